//! In-memory runtime with virtual files.

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// Runtime that serves files from memory.
///
/// Paths are cleaned and made absolute against the runtime's root before
/// storage, so `"./src/a.js"` and `"/root/src/a.js"` address the same file.
/// Directories exist implicitly whenever some file lives beneath them.
#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    /// Create an empty runtime rooted at `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: Arc::new(RwLock::new(FxHashMap::default())),
            cwd: cwd.into().clean(),
        }
    }

    /// Create a runtime pre-populated with `(path, content)` pairs.
    pub fn with_files<P, C, I>(cwd: impl Into<PathBuf>, files: I) -> Self
    where
        P: Into<PathBuf>,
        C: Into<Vec<u8>>,
        I: IntoIterator<Item = (P, C)>,
    {
        let runtime = Self::new(cwd);
        for (path, content) in files {
            runtime.add_file(path, content);
        }
        runtime
    }

    /// Add or replace a virtual file.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        let normalized = self.normalize(&path.into());
        self.files.write().insert(normalized, content.into());
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether no files are stored.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }
}

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize(path);
        self.files
            .read()
            .get(&normalized)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(normalized))
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let normalized = self.normalize(path);
        if let Some(content) = self.files.read().get(&normalized) {
            return Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
                is_file: true,
            });
        }
        if self.is_dir(&normalized) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
            });
        }
        Err(RuntimeError::FileNotFound(normalized))
    }

    fn exists(&self, path: &Path) -> bool {
        let normalized = self.normalize(path);
        self.files.read().contains_key(&normalized) || self.is_dir(&normalized)
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn relative_and_absolute_paths_share_storage() {
        let runtime = MemoryRuntime::new("/app");
        runtime.add_file("./src/../src/a.js", "a");

        assert!(runtime.exists(Path::new("/app/src/a.js")));
        assert_eq!(runtime.read_file(Path::new("src/a.js")).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn directories_are_implied() {
        let runtime = MemoryRuntime::with_files("/app", [("src/lib/index.js", "x")]);

        let meta = runtime.metadata(Path::new("/app/src/lib")).await.unwrap();
        assert!(meta.is_dir);
        assert!(runtime.exists(Path::new("/app/src")));
        assert!(!runtime.exists(Path::new("/app/other")));
    }

    #[tokio::test]
    async fn prefix_of_file_name_is_not_a_directory() {
        let runtime = MemoryRuntime::with_files("/app", [("src/abc.js", "x")]);
        assert!(!runtime.exists(Path::new("/app/src/ab")));
    }
}
