//! Source reader abstraction for the bundler core.
//!
//! The graph builder never touches the filesystem directly. Everything it
//! needs (reading module text, probing candidate paths during resolution,
//! locating the working directory) goes through the [`Runtime`] trait so
//! that builds can run against the real filesystem ([`NativeRuntime`]) or a
//! virtual file set ([`MemoryRuntime`]).

#[cfg(not(target_family = "wasm"))]
mod native;

mod memory;

#[cfg(not(target_family = "wasm"))]
pub use native::NativeRuntime;

pub use memory::MemoryRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// File metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Whether this is a file
    pub is_file: bool,
}

/// Platform runtime trait.
///
/// Implementations supply raw module text and answer the existence checks
/// issued by the resolver. They must be cheap to share behind an `Arc`.
///
/// ```rust,ignore
/// use knit_graph::runtime::{Runtime, RuntimeResult, FileMetadata};
///
/// #[derive(Debug)]
/// struct FixedRuntime;
///
/// #[async_trait::async_trait]
/// impl Runtime for FixedRuntime {
///     async fn read_file(&self, _path: &Path) -> RuntimeResult<Vec<u8>> {
///         Ok(b"export const answer = 42;".to_vec())
///     }
///     // ...
/// }
/// ```
#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file's raw bytes.
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Get file metadata.
    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    /// Check if a path exists (file or directory).
    fn exists(&self, path: &Path) -> bool;

    /// Get the current working directory.
    ///
    /// Virtual runtimes return their configured root so that relative entry
    /// paths resolve identically on every platform.
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}

/// Read a module's source text, rejecting content that is not UTF-8.
pub async fn read_source(runtime: &dyn Runtime, path: &Path) -> RuntimeResult<String> {
    let bytes = runtime.read_file(path).await?;
    String::from_utf8(bytes)
        .map_err(|e| RuntimeError::Io(format!("{} is not valid UTF-8: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_source_rejects_invalid_utf8() {
        let runtime = MemoryRuntime::new("/project");
        runtime.add_file("/project/bad.js", vec![0xff, 0xfe, 0x00]);

        let err = read_source(&runtime, Path::new("/project/bad.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Io(msg) if msg.contains("UTF-8")));
    }

    #[tokio::test]
    async fn read_source_returns_text() {
        let runtime = MemoryRuntime::new("/project");
        runtime.add_file("/project/a.js", "export const a = 1;");

        let text = read_source(&runtime, Path::new("/project/a.js"))
            .await
            .unwrap();
        assert_eq!(text, "export const a = 1;");
    }
}
