//! Extension and index-file probing.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

use super::{ResolutionError, ResolveResult};

/// Supported file extensions for module resolution, in lookup order.
pub const EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs"];

async fn is_file(path: &Path, runtime: &dyn Runtime) -> bool {
    runtime.exists(path)
        && runtime
            .metadata(path)
            .await
            .map(|metadata| metadata.is_file)
            .unwrap_or(false)
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

/// Try `base` as-is, then with each supported extension appended.
///
/// Fails when more than one extension matches, since picking one silently
/// would make the result depend on lookup order rather than the file set.
pub async fn try_extensions(
    base: &Path,
    runtime: &dyn Runtime,
) -> Result<Option<PathBuf>, ResolutionError> {
    if is_file(base, runtime).await {
        return Ok(Some(base.to_path_buf()));
    }
    try_appended_extensions(base, runtime).await
}

async fn try_appended_extensions(
    base: &Path,
    runtime: &dyn Runtime,
) -> Result<Option<PathBuf>, ResolutionError> {
    let mut found = Vec::new();
    for ext in EXTENSIONS {
        let candidate = with_appended_extension(base, ext);
        if is_file(&candidate, runtime).await {
            found.push(candidate);
        }
    }

    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        _ => Err(ResolutionError::AmbiguousExtension { candidates: found }),
    }
}

/// Try `dir/index.<ext>` when `dir` is a directory.
pub async fn try_index_files(
    dir: &Path,
    runtime: &dyn Runtime,
) -> Result<Option<PathBuf>, ResolutionError> {
    if !runtime.exists(dir) {
        return Ok(None);
    }
    match runtime.metadata(dir).await {
        Ok(metadata) if metadata.is_dir => try_extensions(&dir.join("index"), runtime).await,
        _ => Ok(None),
    }
}

/// Resolve a candidate path with extension and index file fallbacks.
pub async fn resolve_with_extensions(
    candidate: PathBuf,
    runtime: &dyn Runtime,
) -> Result<ResolveResult, ResolutionError> {
    if let Some(resolved) = try_extensions(&candidate, runtime).await? {
        return Ok(ResolveResult::Local(resolved));
    }

    if let Some(resolved) = try_index_files(&candidate, runtime).await? {
        return Ok(ResolveResult::Local(resolved));
    }

    Err(ResolutionError::NotFound { candidate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MemoryRuntime;

    #[tokio::test]
    async fn appends_rather_than_replaces_extension() {
        let runtime = MemoryRuntime::with_files("/p", [("user.service.ts", "")]);
        let found = try_extensions(Path::new("/p/user.service"), &runtime)
            .await
            .unwrap();
        assert_eq!(found, Some(PathBuf::from("/p/user.service.ts")));
    }

    #[tokio::test]
    async fn exact_file_beats_extension_lookup() {
        let runtime = MemoryRuntime::with_files("/p", [("a.js", ""), ("a.js.ts", "")]);
        let found = try_extensions(Path::new("/p/a.js"), &runtime).await.unwrap();
        assert_eq!(found, Some(PathBuf::from("/p/a.js")));
    }

    #[tokio::test]
    async fn ambiguous_index_fails() {
        let runtime = MemoryRuntime::with_files("/p", [("lib/index.js", ""), ("lib/index.ts", "")]);
        let err = try_index_files(Path::new("/p/lib"), &runtime)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::AmbiguousExtension { .. }));
    }
}
