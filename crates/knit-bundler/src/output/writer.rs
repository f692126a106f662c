//! Writing build output to disk.
//!
//! Every target path is validated to stay inside the output directory, and
//! files are written in two phases: all contents go to `<name>.tmp` siblings
//! first, then each is renamed into place. If any step fails, the temp files
//! written so far are removed and no partial chunk set is left behind.

#![allow(clippy::disallowed_methods)]

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::{Error, Result};

/// Write `(file name, contents)` pairs below `dir`.
///
/// With `overwrite` off, an existing target fails the whole write before
/// anything is touched.
pub fn write_files(dir: &Path, files: &[(String, Vec<u8>)], overwrite: bool) -> Result<()> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(files.len());
    for (file_name, contents) in files {
        let target = validate_output_path(&dir, file_name)?;
        if !overwrite && target.exists() {
            return Err(Error::OutputExists(format!(
                "File already exists: '{}'. Use overwrite=true to replace.",
                target.display()
            )));
        }
        operations.push((target, contents.as_slice()));
    }

    write_files_atomic(&operations)?;
    tracing::debug!(dir = %dir.display(), files = operations.len(), "wrote build output");
    Ok(())
}

/// Clean `dir` and make it absolute.
fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir().map_err(|e| {
        Error::InvalidOutputPath(format!("Failed to get current directory: {}", e))
    })?;
    Ok(cwd.join(cleaned).clean())
}

/// Resolve `file_name` below `base_dir`, rejecting anything that escapes it.
pub(crate) fn validate_output_path(base_dir: &Path, file_name: &str) -> Result<PathBuf> {
    if file_name.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    #[cfg(target_os = "windows")]
    {
        const DEVICE_NAMES: &[&str] = &[
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        let upper = file_name.to_uppercase();
        if DEVICE_NAMES
            .iter()
            .any(|device| upper == *device || upper.starts_with(&format!("{}.", device)))
        {
            return Err(Error::InvalidOutputPath(format!(
                "Filename is a reserved device name: {}",
                file_name
            )));
        }
    }

    let full_path = base_dir.join(Path::new(file_name).clean()).clean();
    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            file_name,
            base_dir.display(),
            full_path.display()
        )));
    }
    Ok(full_path)
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut written: Vec<(PathBuf, &Path)> = Vec::with_capacity(operations.len());

    for (target, contents) in operations {
        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                cleanup_temp_files(&written);
                return Err(Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                )));
            }
        }

        let temp = temp_path(target);
        if let Err(e) = fs::write(&temp, contents) {
            cleanup_temp_files(&written);
            return Err(Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp.display(),
                e
            )));
        }
        written.push((temp, target.as_path()));
    }

    for (temp, target) in &written {
        if let Err(e) = fs::rename(temp, target) {
            cleanup_temp_files(&written);
            return Err(Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp.display(),
                target.display(),
                e
            )));
        }
    }

    Ok(())
}

/// Best-effort removal of temp files; we are already failing.
fn cleanup_temp_files(written: &[(PathBuf, &Path)]) {
    for (temp, _) in written {
        if temp.exists() {
            if let Err(e) = fs::remove_file(temp) {
                tracing::warn!(
                    path = %temp.display(),
                    error = %e,
                    "failed to clean up temporary file"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn accepts_plain_and_nested_names() {
        let base = Path::new("/tmp/output");
        assert_eq!(
            validate_output_path(base, "main.js").unwrap(),
            Path::new("/tmp/output/main.js")
        );
        assert_eq!(
            validate_output_path(base, "assets/main.js").unwrap(),
            Path::new("/tmp/output/assets/main.js")
        );
        assert_eq!(
            validate_output_path(base, "./main.js").unwrap(),
            Path::new("/tmp/output/main.js")
        );
    }

    #[test]
    fn rejects_traversal() {
        let base = Path::new("/tmp/output");
        assert!(matches!(
            validate_output_path(base, "../etc/passwd"),
            Err(Error::InvalidOutputPath(_))
        ));
        assert!(validate_output_path(base, "safe/../../../etc/passwd").is_err());
        assert!(validate_output_path(base, ".").is_err());
    }

    #[test]
    fn rejects_null_bytes() {
        let base = Path::new("/tmp/output");
        assert!(validate_output_path(base, "main\0.js").is_err());
    }

    #[test]
    fn writes_files_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            ("main.js".to_string(), b"console.log(1);\n".to_vec()),
            ("main.js.map".to_string(), b"{}".to_vec()),
        ];
        write_files(dir.path(), &files, false).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("main.js")).unwrap(),
            "console.log(1);\n"
        );
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn refuses_to_overwrite_unless_asked() {
        let dir = TempDir::new().unwrap();
        let files = vec![("main.js".to_string(), b"a".to_vec())];
        write_files(dir.path(), &files, false).unwrap();

        let err = write_files(dir.path(), &files, false).unwrap_err();
        assert!(matches!(err, Error::OutputExists(_)));

        let replaced = vec![("main.js".to_string(), b"b".to_vec())];
        write_files(dir.path(), &replaced, true).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("main.js")).unwrap(), "b");
    }
}
