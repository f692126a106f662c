//! Module resolution.
//!
//! Maps an import specifier plus the importing module's path to a canonical
//! [`ResolveResult`]. Resolution is a pure function of the specifier, the
//! importer, the options and the runtime's file set, so the same request
//! always yields the same identity within one build.

mod aliases;
mod extensions;

pub use aliases::resolve_path_alias;
pub use extensions::{EXTENSIONS, resolve_with_extensions, try_extensions, try_index_files};

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rustc_hash::FxHashMap;

use crate::runtime::{Runtime, RuntimeError};

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    /// A file that will be bundled.
    Local(PathBuf),
    /// A specifier that stays an import in the output.
    External(String),
}

/// Why a specifier could not be resolved.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolutionError {
    /// No file matched the candidate path.
    #[error("module not found (tried '{}')", .candidate.display())]
    NotFound { candidate: PathBuf },

    /// Several extensions matched the same extensionless path.
    #[error("ambiguous extension, candidates: {}", display_paths(.candidates))]
    AmbiguousExtension { candidates: Vec<PathBuf> },

    /// The specifier can never be bundled.
    #[error("disallowed specifier: {reason}")]
    Disallowed { reason: String },

    /// The runtime failed while probing the filesystem.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolver configuration.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Packages treated as external (exact name or `name/` prefix).
    pub external: Vec<String>,

    /// Path aliases, e.g. `"@" -> "./src"`, resolved relative to `cwd`.
    pub aliases: FxHashMap<String, String>,

    /// Working directory; falls back to the runtime's cwd.
    pub cwd: Option<PathBuf>,
}

/// Node-style resolver over a [`Runtime`].
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    options: ResolveOptions,
}

impl ModuleResolver {
    /// Create a new module resolver with the given configuration.
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve `specifier` as written inside `importer`.
    ///
    /// 1. Reject disallowed specifiers
    /// 2. Explicit externals and `node:` builtins
    /// 3. Path aliases
    /// 4. Relative/absolute paths with extension and index fallbacks
    /// 5. Remaining bare specifiers are external packages
    pub async fn resolve(
        &self,
        specifier: &str,
        importer: &Path,
        runtime: &dyn Runtime,
    ) -> Result<ResolveResult, ResolutionError> {
        validate_specifier(specifier)?;

        if specifier.starts_with("node:") || is_external(specifier, &self.options.external) {
            return Ok(ResolveResult::External(specifier.to_string()));
        }

        if let Some(target) = resolve_path_alias(specifier, &self.options.aliases) {
            let cwd = self.get_cwd(runtime)?;
            let candidate = cwd.join(target).clean();
            tracing::debug!(specifier, candidate = %candidate.display(), "resolved path alias");
            return resolve_with_extensions(candidate, runtime).await;
        }

        if is_path_like(specifier) {
            let base = importer.parent().unwrap_or(Path::new(""));
            let candidate = base.join(specifier).clean();
            return resolve_with_extensions(candidate, runtime).await;
        }

        Ok(ResolveResult::External(specifier.to_string()))
    }

    /// Resolve an entry specifier against the working directory.
    ///
    /// Entries are always bundled, so bare names are treated as relative
    /// paths instead of packages.
    pub async fn resolve_entry(
        &self,
        specifier: &str,
        runtime: &dyn Runtime,
    ) -> Result<PathBuf, ResolutionError> {
        validate_specifier(specifier)?;
        let cwd = self.get_cwd(runtime)?;
        let candidate = cwd.join(specifier).clean();
        match resolve_with_extensions(candidate, runtime).await? {
            ResolveResult::Local(path) => Ok(path),
            ResolveResult::External(name) => Err(ResolutionError::Disallowed {
                reason: format!("entry '{}' resolved to an external module", name),
            }),
        }
    }

    /// Get the current working directory, preferring config, then runtime.
    pub fn get_cwd(&self, runtime: &dyn Runtime) -> Result<PathBuf, RuntimeError> {
        match &self.options.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => runtime.get_cwd(),
        }
    }
}

/// Check if a specifier is explicitly marked as external.
pub fn is_external(specifier: &str, external: &[String]) -> bool {
    external.iter().any(|ext| {
        specifier == ext
            || specifier
                .strip_prefix(ext.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

fn validate_specifier(specifier: &str) -> Result<(), ResolutionError> {
    if specifier.is_empty() {
        return Err(ResolutionError::Disallowed {
            reason: "empty specifier".to_string(),
        });
    }
    if specifier.contains('\0') {
        return Err(ResolutionError::Disallowed {
            reason: "specifier contains a null byte".to_string(),
        });
    }
    for scheme in ["http:", "https:", "data:", "file:"] {
        if specifier.starts_with(scheme) {
            return Err(ResolutionError::Disallowed {
                reason: format!("'{}' URLs cannot be bundled", scheme),
            });
        }
    }
    Ok(())
}
