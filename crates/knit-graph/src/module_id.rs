//! Canonical module identities and arena indices.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Canonical identity of a module.
///
/// Two imports that resolve to the same `ModuleId` share one graph node.
/// Local modules are keyed by their cleaned absolute path; externals by the
/// specifier that was left unbundled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleId {
    /// A module bundled from source.
    Local(PathBuf),
    /// A module left as a runtime import.
    External(String),
}

impl ModuleId {
    /// Whether this identity refers to an external module.
    pub fn is_external(&self) -> bool {
        matches!(self, ModuleId::External(_))
    }

    /// The file path of a local module.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ModuleId::Local(path) => Some(path),
            ModuleId::External(_) => None,
        }
    }

    /// Human-readable id: local paths relative to `cwd` with forward slashes,
    /// externals verbatim.
    pub fn relative_to(&self, cwd: &Path) -> String {
        match self {
            ModuleId::Local(path) => relative_path(path, cwd),
            ModuleId::External(specifier) => specifier.clone(),
        }
    }

    /// File stem sanitized into a JavaScript identifier.
    pub fn identifier_stem(&self) -> String {
        let raw = match self {
            ModuleId::Local(path) => {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
                if stem == "index" {
                    path.parent()
                        .and_then(|p| p.file_name())
                        .and_then(|s| s.to_str())
                        .unwrap_or(stem)
                } else {
                    stem
                }
            }
            ModuleId::External(specifier) => specifier.rsplit('/').next().unwrap_or(specifier),
        };
        to_identifier(raw)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Local(path) => write!(f, "{}", path.display()),
            ModuleId::External(specifier) => write!(f, "{}", specifier),
        }
    }
}

/// Render `path` relative to `base` using `/` separators.
pub fn relative_path(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn arbitrary text into a valid identifier.
pub fn to_identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Index of a module in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleIdx(pub u32);

impl ModuleIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a root-scope symbol within one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolIdx(pub u32);

impl SymbolIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a top-level statement within one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtIdx(pub u32);

impl StmtIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into a module's dependency (unique specifier) list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyIdx(pub u32);

impl DependencyIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A root-scope symbol addressed across the whole graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolRef {
    pub module: ModuleIdx,
    pub symbol: SymbolIdx,
}

impl SymbolRef {
    pub fn new(module: ModuleIdx, symbol: SymbolIdx) -> Self {
        Self { module, symbol }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_ids_use_forward_slashes() {
        let id = ModuleId::Local(PathBuf::from("/proj/src/util/math.js"));
        assert_eq!(id.relative_to(Path::new("/proj")), "src/util/math.js");
    }

    #[test]
    fn identifier_stem_sanitizes() {
        let id = ModuleId::Local(PathBuf::from("/proj/src/my-module.js"));
        assert_eq!(id.identifier_stem(), "my_module");

        let index = ModuleId::Local(PathBuf::from("/proj/src/widgets/index.ts"));
        assert_eq!(index.identifier_stem(), "widgets");

        let external = ModuleId::External("@scope/pkg".to_string());
        assert_eq!(external.identifier_stem(), "pkg");
    }

    #[test]
    fn identifiers_never_start_with_digits() {
        assert_eq!(to_identifier("2d"), "_2d");
        assert_eq!(to_identifier(""), "_");
    }
}
