//! Error taxonomy for graph construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resolver::ResolutionError;
use crate::runtime::RuntimeError;

/// Source position: 1-indexed line, 0-indexed UTF-16 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Errors produced while resolving, reading or scanning modules.
///
/// Every variant is fatal for the build; the graph builder collects all
/// failures of a batch and reports them together via [`Error::Multiple`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A specifier could not be mapped to a module.
    #[error("Failed to resolve '{specifier}' from '{}': {source}", display_importer(.importer.as_deref()))]
    Resolution {
        specifier: String,
        /// `None` for entry specifiers.
        importer: Option<PathBuf>,
        #[source]
        source: ResolutionError,
    },

    /// Source text could not be parsed.
    #[error("Parse error in '{}': {message}", .path.display())]
    Parse {
        path: PathBuf,
        message: String,
        location: Option<Location>,
    },

    /// Two declarations claim the same top-level name in conflicting ways.
    #[error("Duplicate binding '{name}' in '{}'", .path.display())]
    DuplicateBinding {
        path: PathBuf,
        name: String,
        location: Option<Location>,
    },

    /// Module text could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    /// The runtime failed outside of reading a specific module.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// The build was cancelled through its abort signal.
    #[error("Build aborted")]
    Aborted,

    /// Several independent failures.
    #[error("{} errors: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<Error>),
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Collapse a list of failures into one error.
    ///
    /// Returns `None` when the list is empty.
    pub fn from_many(mut errors: Vec<Error>) -> Option<Error> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Error::Multiple(errors)),
        }
    }

    /// Iterate over leaf errors, expanding nested [`Error::Multiple`].
    pub fn leaves(&self) -> Vec<&Error> {
        match self {
            Error::Multiple(errors) => errors.iter().flat_map(Error::leaves).collect(),
            other => vec![other],
        }
    }

    /// The module a failure is attributed to, if any.
    pub fn module_path(&self) -> Option<&Path> {
        match self {
            Error::Resolution { importer, .. } => importer.as_deref(),
            Error::Parse { path, .. }
            | Error::DuplicateBinding { path, .. }
            | Error::Read { path, .. } => Some(path),
            Error::Runtime(_) | Error::Aborted | Error::Multiple(_) => None,
        }
    }

    /// Source position of the failure, if known.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Parse { location, .. } | Error::DuplicateBinding { location, .. } => *location,
            _ => None,
        }
    }
}

fn display_importer(importer: Option<&Path>) -> String {
    importer
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<entry>".to_string())
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_many_collapses_single_error() {
        assert!(Error::from_many(vec![]).is_none());
        assert!(matches!(
            Error::from_many(vec![Error::Aborted]),
            Some(Error::Aborted)
        ));
        assert!(matches!(
            Error::from_many(vec![Error::Aborted, Error::Aborted]),
            Some(Error::Multiple(v)) if v.len() == 2
        ));
    }

    #[test]
    fn leaves_flatten_nested_errors() {
        let nested = Error::Multiple(vec![
            Error::Aborted,
            Error::Multiple(vec![Error::Aborted, Error::Aborted]),
        ]);
        assert_eq!(nested.leaves().len(), 3);
    }

    #[test]
    fn entry_resolution_message_mentions_entry() {
        let err = Error::Resolution {
            specifier: "./missing.js".into(),
            importer: None,
            source: ResolutionError::NotFound {
                candidate: PathBuf::from("/p/missing.js"),
            },
        };
        assert!(err.to_string().contains("<entry>"));
    }
}
