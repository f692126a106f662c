//! Structured diagnostics for build failures and warnings.
//!
//! Every failure the pipeline can produce is reduced to a [`Diagnostic`]:
//! a cloneable, serializable record that names the module, the failure kind
//! and, where available, the source position. A failed build reports all of
//! them at once through [`Error::Build`](crate::Error::Build).

use std::fmt;
use std::path::Path;

use knit_graph::{ResolutionError, relative_path};
use serde::{Deserialize, Serialize};

/// One problem found while building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub message: String,
    /// Module id relative to the build working directory.
    pub module: Option<String>,
    /// 1-indexed line.
    pub line: Option<u32>,
    /// 0-indexed UTF-16 column.
    pub column: Option<u32>,
    pub help: Option<String>,
    /// Structured context for the diagnostic (if available)
    pub context: Option<DiagnosticContext>,
}

/// Structured context for different diagnostic kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiagnosticContext {
    /// An import or re-export asked for a name the target lacks.
    MissingExport {
        export_name: String,
        /// Module the name was requested from
        module_id: String,
        /// Names the target module does export
        available_exports: Vec<String>,
    },
    /// A name reachable through several `export *` sources.
    AmbiguousExport {
        export_name: String,
        /// Modules that supply conflicting bindings
        sources: Vec<String>,
    },
    /// Modules that import each other.
    CircularDependency { cycle_path: Vec<String> },
    UnresolvedEntry { entry_path: String },
    UnresolvedImport { specifier: String, from_file: String },
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnresolvedEntry,
    UnresolvedImport,
    ParseError,
    DuplicateBinding,
    AmbiguousExport,
    CyclicExport,
    MissingExport,
    CircularDependency,
    Aborted,
    Io,
}

impl DiagnosticKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::UnresolvedEntry => "UNRESOLVED_ENTRY",
            DiagnosticKind::UnresolvedImport => "UNRESOLVED_IMPORT",
            DiagnosticKind::ParseError => "PARSE_ERROR",
            DiagnosticKind::DuplicateBinding => "DUPLICATE_BINDING",
            DiagnosticKind::AmbiguousExport => "AMBIGUOUS_EXPORT",
            DiagnosticKind::CyclicExport => "CYCLIC_EXPORT",
            DiagnosticKind::MissingExport => "MISSING_EXPORT",
            DiagnosticKind::CircularDependency => "CIRCULAR_DEPENDENCY",
            DiagnosticKind::Aborted => "ABORTED",
            DiagnosticKind::Io => "IO_ERROR",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticKind::UnresolvedEntry => "unresolved entry",
            DiagnosticKind::UnresolvedImport => "unresolved import",
            DiagnosticKind::ParseError => "parse error",
            DiagnosticKind::DuplicateBinding => "duplicate binding",
            DiagnosticKind::AmbiguousExport => "ambiguous export",
            DiagnosticKind::CyclicExport => "cyclic export",
            DiagnosticKind::MissingExport => "missing export",
            DiagnosticKind::CircularDependency => "circular dependency",
            DiagnosticKind::Aborted => "aborted",
            DiagnosticKind::Io => "I/O error",
        };
        f.write_str(text)
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            module: None,
            line: None,
            column: None,
            help: None,
            context: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(kind, message)
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_location(mut self, location: Option<knit_graph::Location>) -> Self {
        if let Some(location) = location {
            self.line = Some(location.line);
            self.column = Some(location.column);
        }
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_context(mut self, context: DiagnosticContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }

    /// `module:line:column`, as far as it is known.
    pub fn position(&self) -> Option<String> {
        let module = self.module.as_deref()?;
        Some(match (self.line, self.column) {
            (Some(line), Some(column)) => format!("{}:{}:{}", module, line, column),
            (Some(line), None) => format!("{}:{}", module, line),
            _ => module.to_string(),
        })
    }
}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            DiagnosticSeverity::Error => miette::Severity::Error,
            DiagnosticSeverity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_deref()
            .map(|help| Box::new(help) as Box<dyn fmt::Display>)
    }
}

/// Flatten a graph construction failure into diagnostics.
pub fn from_graph_error(error: &knit_graph::Error, cwd: &Path) -> Vec<Diagnostic> {
    error
        .leaves()
        .into_iter()
        .map(|leaf| from_graph_leaf(leaf, cwd))
        .collect()
}

fn from_graph_leaf(error: &knit_graph::Error, cwd: &Path) -> Diagnostic {
    use knit_graph::Error as GraphError;

    let module = error.module_path().map(|path| relative_path(path, cwd));
    let mut diagnostic = match error {
        GraphError::Resolution {
            specifier,
            importer: None,
            source,
        } => Diagnostic::error(
            DiagnosticKind::UnresolvedEntry,
            format!("Could not resolve entry '{}': {}", specifier, source),
        )
        .with_help(resolution_help(source))
        .with_context(DiagnosticContext::UnresolvedEntry {
            entry_path: specifier.clone(),
        }),
        GraphError::Resolution {
            specifier,
            importer: Some(importer),
            source,
        } => Diagnostic::error(
            DiagnosticKind::UnresolvedImport,
            format!("Could not resolve '{}': {}", specifier, source),
        )
        .with_help(resolution_help(source))
        .with_context(DiagnosticContext::UnresolvedImport {
            specifier: specifier.clone(),
            from_file: relative_path(importer, cwd),
        }),
        GraphError::Parse { message, .. } => {
            Diagnostic::error(DiagnosticKind::ParseError, message.clone())
        }
        GraphError::DuplicateBinding { name, .. } => Diagnostic::error(
            DiagnosticKind::DuplicateBinding,
            format!("Identifier '{}' has already been declared", name),
        )
        .with_help("Rename one of the declarations or remove the conflicting import"),
        GraphError::Read { source, .. } => {
            Diagnostic::error(DiagnosticKind::Io, format!("Failed to read module: {}", source))
        }
        GraphError::Runtime(source) => Diagnostic::error(DiagnosticKind::Io, source.to_string()),
        GraphError::Aborted => Diagnostic::error(DiagnosticKind::Aborted, "Build aborted"),
        // leaves() never yields Multiple
        GraphError::Multiple(_) => Diagnostic::error(DiagnosticKind::Io, error.to_string()),
    };
    diagnostic.module = module;
    diagnostic.with_location(error.location())
}

fn resolution_help(error: &ResolutionError) -> String {
    match error {
        ResolutionError::NotFound { .. } => {
            "Check the path, or mark the package as external".to_string()
        }
        ResolutionError::AmbiguousExtension { .. } => {
            "Add the file extension to the specifier".to_string()
        }
        ResolutionError::Disallowed { .. } => {
            "Only relative, absolute, aliased and bare package specifiers are supported"
                .to_string()
        }
        ResolutionError::Runtime(_) => "The filesystem could not be queried".to_string(),
    }
}

/// Format diagnostics as one message, following the single/multiple convention
/// of [`Error`](crate::Error).
pub fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "Build failed".to_string(),
        [single] => format_one(single),
        many => {
            let messages: Vec<_> = many.iter().map(format_one).collect();
            format!("{} errors: {}", many.len(), messages.join("; "))
        }
    }
}

fn format_one(diagnostic: &Diagnostic) -> String {
    match diagnostic.position() {
        Some(position) => format!("{}: {} ({})", diagnostic.kind, diagnostic.message, position),
        None => format!("{}: {}", diagnostic.kind, diagnostic.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn entry_resolution_becomes_unresolved_entry() {
        let error = knit_graph::Error::Resolution {
            specifier: "./main.js".into(),
            importer: None,
            source: ResolutionError::NotFound {
                candidate: PathBuf::from("/p/main.js"),
            },
        };
        let diagnostics = from_graph_error(&error, Path::new("/p"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedEntry);
        assert!(diagnostics[0].module.is_none());
    }

    #[test]
    fn parse_error_keeps_location_and_relative_module() {
        let error = knit_graph::Error::Multiple(vec![
            knit_graph::Error::Parse {
                path: PathBuf::from("/p/src/a.js"),
                message: "Unexpected token".into(),
                location: Some(knit_graph::Location { line: 3, column: 4 }),
            },
            knit_graph::Error::Aborted,
        ]);
        let diagnostics = from_graph_error(&error, Path::new("/p"));
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].module.as_deref(), Some("src/a.js"));
        assert_eq!(diagnostics[0].line, Some(3));
        assert_eq!(diagnostics[0].position().as_deref(), Some("src/a.js:3:4"));
        assert_eq!(diagnostics[1].kind, DiagnosticKind::Aborted);
    }

    #[test]
    fn summary_counts_multiple_diagnostics() {
        let one = Diagnostic::error(DiagnosticKind::MissingExport, "no 'x'");
        assert_eq!(summarize(std::slice::from_ref(&one)), "missing export: no 'x'");

        let two = vec![one.clone(), one.with_module("src/a.js")];
        let summary = summarize(&two);
        assert!(summary.starts_with("2 errors:"));
        assert!(summary.contains("(src/a.js)"));
    }

    #[test]
    fn serializes_kind_in_snake_case() {
        let diagnostic = Diagnostic::warning(DiagnosticKind::CircularDependency, "cycle")
            .with_context(DiagnosticContext::CircularDependency {
                cycle_path: vec!["a.js".into(), "b.js".into(), "a.js".into()],
            });
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "circular_dependency");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["context"]["type"], "CircularDependency");
    }
}
