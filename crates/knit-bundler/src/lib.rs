#![cfg_attr(docsrs, feature(doc_cfg))]

//! # knit-bundler
//!
//! Links, tree-shakes and renders the module graphs built by `knit-graph`
//! into one self-contained ESM chunk per entry.
//!
//! ## Quick Start
//!
//! ```no_run
//! use knit_bundler::BuildOptions;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let output = BuildOptions::new("./src/index.js")
//!     .external(["react"])
//!     .sourcemap(true)
//!     .build()
//!     .await?;
//!
//! for warning in &output.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! output.write_to("dist", true)?;
//! # Ok(()) }
//! ```
//!
//! ## In-memory builds
//!
//! ```no_run
//! use std::sync::Arc;
//! use knit_bundler::{BuildOptions, MemoryRuntime};
//!
//! # async fn demo() -> knit_bundler::Result<()> {
//! let runtime = MemoryRuntime::with_files(
//!     "/project",
//!     [
//!         ("main.js", "import { add } from './math.js';\nconsole.log(add(1, 2));"),
//!         ("math.js", "export const add = (a, b) => a + b;\nexport const unused = 1;"),
//!     ],
//! );
//! let output = BuildOptions::new("main.js")
//!     .runtime(Arc::new(runtime))
//!     .build()
//!     .await?;
//! assert!(!output.chunks[0].code.contains("unused"));
//! # Ok(()) }
//! ```
//!
//! ## Pipeline
//!
//! 1. `knit-graph` resolves and scans every reachable module
//! 2. [`link`] resolves export tables and import bindings across the graph
//! 3. per entry: [`link::execution_order`], [`shake::analyze`],
//!    [`rename::deconflict`], then [`codegen::render_chunk`]

mod build;
pub mod codegen;
pub mod diagnostics;
pub mod link;
pub mod options;
pub mod output;
pub mod rename;
pub mod shake;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use build::build;
pub use diagnostics::{Diagnostic, DiagnosticContext, DiagnosticKind, DiagnosticSeverity};
pub use knit_config::{InputOption, KnitConfig};
#[cfg(not(target_family = "wasm"))]
pub use knit_graph::NativeRuntime;
pub use knit_graph::{AbortSignal, MemoryRuntime, Runtime, RuntimeError};
pub use options::BuildOptions;
pub use output::{BuildOutput, OutputChunk};
pub use oxc_sourcemap::SourceMap;

/// Error types for knit-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The build failed; every collected diagnostic is attached.
    #[error("{}", diagnostics::summarize(.0))]
    Build(Vec<Diagnostic>),

    /// Invalid build options.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Loading a config file failed.
    #[error("Config error: {0}")]
    Config(#[from] knit_config::ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Output file already exists and overwrite is disabled.
    #[error("Output exists: {0}")]
    OutputExists(String),
}

/// Result type alias for knit-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Diagnostics of a failed build; empty for other errors.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Build(diagnostics) => diagnostics,
            _ => &[],
        }
    }

    /// Whether this is a build failure containing a diagnostic of `kind`.
    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics().iter().any(|d| d.kind == kind)
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        let code = match self {
            Error::Build(diagnostics) => match diagnostics.as_slice() {
                [single] => single.kind.code(),
                _ => "BUILD_FAILED",
            },
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::OutputExists(_) => "OUTPUT_EXISTS",
        };
        Some(Box::new(code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Build(diagnostics) => match diagnostics.as_slice() {
                [single] => single
                    .help
                    .as_ref()
                    .map(|h| Box::new(h.clone()) as Box<dyn std::fmt::Display>),
                _ => Some(Box::new(format!(
                    "{} problems were found. See the related diagnostics.",
                    diagnostics.len()
                ))),
            },
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check the build options.\nError: {}",
                msg
            ))),
            Error::Config(_) => Some(Box::new(
                "Check knit.toml or the \"knit\" field of package.json".to_string(),
            )),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{}' is invalid. Ensure it stays within the output directory.",
                path
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            Error::OutputExists(msg) => Some(Box::new(format!(
                "Output file already exists: {}\nPass overwrite=true to replace existing files.",
                msg
            ))),
            Error::Io(_) => None,
        }
    }

    fn related(&self) -> Option<Box<dyn Iterator<Item = &dyn miette::Diagnostic> + '_>> {
        match self {
            Error::Build(diagnostics) if diagnostics.len() > 1 => Some(Box::new(
                diagnostics.iter().map(|d| d as &dyn miette::Diagnostic),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use knit_graph::{AbortSignal, GraphBuilder, MemoryRuntime, ModuleGraph, ModuleResolver};

    /// Build a graph from `(path, source)` pairs under `/project`; the first
    /// file is the entry.
    pub async fn graph(files: &[(&str, &str)]) -> ModuleGraph {
        let runtime = MemoryRuntime::with_files("/project", files.iter().copied());
        let entry = files[0].0.to_string();
        GraphBuilder::new(ModuleResolver::default(), Arc::new(runtime))
            .build(&[entry], &AbortSignal::new())
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic as _;

    #[test]
    fn single_diagnostic_sets_code_and_help() {
        let error = Error::Build(vec![
            Diagnostic::error(DiagnosticKind::MissingExport, "'x' is not exported by 'a.js'")
                .with_help("Check the export name"),
        ]);
        assert_eq!(error.code().unwrap().to_string(), "MISSING_EXPORT");
        assert_eq!(error.help().unwrap().to_string(), "Check the export name");
        assert!(error.related().is_none());
        assert!(error.has_kind(DiagnosticKind::MissingExport));
    }

    #[test]
    fn several_diagnostics_are_related() {
        let error = Error::Build(vec![
            Diagnostic::error(DiagnosticKind::ParseError, "Unexpected token"),
            Diagnostic::error(DiagnosticKind::UnresolvedImport, "Could not resolve './x'"),
        ]);
        assert_eq!(error.code().unwrap().to_string(), "BUILD_FAILED");
        assert_eq!(error.related().unwrap().count(), 2);
        assert!(error.to_string().starts_with("2 errors:"));
    }
}
