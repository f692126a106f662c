//! # knit-graph
//!
//! Module resolution, scope analysis and dependency graph construction for
//! the knit bundler.
//!
//! The crate turns entry specifiers into a closed [`ModuleGraph`]:
//!
//! - [`ModuleResolver`] maps `(specifier, importer)` to a canonical
//!   [`ModuleId`], either a local file or an external package.
//! - [`scan_module`] parses a file with oxc and reduces it to owned records:
//!   top-level statements, root-scope symbols, import/export records and
//!   identifier occurrences.
//! - [`GraphBuilder`] drives both in batched rounds until no unresolved
//!   specifier remains, parsing each batch in parallel.
//!
//! All filesystem access goes through the [`Runtime`] trait, so the same
//! build runs against disk ([`NativeRuntime`]) or a virtual file set
//! ([`MemoryRuntime`]).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use knit_graph::{AbortSignal, GraphBuilder, MemoryRuntime, ModuleResolver};
//!
//! # async fn demo() -> knit_graph::Result<()> {
//! let runtime = MemoryRuntime::with_files(
//!     "/project",
//!     [("src/main.js", "import { greet } from './greet';\ngreet();")],
//! );
//! runtime.add_file("src/greet.js", "export function greet() {}");
//!
//! let graph = GraphBuilder::new(ModuleResolver::default(), Arc::new(runtime))
//!     .build(&["src/main.js".to_string()], &AbortSignal::new())
//!     .await?;
//! assert_eq!(graph.len(), 2);
//! # Ok(())
//! # }
//! ```

mod abort;
pub mod error;
pub mod graph;
pub mod line_index;
pub mod module;
pub mod module_id;
pub mod resolver;
pub mod runtime;
pub mod scan;

pub use abort::AbortSignal;
pub use error::{Error, Location, Result};
pub use graph::{GraphBuilder, ModuleGraph};
pub use line_index::LineIndex;
pub use module::{ExternalModule, Module, NormalModule};
pub use module_id::{
    DependencyIdx, ModuleId, ModuleIdx, StmtIdx, SymbolIdx, SymbolRef, relative_path,
    to_identifier,
};
pub use resolver::{ModuleResolver, ResolutionError, ResolveOptions, ResolveResult};
#[cfg(not(target_family = "wasm"))]
pub use runtime::NativeRuntime;
pub use runtime::{FileMetadata, MemoryRuntime, Runtime, RuntimeError, RuntimeResult};
pub use scan::{
    BindingKind, ExportRecord, ExportTarget, ImportRecord, ImportedName, Occurrence,
    ScannedModule, Statement, StatementKind, Symbol, scan_module,
};

/// Re-exports of the oxc crates the scanner is built on.
pub mod oxc {
    pub use oxc_allocator::Allocator;
    pub use oxc_ast::ast;
    pub use oxc_ast_visit::Visit;
    pub use oxc_parser::{Parser, ParserReturn};
    pub use oxc_semantic::{Scoping, SemanticBuilder, SymbolFlags};
    pub use oxc_span::{GetSpan, SourceType, Span};
}
