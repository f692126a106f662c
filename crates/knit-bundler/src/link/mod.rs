//! Export/binding resolution.
//!
//! The linker runs once per build, after the graph is closed. It computes a
//! sorted export table for every module and the binding each import symbol
//! refers to, following ECMAScript `ResolveExport` semantics:
//!
//! - direct exports win over names merged from `export *`;
//! - star sources that supply *different* bindings for a name make it
//!   ambiguous, and the name is left out (or fails the build in strict mode);
//! - `default` never travels through `export *`;
//! - a cyclic `export *` contributes nothing, while a named re-export that
//!   loops back to itself is a [`LinkError::CyclicExport`].

mod exec_order;
mod exports;

pub use exec_order::{ExecutionOrder, execution_order};
pub use exports::{ExportResolver, Resolution, external_star_sources};

use indexmap::IndexMap;
use knit_graph::{
    ExportTarget, ImportedName, ModuleGraph, ModuleIdx, NormalModule, SymbolRef,
};
use oxc_span::Span;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::diagnostics::{Diagnostic, DiagnosticContext, DiagnosticKind};

/// What a name ultimately refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Binding {
    /// A declaration in a bundled module.
    Symbol(SymbolRef),
    /// The namespace object of a bundled module.
    Namespace(ModuleIdx),
    /// A binding of an external module, imported at runtime.
    External {
        module: ModuleIdx,
        name: ImportedName,
    },
}

/// Exported name to binding, sorted by name.
pub type ExportTable = IndexMap<String, Binding>;

/// Where in a module a link failure was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Site {
    pub module: ModuleIdx,
    pub span: Span,
}

/// A name that could not be linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// `target` does not export `name`.
    MissingExport {
        site: Site,
        target: ModuleIdx,
        name: String,
        /// The name exists but is ambiguous in `target`.
        ambiguous: bool,
    },
    /// `module` receives `name` from several star sources.
    AmbiguousExport {
        module: ModuleIdx,
        name: String,
        sources: Vec<ModuleIdx>,
        site: Option<Site>,
    },
    /// Resolving `name` in `module` leads back to itself.
    CyclicExport {
        module: ModuleIdx,
        name: String,
        site: Option<Site>,
    },
}

impl LinkError {
    fn key(&self) -> (u8, ModuleIdx, &str) {
        match self {
            LinkError::MissingExport { site, name, .. } => (0, site.module, name),
            LinkError::AmbiguousExport { module, name, .. } => (1, *module, name),
            LinkError::CyclicExport { module, name, .. } => (2, *module, name),
        }
    }

    /// Render as a diagnostic of the given severity.
    pub fn to_diagnostic(&self, graph: &ModuleGraph, as_error: bool) -> Diagnostic {
        let diagnostic = match self {
            LinkError::MissingExport {
                site,
                target,
                name,
                ambiguous,
            } => {
                let target_id = graph.relative_id(*target);
                let available = available_exports(graph, *target);
                let help = if *ambiguous {
                    format!(
                        "'{}' is exported by several `export *` sources of '{}'; import it from one of them directly",
                        name, target_id
                    )
                } else if available.is_empty() {
                    format!("'{}' has no exports", target_id)
                } else {
                    format!("Available exports: {}", available.join(", "))
                };
                Diagnostic::error(
                    DiagnosticKind::MissingExport,
                    format!("'{}' is not exported by '{}'", name, target_id),
                )
                .with_help(help)
                .with_context(DiagnosticContext::MissingExport {
                    export_name: name.clone(),
                    module_id: target_id,
                    available_exports: available,
                })
                .at(graph, Some(*site))
            }
            LinkError::AmbiguousExport {
                module,
                name,
                sources,
                site,
            } => {
                let sources: Vec<String> = sources.iter().map(|m| graph.relative_id(*m)).collect();
                Diagnostic::error(
                    DiagnosticKind::AmbiguousExport,
                    format!(
                        "'{}' is exported by more than one `export *` source of '{}' ({})",
                        name,
                        graph.relative_id(*module),
                        sources.join(", ")
                    ),
                )
                .with_help(format!("Re-export '{}' explicitly to pick one source", name))
                .with_context(DiagnosticContext::AmbiguousExport {
                    export_name: name.clone(),
                    sources,
                })
                .with_module(graph.relative_id(*module))
                .at(graph, *site)
            }
            LinkError::CyclicExport { module, name, site } => Diagnostic::error(
                DiagnosticKind::CyclicExport,
                format!(
                    "Export '{}' of '{}' re-exports itself in a cycle",
                    name,
                    graph.relative_id(*module)
                ),
            )
            .with_module(graph.relative_id(*module))
            .at(graph, *site),
        };
        if as_error {
            diagnostic
        } else {
            Diagnostic {
                severity: crate::diagnostics::DiagnosticSeverity::Warning,
                ..diagnostic
            }
        }
    }
}

impl Diagnostic {
    /// Attach a module and position from a link site.
    fn at(self, graph: &ModuleGraph, site: Option<Site>) -> Self {
        let Some(site) = site else {
            return self;
        };
        let location = graph
            .normal(site.module)
            .map(|normal| normal.lines.location(&normal.source, site.span.start));
        self.with_module(graph.relative_id(site.module))
            .with_location(location)
    }
}

fn available_exports(graph: &ModuleGraph, module: ModuleIdx) -> Vec<String> {
    ExportResolver::new(graph).exported_names(module)
}

/// Result of linking a graph.
#[derive(Debug, Clone, Default)]
pub struct LinkOutput {
    export_tables: Vec<ExportTable>,
    import_bindings: FxHashMap<SymbolRef, Binding>,
    external_stars: FxHashMap<ModuleIdx, Vec<ModuleIdx>>,
    /// Fatal failures.
    pub errors: Vec<LinkError>,
    /// Ambiguous names dropped outside strict mode.
    pub warnings: Vec<LinkError>,
}

impl LinkOutput {
    /// Export table of `module`; empty for externals.
    pub fn export_table(&self, module: ModuleIdx) -> &ExportTable {
        &self.export_tables[module.index()]
    }

    /// The binding an import symbol resolved to.
    pub fn import_binding(&self, symbol: SymbolRef) -> Option<&Binding> {
        self.import_bindings.get(&symbol)
    }

    /// Final binding of any root symbol: imports are followed, declarations
    /// stand for themselves.
    pub fn binding_of(&self, graph: &ModuleGraph, symbol: SymbolRef) -> Option<Binding> {
        let normal = graph.normal(symbol.module)?;
        if normal.scanned.symbol(symbol.symbol).is_import() {
            self.import_binding(symbol).cloned()
        } else {
            Some(Binding::Symbol(symbol))
        }
    }

    /// External modules re-exported through an entry's `export *` closure.
    pub fn external_stars(&self, entry: ModuleIdx) -> &[ModuleIdx] {
        self.external_stars
            .get(&entry)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Computes export tables and import bindings for a [`ModuleGraph`].
pub struct Linker<'g> {
    graph: &'g ModuleGraph,
    strict: bool,
    resolver: ExportResolver<'g>,
    reported: FxHashSet<(u8, ModuleIdx, String)>,
    output: LinkOutput,
}

impl<'g> Linker<'g> {
    pub fn new(graph: &'g ModuleGraph, strict: bool) -> Self {
        Self {
            graph,
            strict,
            resolver: ExportResolver::new(graph),
            reported: FxHashSet::default(),
            output: LinkOutput::default(),
        }
    }

    pub fn link(mut self) -> LinkOutput {
        let graph = self.graph;
        for module in graph.modules() {
            let table = match module.as_normal() {
                Some(normal) => self.build_export_table(normal),
                None => ExportTable::new(),
            };
            self.output.export_tables.push(table);
        }

        for normal in graph.normal_modules() {
            self.bind_imports(normal);
        }

        for &entry in graph.entries() {
            let stars = external_star_sources(graph, entry);
            self.output.external_stars.insert(entry, stars);
        }

        tracing::debug!(
            modules = graph.len(),
            errors = self.output.errors.len(),
            warnings = self.output.warnings.len(),
            "linked module graph"
        );
        self.output
    }

    fn build_export_table(&mut self, normal: &NormalModule) -> ExportTable {
        let mut table = ExportTable::new();
        for name in self.resolver.exported_names(normal.idx) {
            let direct = normal.scanned.export(&name).map(|record| Site {
                module: normal.idx,
                span: record.span,
            });
            match self.resolver.resolve_export(normal.idx, &name) {
                Resolution::Found(binding) => {
                    table.insert(name, binding);
                }
                Resolution::Ambiguous(sources) => {
                    self.ambiguous(normal.idx, name, sources, None);
                }
                Resolution::Circular => self.report(
                    LinkError::CyclicExport {
                        module: normal.idx,
                        name,
                        site: direct,
                    },
                    true,
                ),
                Resolution::NotFound => self.missing_reexport(normal, &name),
            }
        }
        table
    }

    /// A direct re-export (or exported import) whose target lacks the name.
    fn missing_reexport(&mut self, normal: &NormalModule, name: &str) {
        let Some(record) = normal.scanned.export(name) else {
            return;
        };
        let (dependency, imported) = match &record.target {
            ExportTarget::ReExport {
                dependency,
                imported,
            } => (*dependency, imported.clone()),
            ExportTarget::Local(symbol) => match normal.scanned.import_for(*symbol) {
                Some(import) => match &import.imported {
                    ImportedName::Named(imported) => (import.dependency, imported.clone()),
                    ImportedName::Namespace => return,
                },
                None => return,
            },
            ExportTarget::ReExportNamespace { .. } => return,
        };
        let target = normal.dependency_module(dependency);
        let site = Site {
            module: normal.idx,
            span: record.span,
        };
        self.missing(site, target, imported);
    }

    fn bind_imports(&mut self, normal: &NormalModule) {
        for record in &normal.scanned.imports {
            let symbol = SymbolRef::new(normal.idx, record.local);
            let site = Site {
                module: normal.idx,
                span: record.span,
            };
            match self.resolver.resolve_import(normal, record.local) {
                Resolution::Found(binding) => {
                    self.output.import_bindings.insert(symbol, binding);
                }
                Resolution::NotFound => {
                    let target = normal.dependency_module(record.dependency);
                    self.missing(site, target, record.imported.to_string());
                }
                Resolution::Ambiguous(sources) => {
                    let target = normal.dependency_module(record.dependency);
                    let name = record.imported.to_string();
                    if self.strict {
                        self.ambiguous(target, name, sources, Some(site));
                    } else {
                        self.report(
                            LinkError::MissingExport {
                                site,
                                target,
                                name,
                                ambiguous: true,
                            },
                            true,
                        );
                    }
                }
                Resolution::Circular => {
                    let target = normal.dependency_module(record.dependency);
                    self.report(
                        LinkError::CyclicExport {
                            module: target,
                            name: record.imported.to_string(),
                            site: Some(site),
                        },
                        true,
                    );
                }
            }
        }
    }

    /// Report a missing name unless the failure really lies deeper, in a
    /// module that claims the name but cannot resolve it.
    fn missing(&mut self, site: Site, target: ModuleIdx, name: String) {
        if self.resolver.exported_names(target).contains(&name) {
            return;
        }
        self.report(
            LinkError::MissingExport {
                site,
                target,
                name,
                ambiguous: false,
            },
            true,
        );
    }

    fn ambiguous(
        &mut self,
        module: ModuleIdx,
        name: String,
        sources: Vec<ModuleIdx>,
        site: Option<Site>,
    ) {
        if !self.strict {
            tracing::warn!(
                module = %self.graph.relative_id(module),
                name = %name,
                "dropping ambiguous star export"
            );
        }
        let strict = self.strict;
        self.report(
            LinkError::AmbiguousExport {
                module,
                name,
                sources,
                site,
            },
            strict,
        );
    }

    fn report(&mut self, error: LinkError, fatal: bool) {
        let (tag, module, name) = error.key();
        if !self.reported.insert((tag, module, name.to_string())) {
            return;
        }
        if fatal {
            self.output.errors.push(error);
        } else {
            self.output.warnings.push(error);
        }
    }
}
