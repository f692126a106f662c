//! Owned records produced by the scanner.
//!
//! Nothing here borrows from the oxc arena; a scanned module can be moved
//! across threads and outlive the allocator it was parsed with.

use oxc_span::Span;
use rustc_hash::FxHashSet;

use crate::module_id::{DependencyIdx, StmtIdx, SymbolIdx};

/// How a root-scope binding was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Function,
    Class,
    Const,
    Let,
    Var,
    Import,
}

impl BindingKind {
    /// Whether a second declaration of the same name is an error.
    ///
    /// Top-level functions are lexical in module code, so only `var` may be
    /// repeated.
    pub fn forbids_redeclaration(self) -> bool {
        !matches!(self, BindingKind::Var)
    }
}

/// A binding in the module's top-level scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: BindingKind,
    /// Span of the (first) declaring identifier.
    pub span: Span,
    /// Statements that declare this symbol, in source order.
    pub declarations: Vec<StmtIdx>,
    /// Created for `export default` values that have no name in source.
    pub synthetic: bool,
}

impl Symbol {
    pub fn is_import(&self) -> bool {
        self.kind == BindingKind::Import
    }
}

/// Rendering shape of a top-level statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Emitted verbatim.
    Plain,
    /// `import ... from '...'`
    Import,
    /// `export ... from '...'` and `export * from '...'`
    ReExport,
    /// `export { a, b as c }`
    ExportSpecifiers,
    /// TypeScript-only declarations.
    TypeOnly,
    /// `export <declaration>`; emitted from `declaration_start`.
    ExportDeclaration { declaration_start: u32 },
    /// `export default function/class`; emitted from `declaration_start`,
    /// with the synthetic name inserted at `name_insertion` when anonymous.
    ExportDefaultDeclaration {
        declaration_start: u32,
        name_insertion: Option<u32>,
    },
    /// `export default <expression>`; emitted as `var <name> = <expression>;`.
    ExportDefaultExpression { expression: Span },
}

impl StatementKind {
    /// Whether the statement contributes code to the output.
    pub fn emits_code(self) -> bool {
        !matches!(
            self,
            StatementKind::Import
                | StatementKind::ReExport
                | StatementKind::ExportSpecifiers
                | StatementKind::TypeOnly
        )
    }
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
    /// Root symbols declared by this statement.
    pub declared: Vec<SymbolIdx>,
    /// Root symbols read or written by this statement.
    pub referenced: Vec<SymbolIdx>,
    /// Whether evaluating the statement has observable effects.
    pub side_effects: bool,
    /// Whether the statement's text ends it on its own: a trailing `;` or
    /// the closing brace of a declaration. Unterminated statements can merge
    /// with whatever follows them once moved next to other code.
    pub terminated: bool,
}

/// A unique specifier requested by the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub specifier: String,
    /// Span of the first specifier string literal.
    pub span: Span,
}

/// What an import or re-export asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportedName {
    /// A single export; `default` for default imports.
    Named(String),
    /// The namespace object (`* as ns`).
    Namespace,
}

impl ImportedName {
    pub fn default_export() -> Self {
        ImportedName::Named("default".to_string())
    }

    pub fn as_named(&self) -> Option<&str> {
        match self {
            ImportedName::Named(name) => Some(name),
            ImportedName::Namespace => None,
        }
    }
}

impl std::fmt::Display for ImportedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportedName::Named(name) => write!(f, "{}", name),
            ImportedName::Namespace => write!(f, "*"),
        }
    }
}

/// An import binding: `import { imported as local } from dependency`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub dependency: DependencyIdx,
    pub imported: ImportedName,
    pub local: SymbolIdx,
    pub span: Span,
}

/// Where an exported name comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A root symbol of this module (possibly itself an import).
    Local(SymbolIdx),
    /// `export { imported as exported } from dependency`
    ReExport {
        dependency: DependencyIdx,
        imported: String,
    },
    /// `export * as exported from dependency`
    ReExportNamespace { dependency: DependencyIdx },
}

/// A single exported name declared directly by the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub exported: String,
    pub target: ExportTarget,
    pub span: Span,
}

/// A position where a root symbol is spelled in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub span: Span,
    pub symbol: SymbolIdx,
    /// `{ name }` shorthand; renaming must expand it to `name: renamed`.
    pub shorthand: bool,
}

/// Everything the bundler needs to know about one parsed module.
#[derive(Debug, Clone, Default)]
pub struct ScannedModule {
    pub statements: Vec<Statement>,
    pub symbols: Vec<Symbol>,
    pub dependencies: Vec<Dependency>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    pub star_exports: Vec<DependencyIdx>,
    /// Sorted by span start.
    pub occurrences: Vec<Occurrence>,
    /// Names referenced but never declared (globals).
    pub globals: FxHashSet<String>,
    /// Names declared in nested scopes.
    pub nested_names: FxHashSet<String>,
    pub side_effects: bool,
}

impl ScannedModule {
    pub fn symbol(&self, idx: SymbolIdx) -> &Symbol {
        &self.symbols[idx.index()]
    }

    pub fn statement(&self, idx: StmtIdx) -> &Statement {
        &self.statements[idx.index()]
    }

    pub fn dependency(&self, idx: DependencyIdx) -> &Dependency {
        &self.dependencies[idx.index()]
    }

    /// The import record that introduced `symbol`, if it is an import.
    pub fn import_for(&self, symbol: SymbolIdx) -> Option<&ImportRecord> {
        self.imports.iter().find(|record| record.local == symbol)
    }

    /// Find a root symbol by name.
    pub fn symbol_by_name(&self, name: &str) -> Option<SymbolIdx> {
        self.symbols
            .iter()
            .position(|s| s.name == name)
            .map(|i| SymbolIdx(i as u32))
    }

    /// The directly exported record for `name`.
    pub fn export(&self, name: &str) -> Option<&ExportRecord> {
        self.exports.iter().find(|record| record.exported == name)
    }
}
