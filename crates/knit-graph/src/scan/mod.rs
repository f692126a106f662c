//! Parser and scope analyzer.
//!
//! [`scan_module`] parses one module with oxc, runs semantic analysis and
//! reduces the arena-allocated AST into an owned [`ScannedModule`]: the
//! top-level statements, the root-scope symbol table, import/export records
//! and the identifier positions needed later for renaming.

mod collector;
mod records;
mod side_effects;

pub use records::{
    BindingKind, Dependency, ExportRecord, ExportTarget, ImportRecord, ImportedName, Occurrence,
    ScannedModule, Statement, StatementKind, Symbol,
};
pub use side_effects::{expression_has_side_effects, statement_has_side_effects};

use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Class, Declaration, ExportDefaultDeclarationKind, Function, ImportDeclarationSpecifier,
    ModuleExportName, Program, TSModuleDeclarationName, VariableDeclarationKind,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_semantic::{Scoping, SemanticBuilder, SymbolFlags, SymbolId};
use oxc_span::{GetSpan, SourceType, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::line_index::LineIndex;
use crate::module_id::{DependencyIdx, ModuleId, StmtIdx, SymbolIdx};

use collector::ReferenceCollector;

/// Parse and analyze one module.
///
/// This is a pure function of `path` and `source`; the path selects the
/// dialect (`.ts`, `.tsx`, `.jsx`, ...) and names synthetic bindings.
pub fn scan_module(path: &Path, source: &str) -> Result<ScannedModule> {
    let source_type = SourceType::from_path(path)
        .unwrap_or(SourceType::mjs())
        .with_module(true);
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    let lines = LineIndex::new(source);

    if let Some(error) = ret.errors.first() {
        let offset = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset() as u32);
        return Err(Error::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
            location: offset.map(|offset| lines.location(source, offset)),
        });
    }
    if ret.panicked {
        return Err(Error::Parse {
            path: path.to_path_buf(),
            message: "parser gave up on this file".to_string(),
            location: None,
        });
    }

    let program = ret.program;
    let mut scanner = Scanner::new(path, source, &lines, source_type.is_typescript());
    scanner.declare_statements(&program)?;

    let semantic = SemanticBuilder::new().build(&program).semantic;
    let scoping = semantic.scoping();
    let root_symbols = scanner.bind_root_symbols(&program, scoping);
    scanner.collect_references(&program, scoping, &root_symbols);
    scanner.finish()
}

/// A declaration reduced to what the symbol table needs.
enum DeclaredNames {
    /// Erased at runtime; names are remembered so `export { T }` is accepted.
    Type(Vec<String>),
    Value(BindingKind, Vec<(String, Span)>),
}

/// A trailing `;`, or a declaration whose closing brace cannot continue
/// into the next statement.
fn is_terminated(stmt: &oxc_ast::ast::Statement<'_>, source: &str) -> bool {
    use oxc_ast::ast::Statement as Stmt;

    let ends_with_semicolon = source
        .get(..stmt.span().end as usize)
        .is_some_and(|text| text.ends_with(';'));
    ends_with_semicolon
        || match stmt {
            Stmt::FunctionDeclaration(_)
            | Stmt::ClassDeclaration(_)
            | Stmt::BlockStatement(_)
            | Stmt::TSEnumDeclaration(_)
            | Stmt::TSModuleDeclaration(_) => true,
            Stmt::ExportNamedDeclaration(export) => matches!(
                export.declaration,
                Some(
                    Declaration::FunctionDeclaration(_)
                        | Declaration::ClassDeclaration(_)
                        | Declaration::TSEnumDeclaration(_)
                        | Declaration::TSModuleDeclaration(_)
                )
            ),
            Stmt::ExportDefaultDeclaration(export) => matches!(
                export.declaration,
                ExportDefaultDeclarationKind::FunctionDeclaration(_)
                    | ExportDefaultDeclarationKind::ClassDeclaration(_)
            ),
            _ => false,
        }
}

fn declared_names(decl: &Declaration<'_>) -> DeclaredNames {
    match decl {
        Declaration::VariableDeclaration(var) => {
            let names = var
                .declarations
                .iter()
                .flat_map(|declarator| declarator.id.get_binding_identifiers())
                .map(|ident| (ident.name.to_string(), ident.span))
                .collect::<Vec<_>>();
            if var.declare {
                return DeclaredNames::Type(names.into_iter().map(|(name, _)| name).collect());
            }
            let kind = match var.kind {
                VariableDeclarationKind::Var => BindingKind::Var,
                VariableDeclarationKind::Let => BindingKind::Let,
                _ => BindingKind::Const,
            };
            DeclaredNames::Value(kind, names)
        }
        Declaration::FunctionDeclaration(func) => {
            if func.declare || func.body.is_none() {
                return DeclaredNames::Type(Vec::new());
            }
            DeclaredNames::Value(BindingKind::Function, function_name(func))
        }
        Declaration::ClassDeclaration(class) => {
            if class.declare {
                return DeclaredNames::Type(class_name(class).into_iter().map(|(n, _)| n).collect());
            }
            DeclaredNames::Value(BindingKind::Class, class_name(class))
        }
        Declaration::TSTypeAliasDeclaration(alias) => {
            DeclaredNames::Type(vec![alias.id.name.to_string()])
        }
        Declaration::TSInterfaceDeclaration(interface) => {
            DeclaredNames::Type(vec![interface.id.name.to_string()])
        }
        Declaration::TSEnumDeclaration(decl) if !decl.declare => DeclaredNames::Value(
            BindingKind::Var,
            vec![(decl.id.name.to_string(), decl.id.span)],
        ),
        Declaration::TSModuleDeclaration(decl) if !decl.declare => match &decl.id {
            TSModuleDeclarationName::Identifier(ident) => {
                DeclaredNames::Value(BindingKind::Var, vec![(ident.name.to_string(), ident.span)])
            }
            TSModuleDeclarationName::StringLiteral(_) => DeclaredNames::Type(Vec::new()),
        },
        Declaration::TSImportEqualsDeclaration(decl) if !decl.import_kind.is_type() => {
            DeclaredNames::Value(BindingKind::Var, vec![(decl.id.name.to_string(), decl.id.span)])
        }
        _ => DeclaredNames::Type(Vec::new()),
    }
}

fn function_name(func: &Function<'_>) -> Vec<(String, Span)> {
    func.id
        .iter()
        .map(|id| (id.name.to_string(), id.span))
        .collect()
}

fn class_name(class: &Class<'_>) -> Vec<(String, Span)> {
    class
        .id
        .iter()
        .map(|id| (id.name.to_string(), id.span))
        .collect()
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

/// `export { local as exported }` waiting for every declaration to be seen.
struct PendingLocalExport {
    exported: String,
    local: String,
    span: Span,
}

enum PendingExport {
    Resolved(ExportRecord),
    Local(PendingLocalExport),
}

struct Scanner<'s> {
    path: &'s Path,
    source: &'s str,
    lines: &'s LineIndex,
    typescript: bool,
    default_name: String,
    module: ScannedModule,
    names: FxHashMap<String, SymbolIdx>,
    type_names: FxHashSet<String>,
    dependency_index: FxHashMap<String, DependencyIdx>,
    pending_exports: Vec<PendingExport>,
}

impl<'s> Scanner<'s> {
    fn new(path: &'s Path, source: &'s str, lines: &'s LineIndex, typescript: bool) -> Self {
        let stem = ModuleId::Local(path.to_path_buf()).identifier_stem();
        Self {
            path,
            source,
            lines,
            typescript,
            default_name: format!("{stem}_default"),
            module: ScannedModule::default(),
            names: FxHashMap::default(),
            type_names: FxHashSet::default(),
            dependency_index: FxHashMap::default(),
            pending_exports: Vec::new(),
        }
    }

    fn path_buf(&self) -> PathBuf {
        self.path.to_path_buf()
    }

    fn declare(
        &mut self,
        name: &str,
        span: Span,
        kind: BindingKind,
        stmt: StmtIdx,
    ) -> Result<SymbolIdx> {
        if let Some(&idx) = self.names.get(name) {
            let symbol = &mut self.module.symbols[idx.index()];
            if kind.forbids_redeclaration() || symbol.kind.forbids_redeclaration() {
                return Err(Error::DuplicateBinding {
                    path: self.path.to_path_buf(),
                    name: name.to_string(),
                    location: Some(self.lines.location(self.source, span.start)),
                });
            }
            if !symbol.declarations.contains(&stmt) {
                symbol.declarations.push(stmt);
            }
            return Ok(idx);
        }

        let idx = self.push_symbol(Symbol {
            name: name.to_string(),
            kind,
            span,
            declarations: vec![stmt],
            synthetic: false,
        });
        self.names.insert(name.to_string(), idx);
        Ok(idx)
    }

    fn push_symbol(&mut self, symbol: Symbol) -> SymbolIdx {
        let idx = SymbolIdx(self.module.symbols.len() as u32);
        self.module.symbols.push(symbol);
        idx
    }

    /// Synthetic binding for an anonymous `export default`.
    fn declare_default(&mut self, kind: BindingKind, at: u32, stmt: StmtIdx) -> SymbolIdx {
        self.push_symbol(Symbol {
            name: self.default_name.clone(),
            kind,
            span: Span::new(at, at),
            declarations: vec![stmt],
            synthetic: true,
        })
    }

    fn dependency(&mut self, specifier: &str, span: Span) -> DependencyIdx {
        if let Some(&idx) = self.dependency_index.get(specifier) {
            return idx;
        }
        let idx = DependencyIdx(self.module.dependencies.len() as u32);
        self.module.dependencies.push(Dependency {
            specifier: specifier.to_string(),
            span,
        });
        self.dependency_index.insert(specifier.to_string(), idx);
        idx
    }

    fn export(&mut self, exported: String, target: ExportTarget, span: Span) {
        self.pending_exports
            .push(PendingExport::Resolved(ExportRecord {
                exported,
                target,
                span,
            }));
    }

    fn declare_values(
        &mut self,
        kind: BindingKind,
        names: &[(String, Span)],
        stmt: StmtIdx,
    ) -> Result<Vec<SymbolIdx>> {
        names
            .iter()
            .map(|(name, span)| self.declare(name, *span, kind, stmt))
            .collect()
    }

    /// First pass: statement kinds, declarations and module records.
    fn declare_statements(&mut self, program: &Program<'_>) -> Result<()> {
        for (i, stmt) in program.body.iter().enumerate() {
            let idx = StmtIdx(i as u32);
            let span = stmt.span();
            let (kind, declared) = self.declare_statement(stmt, idx)?;
            let side_effects = kind != StatementKind::TypeOnly && statement_has_side_effects(stmt);
            let terminated = is_terminated(stmt, self.source);
            self.module.statements.push(Statement {
                span,
                kind,
                declared,
                referenced: Vec::new(),
                side_effects,
                terminated,
            });
        }
        Ok(())
    }

    fn declare_statement(
        &mut self,
        stmt: &oxc_ast::ast::Statement<'_>,
        idx: StmtIdx,
    ) -> Result<(StatementKind, Vec<SymbolIdx>)> {
        use oxc_ast::ast::Statement as Stmt;

        match stmt {
            Stmt::ImportDeclaration(import) => {
                if import.import_kind.is_type() {
                    return Ok((StatementKind::TypeOnly, Vec::new()));
                }
                let dependency = self.dependency(&import.source.value, import.source.span);
                let mut declared = Vec::new();
                for specifier in import.specifiers.iter().flatten() {
                    let (imported, local) = match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                            if spec.import_kind.is_type() {
                                continue;
                            }
                            (ImportedName::Named(export_name(&spec.imported)), &spec.local)
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                            (ImportedName::default_export(), &spec.local)
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                            (ImportedName::Namespace, &spec.local)
                        }
                    };
                    let symbol = self.declare(&local.name, local.span, BindingKind::Import, idx)?;
                    self.module.imports.push(ImportRecord {
                        dependency,
                        imported,
                        local: symbol,
                        span: specifier.span(),
                    });
                    declared.push(symbol);
                }
                Ok((StatementKind::Import, declared))
            }

            Stmt::ExportAllDeclaration(export) => {
                if export.export_kind.is_type() {
                    return Ok((StatementKind::TypeOnly, Vec::new()));
                }
                let dependency = self.dependency(&export.source.value, export.source.span);
                match &export.exported {
                    Some(exported) => self.export(
                        export_name(exported),
                        ExportTarget::ReExportNamespace { dependency },
                        export.span,
                    ),
                    None => {
                        if !self.module.star_exports.contains(&dependency) {
                            self.module.star_exports.push(dependency);
                        }
                    }
                }
                Ok((StatementKind::ReExport, Vec::new()))
            }

            Stmt::ExportNamedDeclaration(export) => {
                if export.export_kind.is_type() {
                    return Ok((StatementKind::TypeOnly, Vec::new()));
                }

                if let Some(source) = &export.source {
                    let dependency = self.dependency(&source.value, source.span);
                    for specifier in &export.specifiers {
                        if specifier.export_kind.is_type() {
                            continue;
                        }
                        self.export(
                            export_name(&specifier.exported),
                            ExportTarget::ReExport {
                                dependency,
                                imported: export_name(&specifier.local),
                            },
                            specifier.span,
                        );
                    }
                    return Ok((StatementKind::ReExport, Vec::new()));
                }

                if let Some(decl) = &export.declaration {
                    return match declared_names(decl) {
                        DeclaredNames::Type(names) => {
                            self.type_names.extend(names);
                            Ok((StatementKind::TypeOnly, Vec::new()))
                        }
                        DeclaredNames::Value(kind, names) => {
                            let declared = self.declare_values(kind, &names, idx)?;
                            for (symbol, (name, span)) in declared.iter().zip(&names) {
                                self.export(name.clone(), ExportTarget::Local(*symbol), *span);
                            }
                            Ok((
                                StatementKind::ExportDeclaration {
                                    declaration_start: decl.span().start,
                                },
                                declared,
                            ))
                        }
                    };
                }

                for specifier in &export.specifiers {
                    if specifier.export_kind.is_type() {
                        continue;
                    }
                    self.pending_exports
                        .push(PendingExport::Local(PendingLocalExport {
                            exported: export_name(&specifier.exported),
                            local: export_name(&specifier.local),
                            span: specifier.span,
                        }));
                }
                Ok((StatementKind::ExportSpecifiers, Vec::new()))
            }

            Stmt::ExportDefaultDeclaration(export) => self.declare_default_export(export, idx),

            Stmt::TSNamespaceExportDeclaration(_) => Ok((StatementKind::TypeOnly, Vec::new())),

            _ => match stmt.as_declaration().map(declared_names) {
                Some(DeclaredNames::Type(names)) => {
                    self.type_names.extend(names);
                    Ok((StatementKind::TypeOnly, Vec::new()))
                }
                Some(DeclaredNames::Value(kind, names)) => {
                    let declared = self.declare_values(kind, &names, idx)?;
                    Ok((StatementKind::Plain, declared))
                }
                None => Ok((StatementKind::Plain, Vec::new())),
            },
        }
    }

    fn declare_default_export(
        &mut self,
        export: &oxc_ast::ast::ExportDefaultDeclaration<'_>,
        idx: StmtIdx,
    ) -> Result<(StatementKind, Vec<SymbolIdx>)> {
        let default = "default".to_string();
        match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                if func.body.is_none() {
                    return Ok((StatementKind::TypeOnly, Vec::new()));
                }
                let (symbol, name_insertion) = match &func.id {
                    Some(id) => (
                        self.declare(&id.name, id.span, BindingKind::Function, idx)?,
                        None,
                    ),
                    None => {
                        let at = func
                            .type_parameters
                            .as_ref()
                            .map(|params| params.span.start)
                            .unwrap_or(func.params.span.start);
                        (
                            self.declare_default(BindingKind::Function, at, idx),
                            Some(at),
                        )
                    }
                };
                self.export(default, ExportTarget::Local(symbol), export.span);
                Ok((
                    StatementKind::ExportDefaultDeclaration {
                        declaration_start: func.span.start,
                        name_insertion,
                    },
                    vec![symbol],
                ))
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                let (symbol, name_insertion) = match &class.id {
                    Some(id) => (
                        self.declare(&id.name, id.span, BindingKind::Class, idx)?,
                        None,
                    ),
                    None => {
                        let start = class.span.start as usize;
                        let at = self.source[start..]
                            .find("class")
                            .map(|offset| (start + offset + "class".len()) as u32)
                            .unwrap_or(class.span.start);
                        (self.declare_default(BindingKind::Class, at, idx), Some(at))
                    }
                };
                self.export(default, ExportTarget::Local(symbol), export.span);
                Ok((
                    StatementKind::ExportDefaultDeclaration {
                        declaration_start: class.span.start,
                        name_insertion,
                    },
                    vec![symbol],
                ))
            }
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(interface) => {
                self.type_names.insert(interface.id.name.to_string());
                Ok((StatementKind::TypeOnly, Vec::new()))
            }
            kind => match kind.as_expression() {
                Some(expr) => {
                    let span = expr.span();
                    let symbol = self.declare_default(BindingKind::Var, span.start, idx);
                    self.export(default, ExportTarget::Local(symbol), export.span);
                    Ok((
                        StatementKind::ExportDefaultExpression { expression: span },
                        vec![symbol],
                    ))
                }
                None => Ok((StatementKind::TypeOnly, Vec::new())),
            },
        }
    }

    /// Map semantic root-scope symbols onto the module's symbol table.
    ///
    /// `var` declarations nested in top-level blocks hoist to the root scope
    /// without appearing as top-level statements; they are added here and
    /// attributed to the statement that contains them.
    fn bind_root_symbols(
        &mut self,
        program: &Program<'_>,
        scoping: &Scoping,
    ) -> FxHashMap<SymbolId, SymbolIdx> {
        let root = scoping.root_scope_id();
        let mut root_symbols = FxHashMap::default();

        for symbol_id in scoping.symbol_ids() {
            if scoping.symbol_scope_id(symbol_id) != root {
                continue;
            }
            let name = scoping.symbol_name(symbol_id);
            if let Some(&idx) = self.names.get(name) {
                root_symbols.insert(symbol_id, idx);
                continue;
            }
            if !scoping
                .symbol_flags(symbol_id)
                .contains(SymbolFlags::FunctionScopedVariable)
            {
                continue;
            }

            let span = scoping.symbol_span(symbol_id);
            let Some(stmt) = program
                .body
                .iter()
                .position(|stmt| stmt.span().start <= span.start && span.end <= stmt.span().end)
            else {
                continue;
            };
            let stmt = StmtIdx(stmt as u32);
            let idx = self.push_symbol(Symbol {
                name: name.to_string(),
                kind: BindingKind::Var,
                span,
                declarations: vec![stmt],
                synthetic: false,
            });
            self.names.insert(name.to_string(), idx);
            self.module.statements[stmt.index()].declared.push(idx);
            root_symbols.insert(symbol_id, idx);
        }

        root_symbols
    }

    /// Second pass: per-statement references and identifier positions.
    fn collect_references(
        &mut self,
        program: &Program<'_>,
        scoping: &Scoping,
        root_symbols: &FxHashMap<SymbolId, SymbolIdx>,
    ) {
        let mut collector = ReferenceCollector::new(scoping, root_symbols);
        for (stmt, record) in program.body.iter().zip(self.module.statements.iter_mut()) {
            if record.kind == StatementKind::TypeOnly {
                continue;
            }
            collector.visit_statement(stmt);
            record.referenced = collector.take_referenced();
        }

        let mut occurrences = collector.occurrences;
        occurrences.sort_by_key(|occurrence| occurrence.span.start);
        self.module.occurrences = occurrences;
        self.module.globals = collector.globals;
        self.module.nested_names = collector.nested_names;
    }

    fn finish(mut self) -> Result<ScannedModule> {
        for pending in std::mem::take(&mut self.pending_exports) {
            match pending {
                PendingExport::Resolved(record) => self.module.exports.push(record),
                PendingExport::Local(export) => match self.names.get(&export.local) {
                    Some(&symbol) => self.module.exports.push(ExportRecord {
                        exported: export.exported,
                        target: ExportTarget::Local(symbol),
                        span: export.span,
                    }),
                    None if self.type_names.contains(&export.local) => {}
                    None => {
                        return Err(Error::Parse {
                            path: self.path_buf(),
                            message: format!("Export '{}' is not defined", export.local),
                            location: Some(self.lines.location(self.source, export.span.start)),
                        });
                    }
                },
            }
        }

        if self.typescript {
            self.elide_unused_imports();
        }

        self.module.side_effects = self.module.statements.iter().any(|s| s.side_effects);
        Ok(self.module)
    }

    /// TypeScript drops imports that are only used as types.
    fn elide_unused_imports(&mut self) {
        let mut used: FxHashSet<SymbolIdx> = self
            .module
            .statements
            .iter()
            .flat_map(|stmt| stmt.referenced.iter().copied())
            .collect();
        used.extend(self.module.exports.iter().filter_map(|record| match record.target {
            ExportTarget::Local(symbol) => Some(symbol),
            _ => None,
        }));
        self.module
            .imports
            .retain(|record| used.contains(&record.local));
    }
}
