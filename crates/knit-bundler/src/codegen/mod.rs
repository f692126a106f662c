//! Chunk rendering.
//!
//! Output is produced by slicing the original text of every live statement
//! and patching root identifiers to their deconflicted names, so code that
//! needs no renaming comes out byte-for-byte as written.
//!
//! Chunk layout:
//!
//! 1. external imports, one group per external module in first-use order
//! 2. `export * from` for external star re-exports of the entry
//! 3. per module in execution order: a `// path` header, the namespace
//!    object if one is needed, then the live statements
//! 4. a single `export { ... };` clause for the entry's export table

mod sourcemap;

pub use sourcemap::{CodeWriter, SourceRef};

use knit_graph::{
    ImportedName, ModuleGraph, ModuleIdx, NormalModule, Statement, StatementKind, SymbolIdx,
    SymbolRef,
};
use oxc_sourcemap::SourceMap;

use crate::link::{ExecutionOrder, LinkOutput};
use crate::rename::{ChunkNames, is_identifier};
use crate::shake::Liveness;

/// Everything needed to render one chunk.
pub struct ChunkContext<'a> {
    pub graph: &'a ModuleGraph,
    pub link: &'a LinkOutput,
    pub entry: ModuleIdx,
    pub order: &'a ExecutionOrder,
    pub liveness: &'a Liveness,
    pub names: &'a ChunkNames,
    pub file_name: &'a str,
    pub sourcemap: bool,
}

/// Rendered chunk text and its source map.
#[derive(Debug, Clone)]
pub struct RenderedChunk {
    pub code: String,
    pub map: Option<SourceMap>,
}

pub fn render_chunk(ctx: &ChunkContext<'_>) -> RenderedChunk {
    let mut writer = CodeWriter::new(ctx.sourcemap);

    render_external_imports(ctx, &mut writer);

    for &external in ctx.link.external_stars(ctx.entry) {
        writer.push(&format!(
            "export * from {};\n",
            string_literal(&ctx.graph.relative_id(external))
        ));
    }

    for &module in &ctx.order.modules {
        if let Some(normal) = ctx.graph.normal(module) {
            render_module(ctx, normal, &mut writer);
        }
    }

    render_export_clause(ctx, &mut writer);

    let (code, map) = writer.finish(ctx.file_name);
    RenderedChunk { code, map }
}

fn render_external_imports(ctx: &ChunkContext<'_>, writer: &mut CodeWriter) {
    for &external in &ctx.order.externals {
        let specifier = string_literal(&ctx.graph.relative_id(external));
        let mut default = None;
        let mut named: Vec<(&str, &str)> = Vec::new();
        let mut namespace = None;

        for (module, imported) in ctx.liveness.external_bindings() {
            if *module != external {
                continue;
            }
            let Some(local) = ctx.names.external(external, imported) else {
                continue;
            };
            match imported {
                ImportedName::Named(name) if name == "default" => default = Some(local),
                ImportedName::Named(name) => named.push((name.as_str(), local)),
                ImportedName::Namespace => namespace = Some(local),
            }
        }
        named.sort();

        if default.is_none() && named.is_empty() && namespace.is_none() {
            writer.push(&format!("import {};\n", specifier));
            continue;
        }

        if default.is_some() || !named.is_empty() {
            let mut clause = Vec::new();
            if let Some(local) = default {
                clause.push(local.to_string());
            }
            if !named.is_empty() {
                let specifiers: Vec<String> = named
                    .iter()
                    .map(|(imported, local)| specifier_text(imported, local))
                    .collect();
                clause.push(format!("{{ {} }}", specifiers.join(", ")));
            }
            writer.push(&format!("import {} from {};\n", clause.join(", "), specifier));
        }
        if let Some(local) = namespace {
            writer.push(&format!("import * as {} from {};\n", local, specifier));
        }
    }
}

fn render_module(ctx: &ChunkContext<'_>, normal: &NormalModule, writer: &mut CodeWriter) {
    let statements: Vec<&Statement> = ctx
        .liveness
        .live_statements(normal.idx)
        .map(|idx| normal.scanned.statement(idx))
        .filter(|statement| statement.kind.emits_code())
        .collect();
    let namespace = ctx
        .liveness
        .needs_namespace(normal.idx)
        .then(|| ctx.names.namespace(normal.idx))
        .flatten();

    if statements.is_empty() && namespace.is_none() {
        return;
    }

    let id = ctx.graph.relative_id(normal.idx);
    separate(writer);
    writer.push(&format!("// {}\n", id));

    if let Some(name) = namespace {
        render_namespace(ctx, normal.idx, name, writer);
    }

    let source = writer.source(normal.idx, &id, &normal.source, &normal.lines);
    for statement in statements {
        render_statement(ctx, normal, statement, source, writer);
        if needs_semicolon(statement) {
            writer.push(";");
        }
        writer.push("\n");
    }
}

/// Blank line between sections.
fn separate(writer: &mut CodeWriter) {
    if !writer.is_empty() {
        writer.push("\n");
    }
}

fn render_namespace(ctx: &ChunkContext<'_>, module: ModuleIdx, name: &str, writer: &mut CodeWriter) {
    writer.push(&format!("var {} = Object.freeze({{\n  __proto__: null", name));
    for (exported, binding) in ctx.link.export_table(module) {
        let Some(local) = ctx.names.binding(binding) else {
            continue;
        };
        writer.push(&format!(
            ",\n  get {}() {{ return {}; }}",
            property_key(exported),
            local
        ));
    }
    writer.push("\n});\n");
}

fn render_statement(
    ctx: &ChunkContext<'_>,
    normal: &NormalModule,
    statement: &Statement,
    source: SourceRef<'_>,
    writer: &mut CodeWriter,
) {
    let span = statement.span;
    match statement.kind {
        StatementKind::Plain => patch_range(ctx, normal, span.start, span.end, None, source, writer),
        StatementKind::ExportDeclaration { declaration_start } => {
            patch_range(ctx, normal, declaration_start, span.end, None, source, writer)
        }
        StatementKind::ExportDefaultDeclaration {
            declaration_start,
            name_insertion,
        } => {
            let insertion = name_insertion.and_then(|at| {
                let name = declared_name(ctx, normal, statement)?;
                Some((at, name))
            });
            patch_range(ctx, normal, declaration_start, span.end, insertion, source, writer)
        }
        StatementKind::ExportDefaultExpression { expression } => {
            let name = declared_name(ctx, normal, statement).unwrap_or("_default");
            writer.push_at(&format!("var {} = ", name), source, span.start);
            patch_range(ctx, normal, expression.start, expression.end, None, source, writer);
            writer.push(";");
        }
        StatementKind::Import
        | StatementKind::ReExport
        | StatementKind::ExportSpecifiers
        | StatementKind::TypeOnly => {}
    }
}

/// Statements are no longer adjacent to their original neighbours, so one
/// left to ASI could join with a following `(`, `[` or template.
fn needs_semicolon(statement: &Statement) -> bool {
    !statement.terminated
        && !matches!(statement.kind, StatementKind::ExportDefaultExpression { .. })
}

fn declared_name<'a>(
    ctx: &ChunkContext<'a>,
    normal: &NormalModule,
    statement: &Statement,
) -> Option<&'a str> {
    let symbol = statement.declared.first()?;
    ctx.names.symbol(SymbolRef::new(normal.idx, *symbol))
}

/// Copy `start..end`, rewriting renamed identifiers and inserting a name for
/// anonymous default declarations.
fn patch_range(
    ctx: &ChunkContext<'_>,
    normal: &NormalModule,
    start: u32,
    end: u32,
    insertion: Option<(u32, &str)>,
    source: SourceRef<'_>,
    writer: &mut CodeWriter,
) {
    let occurrences = &normal.scanned.occurrences;
    let first = occurrences.partition_point(|occurrence| occurrence.span.start < start);
    let mut cursor = start;
    let mut insertion = insertion;

    for occurrence in occurrences[first..]
        .iter()
        .take_while(|occurrence| occurrence.span.end <= end)
    {
        if let Some((at, name)) = insertion.filter(|(at, _)| *at <= occurrence.span.start) {
            insert_name(normal, at, name, cursor, source, writer);
            cursor = at;
            insertion = None;
        }

        let original = &normal.source[occurrence.span.start as usize..occurrence.span.end as usize];
        let Some(renamed) = final_name(ctx, normal, occurrence.symbol) else {
            continue;
        };
        if renamed == original {
            continue;
        }
        writer.copy(source, cursor, occurrence.span.start);
        if occurrence.shorthand {
            writer.copy(source, occurrence.span.start, occurrence.span.end);
            writer.push(": ");
        }
        writer.push_name(renamed, original, source, occurrence.span.start);
        cursor = occurrence.span.end;
    }

    if let Some((at, name)) = insertion {
        insert_name(normal, at, name, cursor, source, writer);
        cursor = at;
    }
    writer.copy(source, cursor, end);
}

fn insert_name(
    normal: &NormalModule,
    at: u32,
    name: &str,
    cursor: u32,
    source: SourceRef<'_>,
    writer: &mut CodeWriter,
) {
    writer.copy(source, cursor, at);
    let after_space = normal.source[..at as usize]
        .chars()
        .next_back()
        .is_some_and(char::is_whitespace);
    let text = if after_space {
        name.to_string()
    } else {
        format!(" {}", name)
    };
    writer.push_at(&text, source, at);
}

fn final_name<'a>(ctx: &ChunkContext<'a>, normal: &NormalModule, symbol: SymbolIdx) -> Option<&'a str> {
    let binding = ctx
        .link
        .binding_of(ctx.graph, SymbolRef::new(normal.idx, symbol))?;
    ctx.names.binding(&binding)
}

fn render_export_clause(ctx: &ChunkContext<'_>, writer: &mut CodeWriter) {
    let specifiers: Vec<String> = ctx
        .link
        .export_table(ctx.entry)
        .iter()
        .filter_map(|(exported, binding)| {
            let local = ctx.names.binding(binding)?;
            Some(export_specifier_text(local, exported))
        })
        .collect();
    if specifiers.is_empty() {
        return;
    }
    separate(writer);
    writer.push(&format!("export {{ {} }};\n", specifiers.join(", ")));
}

/// `imported as local` inside an import clause.
fn specifier_text(imported: &str, local: &str) -> String {
    if imported == local {
        local.to_string()
    } else if is_identifier(imported) {
        format!("{} as {}", imported, local)
    } else {
        format!("{} as {}", string_literal(imported), local)
    }
}

/// `local as exported` inside an export clause.
fn export_specifier_text(local: &str, exported: &str) -> String {
    if local == exported {
        local.to_string()
    } else if is_identifier(exported) {
        format!("{} as {}", local, exported)
    } else {
        format!("{} as {}", local, string_literal(exported))
    }
}

fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        string_literal(name)
    }
}

/// A double-quoted JavaScript string literal.
fn string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}
