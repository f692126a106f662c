//! Top-level name deconflicting within a chunk.

use knit_graph::{ImportedName, ModuleGraph, ModuleIdx, SymbolRef};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::link::{Binding, ExecutionOrder, LinkOutput};
use crate::shake::Liveness;

/// Words that can never name a top-level binding in module code.
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield", "arguments",
    "eval",
];

/// Final top-level names of one chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkNames {
    symbols: FxHashMap<SymbolRef, String>,
    namespaces: FxHashMap<ModuleIdx, String>,
    externals: FxHashMap<(ModuleIdx, ImportedName), String>,
}

impl ChunkNames {
    pub fn symbol(&self, symbol: SymbolRef) -> Option<&str> {
        self.symbols.get(&symbol).map(String::as_str)
    }

    pub fn namespace(&self, module: ModuleIdx) -> Option<&str> {
        self.namespaces.get(&module).map(String::as_str)
    }

    pub fn external(&self, module: ModuleIdx, name: &ImportedName) -> Option<&str> {
        self.externals
            .get(&(module, name.clone()))
            .map(String::as_str)
    }

    /// Name a resolved binding is emitted under.
    pub fn binding(&self, binding: &Binding) -> Option<&str> {
        match binding {
            Binding::Symbol(symbol) => self.symbol(*symbol),
            Binding::Namespace(module) => self.namespace(*module),
            Binding::External { module, name } => self.external(*module, name),
        }
    }
}

struct Renamer<'a> {
    graph: &'a ModuleGraph,
    taken: FxHashSet<String>,
    /// Every module that spells a binding, and how it spells it.
    spellings: FxHashMap<Binding, Vec<(ModuleIdx, &'a str)>>,
    names: ChunkNames,
}

impl<'a> Renamer<'a> {
    /// Pick the first free name: `preferred`, then `preferred$1`, `preferred$2`, ...
    fn assign(&mut self, binding: &Binding, preferred: &str) -> String {
        let mut candidate = preferred.to_string();
        let mut suffix = 0;
        while self.taken.contains(&candidate) || self.captured(binding, &candidate) {
            suffix += 1;
            candidate = format!("{}${}", preferred, suffix);
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    /// Whether `candidate` would be shadowed by a nested declaration in a
    /// module that has to rewrite its spelling of `binding`.
    fn captured(&self, binding: &Binding, candidate: &str) -> bool {
        let Some(spellings) = self.spellings.get(binding) else {
            return false;
        };
        spellings.iter().any(|(module, spelled)| {
            *spelled != candidate
                && self
                    .graph
                    .normal(*module)
                    .is_some_and(|normal| normal.scanned.nested_names.contains(candidate))
        })
    }

    fn first_alias(&self, binding: &Binding) -> Option<&'a str> {
        self.spellings
            .get(binding)
            .and_then(|spellings| spellings.first())
            .map(|(_, alias)| *alias)
    }
}

/// Assign every emitted top-level binding a unique name, in execution order.
///
/// Original names are kept when free; otherwise the smallest free `name$N`
/// is used. Globals referenced by any module of the chunk, reserved words and
/// names that a nested scope would capture are never handed out.
pub fn deconflict(
    graph: &ModuleGraph,
    link: &LinkOutput,
    order: &ExecutionOrder,
    liveness: &Liveness,
) -> ChunkNames {
    let mut taken: FxHashSet<String> = RESERVED_WORDS.iter().map(|w| w.to_string()).collect();
    let mut spellings: FxHashMap<Binding, Vec<(ModuleIdx, &str)>> = FxHashMap::default();

    for &module in &order.modules {
        let Some(normal) = graph.normal(module) else {
            continue;
        };
        taken.extend(normal.scanned.globals.iter().cloned());
        for record in &normal.scanned.imports {
            let symbol = SymbolRef::new(module, record.local);
            if let Some(binding) = link.import_binding(symbol) {
                let local = normal.scanned.symbol(record.local).name.as_str();
                spellings
                    .entry(binding.clone())
                    .or_default()
                    .push((module, local));
            }
        }
        for (idx, symbol) in normal.scanned.symbols.iter().enumerate() {
            if !symbol.is_import() {
                let symbol_ref = SymbolRef::new(module, knit_graph::SymbolIdx(idx as u32));
                spellings
                    .entry(Binding::Symbol(symbol_ref))
                    .or_default()
                    .push((module, symbol.name.as_str()));
            }
        }
    }

    let mut renamer = Renamer {
        graph,
        taken,
        spellings,
        names: ChunkNames::default(),
    };

    let mut externals: Vec<&(ModuleIdx, ImportedName)> = liveness.external_bindings().collect();
    externals.sort_by_key(|(module, name)| {
        let position = order.externals.iter().position(|m| m == module);
        (position, external_rank(name))
    });
    for (module, name) in externals {
        let binding = Binding::External {
            module: *module,
            name: name.clone(),
        };
        let stem = graph.module(*module).id().identifier_stem();
        let preferred = renamer
            .first_alias(&binding)
            .map(str::to_string)
            .unwrap_or_else(|| match name {
                ImportedName::Named(n) if n != "default" && is_identifier(n) => n.clone(),
                _ => stem,
            });
        let assigned = renamer.assign(&binding, &preferred);
        renamer
            .names
            .externals
            .insert((*module, name.clone()), assigned);
    }

    for &module in &order.modules {
        let Some(normal) = graph.normal(module) else {
            continue;
        };
        if liveness.needs_namespace(module) {
            let binding = Binding::Namespace(module);
            let preferred = renamer
                .first_alias(&binding)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}_ns", normal.id().identifier_stem()));
            let assigned = renamer.assign(&binding, &preferred);
            renamer.names.namespaces.insert(module, assigned);
        }
        for statement in liveness.live_statements(module) {
            for &symbol in &normal.scanned.statement(statement).declared {
                let declared = normal.scanned.symbol(symbol);
                let symbol_ref = SymbolRef::new(module, symbol);
                if declared.is_import() || renamer.names.symbols.contains_key(&symbol_ref) {
                    continue;
                }
                let assigned = renamer.assign(&Binding::Symbol(symbol_ref), &declared.name);
                renamer.names.symbols.insert(symbol_ref, assigned);
            }
        }
    }

    renamer.names
}

/// Default import first, then named imports by name, then the namespace.
fn external_rank(name: &ImportedName) -> (u8, String) {
    match name {
        ImportedName::Named(n) if n == "default" => (0, String::new()),
        ImportedName::Named(n) => (1, n.clone()),
        ImportedName::Namespace => (2, String::new()),
    }
}

/// Whether `name` can be written as a plain identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{Linker, execution_order};
    use crate::shake::analyze;
    use crate::test_support::graph;

    async fn names(files: &[(&str, &str)]) -> (ModuleGraph, ChunkNames) {
        let graph = graph(files).await;
        let link = Linker::new(&graph, false).link();
        let entry = graph.entries()[0];
        let order = execution_order(&graph, entry);
        let liveness = analyze(&graph, &link, entry, &order, false);
        let names = deconflict(&graph, &link, &order, &liveness);
        (graph, names)
    }

    fn name_of<'n>(graph: &ModuleGraph, names: &'n ChunkNames, module: &str, symbol: &str) -> &'n str {
        let normal = graph
            .normal_modules()
            .find(|m| graph.relative_id(m.idx) == module)
            .unwrap();
        let idx = normal.scanned.symbol_by_name(symbol).unwrap();
        names.symbol(SymbolRef::new(normal.idx, idx)).unwrap()
    }

    #[tokio::test]
    async fn first_declaration_in_execution_order_keeps_its_name() {
        let (graph, names) = names(&[
            ("main.js", "import './a.js';\nconst value = 'main';\nconsole.log(value);"),
            ("a.js", "const value = 'a';\nconsole.log(value);"),
        ])
        .await;
        assert_eq!(name_of(&graph, &names, "a.js", "value"), "value");
        assert_eq!(name_of(&graph, &names, "main.js", "value"), "value$1");
    }

    #[tokio::test]
    async fn globals_and_reserved_words_are_avoided() {
        let (graph, names) = names(&[
            ("main.js", "import './a.js';\nconsole.log(window);"),
            ("a.js", "const window = 1;\nconst console = 2;\nexport { window, console };"),
        ])
        .await;
        assert_eq!(name_of(&graph, &names, "a.js", "window"), "window$1");
        assert_eq!(name_of(&graph, &names, "a.js", "console"), "console$1");
    }

    #[tokio::test]
    async fn nested_declarations_block_capturing_names() {
        // main spells lib's `helper` as `h`; renaming it back to `helper`
        // would be captured by main's inner `helper` parameter.
        let (graph, names) = names(&[
            (
                "main.js",
                "import { helper as h } from './lib.js';\nfunction run(helper) { return h(helper); }\nrun(1);",
            ),
            ("lib.js", "export function helper(x) { return x; }"),
        ])
        .await;
        assert_eq!(name_of(&graph, &names, "lib.js", "helper"), "helper$1");
    }

    #[tokio::test]
    async fn external_bindings_share_one_local() {
        let (graph, names) = names(&[
            ("main.js", "import './a.js';\nimport { merge } from 'lodash';\nmerge();"),
            ("a.js", "import { merge as m } from 'lodash';\nm();"),
        ])
        .await;
        let lodash = graph
            .get(&knit_graph::ModuleId::External("lodash".into()))
            .unwrap();
        assert_eq!(
            names.external(lodash, &ImportedName::Named("merge".into())),
            Some("m")
        );
    }

    #[test]
    fn identifier_check() {
        assert!(is_identifier("foo$1"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier(""));
    }
}
