//! Liveness analysis (tree-shaking).

use indexmap::IndexSet;
use knit_graph::{ImportedName, ModuleGraph, ModuleIdx, StmtIdx, SymbolRef};
use rustc_hash::FxHashSet;

use crate::link::{Binding, ExecutionOrder, LinkOutput};

/// Which parts of the reached modules end up in a chunk.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    /// Per module (indexed by `ModuleIdx`), per statement.
    statements: Vec<Vec<bool>>,
    symbols: FxHashSet<SymbolRef>,
    namespaces: FxHashSet<ModuleIdx>,
    externals: IndexSet<(ModuleIdx, ImportedName)>,
}

impl Liveness {
    pub fn is_statement_live(&self, module: ModuleIdx, statement: StmtIdx) -> bool {
        self.statements
            .get(module.index())
            .and_then(|stmts| stmts.get(statement.index()))
            .copied()
            .unwrap_or(false)
    }

    /// Live statements of `module`, in source order.
    pub fn live_statements(&self, module: ModuleIdx) -> impl Iterator<Item = StmtIdx> + '_ {
        self.statements
            .get(module.index())
            .into_iter()
            .flat_map(|stmts| stmts.iter().enumerate())
            .filter(|(_, live)| **live)
            .map(|(idx, _)| StmtIdx(idx as u32))
    }

    pub fn is_symbol_live(&self, symbol: SymbolRef) -> bool {
        self.symbols.contains(&symbol)
    }

    /// Whether `module` needs a namespace object.
    pub fn needs_namespace(&self, module: ModuleIdx) -> bool {
        self.namespaces.contains(&module)
    }

    /// External bindings in the order they were first marked.
    pub fn external_bindings(&self) -> impl Iterator<Item = &(ModuleIdx, ImportedName)> {
        self.externals.iter()
    }
}

enum Work {
    Binding(Binding),
    Statement(ModuleIdx, StmtIdx),
}

/// Mark everything one entry needs.
///
/// Seeds are the entry's export table plus, with `treeshake` on, every
/// statement with its own side effects in the reached modules; with
/// `treeshake` off, every statement of every reached module. Marking then
/// runs a worklist to a fixed point, so the result depends only on
/// reachability.
pub fn analyze(
    graph: &ModuleGraph,
    link: &LinkOutput,
    entry: ModuleIdx,
    order: &ExecutionOrder,
    treeshake: bool,
) -> Liveness {
    let mut liveness = Liveness {
        statements: graph
            .modules()
            .iter()
            .map(|module| {
                module
                    .as_normal()
                    .map(|normal| vec![false; normal.scanned.statements.len()])
                    .unwrap_or_default()
            })
            .collect(),
        ..Liveness::default()
    };

    let mut worklist: Vec<Work> = link
        .export_table(entry)
        .values()
        .cloned()
        .map(Work::Binding)
        .collect();

    for &module in &order.modules {
        let Some(normal) = graph.normal(module) else {
            continue;
        };
        for (idx, statement) in normal.scanned.statements.iter().enumerate() {
            if !treeshake || statement.side_effects {
                worklist.push(Work::Statement(module, StmtIdx(idx as u32)));
            }
        }
    }

    // Seeds are reversed so the pop order follows source order, which only
    // affects the order external bindings are discovered in.
    worklist.reverse();

    while let Some(work) = worklist.pop() {
        match work {
            Work::Statement(module, statement) => {
                let Some(normal) = graph.normal(module) else {
                    continue;
                };
                let slot = &mut liveness.statements[module.index()][statement.index()];
                if *slot {
                    continue;
                }
                *slot = true;
                let referenced = &normal.scanned.statement(statement).referenced;
                for &symbol in referenced.iter().rev() {
                    worklist.push(Work::Binding(Binding::Symbol(SymbolRef::new(module, symbol))));
                }
            }
            Work::Binding(Binding::Symbol(symbol)) => {
                if !liveness.symbols.insert(symbol) {
                    continue;
                }
                let Some(normal) = graph.normal(symbol.module) else {
                    continue;
                };
                let declared = normal.scanned.symbol(symbol.symbol);
                if declared.is_import() {
                    // Type-only imports were elided and have no binding.
                    if let Some(binding) = link.import_binding(symbol) {
                        worklist.push(Work::Binding(binding.clone()));
                    }
                    continue;
                }
                for &statement in declared.declarations.iter().rev() {
                    worklist.push(Work::Statement(symbol.module, statement));
                }
            }
            Work::Binding(Binding::Namespace(module)) => {
                if !liveness.namespaces.insert(module) {
                    continue;
                }
                let table = link.export_table(module);
                for binding in table.values().rev() {
                    worklist.push(Work::Binding(binding.clone()));
                }
            }
            Work::Binding(Binding::External { module, name }) => {
                liveness.externals.insert((module, name));
            }
        }
    }

    liveness
}
