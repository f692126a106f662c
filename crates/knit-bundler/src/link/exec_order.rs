//! Module evaluation order.

use knit_graph::{ModuleGraph, ModuleIdx};

/// Evaluation order of everything one entry reaches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOrder {
    /// Bundled modules, dependencies before dependents.
    pub modules: Vec<ModuleIdx>,
    /// External modules in the order they are first imported.
    pub externals: Vec<ModuleIdx>,
    /// Import cycles, each closed by repeating its first module.
    pub cycles: Vec<Vec<ModuleIdx>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnStack,
    Done,
}

/// Depth-first post-order over dependencies in source order, starting at
/// `entry`. Every module is evaluated once; an edge back to a module still on
/// the stack is recorded as a cycle and otherwise ignored.
pub fn execution_order(graph: &ModuleGraph, entry: ModuleIdx) -> ExecutionOrder {
    let mut order = ExecutionOrder::default();
    let mut state = vec![Visit::New; graph.len()];

    if graph.normal(entry).is_none() {
        return order;
    }

    // (module, next dependency to visit)
    let mut stack: Vec<(ModuleIdx, usize)> = vec![(entry, 0)];
    state[entry.index()] = Visit::OnStack;

    while let Some((module, next)) = stack.last().copied() {
        let dependencies = graph
            .normal(module)
            .map(|normal| normal.resolved_dependencies.as_slice())
            .unwrap_or_default();

        let Some(&dependency) = dependencies.get(next) else {
            stack.pop();
            state[module.index()] = Visit::Done;
            order.modules.push(module);
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.1 += 1;
        }

        match state[dependency.index()] {
            Visit::New if graph.module(dependency).is_external() => {
                state[dependency.index()] = Visit::Done;
                order.externals.push(dependency);
            }
            Visit::New => {
                state[dependency.index()] = Visit::OnStack;
                stack.push((dependency, 0));
            }
            Visit::OnStack => {
                let start = stack
                    .iter()
                    .position(|(m, _)| *m == dependency)
                    .unwrap_or_default();
                let mut cycle: Vec<ModuleIdx> = stack[start..].iter().map(|(m, _)| *m).collect();
                cycle.push(dependency);
                order.cycles.push(cycle);
            }
            Visit::Done => {}
        }
    }

    order
}
