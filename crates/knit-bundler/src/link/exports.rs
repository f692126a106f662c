//! `ResolveExport` and `GetExportedNames` over the module graph.

use knit_graph::{
    ExportTarget, ImportedName, ModuleGraph, ModuleIdx, NormalModule, SymbolIdx, SymbolRef,
};
use rustc_hash::{FxHashMap, FxHashSet};

use super::Binding;

/// Outcome of resolving one exported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Binding),
    NotFound,
    /// Several star sources supply different bindings; holds two of them.
    Ambiguous(Vec<ModuleIdx>),
    /// The lookup re-entered a (module, name) pair already being resolved.
    Circular,
}

/// Memoizing export resolver.
///
/// Top-level lookups start from an empty resolve set and are cached; the
/// recursive steps are not, since their outcome depends on the set.
pub struct ExportResolver<'g> {
    graph: &'g ModuleGraph,
    resolved: FxHashMap<(ModuleIdx, String), Resolution>,
    names: FxHashMap<ModuleIdx, Vec<String>>,
}

impl<'g> ExportResolver<'g> {
    pub fn new(graph: &'g ModuleGraph) -> Self {
        Self {
            graph,
            resolved: FxHashMap::default(),
            names: FxHashMap::default(),
        }
    }

    /// Resolve `name` as exported by `module`.
    pub fn resolve_export(&mut self, module: ModuleIdx, name: &str) -> Resolution {
        let key = (module, name.to_string());
        if let Some(hit) = self.resolved.get(&key) {
            return hit.clone();
        }
        let mut resolve_set = Vec::new();
        let resolution = self.resolve_in(module, name, &mut resolve_set);
        self.resolved.insert(key, resolution.clone());
        resolution
    }

    /// Resolve what an import symbol of `module` ultimately refers to.
    pub fn resolve_import(&mut self, module: &NormalModule, symbol: SymbolIdx) -> Resolution {
        let Some(record) = module.scanned.import_for(symbol) else {
            return Resolution::NotFound;
        };
        let target = module.dependency_module(record.dependency);
        match &record.imported {
            _ if self.graph.module(target).is_external() => Resolution::Found(Binding::External {
                module: target,
                name: record.imported.clone(),
            }),
            ImportedName::Namespace => Resolution::Found(Binding::Namespace(target)),
            ImportedName::Named(name) => self.resolve_export(target, name),
        }
    }

    /// Every name `module` exports, sorted. Externals export an unknown set
    /// and report none.
    pub fn exported_names(&mut self, module: ModuleIdx) -> Vec<String> {
        if let Some(hit) = self.names.get(&module) {
            return hit.clone();
        }
        let mut visited = FxHashSet::default();
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        self.collect_names(module, true, &mut visited, &mut seen, &mut names);
        names.sort();
        self.names.insert(module, names.clone());
        names
    }

    fn collect_names(
        &self,
        module: ModuleIdx,
        include_default: bool,
        visited: &mut FxHashSet<ModuleIdx>,
        seen: &mut FxHashSet<String>,
        names: &mut Vec<String>,
    ) {
        // A cyclic `export *` contributes nothing.
        if !visited.insert(module) {
            return;
        }
        let Some(normal) = self.graph.normal(module) else {
            return;
        };
        for record in &normal.scanned.exports {
            if (include_default || record.exported != "default")
                && seen.insert(record.exported.clone())
            {
                names.push(record.exported.clone());
            }
        }
        for &dependency in &normal.scanned.star_exports {
            let target = normal.dependency_module(dependency);
            self.collect_names(target, false, visited, seen, names);
        }
    }

    fn resolve_in(
        &self,
        module: ModuleIdx,
        name: &str,
        resolve_set: &mut Vec<(ModuleIdx, String)>,
    ) -> Resolution {
        let Some(normal) = self.graph.normal(module) else {
            return Resolution::Found(Binding::External {
                module,
                name: ImportedName::Named(name.to_string()),
            });
        };
        if resolve_set.iter().any(|(m, n)| *m == module && n == name) {
            return Resolution::Circular;
        }
        resolve_set.push((module, name.to_string()));

        if let Some(record) = normal.scanned.export(name) {
            return match &record.target {
                ExportTarget::Local(symbol) => self.resolve_local(normal, *symbol, resolve_set),
                ExportTarget::ReExport {
                    dependency,
                    imported,
                } => self.resolve_in(normal.dependency_module(*dependency), imported, resolve_set),
                ExportTarget::ReExportNamespace { dependency } => Resolution::Found(
                    namespace_binding(self.graph, normal.dependency_module(*dependency)),
                ),
            };
        }

        if name == "default" {
            return Resolution::NotFound;
        }

        let mut star: Option<(Binding, ModuleIdx)> = None;
        let mut external_fallback = None;
        for &dependency in &normal.scanned.star_exports {
            let target = normal.dependency_module(dependency);
            if self.graph.module(target).is_external() {
                external_fallback.get_or_insert(target);
                continue;
            }
            match self.resolve_in(target, name, resolve_set) {
                Resolution::Ambiguous(sources) => return Resolution::Ambiguous(sources),
                Resolution::Found(binding) => match &star {
                    None => star = Some((binding, target)),
                    Some((existing, first)) if *existing != binding => {
                        return Resolution::Ambiguous(vec![*first, target]);
                    }
                    Some(_) => {}
                },
                Resolution::NotFound | Resolution::Circular => {}
            }
        }

        match (star, external_fallback) {
            (Some((binding, _)), _) => Resolution::Found(binding),
            (None, Some(external)) => Resolution::Found(Binding::External {
                module: external,
                name: ImportedName::Named(name.to_string()),
            }),
            (None, None) => Resolution::NotFound,
        }
    }

    /// A locally exported symbol; imports are followed to their source.
    fn resolve_local(
        &self,
        normal: &NormalModule,
        symbol: SymbolIdx,
        resolve_set: &mut Vec<(ModuleIdx, String)>,
    ) -> Resolution {
        if !normal.scanned.symbol(symbol).is_import() {
            return Resolution::Found(Binding::Symbol(SymbolRef::new(normal.idx, symbol)));
        }
        let Some(record) = normal.scanned.import_for(symbol) else {
            return Resolution::NotFound;
        };
        let target = normal.dependency_module(record.dependency);
        match &record.imported {
            ImportedName::Namespace => Resolution::Found(namespace_binding(self.graph, target)),
            ImportedName::Named(name) => self.resolve_in(target, name, resolve_set),
        }
    }
}

fn namespace_binding(graph: &ModuleGraph, target: ModuleIdx) -> Binding {
    if graph.module(target).is_external() {
        Binding::External {
            module: target,
            name: ImportedName::Namespace,
        }
    } else {
        Binding::Namespace(target)
    }
}

/// External modules re-exported through `module`'s `export *` closure, in
/// depth-first source order.
pub fn external_star_sources(graph: &ModuleGraph, module: ModuleIdx) -> Vec<ModuleIdx> {
    let mut visited = FxHashSet::default();
    let mut sources = Vec::new();
    let mut stack = vec![module];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let Some(normal) = graph.normal(current) else {
            if !sources.contains(&current) {
                sources.push(current);
            }
            continue;
        };
        // reversed so the first star is explored first
        for &dependency in normal.scanned.star_exports.iter().rev() {
            stack.push(normal.dependency_module(dependency));
        }
    }
    sources
}
