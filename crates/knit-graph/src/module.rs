//! Graph nodes.

use std::path::{Path, PathBuf};

use crate::line_index::LineIndex;
use crate::module_id::{DependencyIdx, ModuleId, ModuleIdx};
use crate::scan::ScannedModule;

/// A module bundled from source.
#[derive(Debug, Clone)]
pub struct NormalModule {
    pub idx: ModuleIdx,
    pub path: PathBuf,
    pub source: String,
    pub lines: LineIndex,
    pub scanned: ScannedModule,
    /// Resolved target of every entry in `scanned.dependencies`.
    pub resolved_dependencies: Vec<ModuleIdx>,
}

impl NormalModule {
    pub fn id(&self) -> ModuleId {
        ModuleId::Local(self.path.clone())
    }

    /// Module a dependency resolved to.
    pub fn dependency_module(&self, dependency: DependencyIdx) -> ModuleIdx {
        self.resolved_dependencies[dependency.index()]
    }

    /// Resolved dependencies in source order, one per specifier.
    pub fn dependency_modules(&self) -> impl Iterator<Item = ModuleIdx> + '_ {
        self.resolved_dependencies.iter().copied()
    }
}

/// A module left as an import in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalModule {
    pub idx: ModuleIdx,
    pub specifier: String,
}

/// A node of the module graph.
#[derive(Debug, Clone)]
pub enum Module {
    Normal(Box<NormalModule>),
    External(ExternalModule),
}

impl Module {
    pub fn idx(&self) -> ModuleIdx {
        match self {
            Module::Normal(module) => module.idx,
            Module::External(module) => module.idx,
        }
    }

    pub fn id(&self) -> ModuleId {
        match self {
            Module::Normal(module) => module.id(),
            Module::External(module) => ModuleId::External(module.specifier.clone()),
        }
    }

    pub fn as_normal(&self) -> Option<&NormalModule> {
        match self {
            Module::Normal(module) => Some(module),
            Module::External(_) => None,
        }
    }

    pub fn as_external(&self) -> Option<&ExternalModule> {
        match self {
            Module::External(module) => Some(module),
            Module::Normal(_) => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Module::External(_))
    }

    pub fn path(&self) -> Option<&Path> {
        self.as_normal().map(|module| module.path.as_path())
    }
}
