//! The module graph arena.

mod builder;

pub use builder::GraphBuilder;

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::module::{Module, NormalModule};
use crate::module_id::{ModuleId, ModuleIdx};

/// All modules of one build, indexed by [`ModuleIdx`].
///
/// Each canonical [`ModuleId`] owns exactly one slot. The graph is immutable
/// once built; later phases keep their own per-module side tables.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    index: FxHashMap<ModuleId, ModuleIdx>,
    entries: Vec<ModuleIdx>,
    cwd: PathBuf,
}

impl ModuleGraph {
    pub(crate) fn new(
        modules: Vec<Module>,
        index: FxHashMap<ModuleId, ModuleIdx>,
        entries: Vec<ModuleIdx>,
        cwd: PathBuf,
    ) -> Self {
        Self {
            modules,
            index,
            entries,
            cwd,
        }
    }

    pub fn module(&self, idx: ModuleIdx) -> &Module {
        &self.modules[idx.index()]
    }

    /// The normal module at `idx`, or `None` for externals.
    pub fn normal(&self, idx: ModuleIdx) -> Option<&NormalModule> {
        self.module(idx).as_normal()
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn normal_modules(&self) -> impl Iterator<Item = &NormalModule> {
        self.modules.iter().filter_map(Module::as_normal)
    }

    /// Look up a module by canonical identity.
    pub fn get(&self, id: &ModuleId) -> Option<ModuleIdx> {
        self.index.get(id).copied()
    }

    /// Entry modules in the order they were requested.
    pub fn entries(&self) -> &[ModuleIdx] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Working directory the build was resolved against.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Display id of a module relative to the working directory.
    pub fn relative_id(&self, idx: ModuleIdx) -> String {
        self.module(idx).id().relative_to(&self.cwd)
    }
}
