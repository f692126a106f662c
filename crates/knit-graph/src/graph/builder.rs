//! Batched work-queue construction of the module graph.
//!
//! Each round drains the queue of claimed-but-unpopulated slots, reads their
//! sources concurrently, parses them in parallel and resolves their imports.
//! A slot is claimed for every new identity before it is enqueued, so a
//! module that is reached again (including through a cycle) is a lookup hit
//! rather than a second parse.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use path_clean::PathClean;
use rustc_hash::FxHashMap;

use crate::abort::AbortSignal;
use crate::error::{Error, Result};
use crate::line_index::LineIndex;
use crate::module::{ExternalModule, Module, NormalModule};
use crate::module_id::{ModuleId, ModuleIdx};
use crate::resolver::{ModuleResolver, ResolveResult};
use crate::runtime::{Runtime, RuntimeError, read_source};
use crate::scan::{ScannedModule, scan_module};

use super::ModuleGraph;

enum Slot {
    /// Claimed; waiting to be read and parsed.
    Pending(PathBuf),
    Ready(Module),
}

/// Slot arena plus identity index shared by every round of one build.
struct BuildState {
    slots: Vec<Slot>,
    index: FxHashMap<ModuleId, ModuleIdx>,
}

impl BuildState {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Claim a slot for `id`, returning its index and whether it is new.
    fn claim(&mut self, id: ModuleId) -> (ModuleIdx, bool) {
        if let Some(&idx) = self.index.get(&id) {
            return (idx, false);
        }
        let idx = ModuleIdx(self.slots.len() as u32);
        let slot = match &id {
            ModuleId::Local(path) => Slot::Pending(path.clone()),
            ModuleId::External(specifier) => Slot::Ready(Module::External(ExternalModule {
                idx,
                specifier: specifier.clone(),
            })),
        };
        self.slots.push(slot);
        self.index.insert(id, idx);
        (idx, true)
    }

    fn pending_path(&self, idx: ModuleIdx) -> Option<&Path> {
        match &self.slots[idx.index()] {
            Slot::Pending(path) => Some(path),
            Slot::Ready(_) => None,
        }
    }

    fn into_modules(self) -> Result<(Vec<Module>, FxHashMap<ModuleId, ModuleIdx>)> {
        let modules = self
            .slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Ready(module) => Ok(module),
                Slot::Pending(path) => Err(Error::Runtime(RuntimeError::Other(format!(
                    "module '{}' was claimed but never populated",
                    path.display()
                )))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((modules, self.index))
    }
}

/// A module whose source has been read and scanned.
struct ParsedModule {
    idx: ModuleIdx,
    path: PathBuf,
    source: String,
    scanned: Result<ScannedModule>,
}

/// Builds a [`ModuleGraph`] from entry specifiers.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    resolver: ModuleResolver,
    runtime: Arc<dyn Runtime>,
}

impl GraphBuilder {
    pub fn new(resolver: ModuleResolver, runtime: Arc<dyn Runtime>) -> Self {
        Self { resolver, runtime }
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Resolve, read and scan every module reachable from `entries`.
    ///
    /// Fails with one aggregated error if any module fails to resolve, read
    /// or parse, and with [`Error::Aborted`] once `abort` is triggered.
    pub async fn build(&self, entries: &[String], abort: &AbortSignal) -> Result<ModuleGraph> {
        let runtime = self.runtime.as_ref();
        let cwd = self.resolver.get_cwd(runtime)?.clean();

        let mut state = BuildState::new();
        let mut queue = Vec::new();
        let mut entry_indices = Vec::with_capacity(entries.len());
        let mut errors = Vec::new();

        for specifier in entries {
            match self.resolver.resolve_entry(specifier, runtime).await {
                Ok(path) => {
                    let (idx, is_new) = state.claim(ModuleId::Local(path));
                    if is_new {
                        queue.push(idx);
                    }
                    entry_indices.push(idx);
                }
                Err(source) => errors.push(Error::Resolution {
                    specifier: specifier.clone(),
                    importer: None,
                    source,
                }),
            }
        }
        if let Some(error) = Error::from_many(errors) {
            return Err(error);
        }

        let mut round = 0usize;
        while !queue.is_empty() {
            if abort.is_aborted() {
                return Err(Error::Aborted);
            }
            round += 1;
            let mut batch = std::mem::take(&mut queue);
            batch.sort_unstable();
            tracing::debug!(round, modules = batch.len(), "processing module batch");

            let parsed = self.read_and_parse(&state, &batch).await?;
            if abort.is_aborted() {
                return Err(Error::Aborted);
            }

            let mut errors = Vec::new();
            for module in parsed {
                let scanned = match module.scanned {
                    Ok(scanned) => scanned,
                    Err(error) => {
                        errors.push(error);
                        continue;
                    }
                };

                let mut resolved_dependencies = Vec::with_capacity(scanned.dependencies.len());
                for dependency in &scanned.dependencies {
                    let resolved = self
                        .resolver
                        .resolve(&dependency.specifier, &module.path, runtime)
                        .await;
                    let id = match resolved {
                        Ok(ResolveResult::Local(path)) => ModuleId::Local(path),
                        Ok(ResolveResult::External(specifier)) => ModuleId::External(specifier),
                        Err(source) => {
                            errors.push(Error::Resolution {
                                specifier: dependency.specifier.clone(),
                                importer: Some(module.path.clone()),
                                source,
                            });
                            continue;
                        }
                    };
                    let is_local = !id.is_external();
                    let (idx, is_new) = state.claim(id);
                    if is_new && is_local {
                        queue.push(idx);
                    }
                    resolved_dependencies.push(idx);
                }

                let lines = LineIndex::new(&module.source);
                state.slots[module.idx.index()] =
                    Slot::Ready(Module::Normal(Box::new(NormalModule {
                        idx: module.idx,
                        path: module.path,
                        source: module.source,
                        lines,
                        scanned,
                        resolved_dependencies,
                    })));
            }

            if let Some(error) = Error::from_many(errors) {
                return Err(error);
            }
        }

        let (modules, index) = state.into_modules()?;
        tracing::debug!(
            modules = modules.len(),
            rounds = round,
            "module graph complete"
        );
        Ok(ModuleGraph::new(modules, index, entry_indices, cwd))
    }

    async fn read_and_parse(
        &self,
        state: &BuildState,
        batch: &[ModuleIdx],
    ) -> Result<Vec<ParsedModule>> {
        let runtime = self.runtime.as_ref();
        let reads = batch.iter().filter_map(|&idx| {
            let path = state.pending_path(idx)?.to_path_buf();
            Some(async move {
                let source = read_source(runtime, &path).await;
                (idx, path, source)
            })
        });

        let mut sources = Vec::with_capacity(batch.len());
        let mut errors = Vec::new();
        for (idx, path, source) in join_all(reads).await {
            match source {
                Ok(source) => sources.push((idx, path, source)),
                Err(source) => errors.push(Error::Read { path, source }),
            }
        }
        if let Some(error) = Error::from_many(errors) {
            return Err(error);
        }

        parse_batch(sources).await
    }
}

fn parse_one((idx, path, source): (ModuleIdx, PathBuf, String)) -> ParsedModule {
    let scanned = scan_module(&path, &source);
    ParsedModule {
        idx,
        path,
        source,
        scanned,
    }
}

#[cfg(not(target_family = "wasm"))]
async fn parse_batch(sources: Vec<(ModuleIdx, PathBuf, String)>) -> Result<Vec<ParsedModule>> {
    use rayon::prelude::*;

    tokio::task::spawn_blocking(move || sources.into_par_iter().map(parse_one).collect())
        .await
        .map_err(|e| Error::Runtime(RuntimeError::Other(format!("parse task failed: {}", e))))
}

#[cfg(target_family = "wasm")]
async fn parse_batch(sources: Vec<(ModuleIdx, PathBuf, String)>) -> Result<Vec<ParsedModule>> {
    Ok(sources.into_iter().map(parse_one).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveOptions;
    use crate::runtime::MemoryRuntime;

    fn builder(files: &[(&str, &str)]) -> GraphBuilder {
        let runtime = MemoryRuntime::with_files("/proj", files.iter().copied());
        GraphBuilder::new(ModuleResolver::default(), Arc::new(runtime))
    }

    #[tokio::test]
    async fn deduplicates_modules_by_identity() {
        let graph = builder(&[
            ("main.js", "import './a';\nimport './b.js';"),
            ("a.js", "import './b';"),
            ("b.js", "export const b = 1;"),
        ])
        .build(&["main.js".into()], &AbortSignal::new())
        .await
        .unwrap();

        assert_eq!(graph.len(), 3);
        let b = graph.get(&ModuleId::Local("/proj/b.js".into())).unwrap();
        let main = graph.normal(graph.entries()[0]).unwrap();
        assert_eq!(main.resolved_dependencies[1], b);
    }

    #[tokio::test]
    async fn cycles_terminate() {
        let graph = builder(&[
            ("a.js", "import { b } from './b';\nexport const a = 1;"),
            ("b.js", "import { a } from './a';\nexport const b = 2;"),
        ])
        .build(&["a.js".into()], &AbortSignal::new())
        .await
        .unwrap();

        assert_eq!(graph.len(), 2);
        let a = graph.normal(ModuleIdx(0)).unwrap();
        let b = graph.normal(ModuleIdx(1)).unwrap();
        assert_eq!(a.resolved_dependencies, vec![ModuleIdx(1)]);
        assert_eq!(b.resolved_dependencies, vec![ModuleIdx(0)]);
    }

    #[tokio::test]
    async fn externals_are_claimed_but_not_parsed() {
        let runtime = MemoryRuntime::with_files(
            "/proj",
            [("main.js", "import React from 'react';\nimport { x } from 'lodash';")],
        );
        let resolver = ModuleResolver::new(ResolveOptions {
            external: vec!["react".into()],
            ..Default::default()
        });
        let graph = GraphBuilder::new(resolver, Arc::new(runtime))
            .build(&["main.js".into()], &AbortSignal::new())
            .await
            .unwrap();

        assert_eq!(graph.len(), 3);
        assert!(graph.module(ModuleIdx(1)).is_external());
        assert_eq!(graph.relative_id(ModuleIdx(2)), "lodash");
    }

    #[tokio::test]
    async fn failures_in_a_batch_are_aggregated() {
        let err = builder(&[
            ("main.js", "import './missing';\nimport './broken';"),
            ("broken.js", "const = ;"),
        ])
        .build(&["main.js".into()], &AbortSignal::new())
        .await
        .unwrap_err();

        // the missing import stops the build before `broken.js` is parsed
        assert!(matches!(err, Error::Resolution { ref specifier, .. } if specifier == "./missing"));
    }

    #[tokio::test]
    async fn parse_errors_in_siblings_are_reported_together() {
        let err = builder(&[
            ("main.js", "import './a';\nimport './b';"),
            ("a.js", "let = ;"),
            ("b.js", "const = ;"),
        ])
        .build(&["main.js".into()], &AbortSignal::new())
        .await
        .unwrap_err();

        let leaves = err.leaves();
        assert_eq!(leaves.len(), 2);
        assert!(leaves.iter().all(|e| matches!(e, Error::Parse { .. })));
    }

    #[tokio::test]
    async fn missing_entry_fails() {
        let err = builder(&[("main.js", "")])
            .build(&["nope.js".into()], &AbortSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution { importer: None, .. }));
    }

    #[tokio::test]
    async fn aborted_builds_fail() {
        let signal = AbortSignal::new();
        signal.abort();
        let err = builder(&[("main.js", "export const a = 1;")])
            .build(&["main.js".into()], &signal)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Aborted));
    }
}
