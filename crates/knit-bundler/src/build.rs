//! Build orchestration: graph, link, then one chunk per entry.

use std::path::Path;
use std::sync::Arc;

#[cfg(not(target_family = "wasm"))]
use knit_graph::NativeRuntime;
use knit_graph::{
    GraphBuilder, ModuleGraph, ModuleIdx, ModuleResolver, ResolveOptions, Runtime,
};
use path_clean::PathClean;
use rustc_hash::FxHashSet;

use crate::codegen::{ChunkContext, render_chunk};
use crate::diagnostics::{self, Diagnostic, DiagnosticContext, DiagnosticKind};
use crate::link::{LinkOutput, Linker, execution_order};
use crate::options::BuildOptions;
use crate::output::{BuildOutput, OutputChunk};
use crate::{Error, Result, rename, shake};

/// Execute a build with the given options.
///
/// Either every entry produces a chunk, or the build fails with one
/// [`Error::Build`] carrying all diagnostics that were collected.
///
/// ```no_run
/// use knit_bundler::{BuildOptions, build};
///
/// # async fn example() -> knit_bundler::Result<()> {
/// let output = build(BuildOptions::new("./src/index.js").treeshake(true)).await?;
/// println!("{}", output.chunks[0].code);
/// # Ok(())
/// # }
/// ```
pub async fn build(options: BuildOptions) -> Result<BuildOutput> {
    options.validate()?;

    let runtime = default_runtime(&options)?;
    let abort = options.abort_signal.clone().unwrap_or_default();
    let resolver = ModuleResolver::new(ResolveOptions {
        external: options.external.clone(),
        aliases: options.alias.clone(),
        cwd: options.cwd.clone(),
    });
    let cwd = resolver
        .get_cwd(runtime.as_ref())
        .map_err(|e| Error::Build(vec![Diagnostic::error(DiagnosticKind::Io, e.to_string())]))?
        .clean();

    let entries = options.input.entries();
    let specifiers: Vec<String> = entries.iter().map(|(_, spec)| spec.to_string()).collect();

    let timer = PhaseTimer::start();
    let graph = GraphBuilder::new(resolver, Arc::clone(&runtime))
        .build(&specifiers, &abort)
        .await
        .map_err(|e| Error::Build(diagnostics::from_graph_error(&e, &cwd)))?;
    timer.finish("graph", graph.len());

    let timer = PhaseTimer::start();
    let link = Linker::new(&graph, options.strict).link();
    if !link.errors.is_empty() {
        return Err(Error::Build(
            link.errors
                .iter()
                .map(|error| error.to_diagnostic(&graph, true))
                .collect(),
        ));
    }
    timer.finish("link", graph.len());

    let mut warnings: Vec<Diagnostic> = link
        .warnings
        .iter()
        .map(|warning| warning.to_diagnostic(&graph, false))
        .collect();

    let timer = PhaseTimer::start();
    let names = chunk_names(&graph, &entries);
    let mut chunks = Vec::with_capacity(names.len());
    let mut seen_cycles = FxHashSet::default();
    for (&entry, name) in graph.entries().iter().zip(names) {
        if abort.is_aborted() {
            return Err(Error::Build(vec![Diagnostic::error(
                DiagnosticKind::Aborted,
                "Build aborted",
            )]));
        }
        let file_name = options.entry_file_names.replace("[name]", &name);
        let chunk = render_entry(
            &graph,
            &link,
            entry,
            name,
            file_name,
            &options,
            &mut warnings,
            &mut seen_cycles,
        );
        chunks.push(chunk);
    }
    timer.finish("render", chunks.len());

    tracing::debug!(
        chunks = chunks.len(),
        warnings = warnings.len(),
        "build complete"
    );
    Ok(BuildOutput { chunks, warnings })
}

fn default_runtime(options: &BuildOptions) -> Result<Arc<dyn Runtime>> {
    if let Some(runtime) = &options.runtime {
        return Ok(Arc::clone(runtime));
    }

    #[cfg(not(target_family = "wasm"))]
    {
        Ok(Arc::new(NativeRuntime::new()))
    }

    #[cfg(target_family = "wasm")]
    {
        Err(Error::InvalidConfig(
            "a runtime must be provided when building for wasm".into(),
        ))
    }
}

/// Chunk names: the explicit map key, else the entry's file stem. Repeats
/// get numeric suffixes (`main`, `main2`, `main3`).
fn chunk_names(graph: &ModuleGraph, entries: &[(Option<&str>, &str)]) -> Vec<String> {
    let mut taken = FxHashSet::default();
    graph
        .entries()
        .iter()
        .zip(entries)
        .map(|(&entry, (explicit, _))| {
            let base = match explicit {
                Some(name) => name.to_string(),
                None => graph
                    .normal(entry)
                    .and_then(|normal| normal.path.file_stem())
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "chunk".to_string()),
            };
            let mut name = base.clone();
            let mut suffix = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn render_entry(
    graph: &ModuleGraph,
    link: &LinkOutput,
    entry: ModuleIdx,
    name: String,
    file_name: String,
    options: &BuildOptions,
    warnings: &mut Vec<Diagnostic>,
    seen_cycles: &mut FxHashSet<Vec<ModuleIdx>>,
) -> OutputChunk {
    let order = execution_order(graph, entry);
    for cycle in &order.cycles {
        if seen_cycles.insert(cycle.clone()) {
            warnings.push(cycle_warning(graph, cycle));
        }
    }

    let liveness = shake::analyze(graph, link, entry, &order, options.treeshake);
    let names = rename::deconflict(graph, link, &order, &liveness);
    let rendered = render_chunk(&ChunkContext {
        graph,
        link,
        entry,
        order: &order,
        liveness: &liveness,
        names: &names,
        file_name: chunk_file_leaf(&file_name),
        sourcemap: options.sourcemap,
    });

    tracing::debug!(
        chunk = %name,
        modules = order.modules.len(),
        bytes = rendered.code.len(),
        "rendered chunk"
    );

    OutputChunk {
        name,
        file_name,
        code: rendered.code,
        map: rendered.map,
        modules: order
            .modules
            .iter()
            .map(|&module| graph.relative_id(module))
            .collect(),
        exports: link.export_table(entry).keys().cloned().collect(),
    }
}

/// Last path segment of a file name pattern result, for the map's `file`.
fn chunk_file_leaf(file_name: &str) -> &str {
    Path::new(file_name)
        .file_name()
        .and_then(|leaf| leaf.to_str())
        .unwrap_or(file_name)
}

fn cycle_warning(graph: &ModuleGraph, cycle: &[ModuleIdx]) -> Diagnostic {
    let path: Vec<String> = cycle.iter().map(|&m| graph.relative_id(m)).collect();
    let cycle_path = path.join(" -> ");
    tracing::warn!(cycle = %cycle_path, "circular dependency");

    let mut diagnostic = Diagnostic::warning(
        DiagnosticKind::CircularDependency,
        format!("Circular dependency: {}", cycle_path),
    )
    .with_help("Modules in a cycle may observe each other's bindings before initialization")
    .with_context(DiagnosticContext::CircularDependency { cycle_path: path.clone() });
    if let Some(first) = path.into_iter().next() {
        diagnostic = diagnostic.with_module(first);
    }
    diagnostic
}

/// Debug-level phase timing. Wasm has no monotonic clock in std, so only
/// the phase completion is reported there.
struct PhaseTimer {
    #[cfg(not(target_family = "wasm"))]
    started: std::time::Instant,
}

impl PhaseTimer {
    fn start() -> Self {
        Self {
            #[cfg(not(target_family = "wasm"))]
            started: std::time::Instant::now(),
        }
    }

    fn finish(self, phase: &'static str, items: usize) {
        #[cfg(not(target_family = "wasm"))]
        tracing::debug!(
            phase,
            items,
            elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0,
            "phase complete"
        );
        #[cfg(target_family = "wasm")]
        tracing::debug!(phase, items, "phase complete");
    }
}
