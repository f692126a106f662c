//! Build results.

pub mod writer;

use std::path::Path;

use oxc_sourcemap::SourceMap;

use crate::Result;
use crate::diagnostics::Diagnostic;

/// One generated file.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    /// Chunk name (map key or entry file stem).
    pub name: String,
    /// File name produced by the `entry_file_names` pattern.
    pub file_name: String,
    pub code: String,
    pub map: Option<SourceMap>,
    /// Relative ids of the bundled modules, in execution order.
    pub modules: Vec<String>,
    /// Exported names, sorted.
    pub exports: Vec<String>,
}

impl OutputChunk {
    /// File name of the external source map.
    pub fn map_file_name(&self) -> String {
        format!("{}.map", self.file_name)
    }

    /// Code with a trailing `sourceMappingURL` comment when a map exists.
    pub fn code_with_map_url(&self) -> String {
        if self.map.is_none() {
            return self.code.clone();
        }
        let map_name = self
            .map_file_name()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        format!("{}//# sourceMappingURL={}\n", self.code, map_name)
    }
}

/// Everything a successful build produced.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// One chunk per entry, in entry order.
    pub chunks: Vec<OutputChunk>,
    /// Non-fatal diagnostics: circular dependencies and dropped ambiguous
    /// exports.
    pub warnings: Vec<Diagnostic>,
}

impl BuildOutput {
    /// The chunk with the given name.
    pub fn chunk(&self, name: &str) -> Option<&OutputChunk> {
        self.chunks.iter().find(|chunk| chunk.name == name)
    }

    /// Write every chunk (and its `.map`) into `dir`.
    ///
    /// All paths are validated against the output directory, and either
    /// every file is written or none is.
    pub fn write_to(&self, dir: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        let mut files = Vec::with_capacity(self.chunks.len() * 2);
        for chunk in &self.chunks {
            files.push((chunk.file_name.clone(), chunk.code_with_map_url().into_bytes()));
            if let Some(map) = &chunk.map {
                files.push((chunk.map_file_name(), map.to_json_string().into_bytes()));
            }
        }
        writer::write_files(dir.as_ref(), &files, overwrite)
    }
}
