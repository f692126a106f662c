//! Shared test utilities for knit-bundler tests

#![allow(dead_code)]

use std::sync::Arc;

use knit_bundler::{BuildOptions, BuildOutput, MemoryRuntime, Result, SourceMap};

pub const CWD: &str = "/project";

/// In-memory project rooted at [`CWD`].
pub fn memory_runtime(files: &[(&str, &str)]) -> Arc<MemoryRuntime> {
    Arc::new(MemoryRuntime::with_files(CWD, files.iter().copied()))
}

/// Options building `files[0]` out of an in-memory project.
pub fn options(files: &[(&str, &str)]) -> BuildOptions {
    BuildOptions::new(files[0].0).runtime(memory_runtime(files))
}

pub async fn bundle(files: &[(&str, &str)]) -> Result<BuildOutput> {
    options(files).build().await
}

/// Code of the single chunk of a successful build.
pub async fn bundle_code(files: &[(&str, &str)]) -> String {
    let output = bundle(files).await.expect("build should succeed");
    assert_eq!(output.chunks.len(), 1);
    output.chunks[0].code.clone()
}

/// Original position of the token generated at `line:column` (0-based):
/// source index, line and column.
pub fn original_position(map: &SourceMap, line: u32, column: u32) -> Option<(u32, u32, u32)> {
    map.get_tokens()
        .find(|token| token.get_dst_line() == line && token.get_dst_col() == column)
        .and_then(|token| {
            let source = token.get_source_id()?;
            Some((source, token.get_src_line(), token.get_src_col()))
        })
}

/// Generated lines that carry at least one token.
pub fn mapped_lines(map: &SourceMap) -> Vec<u32> {
    let mut lines: Vec<u32> = map.get_tokens().map(|token| token.get_dst_line()).collect();
    lines.dedup();
    lines
}
