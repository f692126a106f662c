//! Output buffer that tracks generated positions for source maps.

use knit_graph::{LineIndex, ModuleIdx};
use oxc_sourcemap::{SourceMap, SourceMapBuilder};
use rustc_hash::FxHashMap;

/// An original source registered with the writer.
#[derive(Clone, Copy)]
pub struct SourceRef<'a> {
    id: Option<u32>,
    text: &'a str,
    lines: &'a LineIndex,
}

impl SourceRef<'_> {
    fn position(&self, offset: u32) -> (u32, u32) {
        self.lines.line_col(self.text, offset)
    }
}

struct MapState {
    builder: SourceMapBuilder,
    sources: FxHashMap<ModuleIdx, u32>,
    names: FxHashMap<String, u32>,
    /// Generated position of the last token, to avoid duplicates.
    last: Option<(u32, u32)>,
}

/// Accumulates chunk code; with source maps on, also emits a token at every
/// copied segment start, every copied line start and every renamed name.
pub struct CodeWriter {
    code: String,
    line: u32,
    /// UTF-16 column on the current line.
    column: u32,
    map: Option<MapState>,
}

impl CodeWriter {
    pub fn new(sourcemap: bool) -> Self {
        Self {
            code: String::new(),
            line: 0,
            column: 0,
            map: sourcemap.then(|| MapState {
                builder: SourceMapBuilder::default(),
                sources: FxHashMap::default(),
                names: FxHashMap::default(),
                last: None,
            }),
        }
    }

    /// Register a module's original text; `path` is what `sources` lists.
    pub fn source<'a>(
        &mut self,
        module: ModuleIdx,
        path: &str,
        text: &'a str,
        lines: &'a LineIndex,
    ) -> SourceRef<'a> {
        let id = self.map.as_mut().map(|map| {
            *map.sources
                .entry(module)
                .or_insert_with(|| map.builder.set_source_and_content(path, text))
        });
        SourceRef { id, text, lines }
    }

    /// Append synthesized text with no mapping.
    pub fn push(&mut self, text: &str) {
        self.code.push_str(text);
        self.advance(text);
    }

    /// Append synthesized text attributed to `offset` in `source`.
    pub fn push_at(&mut self, text: &str, source: SourceRef<'_>, offset: u32) {
        self.mark(source, offset, None);
        self.push(text);
    }

    /// Append a name that replaces the identifier at `offset`.
    pub fn push_name(&mut self, name: &str, original: &str, source: SourceRef<'_>, offset: u32) {
        self.mark(source, offset, Some(original));
        self.push(name);
    }

    /// Copy `source[start..end]` verbatim.
    pub fn copy(&mut self, source: SourceRef<'_>, start: u32, end: u32) {
        let Some(text) = source.text.get(start as usize..end as usize) else {
            return;
        };
        if text.is_empty() {
            return;
        }
        self.mark(source, start, None);
        let mut segment_start = 0;
        for newline in memchr::memchr_iter(b'\n', text.as_bytes()) {
            self.push(&text[segment_start..=newline]);
            segment_start = newline + 1;
            if segment_start < text.len() {
                self.mark(source, start + segment_start as u32, None);
            }
        }
        self.push(&text[segment_start..]);
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Finish the chunk, returning the code and (if enabled) its map.
    pub fn finish(self, file: &str) -> (String, Option<SourceMap>) {
        let map = self.map.map(|mut map| {
            map.builder.set_file(file);
            map.builder.into_sourcemap()
        });
        (self.code, map)
    }

    fn mark(&mut self, source: SourceRef<'_>, offset: u32, name: Option<&str>) {
        let (line, column) = (self.line, self.column);
        let Some(map) = self.map.as_mut() else {
            return;
        };
        if name.is_none() && map.last == Some((line, column)) {
            return;
        }
        let (src_line, src_col) = source.position(offset);
        let name_id = name.map(|name| match map.names.get(name) {
            Some(&id) => id,
            None => {
                let id = map.builder.add_name(name);
                map.names.insert(name.to_string(), id);
                id
            }
        });
        map.builder
            .add_token(line, column, src_line, src_col, source.id, name_id);
        map.last = Some((line, column));
    }

    fn advance(&mut self, text: &str) {
        match memchr::memrchr(b'\n', text.as_bytes()) {
            Some(last) => {
                self.line += memchr::memchr_iter(b'\n', text.as_bytes()).count() as u32;
                self.column = text[last + 1..].encode_utf16().count() as u32;
            }
            None => self.column += text.encode_utf16().count() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_utf16_columns() {
        let mut writer = CodeWriter::new(false);
        writer.push("const s = '😀';");
        assert_eq!((writer.line, writer.column), (0, 14));
        writer.push("\nab");
        assert_eq!((writer.line, writer.column), (1, 2));
    }

    #[test]
    fn copies_map_line_starts_back_to_source() {
        let text = "let a = 1;\nlet b = 2;\n";
        let lines = LineIndex::new(text);
        let mut writer = CodeWriter::new(true);
        writer.push("// header\n");
        let source = writer.source(ModuleIdx(0), "src/a.js", text, &lines);
        writer.copy(source, 0, text.len() as u32);
        let (code, map) = writer.finish("out.js");
        assert_eq!(code, "// header\nlet a = 1;\nlet b = 2;\n");

        let map = map.unwrap();
        let json: serde_json::Value = serde_json::from_str(&map.to_json_string()).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "out.js");
        assert_eq!(json["sources"][0], "src/a.js");
        assert_eq!(json["sourcesContent"][0], text);
        // line 0 unmapped, lines 1 and 2 start at source lines 0 and 1
        assert_eq!(json["mappings"], ";AAAA;AACA");
    }
}
