//! Fast line/column lookup using pre-calculated line offsets.

use crate::error::Location;

/// Byte offsets of every line start in a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', source.as_bytes()).map(|i| (i + 1) as u32));
        Self { line_starts }
    }

    /// Number of lines (a trailing newline opens an empty final line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 0-indexed line containing `offset`.
    pub fn line_of(&self, offset: u32) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx as u32,
            // Err(0) cannot happen since line_starts[0] == 0
            Err(idx) => (idx.saturating_sub(1)) as u32,
        }
    }

    /// 0-indexed line and UTF-16 column of a byte offset.
    pub fn line_col(&self, source: &str, offset: u32) -> (u32, u32) {
        let line = self.line_of(offset);
        let start = self.line_starts[line as usize] as usize;
        let end = (offset as usize).min(source.len());
        let column = source
            .get(start..end)
            .map(|text| text.encode_utf16().count())
            .unwrap_or(0);
        (line, column as u32)
    }

    /// Diagnostic location (1-indexed line) of a byte offset.
    pub fn location(&self, source: &str, offset: u32) -> Location {
        let (line, column) = self.line_col(source, offset);
        Location {
            line: line + 1,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_zero_is_first_line() {
        let index = LineIndex::new("abc\ndef");
        assert_eq!(index.line_col("abc\ndef", 0), (0, 0));
    }

    #[test]
    fn finds_later_lines() {
        let source = "abc\ndef\n\nxyz";
        let index = LineIndex::new(source);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_col(source, 5), (1, 1));
        assert_eq!(index.line_col(source, 4), (1, 0));
        assert_eq!(index.line_col(source, 9), (3, 0));
        assert_eq!(index.location(source, 10), Location { line: 4, column: 1 });
    }

    #[test]
    fn columns_count_utf16_units() {
        let source = "const s = '😀'; x";
        let index = LineIndex::new(source);
        let offset = source.find('x').unwrap() as u32;
        // the emoji is 4 bytes but 2 UTF-16 units
        assert_eq!(index.line_col(source, offset), (0, 16));
    }
}
