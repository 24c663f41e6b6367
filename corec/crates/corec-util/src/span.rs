//! Source positions and the source map (§3 "Source positions").

use crate::symbol::Symbol;
use std::ops::Range;

/// A byte offset into a file's source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceIndex(pub u32);

impl SourceIndex {
    pub const DUMMY: SourceIndex = SourceIndex(u32::MAX);
}

crate::define_idx!(
    /// Identifies one source file within a [`SourceMap`].
    FileId
);

/// A contiguous byte range within a single file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { file, start, end }
    }

    pub fn point(file: FileId, at: u32) -> Self {
        Self::new(file, at, at)
    }

    pub fn range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    pub fn to(self, other: Span) -> Span {
        debug_assert_eq!(self.file, other.file);
        Span::new(self.file, self.start.min(other.start), self.end.max(other.end))
    }
}

/// A fully-resolved diagnostic location: file path, source text, the primary
/// span being reported, and a caret column used to underline it.
#[derive(Clone, Debug)]
pub struct SourceLoc<'a> {
    pub path: &'a str,
    pub source: &'a str,
    pub span: Span,
    pub line: u32,
    pub column: u32,
}

/// One loaded source file.
pub struct SourceFile {
    pub path: Symbol,
    pub source: String,
    /// Byte offset of the start of each line, for O(log n) offset -> (line, col).
    line_starts: Vec<u32>,
}

impl SourceFile {
    pub fn new(path: Symbol, source: String) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) for a byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        (line_idx as u32 + 1, offset - line_start + 1)
    }
}

/// All source files loaded for one compilation.
#[derive(Default)]
pub struct SourceMap {
    files: crate::idx::IndexVec<FileId, SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: &str, source: String) -> FileId {
        self.files.push(SourceFile::new(Symbol::intern(path), source))
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id]
    }

    pub fn loc(&self, span: Span) -> SourceLoc<'_> {
        let file = self.file(span.file);
        let (line, column) = file.line_col(span.start);
        SourceLoc {
            path: file.path.as_str(),
            source: &file.source,
            span,
            line,
            column,
        }
    }

    pub fn snippet(&self, span: Span) -> &str {
        let file = self.file(span.file);
        &file.source[span.range()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_tracks_newlines() {
        let file = SourceFile::new(Symbol::intern("t.corec"), "abc\ndef\nghi".to_string());
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(4), (2, 1));
        assert_eq!(file.line_col(9), (3, 2));
    }

    #[test]
    fn span_to_joins_ranges() {
        let mut map = SourceMap::new();
        let f = map.add_file("a.corec", "0123456789".to_string());
        let a = Span::new(f, 2, 4);
        let b = Span::new(f, 6, 8);
        let joined = a.to(b);
        assert_eq!((joined.start, joined.end), (2, 8));
    }

    #[test]
    fn snippet_extracts_source_text() {
        let mut map = SourceMap::new();
        let f = map.add_file("a.corec", "let x = 1;".to_string());
        assert_eq!(map.snippet(Span::new(f, 4, 5)), "x");
    }
}
