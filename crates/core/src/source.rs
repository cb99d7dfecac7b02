//! Byte-offset bookkeeping shared by the parser and the compiled-output editor.
//!
//! Every position in this crate is a byte offset into the original stories file.
//! swc positions are translated through [`SourceFile::base`] so that embedded
//! scripts and attribute expressions report offsets in the same coordinate space.

use std::sync::Arc;

use swc_core::common::{BytePos, FileName, SourceMap, sync::Lrc};

use crate::error::{CsfError, ErrorKind, SourceLocation};

/// Half-open byte range into a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Create a span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` lies entirely within this span.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A named source text registered in a swc [`SourceMap`].
#[derive(Clone)]
pub struct SourceFile {
    filename: String,
    text: Arc<str>,
    cm: Lrc<SourceMap>,
    base: u32,
    line_starts: Vec<usize>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("filename", &self.filename)
            .field("len", &self.text.len())
            .finish()
    }
}

impl SourceFile {
    /// Register `text` under `filename` in a fresh source map.
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let filename = filename.into();
        let text: String = text.into();
        let cm: Lrc<SourceMap> = Lrc::new(SourceMap::default());
        let fm = cm.new_source_file(FileName::Custom(filename.clone()).into(), text.clone());
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            filename,
            text: Arc::from(text),
            cm,
            base: fm.start_pos.0,
            line_starts,
        }
    }

    /// File name used in errors.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Full text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source map owning this file, for parsers and emitters.
    pub fn source_map(&self) -> Lrc<SourceMap> {
        self.cm.clone()
    }

    /// swc position of byte offset 0.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// swc position of a byte offset.
    pub fn pos(&self, offset: usize) -> BytePos {
        BytePos(self.base + offset as u32)
    }

    /// Byte offset of a swc position.
    pub fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.base) as usize
    }

    /// Byte span of a swc span.
    pub fn span(&self, span: swc_core::common::Span) -> Span {
        Span::new(self.offset(span.lo), self.offset(span.hi))
    }

    /// Text covered by `span`, empty when out of range.
    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or_default()
    }

    /// 1-indexed line and column of a byte offset.
    pub fn location(&self, offset: usize) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        let column = self
            .text
            .get(line_start..offset.min(self.text.len()))
            .map(|prefix| prefix.chars().count())
            .unwrap_or(0);
        SourceLocation::at(offset, line + 1, column + 1)
    }

    /// Build an error scoped to this file.
    pub fn error(&self, kind: ErrorKind) -> CsfError {
        CsfError::new(kind, self.filename.clone())
    }

    /// Build an error pointing at `offset`.
    pub fn error_at(&self, kind: ErrorKind, offset: usize) -> CsfError {
        self.error(kind).with_location(self.location(offset))
    }
}
