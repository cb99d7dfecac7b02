//! Positional text edits over an immutable original string.
//!
//! Edits are queued against offsets of the original text and applied once in
//! [`CodeEditor::finish`], so queuing order never shifts another edit's offsets.

use svelte_csf_core::ErrorKind;

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

impl Edit {
    fn conflicts_with(&self, start: usize, end: usize) -> bool {
        if self.start == self.end && start == end {
            return self.start == start;
        }
        (start < self.end && self.start < end)
            || (start == end && self.start < start && start < self.end)
            || (self.start == self.end && start < self.start && self.start < end)
    }
}

/// Queue of replacements, removals and appends over `original`.
#[derive(Debug)]
pub struct CodeEditor<'a> {
    original: &'a str,
    edits: Vec<Edit>,
    appended: String,
}

impl<'a> CodeEditor<'a> {
    /// Start editing `original`.
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            edits: Vec::new(),
            appended: String::new(),
        }
    }

    /// Text being edited.
    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Replace `start..end` with `text`. An empty range inserts.
    pub fn overwrite(
        &mut self,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<(), ErrorKind> {
        if start > end
            || end > self.original.len()
            || !self.original.is_char_boundary(start)
            || !self.original.is_char_boundary(end)
        {
            return Err(ErrorKind::InvalidEditRange {
                start,
                end,
                len: self.original.len(),
            });
        }
        if self.edits.iter().any(|edit| edit.conflicts_with(start, end)) {
            return Err(ErrorKind::OverlappingEdits { start, end });
        }
        log::trace!("queued edit at {start}..{end}");
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
        });
        Ok(())
    }

    /// Delete `start..end`.
    pub fn remove(&mut self, start: usize, end: usize) -> Result<(), ErrorKind> {
        self.overwrite(start, end, "")
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: impl Into<String>) -> Result<(), ErrorKind> {
        self.overwrite(offset, offset, text)
    }

    /// Add `text` after the end of the original.
    pub fn append(&mut self, text: &str) {
        self.appended.push_str(text);
    }

    /// Number of queued positional edits.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Whether no positional edit is queued.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every edit and return the final text.
    pub fn finish(mut self) -> String {
        self.edits.sort_by_key(|edit| (edit.start, edit.end));
        let mut out = String::with_capacity(self.original.len() + self.appended.len());
        let mut cursor = 0;
        for edit in &self.edits {
            out.push_str(&self.original[cursor..edit.start]);
            out.push_str(&edit.text);
            cursor = edit.end;
        }
        out.push_str(&self.original[cursor..]);
        out.push_str(&self.appended);
        out
    }
}
