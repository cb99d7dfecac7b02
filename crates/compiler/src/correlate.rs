//! Pairing of source story tags with compiled story calls.
//!
//! Both lists are in document order. They are walked from the end so that the
//! edits queued for a story never sit before the offsets of a story that is
//! still to be processed.

use svelte_csf_core::ErrorKind;

/// A source-level story and its compiled counterpart.
#[derive(Debug)]
pub struct Correlated<'s, 'c, S, C> {
    /// Position of the story in document order.
    pub index: usize,
    /// Source-level story.
    pub source: &'s S,
    /// Compiled story node.
    pub compiled: &'c C,
}

/// Pair `source[i]` with `compiled[i]`, last story first.
///
/// Fails when the compiler produced a different number of story calls than
/// there are story tags.
pub fn correlate<'s, 'c, S, C>(
    source: &'s [S],
    compiled: &'c [C],
) -> Result<Vec<Correlated<'s, 'c, S, C>>, ErrorKind> {
    if source.len() != compiled.len() {
        return Err(ErrorKind::StoryCountMismatch {
            source_count: source.len(),
            compiled_count: compiled.len(),
        });
    }
    let last = source.len().saturating_sub(1);
    Ok(source
        .iter()
        .rev()
        .zip(compiled.iter().rev())
        .enumerate()
        .map(|(step, (source, compiled))| Correlated {
            index: last - step,
            source,
            compiled,
        })
        .collect())
}
