//! Build-tool hook layer.
//!
//! The host calls [`StoriesPlugin::pre`] before its component compiler runs and
//! [`StoriesPlugin::post`] after it. Ids that are not stories files pass
//! through untouched.

use svelte_csf_core::{CsfError, IndexInput, ParserPipeline, TextTransform, index_stories_file};

use crate::options::TransformOptions;
use crate::post_transform::post_transform;
use crate::pre_transform::pre_transform;

/// File name suffix of stories files.
pub const STORIES_SUFFIX: &str = ".stories.svelte";

/// Whether a module id names a stories file. Query strings are ignored.
///
/// ```
/// use svelte_csf_compiler::plugin::is_stories_file;
///
/// assert!(is_stories_file("/src/Button.stories.svelte?v=3"));
/// assert!(!is_stories_file("/src/Button.svelte"));
/// ```
pub fn is_stories_file(id: &str) -> bool {
    let path = id.split_once('?').map_or(id, |(path, _)| path);
    path.ends_with(STORIES_SUFFIX)
}

/// Pre and post hooks sharing one set of options and one set of text
/// preprocessors.
#[derive(Debug, Clone, Default)]
pub struct StoriesPlugin {
    options: TransformOptions,
    pipeline: ParserPipeline,
}

impl StoriesPlugin {
    /// Create the hooks.
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            pipeline: ParserPipeline::new(),
        }
    }

    /// Run `transform` over every stories file before it is read, after the
    /// preprocessors already added.
    pub fn with_preprocessor<T: TextTransform + 'static>(mut self, transform: T) -> Self {
        self.pipeline.add_text_transform(transform);
        self
    }

    /// Options in use.
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Hook run before the component compiler.
    pub fn pre(&self, code: &str, id: &str) -> Result<Option<String>, CsfError> {
        if !is_stories_file(id) {
            return Ok(None);
        }
        pre_transform(id, &self.pipeline.preprocess(code)).map(Some)
    }

    /// Hook run after the component compiler.
    ///
    /// `original` is the stories file after the host's preprocessing. The
    /// plugin's own preprocessors are applied to it again so that offsets
    /// match the text [`StoriesPlugin::pre`] handed to the compiler.
    pub fn post(
        &self,
        compiled: &str,
        id: &str,
        original: &str,
    ) -> Result<Option<String>, CsfError> {
        if !is_stories_file(id) {
            return Ok(None);
        }
        let original = self.pipeline.preprocess(original);
        post_transform(id, compiled, &original, &self.options).map(Some)
    }

    /// Parse-only indexing of a stories file.
    pub fn index(&self, filename: &str, source: &str) -> Result<IndexInput, CsfError> {
        let source = self.pipeline.preprocess(source);
        index_stories_file(filename, &source, &self.options.index_options())
    }
}
