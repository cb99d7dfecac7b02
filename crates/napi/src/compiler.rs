//! The stateful compiler exposed to the build tool.

use napi_derive::napi;
use serde_json::Value as JsonValue;
use svelte_csf_compiler::{StoriesPlugin, TransformOptions};
use svelte_csf_core::CsfError;

use crate::batch::{BatchInput, BatchOptions, BatchProcessingResult, index_batch};
use crate::convert_error;
use crate::types::{IndexResult, TransformConfig, TransformResult};

/// Stories transform hooks sharing one configuration.
#[napi]
pub struct StoriesCompiler {
    pub(crate) plugin: StoriesPlugin,
}

#[napi]
impl StoriesCompiler {
    #[napi(constructor)]
    /// Creates hooks that can be reused across build-tool transform calls.
    pub fn new(config: Option<TransformConfig>) -> Self {
        let options: TransformOptions = config.unwrap_or_default().into();
        Self {
            plugin: StoriesPlugin::new(options),
        }
    }

    /// Whether `id` names a stories file.
    #[napi(js_name = "isStoriesFile")]
    pub fn is_stories_file(&self, id: String) -> bool {
        svelte_csf_compiler::is_stories_file(&id)
    }

    /// Hook to run before the component compiler. Returns `null` for other files.
    #[napi(js_name = "preTransform")]
    pub fn pre_transform(&self, code: String, id: String) -> napi::Result<Option<TransformResult>> {
        let code = self.plugin.pre(&code, &id).map_err(convert_error)?;
        Ok(code.map(TransformResult::from))
    }

    /// Hook to run after the component compiler.
    ///
    /// `original` is the stories file after preprocessing, before `preTransform`.
    #[napi(js_name = "postTransform")]
    pub fn post_transform(
        &self,
        compiled: String,
        id: String,
        original: String,
    ) -> napi::Result<Option<TransformResult>> {
        let code = self
            .plugin
            .post(&compiled, &id, &original)
            .map_err(convert_error)?;
        Ok(code.map(TransformResult::from))
    }

    /// Index a stories file without compiling it.
    #[napi]
    pub fn index(&self, source: String, filename: String) -> napi::Result<IndexResult> {
        let input = self
            .plugin
            .index(&filename, &source)
            .map_err(convert_error)?;
        Ok(input.into())
    }

    /// Index a stories file and return the raw indexer output as JSON.
    #[napi(js_name = "indexJson")]
    pub fn index_json(&self, source: String, filename: String) -> napi::Result<JsonValue> {
        let input = self
            .plugin
            .index(&filename, &source)
            .map_err(convert_error)?;
        serde_json::to_value(&input).map_err(|err| {
            convert_error(CsfError::new(
                svelte_csf_core::ErrorKind::Codegen {
                    message: err.to_string(),
                },
                filename,
            ))
        })
    }

    /// Indexes many stories files in parallel using Rayon.
    #[napi(js_name = "indexBatch")]
    pub fn index_batch(
        &self,
        inputs: Vec<BatchInput>,
        options: Option<BatchOptions>,
    ) -> napi::Result<BatchProcessingResult> {
        Ok(index_batch(&self.plugin, inputs, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = concat!(
        "<script module>\n",
        "  import { defineMeta } from '@storybook/addon-svelte-csf';\n",
        "  const { Story } = defineMeta({ title: 'Atoms/Button', tags: ['autodocs'] });\n",
        "</script>\n",
        "<Story name=\"Primary\" tags={['!autodocs']} />\n",
    );

    #[test]
    fn config_defaults_match_transform_options() {
        let compiler = StoriesCompiler::new(None);
        assert_eq!(compiler.plugin.options(), &TransformOptions::default());

        let compiler = StoriesCompiler::new(Some(TransformConfig {
            legacy_template: Some(true),
            runtime_module: Some("./runtime.js".into()),
            dev: None,
        }));
        assert!(compiler.plugin.options().legacy_template);
        assert_eq!(compiler.plugin.options().runtime_module, "./runtime.js");
    }

    #[test]
    fn hooks_skip_other_files() {
        let compiler = StoriesCompiler::new(None);
        let skipped = compiler
            .pre_transform("<div />".into(), "Button.svelte".into())
            .unwrap();
        assert!(skipped.is_none());
        assert!(!compiler.is_stories_file("Button.svelte".into()));
        assert!(compiler.is_stories_file("Button.stories.svelte?t=1".into()));
    }

    #[test]
    fn pre_transform_returns_code_without_map() {
        let compiler = StoriesCompiler::new(None);
        let result = compiler
            .pre_transform(SOURCE.into(), "Button.stories.svelte".into())
            .unwrap()
            .unwrap();
        assert!(result.map.is_none());
        assert_ne!(result.code, SOURCE);
    }

    #[test]
    fn index_combines_tags() {
        let compiler = StoriesCompiler::new(None);
        let index = compiler
            .index(SOURCE.into(), "Button.stories.svelte".into())
            .unwrap();
        assert_eq!(index.title.as_deref(), Some("Atoms/Button"));
        assert_eq!(index.stories.len(), 1);
        assert_eq!(
            index.stories[0].id.as_deref(),
            Some("atoms-button--primary")
        );
        assert!(index.stories[0].tags.is_empty());

        let json = compiler
            .index_json(SOURCE.into(), "Button.stories.svelte".into())
            .unwrap();
        assert_eq!(json["stories"][0]["exportName"], "Primary");
    }
}
