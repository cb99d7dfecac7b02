//! Transform configuration.

use serde::Deserialize;
use svelte_csf_core::IndexOptions;

/// Module exporting the runtime story registration helper.
pub const DEFAULT_RUNTIME_MODULE: &str =
    "@storybook/addon-svelte-csf/internal/create-runtime-stories";

/// Options shared by the hooks and the full pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Whether the legacy template API is enabled for this project.
    pub legacy_template: bool,
    /// Import path of the runtime registration helper.
    pub runtime_module: String,
    /// Compile in development mode.
    pub dev: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            legacy_template: false,
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            dev: false,
        }
    }
}

impl TransformOptions {
    /// Options for the parse-only indexer.
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            legacy_template: self.legacy_template,
        }
    }
}
