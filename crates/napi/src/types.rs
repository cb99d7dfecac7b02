//! NAPI-exposed data structures.

use napi_derive::napi;
use svelte_csf_compiler::{DEFAULT_RUNTIME_MODULE, TransformOptions};
use svelte_csf_core::{IndexEntry, IndexInput};

/// Options passed to the compiler constructor.
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct TransformConfig {
    /// Accept the legacy template API when indexing.
    pub legacy_template: Option<bool>,
    /// Overrides the module the runtime story helper is imported from.
    pub runtime_module: Option<String>,
    /// Whether the component compiler runs in development mode.
    pub dev: Option<bool>,
}

impl From<TransformConfig> for TransformOptions {
    fn from(config: TransformConfig) -> Self {
        TransformOptions {
            legacy_template: config.legacy_template.unwrap_or(false),
            runtime_module: config
                .runtime_module
                .unwrap_or_else(|| DEFAULT_RUNTIME_MODULE.to_string()),
            dev: config.dev.unwrap_or(false),
        }
    }
}

/// Rewritten module code.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct TransformResult {
    /// Module source.
    pub code: String,
    /// Source map; not produced.
    pub map: Option<String>,
}

impl From<String> for TransformResult {
    fn from(code: String) -> Self {
        Self { code, map: None }
    }
}

/// One catalog entry.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct IndexedStoryEntry {
    /// Story id, when the title or component id is known.
    pub id: Option<String>,
    /// Catalog title.
    pub title: Option<String>,
    /// Named export of the story.
    pub export_name: String,
    /// Display name.
    pub name: String,
    /// Meta and story tags combined.
    pub tags: Vec<String>,
}

impl From<IndexEntry> for IndexedStoryEntry {
    fn from(entry: IndexEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            export_name: entry.export_name,
            name: entry.name,
            tags: entry.tags,
        }
    }
}

/// Indexer output for one stories file.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct IndexResult {
    /// Explicit component id from the meta.
    pub id: Option<String>,
    /// Catalog title from the meta.
    pub title: Option<String>,
    /// Meta-level tags.
    pub tags: Vec<String>,
    /// Stories in document order.
    pub stories: Vec<IndexedStoryEntry>,
}

impl From<IndexInput> for IndexResult {
    fn from(input: IndexInput) -> Self {
        let stories = input
            .entries()
            .into_iter()
            .map(IndexedStoryEntry::from)
            .collect();
        Self {
            id: input.meta.id,
            title: input.meta.title,
            tags: input.meta.tags,
            stories,
        }
    }
}
