//! Parse-only indexing of a stories file for the catalog.

use serde::{Deserialize, Serialize};

use crate::analyse::{analyse_stories, meta_summary};
use crate::error::{CsfError, ErrorKind};
use crate::extract::extract_source_ast;
use crate::identifier::{export_name_to_story_name, to_id};
use crate::parse::parse_component;
use crate::source::SourceFile;

/// Indexing options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexOptions {
    /// Whether the legacy template API is enabled for this project.
    pub legacy_template: bool,
}

/// Meta fields of an indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedMeta {
    /// Explicit component id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Catalog title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Meta-level tags.
    pub tags: Vec<String>,
}

/// One indexed story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedStory {
    /// Named export.
    pub export_name: String,
    /// Display name.
    pub name: String,
    /// Story-level tags.
    pub tags: Vec<String>,
}

/// Metadata summary and story summaries of a stories file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInput {
    /// Meta fields.
    pub meta: IndexedMeta,
    /// Stories in document order.
    pub stories: Vec<IndexedStory>,
}

/// Flattened catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Story id, when the title or component id is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Catalog title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Named export.
    pub export_name: String,
    /// Display name.
    pub name: String,
    /// Meta and story tags combined.
    pub tags: Vec<String>,
}

impl IndexInput {
    /// One entry per story with combined tags and derived ids.
    pub fn entries(&self) -> Vec<IndexEntry> {
        let component = self.meta.id.as_ref().or(self.meta.title.as_ref());
        self.stories
            .iter()
            .map(|story| IndexEntry {
                id: component.map(|component| {
                    to_id(component, &export_name_to_story_name(&story.export_name))
                }),
                title: self.meta.title.clone(),
                export_name: story.export_name.clone(),
                name: story.name.clone(),
                tags: combine_tags(self.meta.tags.iter().chain(&story.tags)),
            })
            .collect()
    }
}

/// Merge tag lists in order; `!tag` removes an earlier `tag`.
pub fn combine_tags<'a>(tags: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut combined: Vec<String> = Vec::new();
    for tag in tags {
        if let Some(removed) = tag.strip_prefix('!') {
            combined.retain(|existing| existing != removed);
        } else if !combined.contains(tag) {
            combined.push(tag.clone());
        }
    }
    combined
}

/// Index a stories file without compiling it.
///
/// With the legacy flag off, the structural errors that legacy files trigger
/// are reported as [`ErrorKind::LegacyTemplateNotEnabled`].
pub fn index_stories_file(
    filename: &str,
    source: &str,
    options: &IndexOptions,
) -> Result<IndexInput, CsfError> {
    index(filename, source).map_err(|err| {
        if !options.legacy_template && err.kind.is_legacy_signal() {
            log::debug!(
                "{filename}: `{}` looks like the legacy template API",
                err.code()
            );
            CsfError {
                kind: ErrorKind::LegacyTemplateNotEnabled,
                ..err
            }
        } else {
            err
        }
    })
}

fn index(filename: &str, source: &str) -> Result<IndexInput, CsfError> {
    let file = SourceFile::new(filename, source);
    let root = parse_component(&file)?;
    let bundle = extract_source_ast(&root)?;
    let meta = meta_summary(&bundle)?;
    let stories = analyse_stories(&bundle)?
        .into_iter()
        .map(|story| IndexedStory {
            export_name: story.attributes.ids.export_name,
            name: story.attributes.ids.name,
            tags: story.attributes.tags.unwrap_or_default(),
        })
        .collect();

    Ok(IndexInput {
        meta: IndexedMeta {
            id: meta.id,
            title: meta.title,
            tags: meta.tags,
        },
        stories,
    })
}
