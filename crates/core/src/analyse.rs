//! Static analysis of story tags and the meta declaration.

use swc_core::ecma::ast::Expr;

use crate::accessors::{
    extract_named_attributes, extract_named_properties, read_string_array_attribute,
    read_string_array_property, read_string_attribute, read_string_property,
};
use crate::ast::{AttributeValue, Comment, CommentKind, Element, ScriptComment, TemplateNode};
use crate::error::{CsfError, ErrorKind};
use crate::extract::{SourceAstBundle, StoryTag};
use crate::identifier::{ExportNames, StoryIdentifiers};
use crate::source::{SourceFile, Span};

/// Name of the snippet holding a story's own template.
pub const CHILDREN_SNIPPET: &str = "children";

/// Static attributes of one story tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryAttributes {
    /// Export and display names.
    pub ids: StoryIdentifiers,
    /// `tags` attribute.
    pub tags: Option<Vec<String>>,
    /// Snippet referenced by the `template` attribute.
    pub template: Option<String>,
}

/// Read the attributes of a story tag.
pub fn story_attributes(file: &SourceFile, element: &Element) -> Result<StoryAttributes, CsfError> {
    let attrs = extract_named_attributes(element, &["name", "exportName", "tags", "template"]);
    let name = attrs
        .get("name")
        .map(|attr| read_string_attribute(file, attr))
        .transpose()?;
    let export_name = attrs
        .get("exportName")
        .map(|attr| read_string_attribute(file, attr))
        .transpose()?;
    let ids = StoryIdentifiers::resolve(name, export_name)
        .map_err(|kind| file.error_at(kind, element.span.start))?;
    let tags = attrs
        .get("tags")
        .map(|attr| read_string_array_attribute(file, attr))
        .transpose()?;
    let template = attrs
        .get("template")
        .map(|attr| match &attr.value {
            AttributeValue::Expression(value) => match &*value.expr {
                Expr::Ident(ident) => Ok(ident.sym.to_string()),
                _ => Err(()),
            },
            _ => Err(()),
        })
        .transpose()
        .map_err(|()| {
            file.error_at(
                ErrorKind::InvalidTemplateAttribute {
                    story: ids.name.clone(),
                },
                element.span.start,
            )
        })?;

    Ok(StoryAttributes {
        ids,
        tags,
        template,
    })
}

/// A story with everything the transform needs resolved.
#[derive(Debug, Clone)]
pub struct AnalysedStory<'a> {
    /// Tag this story was read from.
    pub tag: StoryTag<'a>,
    /// Static attributes.
    pub attributes: StoryAttributes,
    /// Exact author-written source of the story's template.
    pub raw_code: String,
    /// Description from the comment above the tag.
    pub description: Option<String>,
}

/// Analyse every story of the bundle, rejecting duplicate export names.
pub fn analyse_stories<'a>(
    bundle: &SourceAstBundle<'a>,
) -> Result<Vec<AnalysedStory<'a>>, CsfError> {
    let file = &bundle.root.source;
    let mut export_names = ExportNames::new();
    let mut stories = Vec::with_capacity(bundle.stories.len());

    for tag in &bundle.stories {
        let attributes = story_attributes(file, tag.element)?;
        export_names
            .claim(&attributes.ids)
            .map_err(|kind| file.error_at(kind, tag.element.span.start))?;
        let raw_code = story_raw_code(bundle, tag.element, &attributes)?;
        log::trace!(
            "{}: story `{}` raw code is {} bytes",
            file.filename(),
            attributes.ids.export_name,
            raw_code.len()
        );
        stories.push(AnalysedStory {
            tag: *tag,
            description: tag.comment.and_then(story_description),
            attributes,
            raw_code,
        });
    }

    Ok(stories)
}

/// Exact source text shown as a story's code sample.
///
/// Picks, in order: the body of a `children` snippet, the story's other
/// non-whitespace children, the body of the snippet named by `template`,
/// and finally the whole tag.
pub fn story_raw_code(
    bundle: &SourceAstBundle<'_>,
    element: &Element,
    attributes: &StoryAttributes,
) -> Result<String, CsfError> {
    let file = &bundle.root.source;
    let children = &element.fragment.nodes;

    let children_snippet = children.iter().find_map(|node| match node {
        TemplateNode::SnippetBlock(snippet) if snippet.name == CHILDREN_SNIPPET => Some(snippet),
        _ => None,
    });
    if let Some(snippet) = children_snippet {
        return Ok(file.slice(snippet.body.span).to_string());
    }

    let mut content = children.iter().filter(|node| !node.is_whitespace());
    if let Some(first) = content.next() {
        let last = content.last().unwrap_or(first);
        return Ok(file
            .slice(Span::new(first.span().start, last.span().end))
            .to_string());
    }

    if let Some(template) = &attributes.template {
        let snippet = bundle.snippets.get(template).ok_or_else(|| {
            file.error_at(
                ErrorKind::MissingTemplateSnippet {
                    story: attributes.ids.name.clone(),
                    snippet: template.clone(),
                },
                element.span.start,
            )
        })?;
        return Ok(file.slice(snippet.body.span).to_string());
    }

    Ok(file.slice(element.span).to_string())
}

/// Description text of a story comment.
pub fn story_description(comment: &Comment) -> Option<String> {
    non_empty(dedent(&comment.data))
}

/// Description from the JSDoc comment above the meta declaration.
///
/// Only block comments count; the closest one wins.
pub fn meta_description(comments: &[ScriptComment]) -> Option<String> {
    let comment = comments
        .iter()
        .rev()
        .find(|comment| comment.kind == CommentKind::Block)?;
    let stripped = comment
        .text
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix('*') {
                Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
                None => line,
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    non_empty(dedent(&stripped))
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Remove the common indentation of non-blank lines and trim surrounding blank space.
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|line| line.get(indent..).unwrap_or(line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Static fields of the meta declaration used for indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaSummary {
    /// `id` property.
    pub id: Option<String>,
    /// `title` property.
    pub title: Option<String>,
    /// `tags` property.
    pub tags: Vec<String>,
    /// Description from the declaration's JSDoc comment.
    pub description: Option<String>,
}

/// Read the statically known meta fields.
pub fn meta_summary(bundle: &SourceAstBundle<'_>) -> Result<MetaSummary, CsfError> {
    let file = &bundle.root.source;
    let props = extract_named_properties(bundle.define_meta.argument, &["id", "title", "tags"]);
    Ok(MetaSummary {
        id: props
            .get("id")
            .map(|prop| read_string_property(file, "id", prop))
            .transpose()?,
        title: props
            .get("title")
            .map(|prop| read_string_property(file, "title", prop))
            .transpose()?,
        tags: props
            .get("tags")
            .map(|prop| read_string_array_property(file, "tags", prop))
            .transpose()?
            .unwrap_or_default(),
        description: meta_description(bundle.define_meta.leading_comments),
    })
}
