#![deny(missing_docs)]
//! Svelte CSF core: component parsing, stories extraction and static analysis.

/// Typed, fail-fast node accessors.
pub mod accessors;
/// Story and meta analysis.
pub mod analyse;
/// Source-level component AST.
pub mod ast;
/// Error taxonomy and diagnostics.
pub mod error;
/// Source-AST extraction.
pub mod extract;
/// Story naming rules.
pub mod identifier;
/// Parse-only indexing entry point.
pub mod indexer;
/// Component parsing and preprocessing hooks.
pub mod parse;
/// Byte offsets, spans and source files.
pub mod source;

pub use analyse::{AnalysedStory, MetaSummary, StoryAttributes, analyse_stories, meta_summary};
pub use ast::Root;
pub use error::{CsfError, ErrorCategory, ErrorClass, ErrorKind, SourceLocation};
pub use extract::{SourceAstBundle, StoryTag, extract_source_ast};
pub use identifier::StoryIdentifiers;
pub use indexer::{IndexEntry, IndexInput, IndexOptions, index_stories_file};
pub use parse::{ParserPipeline, TextTransform, parse_component};
pub use source::{SourceFile, Span};
