//! Source-level AST of a Svelte component file.
//!
//! Markup is modelled structurally; script blocks and attribute expressions are
//! parsed with swc. Every [`Span`] is a byte range into the original file.

use std::collections::HashMap;

use swc_core::ecma::ast::{Expr, Module};

use crate::source::{SourceFile, Span};

/// Parsed component file.
#[derive(Debug)]
pub struct Root {
    /// File the tree was parsed from.
    pub source: SourceFile,
    /// `<script module>` block.
    pub module: Option<Script>,
    /// Instance `<script>` block.
    pub instance: Option<Script>,
    /// Spans of top-level `<style>` elements.
    pub styles: Vec<Span>,
    /// Markup outside of scripts and styles.
    pub fragment: Fragment,
}

/// Which script block a `<script>` element is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptContext {
    /// `<script module>` or `<script context="module">`.
    Module,
    /// Plain instance script.
    Default,
}

/// Language of a script block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptLang {
    /// JavaScript.
    #[default]
    Js,
    /// TypeScript (`lang="ts"`).
    Ts,
}

/// Kind of a script comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// ...`
    Line,
    /// `/* ... */`, including JSDoc.
    Block,
}

/// Comment attached before a top-level script item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptComment {
    /// Line or block comment.
    pub kind: CommentKind,
    /// Text between the comment delimiters.
    pub text: String,
    /// Span including delimiters.
    pub span: Span,
}

/// A parsed `<script>` block.
#[derive(Debug)]
pub struct Script {
    /// Whole element, tags included.
    pub span: Span,
    /// Text between the opening and closing tags.
    pub content: Span,
    /// Module or instance script.
    pub context: ScriptContext,
    /// Script language.
    pub lang: ScriptLang,
    /// Parsed program.
    pub program: Module,
    /// Leading comments keyed by the start offset of the item they precede.
    pub leading_comments: HashMap<usize, Vec<ScriptComment>>,
}

impl Script {
    /// Comments written directly before the item starting at `offset`.
    pub fn leading_comments_at(&self, offset: usize) -> &[ScriptComment] {
        self.leading_comments
            .get(&offset)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Ordered sequence of template nodes.
#[derive(Debug, Default)]
pub struct Fragment {
    /// Span covering the children; empty for childless elements.
    pub span: Span,
    /// Child nodes in document order.
    pub nodes: Vec<TemplateNode>,
}

/// Markup node.
#[derive(Debug)]
pub enum TemplateNode {
    /// Raw text, whitespace included.
    Text(Text),
    /// `<!-- ... -->`
    Comment(Comment),
    /// Element, component or `svelte:*` element.
    Element(Element),
    /// `{expression}`
    ExpressionTag(ExpressionTag),
    /// `{#snippet name(params)}...{/snippet}`
    SnippetBlock(SnippetBlock),
    /// `{#if}`, `{#each}`, `{#await}` or `{#key}`.
    Block(Block),
    /// `{@html}`, `{@const}`, `{@render}` and friends.
    Tag(Tag),
}

impl TemplateNode {
    /// Span of the node.
    pub fn span(&self) -> Span {
        match self {
            TemplateNode::Text(node) => node.span,
            TemplateNode::Comment(node) => node.span,
            TemplateNode::Element(node) => node.span,
            TemplateNode::ExpressionTag(node) => node.span,
            TemplateNode::SnippetBlock(node) => node.span,
            TemplateNode::Block(node) => node.span,
            TemplateNode::Tag(node) => node.span,
        }
    }

    /// Whether the node is text made only of whitespace.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, TemplateNode::Text(text) if text.data.trim().is_empty())
    }
}

/// Raw text.
#[derive(Debug)]
pub struct Text {
    /// Span of the text.
    pub span: Span,
    /// Text content.
    pub data: String,
}

/// HTML comment.
#[derive(Debug)]
pub struct Comment {
    /// Span including `<!--` and `-->`.
    pub span: Span,
    /// Text between the delimiters.
    pub data: String,
}

/// How an element name is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Lowercase HTML element.
    Regular,
    /// Capitalised or dotted name referencing a component binding.
    Component,
    /// `svelte:head`, `svelte:window`, ...
    Special,
}

/// Element or component tag.
#[derive(Debug)]
pub struct Element {
    /// Span from `<` to the end of the closing tag.
    pub span: Span,
    /// Element kind.
    pub kind: ElementKind,
    /// Tag name as written.
    pub name: String,
    /// Attributes in source order.
    pub attributes: Vec<AttributeNode>,
    /// Children.
    pub fragment: Fragment,
    /// Whether written as `<Name />`.
    pub self_closing: bool,
}

/// Any item inside an opening tag.
#[derive(Debug)]
pub enum AttributeNode {
    /// `name`, `name="..."`, `name={...}` or `{name}`.
    Attribute(Attribute),
    /// `{...expression}`
    Spread(SpreadAttribute),
    /// `on:click`, `bind:value={...}`, ...
    Directive(Directive),
}

/// Regular attribute.
#[derive(Debug)]
pub struct Attribute {
    /// Span of the whole attribute.
    pub span: Span,
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: AttributeValue,
}

/// Value of a regular attribute.
#[derive(Debug)]
pub enum AttributeValue {
    /// Boolean attribute without a value.
    True,
    /// Static text.
    Text(TextValue),
    /// A single `{expression}`.
    Expression(ExpressionValue),
    /// Text interleaved with expressions, e.g. `"a {b} c"`.
    Sequence(Vec<SequencePart>),
}

/// Static text value.
#[derive(Debug)]
pub struct TextValue {
    /// Span of the text, quotes excluded.
    pub span: Span,
    /// The text.
    pub data: String,
}

/// Parsed expression value.
#[derive(Debug)]
pub struct ExpressionValue {
    /// Span of the expression, braces excluded.
    pub span: Span,
    /// Parsed expression with absolute positions.
    pub expr: Box<Expr>,
}

/// Part of a quoted attribute value.
#[derive(Debug)]
pub enum SequencePart {
    /// Static text.
    Text(TextValue),
    /// Interpolated expression span, braces excluded.
    Expression(Span),
}

/// `{...expression}` attribute.
#[derive(Debug)]
pub struct SpreadAttribute {
    /// Span including braces.
    pub span: Span,
    /// Span of the spread operand.
    pub expression: Span,
}

/// Directive such as `bind:value`.
#[derive(Debug)]
pub struct Directive {
    /// Span of the directive.
    pub span: Span,
    /// Prefix before the colon.
    pub kind: String,
    /// Name after the colon, modifiers included.
    pub name: String,
    /// Span of the value expression, if any.
    pub value: Option<Span>,
}

/// `{expression}` in markup.
#[derive(Debug)]
pub struct ExpressionTag {
    /// Span including braces.
    pub span: Span,
    /// Span of the expression.
    pub expression: Span,
}

/// Snippet declaration.
#[derive(Debug)]
pub struct SnippetBlock {
    /// Span from `{#snippet` to `{/snippet}` inclusive.
    pub span: Span,
    /// Snippet name.
    pub name: String,
    /// Span of the parameter list, parentheses excluded.
    pub params: Span,
    /// Snippet body.
    pub body: Fragment,
}

/// Control-flow block.
#[derive(Debug)]
pub struct Block {
    /// Span from the opening `{#` to the closing `{/...}`.
    pub span: Span,
    /// Block keyword (`if`, `each`, ...).
    pub kind: String,
    /// Span of the header expression.
    pub expression: Span,
    /// Branch bodies separated by `{:...}` clauses.
    pub branches: Vec<Fragment>,
}

/// `{@kind expression}` tag.
#[derive(Debug)]
pub struct Tag {
    /// Span including braces.
    pub span: Span,
    /// Tag keyword.
    pub kind: String,
    /// Span of the expression.
    pub expression: Span,
}

impl Element {
    /// First regular attribute named `name`.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find_map(|node| match node {
            AttributeNode::Attribute(attr) if attr.name == name => Some(attr),
            _ => None,
        })
    }
}
