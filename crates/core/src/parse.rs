//! Component source parsing and preprocessing hooks.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use swc_core::common::Spanned;
use swc_core::common::comments::{Comments, SingleThreadedComments};
use swc_core::ecma::ast::{EsVersion, Expr, Module};
use swc_core::ecma::parser::{EsSyntax, Parser, StringInput, Syntax, TsSyntax, lexer::Lexer};

use crate::ast::*;
use crate::error::{CsfError, ErrorKind};
use crate::source::{SourceFile, Span};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

const DIRECTIVE_PREFIXES: &[&str] = &[
    "on",
    "bind",
    "class",
    "style",
    "use",
    "transition",
    "in",
    "out",
    "animate",
    "let",
];

const DUPLICATE_SCRIPT: &str =
    "A component can only have one instance-level and one module-level `<script>` element";

/// Text preprocessor run on a stories file before it is parsed.
pub trait TextTransform: Send + Sync {
    /// Transform the input text, returning an owned or borrowed string.
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str>;
}

impl<F> TextTransform for F
where
    F: for<'a> Fn(&'a str) -> Cow<'a, str> + Send + Sync,
{
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        (self)(input)
    }
}

/// Ordered text preprocessors shared by every entry point that reads a
/// stories file.
#[derive(Clone, Default)]
pub struct ParserPipeline {
    text_transforms: Vec<Arc<dyn TextTransform>>,
}

impl fmt::Debug for ParserPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserPipeline")
            .field("text_transforms", &self.text_transforms.len())
            .finish()
    }
}

impl ParserPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text preprocessor, run after the ones already added.
    pub fn add_text_transform<T: TextTransform + 'static>(&mut self, transform: T) {
        self.text_transforms.push(Arc::new(transform));
    }

    /// Whether no preprocessor is registered.
    pub fn is_empty(&self) -> bool {
        self.text_transforms.is_empty()
    }

    /// Apply every preprocessor in order.
    pub fn preprocess<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(input);
        for transform in &self.text_transforms {
            if let Cow::Owned(next) = transform.transform(current.as_ref()) {
                current = Cow::Owned(next);
            }
        }
        current
    }
}

/// Parse a component file into its source-level AST.
pub fn parse_component(file: &SourceFile) -> Result<Root, CsfError> {
    let mut parser = MarkupParser {
        file,
        text: file.text(),
        pos: 0,
    };
    let nodes = parser.parse_nodes(Until::Eof)?;
    log::trace!(
        "{}: parsed {} top-level nodes",
        file.filename(),
        nodes.len()
    );

    let mut root = Root {
        source: file.clone(),
        module: None,
        instance: None,
        styles: Vec::new(),
        fragment: Fragment {
            span: Span::new(0, file.text().len()),
            nodes: Vec::new(),
        },
    };

    for node in nodes {
        match node {
            TemplateNode::Element(element) if element.name == "script" => {
                let script = build_script(file, element)?;
                let slot = match script.context {
                    ScriptContext::Module => &mut root.module,
                    ScriptContext::Default => &mut root.instance,
                };
                if slot.is_some() {
                    return Err(file.error_at(
                        ErrorKind::MarkupSyntax {
                            message: DUPLICATE_SCRIPT.into(),
                        },
                        script.span.start,
                    ));
                }
                *slot = Some(script);
            }
            TemplateNode::Element(element) if element.name == "style" => {
                root.styles.push(element.span);
            }
            other => root.fragment.nodes.push(other),
        }
    }

    Ok(root)
}

/// Parse a JS or TS module occupying `content` in `file`.
pub fn parse_program(
    file: &SourceFile,
    content: Span,
    lang: ScriptLang,
) -> Result<(Module, HashMap<usize, Vec<ScriptComment>>), CsfError> {
    let comments = SingleThreadedComments::default();
    let module = {
        let lexer = Lexer::new(
            syntax_for(lang),
            EsVersion::latest(),
            StringInput::new(
                file.slice(content),
                file.pos(content.start),
                file.pos(content.end),
            ),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);
        let module = parser
            .parse_module()
            .map_err(|err| script_error(file, &err))?;
        if let Some(err) = parser.take_errors().into_iter().next() {
            return Err(script_error(file, &err));
        }
        module
    };

    let mut leading = HashMap::new();
    for item in &module.body {
        let lo = item.span_lo();
        if let Some(found) = comments.get_leading(lo) {
            let converted = found
                .iter()
                .map(|comment| ScriptComment {
                    kind: match comment.kind {
                        swc_core::common::comments::CommentKind::Line => CommentKind::Line,
                        swc_core::common::comments::CommentKind::Block => CommentKind::Block,
                    },
                    text: comment.text.to_string(),
                    span: file.span(comment.span),
                })
                .collect::<Vec<_>>();
            if !converted.is_empty() {
                leading.insert(file.offset(lo), converted);
            }
        }
    }

    Ok((module, leading))
}

/// Parse a single expression occupying `span` in `file`.
pub fn parse_expression(file: &SourceFile, span: Span) -> Result<Box<Expr>, CsfError> {
    let lexer = Lexer::new(
        syntax_for(ScriptLang::Ts),
        EsVersion::latest(),
        StringInput::new(file.slice(span), file.pos(span.start), file.pos(span.end)),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let expr = parser.parse_expr().map_err(|err| script_error(file, &err))?;
    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(script_error(file, &err));
    }
    Ok(expr)
}

fn syntax_for(lang: ScriptLang) -> Syntax {
    match lang {
        ScriptLang::Ts => Syntax::Typescript(TsSyntax::default()),
        ScriptLang::Js => Syntax::Es(EsSyntax::default()),
    }
}

fn script_error(file: &SourceFile, err: &swc_core::ecma::parser::error::Error) -> CsfError {
    file.error_at(
        ErrorKind::ScriptSyntax {
            message: err.kind().msg().to_string(),
        },
        file.offset(err.span().lo),
    )
}

fn build_script(file: &SourceFile, element: Element) -> Result<Script, CsfError> {
    let mut context = ScriptContext::Default;
    let mut lang = ScriptLang::Js;
    for attr in element.attributes.iter().filter_map(|node| match node {
        AttributeNode::Attribute(attr) => Some(attr),
        _ => None,
    }) {
        match (attr.name.as_str(), &attr.value) {
            ("module", AttributeValue::True) => context = ScriptContext::Module,
            ("context", AttributeValue::Text(text)) if text.data == "module" => {
                context = ScriptContext::Module
            }
            ("lang", AttributeValue::Text(text))
                if matches!(text.data.as_str(), "ts" | "typescript") =>
            {
                lang = ScriptLang::Ts
            }
            _ => {}
        }
    }

    let content = element.fragment.span;
    let (program, leading_comments) = parse_program(file, content, lang)?;
    Ok(Script {
        span: element.span,
        content,
        context,
        lang,
        program,
        leading_comments,
    })
}

/// Where a run of nodes stops.
#[derive(Clone, Copy)]
enum Until<'n> {
    Eof,
    Closing(&'n str),
    BlockClause,
}

struct MarkupParser<'a> {
    file: &'a SourceFile,
    text: &'a str,
    pos: usize,
}

impl<'a> MarkupParser<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + ahead).copied()
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> CsfError {
        self.file.error_at(
            ErrorKind::MarkupSyntax {
                message: message.into(),
            },
            offset,
        )
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek_byte(0) {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_while(&mut self, accept: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(byte) = self.peek_byte(0) {
            if !accept(byte) {
                break;
            }
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn parse_nodes(&mut self, until: Until<'_>) -> Result<Vec<TemplateNode>, CsfError> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() {
                return match until {
                    Until::Eof => Ok(nodes),
                    Until::Closing(name) => {
                        Err(self.error(
                            format!("`<{name}>` was left open"),
                            self.text.len(),
                        ))
                    }
                    Until::BlockClause => {
                        Err(self.error("Block was left open", self.text.len()))
                    }
                };
            }

            let rest = self.rest();
            if rest.starts_with("<!--") {
                nodes.push(self.parse_comment()?);
            } else if rest.starts_with("</") {
                return match until {
                    Until::Closing(_) => Ok(nodes),
                    _ => {
                        let name = closing_name(rest);
                        Err(self.error(
                            format!("`</{name}>` attempted to close an element that was not open"),
                            self.pos,
                        ))
                    }
                };
            } else if rest.starts_with('<')
                && self.peek_byte(1).is_some_and(|b| b.is_ascii_alphabetic())
            {
                nodes.push(self.parse_element()?);
            } else if rest.starts_with("{:") || rest.starts_with("{/") {
                return match until {
                    Until::BlockClause => Ok(nodes),
                    _ => Err(self.error(
                        "Unexpected block closing or continuation",
                        self.pos,
                    )),
                };
            } else if rest.starts_with("{#") {
                nodes.push(self.parse_block()?);
            } else if rest.starts_with("{@") {
                nodes.push(self.parse_tag()?);
            } else if rest.starts_with('{') {
                let start = self.pos;
                let end = self.expression_end(start)?;
                self.pos = end + 1;
                nodes.push(TemplateNode::ExpressionTag(ExpressionTag {
                    span: Span::new(start, end + 1),
                    expression: Span::new(start + 1, end),
                }));
            } else {
                nodes.push(self.parse_text());
            }
        }
    }

    fn parse_text(&mut self) -> TemplateNode {
        let start = self.pos;
        let bytes = self.text.as_bytes();
        let mut i = self.pos + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'{' => break,
                b'<' if bytes
                    .get(i + 1)
                    .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'/' || *b == b'!') =>
                {
                    break;
                }
                _ => i += 1,
            }
        }
        self.pos = i;
        TemplateNode::Text(Text {
            span: Span::new(start, i),
            data: self.text[start..i].to_string(),
        })
    }

    fn parse_comment(&mut self) -> Result<TemplateNode, CsfError> {
        let start = self.pos;
        let body_start = start + 4;
        let Some(close) = self.text[body_start..].find("-->") else {
            return Err(self.error("Comment was left open, expected `-->`", start));
        };
        let body_end = body_start + close;
        self.pos = body_end + 3;
        Ok(TemplateNode::Comment(Comment {
            span: Span::new(start, self.pos),
            data: self.text[body_start..body_end].to_string(),
        }))
    }

    fn parse_element(&mut self) -> Result<TemplateNode, CsfError> {
        let start = self.pos;
        self.pos += 1;
        let name = self
            .read_while(|b| {
                b.is_ascii_alphanumeric() || matches!(b, b'-' | b':' | b'.' | b'_' | b'$')
            })
            .to_string();

        let mut attributes = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            if self.eof() {
                return Err(self.error(
                    format!("`<{name}>` opening tag was left open"),
                    start,
                ));
            }
            attributes.push(self.parse_attribute()?);
        };

        let kind = element_kind(&name);
        let content_start = self.pos;
        let lower = name.to_ascii_lowercase();
        let fragment = if self_closing || VOID_ELEMENTS.contains(&lower.as_str()) {
            Fragment {
                span: Span::new(content_start, content_start),
                nodes: Vec::new(),
            }
        } else if RAW_TEXT_ELEMENTS.contains(&lower.as_str()) {
            let closing = format!("</{name}");
            let Some(found) = self.rest().find(&closing) else {
                return Err(self.error(format!("`<{name}>` was left open"), start));
            };
            let content_end = content_start + found;
            self.pos = content_end;
            self.consume_closing_tag(&name)?;
            let span = Span::new(content_start, content_end);
            Fragment {
                span,
                nodes: vec![TemplateNode::Text(Text {
                    span,
                    data: self.text[content_start..content_end].to_string(),
                })],
            }
        } else {
            let nodes = self.parse_nodes(Until::Closing(&name))?;
            let content_end = self.pos;
            self.consume_closing_tag(&name)?;
            Fragment {
                span: Span::new(content_start, content_end),
                nodes,
            }
        };

        Ok(TemplateNode::Element(Element {
            span: Span::new(start, self.pos),
            kind,
            name,
            attributes,
            fragment,
            self_closing,
        }))
    }

    fn consume_closing_tag(&mut self, name: &str) -> Result<(), CsfError> {
        let start = self.pos;
        let found = closing_name(self.rest());
        if found != name {
            return Err(self.error(
                format!("Expected `</{name}>`, found `</{found}>`"),
                start,
            ));
        }
        self.pos += 2 + found.len();
        self.skip_whitespace();
        if self.peek_byte(0) != Some(b'>') {
            return Err(self.error(
                format!("`</{name}` closing tag was left open"),
                start,
            ));
        }
        self.pos += 1;
        Ok(())
    }

    fn parse_attribute(&mut self) -> Result<AttributeNode, CsfError> {
        let start = self.pos;

        if self.peek_byte(0) == Some(b'{') {
            let end = self.expression_end(start)?;
            self.pos = end + 1;
            let inner = Span::new(start + 1, end);
            let trimmed = trim_span(self.text, inner);
            let content = &self.text[trimmed.start..trimmed.end];
            if let Some(operand) = content.strip_prefix("...") {
                let operand_start = trimmed.end - operand.len();
                return Ok(AttributeNode::Spread(SpreadAttribute {
                    span: Span::new(start, self.pos),
                    expression: Span::new(operand_start, trimmed.end),
                }));
            }
            return Ok(AttributeNode::Attribute(Attribute {
                span: Span::new(start, self.pos),
                name: content.to_string(),
                value: AttributeValue::Expression(ExpressionValue {
                    span: trimmed,
                    expr: parse_expression(self.file, trimmed)?,
                }),
            }));
        }

        let name = self
            .read_while(|b| {
                !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'{')
            })
            .to_string();
        if name.is_empty() {
            return Err(self.error("Expected attribute name", start));
        }

        let checkpoint = self.pos;
        self.skip_whitespace();
        let has_value = self.peek_byte(0) == Some(b'=');
        if has_value {
            self.pos += 1;
            self.skip_whitespace();
        } else {
            self.pos = checkpoint;
        }

        if let Some((prefix, rest)) = name.split_once(':')
            && DIRECTIVE_PREFIXES.contains(&prefix)
        {
            let value = if has_value {
                Some(self.parse_directive_value()?)
            } else {
                None
            };
            return Ok(AttributeNode::Directive(Directive {
                span: Span::new(start, self.pos),
                kind: prefix.to_string(),
                name: rest.to_string(),
                value,
            }));
        }

        let value = if has_value {
            self.parse_attribute_value()?
        } else {
            AttributeValue::True
        };
        Ok(AttributeNode::Attribute(Attribute {
            span: Span::new(start, self.pos),
            name,
            value,
        }))
    }

    fn parse_directive_value(&mut self) -> Result<Span, CsfError> {
        let quote = self.peek_byte(0).filter(|b| *b == b'"' || *b == b'\'');
        if quote.is_some() {
            self.pos += 1;
        }
        if self.peek_byte(0) != Some(b'{') {
            return Err(self.error(
                "Directive value must be an `{expression}`",
                self.pos,
            ));
        }
        let open = self.pos;
        let end = self.expression_end(open)?;
        self.pos = end + 1;
        if let Some(quote) = quote {
            if self.peek_byte(0) != Some(quote) {
                return Err(self.error("Unterminated attribute value", open));
            }
            self.pos += 1;
        }
        Ok(Span::new(open + 1, end))
    }

    fn parse_attribute_value(&mut self) -> Result<AttributeValue, CsfError> {
        match self.peek_byte(0) {
            Some(quote @ (b'"' | b'\'')) => {
                let open = self.pos;
                self.pos += 1;
                let mut parts = Vec::new();
                let mut text_start = self.pos;
                loop {
                    match self.peek_byte(0) {
                        None => return Err(self.error("Unterminated attribute value", open)),
                        Some(b) if b == quote => {
                            if text_start < self.pos {
                                parts.push(self.text_part(text_start, self.pos));
                            }
                            self.pos += 1;
                            break;
                        }
                        Some(b'{') => {
                            if text_start < self.pos {
                                parts.push(self.text_part(text_start, self.pos));
                            }
                            let brace = self.pos;
                            let end = self.expression_end(brace)?;
                            parts.push(SequencePart::Expression(Span::new(brace + 1, end)));
                            self.pos = end + 1;
                            text_start = self.pos;
                        }
                        Some(_) => self.pos += 1,
                    }
                }
                self.sequence_value(parts, open)
            }
            Some(b'{') => {
                let brace = self.pos;
                let end = self.expression_end(brace)?;
                self.pos = end + 1;
                let span = trim_span(self.text, Span::new(brace + 1, end));
                Ok(AttributeValue::Expression(ExpressionValue {
                    span,
                    expr: parse_expression(self.file, span)?,
                }))
            }
            _ => {
                let start = self.pos;
                let data = self.read_while(|b| !b.is_ascii_whitespace() && b != b'>');
                let data = data
                    .strip_suffix('/')
                    .filter(|_| self.peek_byte(0) == Some(b'>'))
                    .unwrap_or(data);
                self.pos = start + data.len();
                Ok(AttributeValue::Text(TextValue {
                    span: Span::new(start, self.pos),
                    data: data.to_string(),
                }))
            }
        }
    }

    fn text_part(&self, start: usize, end: usize) -> SequencePart {
        SequencePart::Text(TextValue {
            span: Span::new(start, end),
            data: self.text[start..end].to_string(),
        })
    }

    fn sequence_value(
        &self,
        mut parts: Vec<SequencePart>,
        open: usize,
    ) -> Result<AttributeValue, CsfError> {
        match parts.len() {
            0 => Ok(AttributeValue::Text(TextValue {
                span: Span::new(open + 1, open + 1),
                data: String::new(),
            })),
            1 => match parts.remove(0) {
                SequencePart::Text(text) => Ok(AttributeValue::Text(text)),
                SequencePart::Expression(span) => {
                    let span = trim_span(self.text, span);
                    Ok(AttributeValue::Expression(ExpressionValue {
                        span,
                        expr: parse_expression(self.file, span)?,
                    }))
                }
            },
            _ => Ok(AttributeValue::Sequence(parts)),
        }
    }

    fn parse_block(&mut self) -> Result<TemplateNode, CsfError> {
        let start = self.pos;
        let header_end = self.expression_end(start)?;
        let header = Span::new(start + 2, header_end);
        let header_text = &self.text[header.start..header.end];
        let kind_len = header_text
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        let kind = header_text[..kind_len].to_string();
        let expression = trim_span(self.text, Span::new(header.start + kind_len, header.end));
        self.pos = header_end + 1;

        if kind == "snippet" {
            return self.parse_snippet(start, expression);
        }
        if !matches!(kind.as_str(), "if" | "each" | "await" | "key") {
            return Err(self.error(format!("Unknown block `{{#{kind}}}`"), start));
        }

        let mut branches = Vec::new();
        loop {
            let body_start = self.pos;
            let nodes = self.parse_nodes(Until::BlockClause)?;
            branches.push(Fragment {
                span: Span::new(body_start, self.pos),
                nodes,
            });
            let clause_start = self.pos;
            let clause_end = self.expression_end(clause_start)?;
            let closing = self.rest().starts_with("{/");
            self.pos = clause_end + 1;
            if closing {
                let found = self.text[clause_start + 2..clause_end].trim();
                if found != kind {
                    return Err(self.error(
                        format!("Expected `{{/{kind}}}`, found `{{/{found}}}`"),
                        clause_start,
                    ));
                }
                break;
            }
        }

        Ok(TemplateNode::Block(Block {
            span: Span::new(start, self.pos),
            kind,
            expression,
            branches,
        }))
    }

    fn parse_snippet(&mut self, start: usize, header: Span) -> Result<TemplateNode, CsfError> {
        let header_text = &self.text[header.start..header.end];
        let name_len = header_text
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'$')
            .count();
        let name = header_text[..name_len].to_string();
        if name.is_empty() {
            return Err(self.error("Expected snippet name", header.start));
        }
        let params = match (header_text.find('('), header_text.rfind(')')) {
            (Some(open), Some(close)) if open < close => {
                Span::new(header.start + open + 1, header.start + close)
            }
            _ => Span::new(header.end, header.end),
        };

        let body_start = self.pos;
        let nodes = self.parse_nodes(Until::BlockClause)?;
        let body = Fragment {
            span: Span::new(body_start, self.pos),
            nodes,
        };
        let clause_start = self.pos;
        if !self.rest().starts_with("{/") {
            return Err(self.error("Expected `{/snippet}`", clause_start));
        }
        let clause_end = self.expression_end(clause_start)?;
        let found = self.text[clause_start + 2..clause_end].trim();
        if found != "snippet" {
            return Err(self.error(
                format!("Expected `{{/snippet}}`, found `{{/{found}}}`"),
                clause_start,
            ));
        }
        self.pos = clause_end + 1;

        Ok(TemplateNode::SnippetBlock(SnippetBlock {
            span: Span::new(start, self.pos),
            name,
            params,
            body,
        }))
    }

    fn parse_tag(&mut self) -> Result<TemplateNode, CsfError> {
        let start = self.pos;
        let end = self.expression_end(start)?;
        let inner = &self.text[start + 2..end];
        let kind_len = inner
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        self.pos = end + 1;
        Ok(TemplateNode::Tag(Tag {
            span: Span::new(start, self.pos),
            kind: inner[..kind_len].to_string(),
            expression: trim_span(self.text, Span::new(start + 2 + kind_len, end)),
        }))
    }

    fn expression_end(&self, open: usize) -> Result<usize, CsfError> {
        find_matching_brace(self.text, open)
            .ok_or_else(|| self.error("Unclosed expression, expected `}`", open))
    }
}

fn element_kind(name: &str) -> ElementKind {
    if name.starts_with("svelte:") {
        ElementKind::Special
    } else if name.contains('.') || name.starts_with(|c: char| c.is_ascii_uppercase()) {
        ElementKind::Component
    } else {
        ElementKind::Regular
    }
}

fn closing_name(rest: &str) -> &str {
    let body = rest.get(2..).unwrap_or_default();
    let len = body
        .bytes()
        .take_while(|b| !b.is_ascii_whitespace() && *b != b'>')
        .count();
    &body[..len]
}

fn trim_span(text: &str, span: Span) -> Span {
    let slice = &text[span.start..span.end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading == slice.len() {
        return Span::new(span.start, span.start);
    }
    Span::new(span.start + leading, span.end - trailing)
}

/// Index of the `}` closing the `{` at `open`.
///
/// Skips braces inside string literals, template literals (including nested
/// `${}` interpolations) and comments.
pub fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    // b'{' for a code context, b'`' for a template literal body
    let mut stack = vec![b'{'];
    let mut i = open + 1;
    while i < bytes.len() {
        let top = *stack.last()?;
        if top == b'`' {
            match bytes[i] {
                b'\\' => i += 1,
                b'`' => {
                    stack.pop();
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    stack.push(b'{');
                    i += 1;
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'`' => stack.push(b'`'),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'{' => stack.push(b'{'),
            b'}' => {
                stack.pop();
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Root {
        parse_component(&SourceFile::new("Test.stories.svelte", text)).unwrap()
    }

    fn first_element(nodes: &[TemplateNode]) -> &Element {
        nodes
            .iter()
            .find_map(|node| match node {
                TemplateNode::Element(element) => Some(element),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn matches_braces_across_strings_and_templates() {
        let text = r#"{ a: "}", b: `x ${ {c: 1}.c } }`, d: '{' }"#;
        assert_eq!(find_matching_brace(text, 0), Some(text.len() - 1));
        assert_eq!(find_matching_brace("{ // }\n }", 0), Some(8));
        assert_eq!(find_matching_brace("{ unclosed", 0), None);
    }

    #[test]
    fn splits_module_and_instance_scripts() {
        let root = parse(
            "<script module lang=\"ts\">\n  export const x: number = 1;\n</script>\n<script>\n  let y = 2;\n</script>\n<p>hi</p>\n<style>p { color: red; }</style>",
        );
        let module = root.module.as_ref().unwrap();
        assert_eq!(module.context, ScriptContext::Module);
        assert_eq!(module.lang, ScriptLang::Ts);
        assert_eq!(module.program.body.len(), 1);
        assert!(root.instance.is_some());
        assert_eq!(root.styles.len(), 1);
        assert_eq!(first_element(&root.fragment.nodes).name, "p");
    }

    #[test]
    fn supports_legacy_module_context() {
        let root = parse("<script context=\"module\">let a = 1;</script>");
        assert!(root.module.is_some());
        assert!(root.instance.is_none());
    }

    #[test]
    fn script_spans_are_absolute() {
        let text = "<!-- c -->\n<script module>\nconst value = 1;\n</script>";
        let root = parse(text);
        let module = root.module.unwrap();
        let offset = root.source.offset(module.program.body[0].span_lo());
        assert!(text[offset..].starts_with("const value"));
    }

    #[test]
    fn keeps_leading_jsdoc_comments() {
        let text =
            "<script module>\nimport a from 'a';\n/** Describes it */\nconst { Story } = a();\n</script>";
        let root = parse(text);
        let module = root.module.unwrap();
        let item = &module.program.body[1];
        let comments = module.leading_comments_at(root.source.offset(item.span_lo()));
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].kind, CommentKind::Block);
        assert_eq!(comments[0].text, "* Describes it ");
    }

    #[test]
    fn parses_components_attributes_and_children() {
        let text = r#"<Story name="Primary" args={{ label: "}" }} tags={['a']} disabled {...rest} on:click={handle}>
  <Button {...args} />
</Story>"#;
        let root = parse(text);
        let story = first_element(&root.fragment.nodes);
        assert_eq!(story.kind, ElementKind::Component);
        assert_eq!(story.attributes.len(), 6);
        match &story.attribute("name").unwrap().value {
            AttributeValue::Text(text) => assert_eq!(text.data, "Primary"),
            other => panic!("unexpected value {other:?}"),
        }
        assert!(matches!(
            story.attribute("args").unwrap().value,
            AttributeValue::Expression(_)
        ));
        assert!(matches!(
            story.attribute("disabled").unwrap().value,
            AttributeValue::True
        ));
        assert!(matches!(story.attributes[4], AttributeNode::Spread(_)));
        assert!(matches!(story.attributes[5], AttributeNode::Directive(_)));
        assert_eq!(
            root.source.slice(story.fragment.span),
            "\n  <Button {...args} />\n"
        );
    }

    #[test]
    fn parses_snippets_and_blocks() {
        let text = concat!(
            "{#snippet template(args)}\n",
            "  {#if args.on}<b>on</b>{:else}off{/if}\n",
            "{/snippet}\n",
            "{@html '<i></i>'}",
        );
        let root = parse(text);
        let TemplateNode::SnippetBlock(snippet) = &root.fragment.nodes[0] else {
            panic!("expected snippet");
        };
        assert_eq!(snippet.name, "template");
        assert_eq!(root.source.slice(snippet.params), "args");
        let block = snippet
            .body
            .nodes
            .iter()
            .find_map(|node| match node {
                TemplateNode::Block(block) => Some(block),
                _ => None,
            })
            .unwrap();
        assert_eq!(block.kind, "if");
        assert_eq!(block.branches.len(), 2);
        assert!(matches!(
            root.fragment.nodes.last(),
            Some(TemplateNode::Tag(tag)) if tag.kind == "html"
        ));
    }

    #[test]
    fn void_elements_need_no_closing_tag() {
        let root = parse("<div><input value=\"a\"><br></div>");
        let div = first_element(&root.fragment.nodes);
        assert_eq!(div.fragment.nodes.len(), 2);
    }

    #[test]
    fn quoted_values_mix_text_and_expressions() {
        let root = parse("<div class=\"a {b} c\" title=\"{title}\"></div>");
        let div = first_element(&root.fragment.nodes);
        assert!(matches!(
            &div.attribute("class").unwrap().value,
            AttributeValue::Sequence(parts) if parts.len() == 3
        ));
        assert!(matches!(
            div.attribute("title").unwrap().value,
            AttributeValue::Expression(_)
        ));
    }

    #[test]
    fn reports_mismatched_closing_tags() {
        let err = parse_component(&SourceFile::new("x.svelte", "<div>\n<span></div>")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MarkupSyntax { .. }));
        assert_eq!(err.location.unwrap().line, 2);
    }

    #[test]
    fn reports_unclosed_comments_and_scripts() {
        for text in ["<!-- open", "<script>let a"] {
            assert!(parse_component(&SourceFile::new("x.svelte", text)).is_err());
        }
    }

    #[test]
    fn reports_script_syntax_errors() {
        let file = SourceFile::new("x.svelte", "<script module>\nconst = ;\n</script>");
        let err = parse_component(&file).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ScriptSyntax { .. }));
        assert_eq!(err.location.unwrap().line, 2);
    }

    #[test]
    fn pipeline_runs_preprocessors_in_order() {
        fn first(input: &str) -> Cow<'_, str> {
            Cow::Owned(input.replace("TITLE", "first"))
        }
        fn second(input: &str) -> Cow<'_, str> {
            Cow::Owned(input.replace("first", "second"))
        }

        let mut pipeline = ParserPipeline::new();
        pipeline.add_text_transform(first);
        pipeline.add_text_transform(second);
        let text = pipeline.preprocess("<h1>TITLE</h1>");
        let root = parse_component(&SourceFile::new("x.svelte", text.into_owned())).unwrap();
        let h1 = first_element(&root.fragment.nodes);
        assert!(matches!(
            &h1.fragment.nodes[0],
            TemplateNode::Text(t) if t.data == "second"
        ));
    }
}
