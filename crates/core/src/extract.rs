//! One-pass extraction of the nodes the transform needs from a stories file.

use std::collections::HashMap;

use swc_core::common::Spanned;
use swc_core::ecma::ast::{
    CallExpr, Decl, Expr, ImportSpecifier, ModuleDecl, ModuleExportName, ModuleItem, ObjectLit,
    ObjectPat, Pat, Stmt, VarDecl,
};

use crate::accessors::{
    PatternBinding, callee_ident, describe_expr, find_pattern_binding, single_object_argument,
};
use crate::ast::{
    Comment, Element, ElementKind, Root, Script, ScriptComment, SnippetBlock, TemplateNode,
};
use crate::error::{CsfError, ErrorKind};
use crate::source::Span;

/// Package the meta-declaration function is imported from.
pub const ADDON_PACKAGE: &str = "@storybook/addon-svelte-csf";
/// Exported name of the meta-declaration function.
pub const DEFINE_META: &str = "defineMeta";
/// Key of the story component in the destructuring pattern.
pub const STORY_KEY: &str = "Story";
/// Key of the metadata object in the destructuring pattern.
pub const META_KEY: &str = "meta";

/// The `const { Story } = defineMeta({...})` declaration.
#[derive(Debug)]
pub struct MetaDeclaration<'a> {
    /// Whole variable declaration.
    pub decl: &'a VarDecl,
    /// Destructuring pattern of the declarator.
    pub pattern: &'a ObjectPat,
    /// The `defineMeta(...)` call.
    pub call: &'a CallExpr,
    /// Sole object literal argument of the call.
    pub argument: &'a ObjectLit,
    /// Span of the variable declaration in the stories file.
    pub span: Span,
    /// Comments written directly above the declaration.
    pub leading_comments: &'a [ScriptComment],
}

/// A story tag and the comment describing it.
#[derive(Debug, Clone, Copy)]
pub struct StoryTag<'a> {
    /// The `<Story>` element.
    pub element: &'a Element,
    /// HTML comment directly above the tag.
    pub comment: Option<&'a Comment>,
}

/// Everything downstream stages read from the stories file's own AST.
#[derive(Debug)]
pub struct SourceAstBundle<'a> {
    /// Parsed file.
    pub root: &'a Root,
    /// Module script holding the meta declaration.
    pub module: &'a Script,
    /// Local name of the imported meta-declaration function.
    pub define_meta_local: String,
    /// Meta declaration.
    pub define_meta: MetaDeclaration<'a>,
    /// Local name the story component was destructured into.
    pub story_local: String,
    /// Local name of the `meta` binding, when the author destructured it.
    pub meta_local: Option<String>,
    /// Story tags in document order.
    pub stories: Vec<StoryTag<'a>>,
    /// Top-level snippets by name.
    pub snippets: HashMap<String, &'a SnippetBlock>,
}

/// Walk `root` once and collect the meta declaration, story tags and snippets.
pub fn extract_source_ast(root: &Root) -> Result<SourceAstBundle<'_>, CsfError> {
    let file = &root.source;
    let module = root
        .module
        .as_ref()
        .ok_or_else(|| file.error_at(ErrorKind::MissingModuleTag, 0))?;

    let define_meta_local = find_define_meta_import(root, module)?;
    let define_meta = find_meta_declaration(root, module, &define_meta_local)?;

    let story_local = match find_pattern_binding(define_meta.pattern, STORY_KEY) {
        PatternBinding::Ident(ident) => ident.sym.to_string(),
        PatternBinding::Missing | PatternBinding::Complex => {
            return Err(file.error_at(
                ErrorKind::NoStoryComponentDestructured {
                    define_meta: define_meta_local.clone(),
                },
                define_meta.span.start,
            ));
        }
    };
    let meta_local = match find_pattern_binding(define_meta.pattern, META_KEY) {
        PatternBinding::Ident(ident) => Some(ident.sym.to_string()),
        PatternBinding::Missing => None,
        PatternBinding::Complex => {
            return Err(file.error_at(
                ErrorKind::NoMetaIdentifier,
                define_meta.span.start,
            ));
        }
    };

    let mut walker = TemplateWalker {
        story_local: &story_local,
        pending_comment: None,
        stories: Vec::new(),
    };
    walker.walk(&root.fragment.nodes);

    let mut snippets = HashMap::new();
    for node in &root.fragment.nodes {
        if let TemplateNode::SnippetBlock(snippet) = node
            && snippets.insert(snippet.name.clone(), snippet).is_some()
        {
            return Err(file.error_at(
                ErrorKind::DuplicateSnippetBlock {
                    name: snippet.name.clone(),
                },
                snippet.span.start,
            ));
        }
    }

    let stories = walker.stories;
    log::debug!(
        "{}: found {} stories, {} top-level snippets",
        file.filename(),
        stories.len(),
        snippets.len()
    );

    Ok(SourceAstBundle {
        root,
        module,
        define_meta_local,
        define_meta,
        story_local,
        meta_local,
        stories,
        snippets,
    })
}

fn find_define_meta_import(root: &Root, module: &Script) -> Result<String, CsfError> {
    let file = &root.source;
    for item in &module.program.body {
        let ModuleItem::ModuleDecl(ModuleDecl::Import(import)) = item else {
            continue;
        };
        if import.type_only || import.src.value.to_string() != ADDON_PACKAGE {
            continue;
        }
        for specifier in &import.specifiers {
            match specifier {
                ImportSpecifier::Named(named) if !named.is_type_only => {
                    let imported = match &named.imported {
                        Some(ModuleExportName::Ident(ident)) => ident.sym.to_string(),
                        Some(ModuleExportName::Str(s)) => s.value.to_string(),
                        None => named.local.sym.to_string(),
                    };
                    if imported == DEFINE_META {
                        return Ok(named.local.sym.to_string());
                    }
                }
                ImportSpecifier::Named(_) => {}
                ImportSpecifier::Default(_) | ImportSpecifier::Namespace(_) => {
                    return Err(file.error_at(
                        ErrorKind::DefaultOrNamespaceImportUsed {
                            package: ADDON_PACKAGE.to_string(),
                        },
                        file.offset(specifier.span_lo()),
                    ));
                }
            }
        }
    }
    Err(file.error_at(
        ErrorKind::MissingDefineMetaImport,
        module.content.start,
    ))
}

fn find_meta_declaration<'a>(
    root: &'a Root,
    module: &'a Script,
    define_meta: &str,
) -> Result<MetaDeclaration<'a>, CsfError> {
    let file = &root.source;
    for item in &module.program.body {
        let decl = match item {
            ModuleItem::Stmt(Stmt::Decl(Decl::Var(decl))) => decl,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => match &export.decl {
                Decl::Var(decl) => decl,
                _ => continue,
            },
            _ => continue,
        };
        for declarator in &decl.decls {
            let Some(Expr::Call(call)) = declarator.init.as_deref() else {
                continue;
            };
            if !callee_ident(call).is_some_and(|ident| ident.sym == *define_meta) {
                continue;
            }

            let span = file.span(decl.span);
            let pattern = match &declarator.name {
                Pat::Object(pattern) => pattern,
                other => {
                    return Err(file.error_at(
                        ErrorKind::NoDestructuredDefineMetaCall {
                            found: describe_pat(other),
                        },
                        span.start,
                    ));
                }
            };
            let argument = single_object_argument(call).ok_or_else(|| {
                let found = match call.args.as_slice() {
                    [] => "no arguments".to_string(),
                    [arg] => describe_expr(&arg.expr),
                    args => format!("{} arguments", args.len()),
                };
                file.error_at(
                    ErrorKind::InvalidDefineMetaArgument {
                        define_meta: define_meta.to_string(),
                        found,
                    },
                    file.offset(call.span.lo),
                )
            })?;

            return Ok(MetaDeclaration {
                decl,
                pattern,
                call,
                argument,
                span,
                leading_comments: module.leading_comments_at(file.offset(item.span_lo())),
            });
        }
    }
    Err(file.error_at(
        ErrorKind::MissingDefineMetaVariableDeclaration {
            define_meta: define_meta.to_string(),
        },
        module.content.start,
    ))
}

/// Human-readable description of a binding pattern, used in errors.
pub fn describe_pat(pat: &Pat) -> String {
    match pat {
        Pat::Ident(ident) => format!("the identifier `{}`", ident.id.sym),
        Pat::Array(_) => "an array pattern".into(),
        Pat::Object(_) => "an object pattern".into(),
        _ => "an unsupported pattern".into(),
    }
}

struct TemplateWalker<'a, 's> {
    story_local: &'s str,
    pending_comment: Option<&'a Comment>,
    stories: Vec<StoryTag<'a>>,
}

impl<'a> TemplateWalker<'a, '_> {
    fn walk(&mut self, nodes: &'a [TemplateNode]) {
        for node in nodes {
            match node {
                TemplateNode::Comment(comment) => self.pending_comment = Some(comment),
                TemplateNode::Text(_) if node.is_whitespace() => {}
                TemplateNode::Element(element)
                    if element.kind == ElementKind::Component && element.name == self.story_local =>
                {
                    self.stories.push(StoryTag {
                        element,
                        comment: self.pending_comment.take(),
                    });
                }
                TemplateNode::Element(element) => {
                    self.pending_comment = None;
                    self.walk(&element.fragment.nodes);
                    self.pending_comment = None;
                }
                TemplateNode::Block(block) => {
                    self.pending_comment = None;
                    for branch in &block.branches {
                        self.walk(&branch.nodes);
                        self.pending_comment = None;
                    }
                }
                TemplateNode::SnippetBlock(_)
                | TemplateNode::Text(_)
                | TemplateNode::ExpressionTag(_)
                | TemplateNode::Tag(_) => self.pending_comment = None,
            }
        }
    }
}
