//! Extraction of story-related nodes from the component compiler's output.
//!
//! The compiler lowers every `<Story>` tag into a call on the destructured
//! story component inside the function it synthesizes for the file. Generated
//! names differ across compiler versions, so that function is found through the
//! default export, and story calls are recognised by their callee only.

use svelte_csf_core::accessors::{
    PatternBinding, callee_ident, find_pattern_binding, single_object_argument,
};
use svelte_csf_core::extract::{ADDON_PACKAGE, DEFINE_META, META_KEY, STORY_KEY, describe_pat};
use svelte_csf_core::{CsfError, ErrorKind, SourceFile, Span};
use swc_core::common::{Spanned, comments::SingleThreadedComments};
use swc_core::ecma::ast::{
    CallExpr, Callee, Decl, DefaultDecl, EsVersion, ExportDecl, Expr, ExprStmt, Function,
    ImportSpecifier, MemberProp, Module, ModuleDecl, ModuleExportName, ModuleItem, ObjectLit,
    ObjectPat, Pat, Stmt, VarDecl,
};
use swc_core::ecma::parser::{EsSyntax, Parser, StringInput, Syntax, lexer::Lexer};
use swc_core::ecma::visit::{Visit, VisitWith};

/// Member name of the dev-mode component validation helper.
const VALIDATE_COMPONENT: &str = "validate_component";

/// Compiled module text together with its parsed program.
pub struct CompiledProgram {
    /// Compiled code registered under the stories file name.
    pub file: SourceFile,
    /// Parsed module.
    pub module: Module,
}

/// Parse compiler output as an ES module.
pub fn parse_compiled(filename: &str, code: &str) -> Result<CompiledProgram, CsfError> {
    let file = SourceFile::new(filename, code);
    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::latest(),
        StringInput::new(file.text(), file.pos(0), file.pos(file.text().len())),
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);
    let syntax_error = |err: swc_core::ecma::parser::error::Error| {
        file.error(ErrorKind::CompiledSyntax {
            message: err.kind().msg().to_string(),
        })
    };
    let module = parser.parse_module().map_err(syntax_error)?;
    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(syntax_error(err));
    }
    Ok(CompiledProgram { file, module })
}

/// Compiled story call, by lowering shape.
#[derive(Debug, Clone)]
pub enum CompiledStoryNode {
    /// `Story(anchor, props)`, possibly inside a dev metadata wrapper.
    Call(CallExpr),
    /// `$.validate_component(Story)(anchor, props);`
    ValidatedStatement(ExprStmt),
}

impl CompiledStoryNode {
    /// The call that renders the story.
    pub fn call(&self) -> Option<&CallExpr> {
        match self {
            CompiledStoryNode::Call(call) => Some(call),
            CompiledStoryNode::ValidatedStatement(stmt) => match &*stmt.expr {
                Expr::Call(call) => Some(call),
                _ => None,
            },
        }
    }

    /// Props object literal passed to the story component.
    ///
    /// Either the second argument, or the first object literal given to a call
    /// in second position such as `$.spread_props({...}, rest)`.
    pub fn props(&self) -> Option<&ObjectLit> {
        let arg = self.call()?.args.get(1)?;
        if arg.spread.is_some() {
            return None;
        }
        match &*arg.expr {
            Expr::Object(object) => Some(object),
            Expr::Call(inner) => inner.args.iter().find_map(|arg| match &*arg.expr {
                Expr::Object(object) if arg.spread.is_none() => Some(object),
                _ => None,
            }),
            _ => None,
        }
    }
}

/// How the compiled module exports its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportDefaultNode {
    /// `export default function Name(...) {...}`; `span` covers the statement.
    Function {
        /// Span of the export statement.
        span: Span,
    },
    /// `export default Name;` referencing a function declared elsewhere.
    Identifier {
        /// Span of the export statement.
        span: Span,
    },
}

/// The compiled `const { Story } = defineMeta({...})` declaration.
#[derive(Debug)]
pub struct CompiledMeta<'a> {
    /// Whole declaration.
    pub decl: &'a VarDecl,
    /// Destructuring pattern.
    pub pattern: &'a ObjectPat,
    /// Sole object literal argument of the call.
    pub argument: &'a ObjectLit,
}

/// Everything the post-transform reads from the compiled output.
#[derive(Debug)]
pub struct CompiledAstBundle<'a> {
    /// Meta declaration.
    pub define_meta: CompiledMeta<'a>,
    /// Local name of the story component.
    pub story_local: String,
    /// Local name of the `meta` binding, when destructured.
    pub meta_local: Option<String>,
    /// Name of the component function holding the story calls.
    pub stories_function: String,
    /// The default export to remove.
    pub export_default: ExportDefaultNode,
    /// Story calls in document order.
    pub stories: Vec<CompiledStoryNode>,
}

/// Walk the compiled program once and collect the nodes the post-transform needs.
pub fn extract_compiled_ast(program: &CompiledProgram) -> Result<CompiledAstBundle<'_>, CsfError> {
    let file = &program.file;
    let module = &program.module;
    let error = |kind| file.error(kind);

    let define_meta_local = compiled_define_meta_import(module)
        .ok_or_else(|| error(ErrorKind::MissingCompiledDefineMeta))?;
    let define_meta = compiled_meta_declaration(module, &define_meta_local)
        .ok_or(ErrorKind::MissingCompiledDefineMeta)
        .and_then(|found| found)
        .map_err(error)?;

    let story_local = match find_pattern_binding(define_meta.pattern, STORY_KEY) {
        PatternBinding::Ident(ident) => ident.sym.to_string(),
        _ => {
            return Err(error(ErrorKind::NoStoryComponentDestructured {
                define_meta: define_meta_local,
            }));
        }
    };
    let meta_local = match find_pattern_binding(define_meta.pattern, META_KEY) {
        PatternBinding::Ident(ident) => Some(ident.sym.to_string()),
        PatternBinding::Missing => None,
        PatternBinding::Complex => return Err(error(ErrorKind::NoMetaIdentifier)),
    };

    let (export_default, function_name, function) = find_export_default(file, module)?;

    let mut collector = StoryCallCollector {
        story_local: &story_local,
        stories: Vec::new(),
    };
    function.visit_with(&mut collector);
    let stories = collector.stories;

    log::debug!(
        "{}: found {} story calls in `{}`",
        file.filename(),
        stories.len(),
        function_name
    );

    Ok(CompiledAstBundle {
        define_meta,
        story_local,
        meta_local,
        stories_function: function_name,
        export_default,
        stories,
    })
}

fn compiled_define_meta_import(module: &Module) -> Option<String> {
    module.body.iter().find_map(|item| {
        let ModuleItem::ModuleDecl(ModuleDecl::Import(import)) = item else {
            return None;
        };
        if import.src.value.to_string() != ADDON_PACKAGE {
            return None;
        }
        import.specifiers.iter().find_map(|specifier| match specifier {
            ImportSpecifier::Named(named) => {
                let imported = match &named.imported {
                    Some(ModuleExportName::Ident(ident)) => ident.sym.to_string(),
                    Some(ModuleExportName::Str(s)) => s.value.to_string(),
                    None => named.local.sym.to_string(),
                };
                (imported == DEFINE_META).then(|| named.local.sym.to_string())
            }
            _ => None,
        })
    })
}

fn compiled_meta_declaration<'a>(
    module: &'a Module,
    define_meta: &str,
) -> Option<Result<CompiledMeta<'a>, ErrorKind>> {
    module.body.iter().find_map(|item| {
        let decl = match item {
            ModuleItem::Stmt(Stmt::Decl(Decl::Var(decl)))
            | ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                decl: Decl::Var(decl),
                ..
            })) => decl,
            _ => return None,
        };
        decl.decls.iter().find_map(|declarator| {
            let Some(Expr::Call(call)) = declarator.init.as_deref() else {
                return None;
            };
            if !callee_ident(call).is_some_and(|ident| ident.sym == *define_meta) {
                return None;
            }
            let meta = match (&declarator.name, single_object_argument(call)) {
                (Pat::Object(pattern), Some(argument)) => Ok(CompiledMeta {
                    decl,
                    pattern,
                    argument,
                }),
                (Pat::Object(_), None) => Err(ErrorKind::MissingCompiledDefineMeta),
                (other, _) => Err(ErrorKind::NoDestructuredDefineMetaCall {
                    found: describe_pat(other),
                }),
            };
            Some(meta)
        })
    })
}

fn find_export_default<'a>(
    file: &SourceFile,
    module: &'a Module,
) -> Result<(ExportDefaultNode, String, &'a Function), CsfError> {
    let defaults: Vec<&ModuleDecl> = module
        .body
        .iter()
        .filter_map(|item| match item {
            ModuleItem::ModuleDecl(
                decl @ (ModuleDecl::ExportDefaultDecl(_) | ModuleDecl::ExportDefaultExpr(_)),
            ) => Some(decl),
            _ => None,
        })
        .collect();

    let decl = match defaults.as_slice() {
        [] => return Err(file.error(ErrorKind::NoExportDefault)),
        [decl] => *decl,
        many => {
            return Err(file.error(ErrorKind::AmbiguousExportDefault {
                count: many.len(),
            }));
        }
    };
    let span = file.span(decl.span());

    match decl {
        ModuleDecl::ExportDefaultDecl(export) => match &export.decl {
            DefaultDecl::Fn(fn_expr) => {
                let name = fn_expr.ident.as_ref().ok_or_else(|| {
                    file.error(ErrorKind::UnsupportedExportDefault {
                        found: "an anonymous function".into(),
                    })
                })?;
                Ok((
                    ExportDefaultNode::Function { span },
                    name.sym.to_string(),
                    &fn_expr.function,
                ))
            }
            DefaultDecl::Class(_) => Err(file.error(ErrorKind::UnsupportedExportDefault {
                found: "a class".into(),
            })),
            DefaultDecl::TsInterfaceDecl(_) => Err(file.error(ErrorKind::UnsupportedExportDefault {
                found: "an interface".into(),
            })),
        },
        ModuleDecl::ExportDefaultExpr(export) => {
            let Expr::Ident(ident) = &*export.expr else {
                return Err(file.error(ErrorKind::UnsupportedExportDefault {
                    found: svelte_csf_core::accessors::describe_expr(&export.expr),
                }));
            };
            let function = module
                .body
                .iter()
                .find_map(|item| match item {
                    ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl)))
                        if fn_decl.ident.sym == ident.sym =>
                    {
                        Some(&*fn_decl.function)
                    }
                    _ => None,
                })
                .ok_or_else(|| {
                    file.error(ErrorKind::NoStoriesFunctionDeclaration {
                        name: ident.sym.to_string(),
                    })
                })?;
            Ok((
                ExportDefaultNode::Identifier { span },
                ident.sym.to_string(),
                function,
            ))
        }
        _ => Err(file.error(ErrorKind::NoExportDefault)),
    }
}

/// Whether `callee` is `<helpers>.validate_component(<story>)`.
fn is_validated_story(callee: &Callee, story: &str) -> bool {
    let Callee::Expr(expr) = callee else {
        return false;
    };
    let Expr::Call(inner) = &**expr else {
        return false;
    };
    let Callee::Expr(inner_callee) = &inner.callee else {
        return false;
    };
    let is_validate = match &**inner_callee {
        Expr::Member(member) => {
            matches!(&member.prop, MemberProp::Ident(prop) if prop.sym == *VALIDATE_COMPONENT)
        }
        Expr::Ident(ident) => ident.sym == *VALIDATE_COMPONENT,
        _ => false,
    };
    is_validate
        && matches!(
            inner.args.as_slice(),
            [arg] if matches!(&*arg.expr, Expr::Ident(ident) if ident.sym == *story)
        )
}

fn is_story_call(call: &CallExpr, story: &str) -> bool {
    callee_ident(call).is_some_and(|ident| ident.sym == *story)
        || is_validated_story(&call.callee, story)
}

struct StoryCallCollector<'s> {
    story_local: &'s str,
    stories: Vec<CompiledStoryNode>,
}

impl Visit for StoryCallCollector<'_> {
    fn visit_expr_stmt(&mut self, stmt: &ExprStmt) {
        if let Expr::Call(call) = &*stmt.expr
            && is_validated_story(&call.callee, self.story_local)
        {
            log::trace!("validated story call statement");
            self.stories
                .push(CompiledStoryNode::ValidatedStatement(stmt.clone()));
            return;
        }
        stmt.visit_children_with(self);
    }

    // Story children are not searched: a story call's arguments never hold
    // another story of the same file.
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if is_story_call(call, self.story_local) {
            log::trace!("story call");
            self.stories.push(CompiledStoryNode::Call(call.clone()));
            return;
        }
        call.visit_children_with(self);
    }
}
