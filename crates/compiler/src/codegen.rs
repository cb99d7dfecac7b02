//! JavaScript node construction and printing.
//!
//! Synthesized nodes use `DUMMY_SP`; nodes cloned from a parsed program keep
//! their spans, so printing goes through the source map that parsed them.

use svelte_csf_core::ErrorKind;
use swc_core::common::{DUMMY_SP, SourceMap, SyntaxContext, sync::Lrc};
use swc_core::ecma::ast::{
    ArrayLit, CallExpr, Callee, ComputedPropName, Decl, ExportDecl, ExportDefaultExpr,
    ExportNamedSpecifier, Expr, ExprOrSpread, ExprStmt, Ident, IdentName, ImportDecl,
    ImportNamedSpecifier, ImportPhase, ImportSpecifier, KeyValueProp, Lit, MemberExpr, MemberProp,
    Module, ModuleDecl, ModuleExportName, ModuleItem, NamedExport, ObjectLit, ParenExpr, Pat, Prop,
    PropName, PropOrSpread, SpreadElement, Stmt, Str, VarDecl, VarDeclKind, VarDeclarator,
};
use swc_core::ecma::codegen::{Config, Emitter, text_writer::JsWriter};

/// Converts a Rust string to a JavaScript string literal.
///
/// Uses JSON serialization to properly escape special characters.
///
/// # Examples
///
/// ```
/// use svelte_csf_compiler::codegen::js_string_literal;
///
/// assert_eq!(js_string_literal("hello"), "\"hello\"");
/// assert_eq!(js_string_literal("say \"hi\""), "\"say \\\"hi\\\"\"");
/// ```
pub fn js_string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Identifier node.
pub fn ident(sym: &str) -> Ident {
    Ident::new(sym.into(), DUMMY_SP, SyntaxContext::empty())
}

/// Identifier expression.
pub fn ident_expr(sym: &str) -> Expr {
    Expr::Ident(ident(sym))
}

/// String literal node, printed double-quoted.
pub fn str_lit(value: &str) -> Str {
    Str {
        span: DUMMY_SP,
        value: value.into(),
        raw: Some(js_string_literal(value).into()),
    }
}

/// String literal expression.
pub fn str_expr(value: &str) -> Expr {
    Expr::Lit(Lit::Str(str_lit(value)))
}

/// Array of string literals.
pub fn str_array(values: &[String]) -> Expr {
    Expr::Array(ArrayLit {
        span: DUMMY_SP,
        elems: values
            .iter()
            .map(|value| {
                Some(ExprOrSpread {
                    spread: None,
                    expr: Box::new(str_expr(value)),
                })
            })
            .collect(),
    })
}

/// Empty object literal.
pub fn empty_object() -> ObjectLit {
    ObjectLit {
        span: DUMMY_SP,
        props: Vec::new(),
    }
}

/// `{ ...value }`
pub fn spread_object(value: Expr) -> ObjectLit {
    ObjectLit {
        span: DUMMY_SP,
        props: vec![PropOrSpread::Spread(SpreadElement {
            dot3_token: DUMMY_SP,
            expr: Box::new(value),
        })],
    }
}

/// `key: value` property.
pub fn key_value(key: &str, value: Expr) -> PropOrSpread {
    PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
        key: PropName::Ident(IdentName::new(key.into(), DUMMY_SP)),
        value: Box::new(value),
    })))
}

/// `callee(args...)`
pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        callee: Callee::Expr(Box::new(callee)),
        args: args
            .into_iter()
            .map(|expr| ExprOrSpread {
                spread: None,
                expr: Box::new(expr),
            })
            .collect(),
        type_args: None,
    })
}

/// `object["key"]`
pub fn computed_member(object: Expr, key: &str) -> Expr {
    Expr::Member(MemberExpr {
        span: DUMMY_SP,
        obj: Box::new(object),
        prop: MemberProp::Computed(ComputedPropName {
            span: DUMMY_SP,
            expr: Box::new(str_expr(key)),
        }),
    })
}

/// `const name = init;` as a declaration.
pub fn const_decl(name: &str, init: Expr) -> VarDecl {
    VarDecl {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        kind: VarDeclKind::Const,
        declare: false,
        decls: vec![VarDeclarator {
            span: DUMMY_SP,
            name: Pat::Ident(ident(name).into()),
            init: Some(Box::new(init)),
            definite: false,
        }],
    }
}

/// `const name = init;`
pub fn const_stmt(name: &str, init: Expr) -> ModuleItem {
    ModuleItem::Stmt(Stmt::Decl(Decl::Var(Box::new(const_decl(name, init)))))
}

/// `export const name = init;`
pub fn export_const(name: &str, init: Expr) -> ModuleItem {
    ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
        span: DUMMY_SP,
        decl: Decl::Var(Box::new(const_decl(name, init))),
    }))
}

/// `export default expr;`
pub fn export_default(expr: Expr) -> ModuleItem {
    ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(ExportDefaultExpr {
        span: DUMMY_SP,
        expr: Box::new(expr),
    }))
}

/// `export { local as exported };`
pub fn export_alias(local: &str, exported: &str) -> ModuleItem {
    ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(NamedExport {
        span: DUMMY_SP,
        specifiers: vec![swc_core::ecma::ast::ExportSpecifier::Named(ExportNamedSpecifier {
            span: DUMMY_SP,
            orig: ModuleExportName::Ident(ident(local)),
            exported: Some(ModuleExportName::Ident(ident(exported))),
            is_type_only: false,
        })],
        src: None,
        type_only: false,
        with: None,
    }))
}

/// `import { name } from "source";`
pub fn import_named(name: &str, source: &str) -> ModuleItem {
    ModuleItem::ModuleDecl(ModuleDecl::Import(ImportDecl {
        span: DUMMY_SP,
        specifiers: vec![ImportSpecifier::Named(ImportNamedSpecifier {
            span: DUMMY_SP,
            local: ident(name),
            imported: None,
            is_type_only: false,
        })],
        src: Box::new(str_lit(source)),
        type_only: false,
        with: None,
        phase: ImportPhase::Evaluation,
    }))
}

/// Prints module items with the emitter.
pub struct Printer {
    cm: Lrc<SourceMap>,
}

impl Printer {
    /// Printer resolving spans through `cm`.
    pub fn new(cm: Lrc<SourceMap>) -> Self {
        Self { cm }
    }

    /// Print a sequence of module items.
    pub fn items(&self, body: Vec<ModuleItem>) -> Result<String, ErrorKind> {
        let module = Module {
            span: DUMMY_SP,
            body,
            shebang: None,
        };
        let mut buf = Vec::new();
        {
            let mut emitter = Emitter {
                cfg: Config::default(),
                cm: self.cm.clone(),
                comments: None,
                wr: JsWriter::new(self.cm.clone(), "\n", &mut buf, None),
            };
            emitter.emit_module(&module).map_err(|err| ErrorKind::Codegen {
                message: err.to_string(),
            })?;
        }
        String::from_utf8(buf).map_err(|err| ErrorKind::Codegen {
            message: err.to_string(),
        })
    }

    /// Print a variable declaration, without the trailing newline.
    pub fn var_decl(&self, decl: &VarDecl) -> Result<String, ErrorKind> {
        let text = self.items(vec![ModuleItem::Stmt(Stmt::Decl(Decl::Var(Box::new(
            decl.clone(),
        ))))])?;
        Ok(text.trim_end().to_string())
    }

    /// Print a single expression.
    pub fn expr(&self, expr: &Expr) -> Result<String, ErrorKind> {
        let stmt = ModuleItem::Stmt(Stmt::Expr(ExprStmt {
            span: DUMMY_SP,
            expr: Box::new(Expr::Paren(ParenExpr {
                span: DUMMY_SP,
                expr: Box::new(expr.clone()),
            })),
        }));
        let text = self.items(vec![stmt])?;
        let trimmed = text.trim_end();
        trimmed
            .strip_suffix(';')
            .unwrap_or(trimmed)
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .map(str::to_string)
            .ok_or_else(|| ErrorKind::Codegen {
                message: format!("unexpected expression output `{trimmed}`"),
            })
    }
}
