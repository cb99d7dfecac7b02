//! Edits on object literals and destructuring patterns.
//!
//! Nodes are cloned, mutated and printed back over their own span. Only the
//! smallest enclosing value is reprinted so the surrounding compiled code keeps
//! its offsets and formatting.

use svelte_csf_core::accessors::{PatternBinding, find_pattern_binding, prop_key, prop_name};
use svelte_csf_core::extract::META_KEY;
use svelte_csf_core::{ErrorKind, SourceFile, Span};
use swc_core::common::{DUMMY_SP, Spanned};
use swc_core::ecma::ast::{
    AssignPatProp, Expr, ObjectLit, ObjectPat, ObjectPatProp, Prop, PropOrSpread, VarDecl,
};

use crate::codegen::{Printer, empty_object, ident, key_value, spread_object, str_expr};
use crate::edit::CodeEditor;

/// Property holding story and meta parameters.
pub const PARAMETERS_KEY: &str = "parameters";
/// Addon-internal key inside `parameters`.
pub const INTERNAL_KEY: &str = "__svelteCsf";

/// Make sure `pattern` binds the `meta` property.
///
/// Returns the local name of the binding and whether a shorthand `meta` was
/// added. The new binding goes before a rest element, which must stay last.
pub fn ensure_meta_binding(pattern: &mut ObjectPat) -> Result<(String, bool), ErrorKind> {
    match find_pattern_binding(pattern, META_KEY) {
        PatternBinding::Ident(ident) => return Ok((ident.sym.to_string(), false)),
        PatternBinding::Complex => return Err(ErrorKind::NoMetaIdentifier),
        PatternBinding::Missing => {}
    }
    let at = pattern
        .props
        .iter()
        .position(|prop| matches!(prop, ObjectPatProp::Rest(_)))
        .unwrap_or(pattern.props.len());
    pattern.props.insert(
        at,
        ObjectPatProp::Assign(AssignPatProp {
            span: DUMMY_SP,
            key: ident(META_KEY).into(),
            value: None,
        }),
    );
    Ok((META_KEY.to_string(), true))
}

fn has_key(object: &ObjectLit, key: &str) -> bool {
    object.props.iter().any(|prop| match prop {
        PropOrSpread::Prop(prop) => prop_key(prop).as_deref() == Some(key),
        PropOrSpread::Spread(_) => false,
    })
}

/// Object literal stored under `key`, created empty when the key is absent.
///
/// `None` when the key holds anything other than an object literal.
fn object_entry<'a>(object: &'a mut ObjectLit, key: &str) -> Option<&'a mut ObjectLit> {
    let index = match object.props.iter().rposition(|prop| match prop {
        PropOrSpread::Prop(prop) => prop_key(prop).as_deref() == Some(key),
        PropOrSpread::Spread(_) => false,
    }) {
        Some(index) => index,
        None => {
            let entry = key_value(key, Expr::Object(empty_object()));
            object.props.push(entry);
            object.props.len() - 1
        }
    };
    match &mut object.props[index] {
        PropOrSpread::Prop(prop) => match &mut **prop {
            Prop::KeyValue(kv) => match &mut *kv.value {
                Expr::Object(inner) => Some(inner),
                _ => None,
            },
            _ => None,
        },
        PropOrSpread::Spread(_) => None,
    }
}

/// Entries merged into a `parameters` object.
#[derive(Debug, Clone, Default)]
pub struct ParametersPatch {
    /// Value stored under `parameters.__svelteCsf`, replacing any previous one.
    pub internal: Option<Expr>,
    /// Key and text stored under `parameters.docs.description`, unless the
    /// author already set that key.
    pub description: Option<(&'static str, String)>,
}

impl ParametersPatch {
    /// Whether applying the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.internal.is_none() && self.description.is_none()
    }

    /// Merge the patch into a `parameters` object literal.
    pub fn apply(&self, parameters: &mut ObjectLit) {
        if let Some(internal) = &self.internal {
            let existing = parameters.props.iter_mut().rev().find_map(|prop| match prop {
                PropOrSpread::Prop(prop) => match &mut **prop {
                    Prop::KeyValue(kv) if prop_name(&kv.key).as_deref() == Some(INTERNAL_KEY) => {
                        Some(kv)
                    }
                    _ => None,
                },
                PropOrSpread::Spread(_) => None,
            });
            match existing {
                Some(kv) => kv.value = Box::new(internal.clone()),
                None => parameters
                    .props
                    .push(key_value(INTERNAL_KEY, internal.clone())),
            }
        }

        if let Some((key, text)) = &self.description {
            let Some(description) =
                object_entry(parameters, "docs").and_then(|docs| object_entry(docs, "description"))
            else {
                log::warn!(
                    "`parameters.docs` is not an object literal; the description comment is not added"
                );
                return;
            };
            if has_key(description, key) {
                log::warn!(
                    "`parameters.docs.description.{key}` is set explicitly and takes precedence over the comment"
                );
            } else {
                description.props.push(key_value(key, str_expr(text)));
            }
        }
    }

    /// Merge the patch into the `parameters` property of `object`, creating
    /// the property when absent.
    pub fn merge_into(&self, object: &mut ObjectLit) {
        if self.is_empty() {
            return;
        }
        let Some(index) = object.props.iter().rposition(|prop| match prop {
            PropOrSpread::Prop(prop) => prop_key(prop).as_deref() == Some(PARAMETERS_KEY),
            PropOrSpread::Spread(_) => false,
        }) else {
            let mut parameters = empty_object();
            self.apply(&mut parameters);
            object
                .props
                .push(key_value(PARAMETERS_KEY, Expr::Object(parameters)));
            return;
        };

        let replacement = match &mut object.props[index] {
            PropOrSpread::Prop(prop) => match &mut **prop {
                Prop::KeyValue(kv) => match &mut *kv.value {
                    Expr::Object(inner) => {
                        self.apply(inner);
                        None
                    }
                    other => {
                        let mut parameters = spread_object(other.clone());
                        self.apply(&mut parameters);
                        *other = Expr::Object(parameters);
                        None
                    }
                },
                Prop::Shorthand(shorthand) => {
                    let mut parameters = spread_object(Expr::Ident(shorthand.clone()));
                    self.apply(&mut parameters);
                    Some(key_value(PARAMETERS_KEY, Expr::Object(parameters)))
                }
                _ => {
                    log::warn!(
                        "`{PARAMETERS_KEY}` is declared as a method or accessor and is left untouched"
                    );
                    None
                }
            },
            PropOrSpread::Spread(_) => None,
        };
        if let Some(replacement) = replacement {
            object.props[index] = replacement;
        }
    }
}

/// Overwrite `span` with `decl` printed anew.
///
/// A trailing semicolon is only kept when the replaced text had one.
pub fn overwrite_var_decl(
    editor: &mut CodeEditor<'_>,
    file: &SourceFile,
    printer: &Printer,
    span: Span,
    decl: &VarDecl,
) -> Result<(), ErrorKind> {
    let mut text = printer.var_decl(decl)?;
    if !file.slice(span).trim_end().ends_with(';') && text.ends_with(';') {
        text.pop();
    }
    editor.overwrite(span.start, span.end, text)
}

/// Queue the edits that merge `patch` into the `parameters` property of `object`.
pub fn patch_parameters(
    editor: &mut CodeEditor<'_>,
    file: &SourceFile,
    printer: &Printer,
    object: &ObjectLit,
    patch: &ParametersPatch,
) -> Result<(), ErrorKind> {
    if patch.is_empty() {
        return Ok(());
    }
    let existing = object.props.iter().rev().find_map(|prop| match prop {
        PropOrSpread::Prop(prop) if prop_key(prop).as_deref() == Some(PARAMETERS_KEY) => {
            Some(&**prop)
        }
        _ => None,
    });

    match existing {
        None => {
            let mut parameters = empty_object();
            patch.apply(&mut parameters);
            let text = format!(
                "{PARAMETERS_KEY}: {}",
                printer.expr(&Expr::Object(parameters))?
            );
            insert_property(editor, file, object, &text)
        }
        Some(Prop::KeyValue(kv)) => {
            let mut parameters = match &*kv.value {
                Expr::Object(inner) => inner.clone(),
                other => spread_object(other.clone()),
            };
            patch.apply(&mut parameters);
            let span = file.span(kv.value.span());
            editor.overwrite(
                span.start,
                span.end,
                printer.expr(&Expr::Object(parameters))?,
            )
        }
        Some(Prop::Shorthand(shorthand)) => {
            let mut parameters = spread_object(Expr::Ident(shorthand.clone()));
            patch.apply(&mut parameters);
            let span = file.span(shorthand.span);
            editor.overwrite(
                span.start,
                span.end,
                format!(
                    "{PARAMETERS_KEY}: {}",
                    printer.expr(&Expr::Object(parameters))?
                ),
            )
        }
        Some(_) => {
            log::warn!(
                "`{PARAMETERS_KEY}` is declared as a method or accessor and is left untouched"
            );
            Ok(())
        }
    }
}

/// Insert `text` as the last property of `object`.
pub fn insert_property(
    editor: &mut CodeEditor<'_>,
    file: &SourceFile,
    object: &ObjectLit,
    text: &str,
) -> Result<(), ErrorKind> {
    let span = file.span(object.span);
    let close = span.end.saturating_sub(1);
    match object.props.last() {
        None => editor.insert(close, format!(" {text} ")),
        Some(last) => {
            let last_end = file.offset(last.span_hi());
            if has_trailing_comma(file.slice(Span::new(last_end, close))) {
                editor.insert(close, format!(" {text} "))
            } else {
                editor.insert(last_end, format!(", {text}"))
            }
        }
    }
}

/// Whether the text between an object's last property and its closing brace
/// holds a comma outside of comments.
fn has_trailing_comma(gap: &str) -> bool {
    let mut rest = gap;
    while let Some(ch) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("//") {
            rest = after.split_once('\n').map_or("", |(_, next)| next);
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, next)| next);
        } else if ch == ',' {
            return true;
        } else {
            rest = &rest[ch.len_utf8()..];
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::ecma::ast::{Decl, EsVersion, Module, ModuleItem, Pat, Stmt};
    use swc_core::ecma::parser::{EsSyntax, Parser, StringInput, Syntax, lexer::Lexer};

    fn parse(file: &SourceFile) -> Module {
        let lexer = Lexer::new(
            Syntax::Es(EsSyntax::default()),
            EsVersion::latest(),
            StringInput::new(file.text(), file.pos(0), file.pos(file.text().len())),
            None,
        );
        Parser::new_from(lexer).parse_module().unwrap()
    }

    fn first_init(module: &Module) -> (&Pat, &Expr) {
        let ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) = &module.body[0] else {
            panic!("expected a variable declaration")
        };
        (&var.decls[0].name, var.decls[0].init.as_deref().unwrap())
    }

    fn patched(source: &str, patch: &ParametersPatch) -> String {
        let file = SourceFile::new("out.js", source);
        let module = parse(&file);
        let (_, Expr::Object(object)) = first_init(&module) else {
            panic!("expected an object")
        };
        let printer = Printer::new(file.source_map());
        let mut editor = CodeEditor::new(file.text());
        patch_parameters(&mut editor, &file, &printer, object, patch).unwrap();
        editor.finish()
    }

    fn internal(raw: &str) -> ParametersPatch {
        let mut value = empty_object();
        value.props.push(key_value("rawCode", str_expr(raw)));
        ParametersPatch {
            internal: Some(Expr::Object(value)),
            description: None,
        }
    }

    #[test]
    fn meta_binding_is_added_once() {
        let file = SourceFile::new("out.js", "const { Story, ...rest } = defineMeta({});");
        let module = parse(&file);
        let (Pat::Object(pattern), _) = first_init(&module) else {
            panic!("expected a pattern")
        };
        let mut pattern = pattern.clone();
        assert_eq!(
            ensure_meta_binding(&mut pattern).unwrap(),
            ("meta".to_string(), true)
        );
        let once = pattern.clone();
        assert_eq!(
            ensure_meta_binding(&mut pattern).unwrap(),
            ("meta".to_string(), false)
        );
        assert_eq!(once, pattern);
        assert!(matches!(pattern.props.last(), Some(ObjectPatProp::Rest(_))));
    }

    #[test]
    fn renamed_meta_binding_is_kept() {
        let file = SourceFile::new("out.js", "const { Story, meta: m } = defineMeta({});");
        let module = parse(&file);
        let (Pat::Object(pattern), _) = first_init(&module) else {
            panic!("expected a pattern")
        };
        let mut pattern = pattern.clone();
        assert_eq!(
            ensure_meta_binding(&mut pattern).unwrap(),
            ("m".to_string(), false)
        );
    }

    #[test]
    fn inserts_parameters_into_objects() {
        let out = patched("const a = { name: \"A\" };", &internal("<b/>"));
        assert!(
            out.starts_with("const a = { name: \"A\", parameters: {"),
            "out: {}",
            out
        );
        assert!(out.contains("__svelteCsf"), "out: {}", out);

        let out = patched("const a = { name: \"A\", };", &internal("x"));
        assert!(out.contains("\"A\",  parameters: {"), "out: {}", out);

        let out = patched("const a = {};", &internal("x"));
        assert!(out.starts_with("const a = { parameters: {"), "out: {}", out);
    }

    #[test]
    fn commas_inside_comments_are_not_separators() {
        let out = patched("const a = { name: \"A\" /* a, b */ };", &internal("x"));
        assert!(
            out.starts_with("const a = { name: \"A\", parameters: {"),
            "out: {}",
            out
        );
        assert!(out.ends_with("/* a, b */ };"), "out: {}", out);

        let out = patched("const a = { name: \"A\" // a, b\n};", &internal("x"));
        assert!(
            out.starts_with("const a = { name: \"A\", parameters: {"),
            "out: {}",
            out
        );

        let out = patched("const a = { name: \"A\", // a, b\n};", &internal("x"));
        assert!(
            out.starts_with("const a = { name: \"A\", // a, b\n parameters: {"),
            "out: {}",
            out
        );
    }

    #[test]
    fn trailing_comma_detection() {
        assert!(has_trailing_comma(" , "));
        assert!(has_trailing_comma(" /* note */ ,\n"));
        assert!(!has_trailing_comma(" /* , */ "));
        assert!(!has_trailing_comma(" // ,\n "));
        assert!(!has_trailing_comma(" /* unterminated , "));
        assert!(!has_trailing_comma(""));
    }

    #[test]
    fn merges_into_existing_parameters() {
        let out = patched(
            "const a = { parameters: { layout: \"centered\" }, name: \"A\" };",
            &internal("x"),
        );
        assert!(out.contains("layout: \"centered\""), "out: {}", out);
        assert!(out.contains("__svelteCsf"), "out: {}", out);
        assert!(out.ends_with("name: \"A\" };"), "out: {}", out);

        let out = patched("const a = { parameters: shared };", &internal("x"));
        assert!(out.contains("...shared"), "out: {}", out);

        let out = patched("const a = { parameters };", &internal("x"));
        assert!(out.contains("parameters: {"), "out: {}", out);
        assert!(out.contains("...parameters"), "out: {}", out);
    }

    #[test]
    fn explicit_descriptions_win() {
        let patch = ParametersPatch {
            internal: None,
            description: Some(("story", "From comment".into())),
        };
        let mut parameters = empty_object();
        patch.apply(&mut parameters);
        let printer = Printer::new(SourceFile::new("x.js", "").source_map());
        let text = printer.expr(&Expr::Object(parameters.clone())).unwrap();
        assert!(text.contains("From comment"), "text: {}", text);

        let file = SourceFile::new(
            "out.js",
            "const a = { docs: { description: { story: \"Explicit\" } } };",
        );
        let module = parse(&file);
        let (_, Expr::Object(object)) = first_init(&module) else {
            panic!("expected an object")
        };
        let mut parameters = object.clone();
        patch.apply(&mut parameters);
        let text = Printer::new(file.source_map())
            .expr(&Expr::Object(parameters))
            .unwrap();
        assert!(text.contains("Explicit"), "text: {}", text);
        assert!(!text.contains("From comment"), "text: {}", text);
    }

    #[test]
    fn merges_into_meta_arguments_in_place() {
        let patch = ParametersPatch {
            internal: None,
            description: Some(("component", "Buttons".into())),
        };
        let file = SourceFile::new("out.js", "const a = { title: \"A\", parameters: layout };");
        let module = parse(&file);
        let (_, Expr::Object(object)) = first_init(&module) else {
            panic!("expected an object")
        };
        let mut object = object.clone();
        patch.merge_into(&mut object);
        let text = Printer::new(file.source_map())
            .expr(&Expr::Object(object))
            .unwrap();
        assert!(text.contains("...layout"), "text: {}", text);
        assert!(text.contains("component: \"Buttons\""), "text: {}", text);

        let mut object = empty_object();
        patch.merge_into(&mut object);
        assert_eq!(object.props.len(), 1);
    }

    #[test]
    fn internal_entry_is_replaced_not_duplicated() {
        let mut parameters = empty_object();
        internal("one").apply(&mut parameters);
        internal("two").apply(&mut parameters);
        assert_eq!(parameters.props.len(), 1);
    }
}
