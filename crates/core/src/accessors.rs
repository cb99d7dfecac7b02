//! Fail-fast getters over source and compiled ASTs.
//!
//! Lookups only inspect the direct children they are given. Value readers accept
//! static literals and reject everything else with an error that names what was
//! found, so authors can tell a missing value from a dynamic one.

use std::collections::HashMap;

use swc_core::ecma::ast::{
    CallExpr, Callee, Expr, Ident, Lit, ObjectLit, ObjectPat, ObjectPatProp, Pat, Prop, PropName,
    PropOrSpread,
};

use crate::ast::{Attribute, AttributeValue, Element};
use crate::error::{CsfError, ErrorKind};
use crate::source::SourceFile;

/// Top-level properties of `object` whose static key is one of `names`.
///
/// Nested objects are not searched. The first property wins when a key repeats.
pub fn extract_named_properties<'a, 'n>(
    object: &'a ObjectLit,
    names: &[&'n str],
) -> HashMap<&'n str, &'a Prop> {
    let mut found = HashMap::new();
    for prop in &object.props {
        let PropOrSpread::Prop(prop) = prop else {
            continue;
        };
        let Some(key) = prop_key(prop) else {
            continue;
        };
        if let Some(name) = names.iter().find(|name| **name == key) {
            found.entry(*name).or_insert(&**prop);
        }
    }
    found
}

/// Regular attributes of `element` whose name is one of `names`.
pub fn extract_named_attributes<'a, 'n>(
    element: &'a Element,
    names: &[&'n str],
) -> HashMap<&'n str, &'a Attribute> {
    let mut found = HashMap::new();
    for name in names {
        if let Some(attr) = element.attribute(name) {
            found.insert(*name, attr);
        }
    }
    found
}

/// Static key of a property, if it has one.
pub fn prop_key(prop: &Prop) -> Option<String> {
    match prop {
        Prop::KeyValue(kv) => prop_name(&kv.key),
        Prop::Shorthand(ident) => Some(ident.sym.to_string()),
        Prop::Assign(assign) => Some(assign.key.sym.to_string()),
        Prop::Getter(getter) => prop_name(&getter.key),
        Prop::Setter(setter) => prop_name(&setter.key),
        Prop::Method(method) => prop_name(&method.key),
    }
}

/// Static name of a property key.
pub fn prop_name(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        PropName::Num(n) => Some(n.value.to_string()),
        PropName::Computed(_) | PropName::BigInt(_) => None,
    }
}

/// Value expression of a `key: value` property.
pub fn prop_value(prop: &Prop) -> Option<&Expr> {
    match prop {
        Prop::KeyValue(kv) => Some(&kv.value),
        _ => None,
    }
}

/// Human-readable description of an expression, used in errors.
pub fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(ident) => format!("the identifier `{}`", ident.sym),
        Expr::Lit(Lit::Str(_)) => "a string literal".into(),
        Expr::Lit(Lit::Num(_)) => "a number literal".into(),
        Expr::Lit(Lit::Bool(_)) => "a boolean literal".into(),
        Expr::Lit(Lit::Null(_)) => "`null`".into(),
        Expr::Lit(_) => "a literal".into(),
        Expr::Tpl(_) => "a template literal".into(),
        Expr::Array(_) => "an array with non-string elements".into(),
        Expr::Object(_) => "an object expression".into(),
        Expr::Call(_) => "a call expression".into(),
        Expr::Member(_) => "a member expression".into(),
        Expr::Arrow(_) | Expr::Fn(_) => "a function".into(),
        Expr::Paren(paren) => describe_expr(&paren.expr),
        _ => "a dynamic expression".into(),
    }
}

fn describe_prop(prop: &Prop) -> String {
    match prop {
        Prop::KeyValue(kv) => describe_expr(&kv.value),
        Prop::Shorthand(ident) => format!("the shorthand property `{}`", ident.sym),
        _ => "a method or accessor".into(),
    }
}

/// String value of a string literal.
pub fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        Expr::Paren(paren) => string_literal(&paren.expr),
        _ => None,
    }
}

/// Values of an array literal made only of string literals.
pub fn array_of_string_literals(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::Array(array) => array
            .elems
            .iter()
            .map(|elem| match elem {
                Some(elem) if elem.spread.is_none() => string_literal(&elem.expr),
                _ => None,
            })
            .collect(),
        Expr::Paren(paren) => array_of_string_literals(&paren.expr),
        _ => None,
    }
}

/// Read a meta property that must be a string literal.
pub fn read_string_property(
    file: &SourceFile,
    name: &str,
    prop: &Prop,
) -> Result<String, CsfError> {
    prop_value(prop).and_then(string_literal).ok_or_else(|| {
        file.error_at(
            ErrorKind::PropertyNotStringLiteral {
                property: name.to_string(),
                found: describe_prop(prop),
            },
            file.offset(swc_core::common::Spanned::span_lo(prop)),
        )
    })
}

/// Read a meta property that must be an array of string literals.
pub fn read_string_array_property(
    file: &SourceFile,
    name: &str,
    prop: &Prop,
) -> Result<Vec<String>, CsfError> {
    prop_value(prop)
        .and_then(array_of_string_literals)
        .ok_or_else(|| {
            file.error_at(
                ErrorKind::PropertyNotArrayOfStrings {
                    property: name.to_string(),
                    found: describe_prop(prop),
                },
                file.offset(swc_core::common::Spanned::span_lo(prop)),
            )
        })
}

fn describe_attribute_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::True => "a boolean attribute without a value".into(),
        AttributeValue::Text(_) => "plain text".into(),
        AttributeValue::Expression(expression) => describe_expr(&expression.expr),
        AttributeValue::Sequence(_) => "text with interpolated expressions".into(),
    }
}

/// Read a story attribute that must be a static string.
///
/// Accepts `name="x"` and `name={"x"}`.
pub fn read_string_attribute(file: &SourceFile, attr: &Attribute) -> Result<String, CsfError> {
    let value = match &attr.value {
        AttributeValue::Text(text) => Some(text.data.clone()),
        AttributeValue::Expression(expression) => string_literal(&expression.expr),
        _ => None,
    };
    value.ok_or_else(|| {
        file.error_at(
            ErrorKind::AttributeNotStringLiteral {
                attribute: attr.name.clone(),
                found: describe_attribute_value(&attr.value),
            },
            attr.span.start,
        )
    })
}

/// Read a story attribute that must be a static array of strings.
pub fn read_string_array_attribute(
    file: &SourceFile,
    attr: &Attribute,
) -> Result<Vec<String>, CsfError> {
    let value = match &attr.value {
        AttributeValue::Expression(expression) => array_of_string_literals(&expression.expr),
        _ => None,
    };
    value.ok_or_else(|| {
        file.error_at(
            ErrorKind::AttributeNotArrayOfStrings {
                attribute: attr.name.clone(),
                found: describe_attribute_value(&attr.value),
            },
            attr.span.start,
        )
    })
}

/// Sole object literal argument of a call.
pub fn single_object_argument(call: &CallExpr) -> Option<&ObjectLit> {
    match call.args.as_slice() {
        [arg] if arg.spread.is_none() => match &*arg.expr {
            Expr::Object(object) => Some(object),
            _ => None,
        },
        _ => None,
    }
}

/// Identifier a call is made on, for `name(...)` calls.
pub fn callee_ident(call: &CallExpr) -> Option<&Ident> {
    match &call.callee {
        Callee::Expr(expr) => match &**expr {
            Expr::Ident(ident) => Some(ident),
            _ => None,
        },
        _ => None,
    }
}

/// How a key of an object pattern is bound.
#[derive(Debug, Clone, Copy)]
pub enum PatternBinding<'a> {
    /// The key is not destructured.
    Missing,
    /// `{ key }`, `{ key = fallback }` or `{ key: local }`.
    Ident(&'a Ident),
    /// `{ key: { nested } }` or another non-identifier pattern.
    Complex,
}

/// Look up how `key` is bound in a destructuring pattern.
pub fn find_pattern_binding<'a>(pattern: &'a ObjectPat, key: &str) -> PatternBinding<'a> {
    for prop in &pattern.props {
        match prop {
            ObjectPatProp::Assign(assign) if assign.key.sym == *key => {
                return PatternBinding::Ident(&assign.key.id);
            }
            ObjectPatProp::KeyValue(kv) if prop_name(&kv.key).as_deref() == Some(key) => {
                return match &*kv.value {
                    Pat::Ident(binding) => PatternBinding::Ident(&binding.id),
                    Pat::Assign(assign) => match &*assign.left {
                        Pat::Ident(binding) => PatternBinding::Ident(&binding.id),
                        _ => PatternBinding::Complex,
                    },
                    _ => PatternBinding::Complex,
                };
            }
            _ => {}
        }
    }
    PatternBinding::Missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_component, parse_expression};
    use crate::source::Span;

    fn object(file: &SourceFile) -> Box<Expr> {
        parse_expression(file, Span::new(0, file.text().len())).unwrap()
    }

    #[test]
    fn extracts_only_top_level_properties() {
        let file = SourceFile::new(
            "x.js",
            "({ title: 'A', parameters: { title: 'nested' }, 'tags': ['x'] })",
        );
        let expr = object(&file);
        let Expr::Paren(paren) = &*expr else { panic!() };
        let Expr::Object(obj) = &*paren.expr else { panic!() };
        let props = extract_named_properties(obj, &["title", "tags", "id"]);
        assert_eq!(props.len(), 2);
        assert_eq!(
            read_string_property(&file, "title", props["title"]).unwrap(),
            "A"
        );
        assert_eq!(
            read_string_array_property(&file, "tags", props["tags"]).unwrap(),
            vec!["x".to_string()]
        );
    }

    #[test]
    fn rejects_dynamic_meta_values() {
        let file = SourceFile::new("x.js", "({ title: name, tags: [...rest] })");
        let expr = object(&file);
        let Expr::Paren(paren) = &*expr else { panic!() };
        let Expr::Object(obj) = &*paren.expr else { panic!() };
        let props = extract_named_properties(obj, &["title", "tags"]);
        let err = read_string_property(&file, "title", props["title"]).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::PropertyNotStringLiteral {
                property: "title".into(),
                found: "the identifier `name`".into()
            }
        );
        assert!(matches!(
            read_string_array_property(&file, "tags", props["tags"])
                .unwrap_err()
                .kind,
            ErrorKind::PropertyNotArrayOfStrings { .. }
        ));
    }

    #[test]
    fn reads_static_attributes_and_rejects_dynamic_ones() {
        let file = SourceFile::new(
            "x.svelte",
            "<Story name=\"A\" exportName={'B'} title={title} tags={['a', \"b\"]} other={[x]} />",
        );
        let root = parse_component(&file).unwrap();
        let crate::ast::TemplateNode::Element(story) = &root.fragment.nodes[0] else {
            panic!()
        };
        let attrs = extract_named_attributes(
            story,
            &["name", "exportName", "title", "tags", "other", "missing"],
        );
        assert_eq!(attrs.len(), 5);
        assert_eq!(read_string_attribute(&file, attrs["name"]).unwrap(), "A");
        assert_eq!(
            read_string_attribute(&file, attrs["exportName"]).unwrap(),
            "B"
        );
        let err = read_string_attribute(&file, attrs["title"]).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::AttributeNotStringLiteral { .. }
        ));
        assert_eq!(
            read_string_array_attribute(&file, attrs["tags"]).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(read_string_array_attribute(&file, attrs["other"]).is_err());
    }

    #[test]
    fn finds_pattern_bindings() {
        let file = SourceFile::new(
            "x.svelte",
            "<script module>const { Story, meta: m, other: { deep } } = f();</script>",
        );
        let root = parse_component(&file).unwrap();
        let module = root.module.unwrap();
        let swc_core::ecma::ast::ModuleItem::Stmt(stmt) = &module.program.body[0] else {
            panic!()
        };
        let var = stmt.as_decl().and_then(|d| d.as_var()).unwrap();
        let Pat::Object(pattern) = &var.decls[0].name else { panic!() };
        assert!(matches!(
            find_pattern_binding(pattern, "Story"),
            PatternBinding::Ident(i) if i.sym == *"Story"
        ));
        assert!(matches!(
            find_pattern_binding(pattern, "meta"),
            PatternBinding::Ident(i) if i.sym == *"m"
        ));
        assert!(matches!(
            find_pattern_binding(pattern, "other"),
            PatternBinding::Complex
        ));
        assert!(matches!(
            find_pattern_binding(pattern, "missing"),
            PatternBinding::Missing
        ));
    }
}
