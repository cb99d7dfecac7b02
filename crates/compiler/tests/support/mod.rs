//! Test double for the component compiler and helpers reading transformed
//! modules back.

#![allow(dead_code)]

use std::cell::RefCell;

use svelte_csf_compiler::compiled::parse_compiled;
use svelte_csf_compiler::{CompileOptions, CompiledComponent, CompilerError, ComponentCompiler};
use svelte_csf_core::accessors::{prop_name, string_literal};
use svelte_csf_core::{SourceFile, analyse_stories, extract_source_ast, parse_component};
use swc_core::ecma::ast::{
    Decl, ExportDecl, ExportSpecifier, Expr, KeyValueProp, ModuleExportName, NamedExport, Pat,
};
use swc_core::ecma::visit::{Visit, VisitWith};

/// Lowering of story components the fake compiler imitates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `Story(node, {...})` in an exported function.
    Production,
    /// `$.validate_component(Story)(node, {...});`
    Validated,
    /// Calls wrapped in `$.add_svelte_meta(() => ..., ...)`.
    SvelteMeta,
    /// `$.spread_props({...}, rest)` props and a hot-reload wrapper exported by name.
    SpreadHmr,
}

/// Emits a compiled module for a stories file the way the component compiler
/// lays one out: module script first, then the component function.
pub struct FakeSvelteCompiler {
    pub shape: Shape,
    /// Story calls left out of the output, counted from the end.
    pub drop_stories: usize,
    pub received: RefCell<Option<String>>,
}

impl FakeSvelteCompiler {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            drop_stories: 0,
            received: RefCell::new(None),
        }
    }
}

fn component_name(filename: &str) -> String {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    base.trim_end_matches(".svelte").replace(['.', '-'], "_")
}

impl ComponentCompiler for FakeSvelteCompiler {
    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledComponent, CompilerError> {
        self.received.replace(Some(source.to_string()));
        let file = SourceFile::new(options.filename.as_str(), source);
        let root = parse_component(&file).map_err(|err| err.to_string())?;
        let bundle = extract_source_ast(&root).map_err(|err| err.to_string())?;
        let stories = analyse_stories(&bundle).map_err(|err| err.to_string())?;
        let story = &bundle.story_local;
        let name = component_name(&options.filename);

        let mut code = String::from("import * as $ from \"svelte/internal/client\";\n");
        code.push_str(file.slice(bundle.module.content).trim());
        code.push('\n');
        code.push_str("var root = $.template(`<!>`, 1);\n");
        if self.shape == Shape::SpreadHmr {
            code.push_str(&format!("function {name}($$anchor, $$props) {{\n"));
        } else {
            code.push_str(&format!("export default function {name}($$anchor) {{\n"));
        }
        code.push_str("\tvar fragment = root();\n");

        let kept = stories.len().saturating_sub(self.drop_stories);
        for (index, analysed) in stories.iter().take(kept).enumerate() {
            let node = format!("node_{index}");
            let props = format!(
                "{{ name: {}, $$slots: {{ default: true }} }}",
                serde_json::to_string(&analysed.attributes.ids.name)?
            );
            code.push_str(&format!("\tvar {node} = $.first_child(fragment);\n"));
            let call = match self.shape {
                Shape::Production => format!("\t{story}({node}, {props});\n"),
                Shape::Validated => format!("\t$.validate_component({story})({node}, {props});\n"),
                Shape::SvelteMeta => format!(
                    "\t$.add_svelte_meta(() => {story}({node}, {props}), \"component\", {name}, {}, 0);\n",
                    index + 10
                ),
                Shape::SpreadHmr => {
                    format!("\t{story}({node}, $.spread_props({props}, $$props));\n")
                }
            };
            code.push_str(&call);
        }
        code.push_str("\t$.append($$anchor, fragment);\n}\n");
        if self.shape == Shape::SpreadHmr {
            code.push_str(&format!(
                "if (import.meta.hot) {{\n\t{name} = $.hmr({name});\n}}\nexport default {name};\n"
            ));
        }
        Ok(CompiledComponent { code })
    }
}

#[derive(Default)]
struct Collector {
    raw_codes: Vec<String>,
    order: Vec<String>,
    exports: Vec<String>,
}

impl Visit for Collector {
    fn visit_key_value_prop(&mut self, kv: &KeyValueProp) {
        if prop_name(&kv.key).as_deref() == Some("rawCode")
            && let Some(value) = string_literal(&kv.value)
        {
            self.raw_codes.push(value);
        }
        kv.visit_children_with(self);
    }

    fn visit_export_decl(&mut self, export: &ExportDecl) {
        if let Decl::Var(var) = &export.decl {
            for declarator in &var.decls {
                if let Pat::Ident(binding) = &declarator.name
                    && binding.id.sym == *"__namedExportsOrder"
                    && let Some(Expr::Array(array)) = declarator.init.as_deref()
                {
                    self.order = array
                        .elems
                        .iter()
                        .flatten()
                        .filter_map(|elem| string_literal(&elem.expr))
                        .collect();
                }
            }
        }
        export.visit_children_with(self);
    }

    fn visit_named_export(&mut self, export: &NamedExport) {
        for specifier in &export.specifiers {
            if let ExportSpecifier::Named(named) = specifier {
                let exported = named.exported.as_ref().unwrap_or(&named.orig);
                if let ModuleExportName::Ident(ident) = exported {
                    self.exports.push(ident.sym.to_string());
                }
            }
        }
    }
}

/// What a transformed module exposes, read back through the parser.
pub struct Surface {
    pub raw_codes: Vec<String>,
    pub named_exports_order: Vec<String>,
    pub named_exports: Vec<String>,
}

pub fn read_surface(code: &str) -> Surface {
    let program = parse_compiled("out.js", code).unwrap();
    let mut collector = Collector::default();
    program.module.visit_with(&mut collector);
    Surface {
        raw_codes: collector.raw_codes,
        named_exports_order: collector.order,
        named_exports: collector.exports,
    }
}
