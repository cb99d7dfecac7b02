//! Post-compile rewrite of the component compiler's output.
//!
//! The original stories file and the compiled module are read as two
//! independent snapshots. Stories are paired by position, every edit is queued
//! against offsets of the untouched compiled text, and the new export surface
//! is appended once all edits are in place.

use svelte_csf_core::analyse::{AnalysedStory, meta_description};
use svelte_csf_core::{
    CsfError, ErrorKind, SourceFile, analyse_stories, extract_source_ast, parse_component,
};
use swc_core::common::Spanned;
use swc_core::ecma::ast::{Expr, Pat};

use crate::appendix::Appendix;
use crate::codegen::{Printer, empty_object, key_value, str_array, str_expr};
use crate::compiled::{CompiledMeta, ExportDefaultNode, extract_compiled_ast, parse_compiled};
use crate::correlate::correlate;
use crate::edit::CodeEditor;
use crate::object::{ParametersPatch, ensure_meta_binding, overwrite_var_decl, patch_parameters};
use crate::options::TransformOptions;

/// Rewrite `compiled` into the catalog module for the stories file `original`.
///
/// `original` is the stories file as the component compiler received it
/// after preprocessing, before the pre-transform.
pub fn post_transform(
    filename: &str,
    compiled: &str,
    original: &str,
    options: &TransformOptions,
) -> Result<String, CsfError> {
    let source = SourceFile::new(filename, original);
    let root = parse_component(&source)?;
    let svelte = extract_source_ast(&root)?;
    let stories = analyse_stories(&svelte)?;

    let program = parse_compiled(filename, compiled)?;
    let nodes = extract_compiled_ast(&program)?;
    let file = &program.file;
    let fail = |kind| file.error(kind);

    let printer = Printer::new(file.source_map());
    let mut editor = CodeEditor::new(file.text());

    for pair in correlate(&stories, &nodes.stories).map_err(fail)? {
        let props = pair
            .compiled
            .props()
            .ok_or(ErrorKind::NoCompiledStoryPropsObject { index: pair.index })
            .map_err(fail)?;
        patch_parameters(
            &mut editor,
            file,
            &printer,
            props,
            &story_patch(pair.source),
        )
        .map_err(fail)?;
    }
    log::debug!(
        "{filename}: augmented {} compiled story calls",
        stories.len()
    );

    let meta_patch = ParametersPatch {
        internal: None,
        description: meta_description(svelte.define_meta.leading_comments)
            .map(|description| ("component", description)),
    };
    let meta = normalize_meta(&mut editor, file, &printer, &nodes.define_meta, &meta_patch)
        .map_err(fail)?;

    remove_export_default(&mut editor, file, nodes.export_default).map_err(fail)?;

    let appendix = Appendix {
        runtime_module: &options.runtime_module,
        stories_function: &nodes.stories_function,
        meta: &meta,
        export_names: stories
            .iter()
            .map(|story| story.attributes.ids.export_name.clone())
            .collect(),
    };
    editor.append(&appendix.print(&printer).map_err(fail)?);
    log::debug!(
        "{filename}: queued {} edits on the compiled output",
        editor.len()
    );

    Ok(editor.finish())
}

/// `parameters` entries injected into one compiled story call.
fn story_patch(story: &AnalysedStory<'_>) -> ParametersPatch {
    let mut internal = empty_object();
    internal
        .props
        .push(key_value("rawCode", str_expr(&story.raw_code)));
    if let Some(tags) = &story.attributes.tags {
        internal.props.push(key_value("tags", str_array(tags)));
    }
    ParametersPatch {
        internal: Some(Expr::Object(internal)),
        description: story
            .description
            .clone()
            .map(|description| ("story", description)),
    }
}

/// Ensure the compiled meta declaration binds `meta` and carries the meta
/// description. Returns the local name of the metadata object.
fn normalize_meta(
    editor: &mut CodeEditor<'_>,
    file: &SourceFile,
    printer: &Printer,
    meta: &CompiledMeta<'_>,
    patch: &ParametersPatch,
) -> Result<String, ErrorKind> {
    let mut pattern = meta.pattern.clone();
    let (local, inserted) = ensure_meta_binding(&mut pattern)?;
    if !inserted {
        patch_parameters(editor, file, printer, meta.argument, patch)?;
        return Ok(local);
    }

    // The pattern and the argument belong to one declaration, which is printed once.
    let mut decl = meta.decl.clone();
    let declarator = decl
        .decls
        .iter_mut()
        .find(|declarator| declarator.name.span() == meta.pattern.span)
        .ok_or(ErrorKind::MissingCompiledDefineMeta)?;
    declarator.name = Pat::Object(pattern);
    if let Some(Expr::Call(call)) = declarator.init.as_deref_mut()
        && let Some(arg) = call.args.first_mut()
        && let Expr::Object(argument) = &mut *arg.expr
    {
        patch.merge_into(argument);
    }
    log::debug!(
        "{}: added a `meta` binding to the compiled meta declaration",
        file.filename()
    );
    overwrite_var_decl(editor, file, printer, file.span(meta.decl.span), &decl)?;
    Ok(local)
}

/// Drop the compiled default export, keeping an exported function declared.
fn remove_export_default(
    editor: &mut CodeEditor<'_>,
    file: &SourceFile,
    node: ExportDefaultNode,
) -> Result<(), ErrorKind> {
    match node {
        ExportDefaultNode::Identifier { span } => editor.remove(span.start, span.end),
        ExportDefaultNode::Function { span } => {
            let keywords = export_default_keywords_len(file.slice(span)).ok_or_else(|| {
                ErrorKind::UnsupportedExportDefault {
                    found: "a default export without `export default` keywords".into(),
                }
            })?;
            editor.remove(span.start, span.start + keywords)
        }
    }
}

/// Length of the leading `export default ` in `text`, whitespace included.
fn export_default_keywords_len(text: &str) -> Option<usize> {
    let rest = text.strip_prefix("export")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix("default")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(text.len() - rest.trim_start().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use svelte_csf_core::accessors::{prop_name, string_literal};
    use swc_core::ecma::ast::KeyValueProp;
    use swc_core::ecma::visit::{Visit, VisitWith};

    struct RawCodes(Vec<String>);

    impl Visit for RawCodes {
        fn visit_key_value_prop(&mut self, kv: &KeyValueProp) {
            if prop_name(&kv.key).as_deref() == Some("rawCode")
                && let Some(value) = string_literal(&kv.value)
            {
                self.0.push(value);
            }
            kv.visit_children_with(self);
        }
    }

    fn raw_codes(out: &str) -> Vec<String> {
        let program = parse_compiled("out.js", out).unwrap();
        let mut collector = RawCodes(Vec::new());
        program.module.visit_with(&mut collector);
        collector.0
    }

    const ORIGINAL: &str = r#"<script module>
  import { defineMeta } from '@storybook/addon-svelte-csf';
  import Button from './Button.svelte';

  /**
   * Clickable things.
   */
  const { Story } = defineMeta({ title: 'Button', component: Button });
</script>

<Story name="Primary" args={{ primary: true }} />

<!-- Shows disabled state -->
<Story name="Secondary" tags={['new']}>
  <Button   disabled>Nope</Button>
</Story>
"#;

    const COMPILED: &str = r#"import * as $ from "svelte/internal/client";
import { defineMeta } from "@storybook/addon-svelte-csf";
import Button from "./Button.svelte";
const { Story, meta } = defineMeta({ title: "Button", component: Button });
var root = $.template(`<!> <!>`, 1);
export default function Button_stories($$anchor) {
	var fragment = root();
	var node = $.first_child(fragment);
	Story(node, { name: "Primary", args: { primary: true } });
	var node_1 = $.sibling(node, 2);
	Story(node_1, {
		name: "Secondary",
		tags: ["new"],
		children: ($$anchor, $$slotProps) => {
			Button($$anchor, { disabled: true });
		},
		$$slots: { default: true }
	});
	$.append($$anchor, fragment);
}
"#;

    fn transform(compiled: &str) -> String {
        post_transform(
            "Button.stories.svelte",
            compiled,
            ORIGINAL,
            &TransformOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn rewrites_exports() {
        let out = transform(COMPILED);
        assert!(
            out.contains("\nfunction Button_stories($$anchor) {"),
            "out: {}",
            out
        );
        assert!(!out.contains("export default function"), "out: {}", out);
        assert!(out.contains("export default meta;"), "out: {}", out);
        assert!(
            out.contains("createRuntimeStories(Button_stories, meta)"),
            "out: {}",
            out
        );
        assert!(
            out.contains("export { __story_Primary as Primary };"),
            "out: {}",
            out
        );
        assert!(
            out.contains("export { __story_Secondary as Secondary };"),
            "out: {}",
            out
        );
    }

    #[test]
    fn injects_raw_code_tags_and_descriptions() {
        let out = transform(COMPILED);
        assert_eq!(
            raw_codes(&out),
            vec![
                "<Story name=\"Primary\" args={{ primary: true }} />".to_string(),
                "<Button   disabled>Nope</Button>".to_string(),
            ]
        );
        assert!(
            out.contains("story: \"Shows disabled state\""),
            "out: {}",
            out
        );
        assert!(
            out.contains("component: \"Clickable things.\""),
            "out: {}",
            out
        );
        assert_eq!(out.matches("__svelteCsf").count(), 2, "out: {}", out);
    }

    #[test]
    fn adds_meta_binding_when_the_compiler_dropped_it() {
        let compiled = COMPILED.replace("const { Story, meta } =", "const { Story } =");
        let out = transform(&compiled);
        let decl = out
            .lines()
            .find(|line| line.contains("= defineMeta("))
            .unwrap();
        assert!(
            decl.contains("Story") && decl.contains("meta"),
            "out: {}",
            out
        );
        assert!(
            out.contains("component: \"Clickable things.\""),
            "out: {}",
            out
        );
    }

    #[test]
    fn removes_identifier_default_exports() {
        let compiled = COMPILED.replace("export default function", "function")
            + "export default Button_stories;\n";
        let out = transform(&compiled);
        assert!(
            !out.contains("export default Button_stories"),
            "out: {}",
            out
        );
        assert_eq!(out.matches("export default").count(), 1, "out: {}", out);
    }

    #[test]
    fn story_count_mismatch_is_internal() {
        let compiled = COMPILED.replace(
            "Story(node, { name: \"Primary\", args: { primary: true } });",
            "",
        );
        let err = post_transform(
            "Button.stories.svelte",
            &compiled,
            ORIGINAL,
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::StoryCountMismatch {
                source_count: 2,
                compiled_count: 1
            }
        );
        assert!(err.is_internal());
    }

    #[test]
    fn missing_props_object_reports_the_story() {
        let compiled = COMPILED.replace(
            "Story(node, { name: \"Primary\", args: { primary: true } })",
            "Story(node, props)",
        );
        let err = post_transform(
            "Button.stories.svelte",
            &compiled,
            ORIGINAL,
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoCompiledStoryPropsObject { index: 0 });
    }

    #[test]
    fn export_names_matching_internal_bindings_stay_valid() {
        let original = ORIGINAL.replace("name=\"Primary\"", "exportName=\"stories\"");
        let out = post_transform(
            "Button.stories.svelte",
            COMPILED,
            &original,
            &TransformOptions::default(),
        )
        .unwrap();
        parse_compiled("out.js", &out).unwrap();
        assert_eq!(out.matches("const __stories =").count(), 1, "out: {}", out);
        assert!(
            out.contains("export { __story_stories as stories };"),
            "out: {}",
            out
        );
    }

    #[test]
    fn export_order_name_is_reserved() {
        let original = ORIGINAL.replace("name=\"Primary\"", "exportName=\"__namedExportsOrder\"");
        let err = post_transform(
            "Button.stories.svelte",
            COMPILED,
            &original,
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ReservedStoryExportName {
                export_name: "__namedExportsOrder".into()
            }
        );
        assert!(!err.is_internal());
    }

    #[test]
    fn measures_export_default_keywords() {
        assert_eq!(
            export_default_keywords_len("export default function A() {}"),
            Some(15)
        );
        assert_eq!(
            export_default_keywords_len("export\n  default  function"),
            Some(18)
        );
        assert_eq!(export_default_keywords_len("exported default"), None);
        assert_eq!(export_default_keywords_len("function A() {}"), None);
    }
}
