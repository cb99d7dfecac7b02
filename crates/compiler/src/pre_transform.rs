//! Pre-compile normalization of the meta declaration.
//!
//! Later stages reference the metadata object through a `meta` binding, so the
//! declaration `const { Story } = defineMeta({...})` is rewritten to also
//! destructure `meta` before the component compiler sees the file.

use svelte_csf_core::extract::describe_pat;
use svelte_csf_core::{CsfError, ErrorKind, SourceFile, extract_source_ast, parse_component};
use swc_core::common::Spanned;
use swc_core::ecma::ast::Pat;

use crate::codegen::Printer;
use crate::edit::CodeEditor;
use crate::object::{ensure_meta_binding, overwrite_var_decl};

/// Return `source` with a `meta` binding in the meta declaration's pattern.
///
/// Files that already destructure `meta`, under any local name, come back
/// unchanged.
pub fn pre_transform(filename: &str, source: &str) -> Result<String, CsfError> {
    let file = SourceFile::new(filename, source);
    let root = parse_component(&file)?;
    let bundle = extract_source_ast(&root)?;
    let meta = &bundle.define_meta;

    if let Some(local) = &bundle.meta_local {
        log::debug!("{filename}: `meta` already bound to `{local}`");
        return Ok(source.to_string());
    }

    let mut decl = meta.decl.clone();
    let declarator = decl
        .decls
        .iter_mut()
        .find(|declarator| {
            declarator
                .init
                .as_deref()
                .is_some_and(|init| init.span() == meta.call.span)
        })
        .ok_or_else(|| {
            file.error_at(
                ErrorKind::MissingDefineMetaVariableDeclaration {
                    define_meta: bundle.define_meta_local.clone(),
                },
                meta.span.start,
            )
        })?;
    match &mut declarator.name {
        Pat::Object(pattern) => {
            ensure_meta_binding(pattern).map_err(|kind| file.error_at(kind, meta.span.start))?;
        }
        other => {
            return Err(file.error_at(
                ErrorKind::NoDestructuredDefineMetaCall {
                    found: describe_pat(other),
                },
                meta.span.start,
            ));
        }
    }

    let printer = Printer::new(file.source_map());
    let mut editor = CodeEditor::new(source);
    overwrite_var_decl(&mut editor, &file, &printer, meta.span, &decl)
        .map_err(|kind| file.error_at(kind, meta.span.start))?;
    log::debug!("{filename}: added a `meta` binding to the meta declaration");
    Ok(editor.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"<script module>
  import { defineMeta } from '@storybook/addon-svelte-csf';
  import Button from './Button.svelte';

  /** Buttons */
  const {
    Story,
  } = defineMeta({ title: 'Button', component: Button });
</script>

<Story name="Primary" />
"#;

    #[test]
    fn adds_the_meta_binding() {
        let out = pre_transform("Button.stories.svelte", SOURCE).unwrap();
        assert!(out.contains("meta"), "out: {}", out);
        let file = SourceFile::new("Button.stories.svelte", out.as_str());
        let root = parse_component(&file).unwrap();
        let bundle = extract_source_ast(&root).unwrap();
        assert_eq!(bundle.meta_local.as_deref(), Some("meta"));
        assert_eq!(bundle.story_local, "Story");
        assert!(out.contains("/** Buttons */"), "out: {}", out);
        assert!(
            out.ends_with("</script>\n\n<Story name=\"Primary\" />\n"),
            "out: {}",
            out
        );
    }

    #[test]
    fn is_idempotent() {
        let once = pre_transform("Button.stories.svelte", SOURCE).unwrap();
        let twice = pre_transform("Button.stories.svelte", &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn keeps_renamed_meta_bindings() {
        let source = SOURCE.replace("Story,\n", "Story, meta: m,\n");
        assert_eq!(
            pre_transform("Button.stories.svelte", &source).unwrap(),
            source
        );
    }

    #[test]
    fn requires_a_destructured_call() {
        let source = SOURCE.replace("const {\n    Story,\n  } =", "const stories =");
        let err = pre_transform("Button.stories.svelte", &source).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::NoDestructuredDefineMetaCall { .. }
        ));
        assert!(err.kind.is_legacy_signal());
    }
}
