//! Export surface appended to the compiled stories module.

use swc_core::ecma::ast::ModuleItem;
use svelte_csf_core::ErrorKind;
pub use svelte_csf_core::identifier::NAMED_EXPORTS_ORDER;

use crate::codegen::{
    Printer, call, computed_member, const_stmt, export_alias, export_const, export_default,
    ident_expr, import_named, str_array,
};

/// Runtime helper turning the component function and meta into stories.
pub const CREATE_RUNTIME_STORIES: &str = "createRuntimeStories";
/// Binding holding the helper's result.
pub const STORIES_BINDING: &str = "__stories";
/// Prefix of the per-story local bindings. No name it forms equals
/// [`STORIES_BINDING`] or [`NAMED_EXPORTS_ORDER`].
pub const STORY_LOCAL_PREFIX: &str = "__story_";

/// Inputs of the appended module code.
#[derive(Debug, Clone)]
pub struct Appendix<'a> {
    /// Import path of the runtime helper.
    pub runtime_module: &'a str,
    /// Name of the compiled component function.
    pub stories_function: &'a str,
    /// Local name of the metadata object.
    pub meta: &'a str,
    /// Story export names in document order.
    pub export_names: Vec<String>,
}

impl Appendix<'_> {
    /// Items appended after the compiled code.
    pub fn items(&self) -> Vec<ModuleItem> {
        let mut items = vec![
            import_named(CREATE_RUNTIME_STORIES, self.runtime_module),
            const_stmt(
                STORIES_BINDING,
                call(
                    ident_expr(CREATE_RUNTIME_STORIES),
                    vec![ident_expr(self.stories_function), ident_expr(self.meta)],
                ),
            ),
            export_default(ident_expr(self.meta)),
            export_const(NAMED_EXPORTS_ORDER, str_array(&self.export_names)),
        ];
        for export_name in &self.export_names {
            let local = format!("{STORY_LOCAL_PREFIX}{export_name}");
            items.push(const_stmt(
                &local,
                computed_member(ident_expr(STORIES_BINDING), export_name),
            ));
            items.push(export_alias(&local, export_name));
        }
        items
    }

    /// Appended code, starting on a new line.
    pub fn print(&self, printer: &Printer) -> Result<String, ErrorKind> {
        Ok(format!("\n{}", printer.items(self.items())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::common::{SourceMap, sync::Lrc};

    #[test]
    fn lists_exports_in_document_order() {
        let appendix = Appendix {
            runtime_module: "pkg/runtime",
            stories_function: "Button_stories",
            meta: "meta",
            export_names: vec!["Secondary".into(), "Primary".into()],
        };
        let code = appendix
            .print(&Printer::new(Lrc::new(SourceMap::default())))
            .unwrap();
        assert!(code.starts_with('\n'));
        assert!(
            code.contains("import { createRuntimeStories } from \"pkg/runtime\";"),
            "code: {}",
            code
        );
        let helper_call = "const __stories = createRuntimeStories(Button_stories, meta);";
        assert!(code.contains(helper_call), "code: {}", code);
        assert!(code.contains("export default meta;"), "code: {}", code);
        let secondary = code.find("\"Secondary\"").unwrap();
        let primary = code.find("\"Primary\"").unwrap();
        assert!(secondary < primary);
        assert!(
            code.contains("const __story_Secondary = __stories[\"Secondary\"];"),
            "code: {}",
            code
        );
        assert!(
            code.contains("export { __story_Primary as Primary };"),
            "code: {}",
            code
        );
    }

    #[test]
    fn story_locals_never_shadow_the_helper_result() {
        let appendix = Appendix {
            runtime_module: "pkg/runtime",
            stories_function: "S",
            meta: "meta",
            export_names: vec!["stories".into()],
        };
        let code = appendix
            .print(&Printer::new(Lrc::new(SourceMap::default())))
            .unwrap();
        assert_eq!(
            code.matches("const __stories =").count(),
            1,
            "code: {}",
            code
        );
        assert!(
            code.contains("const __story_stories = __stories[\"stories\"];"),
            "code: {}",
            code
        );
    }

    #[test]
    fn no_stories_still_exports_meta_and_order() {
        let appendix = Appendix {
            runtime_module: "pkg/runtime",
            stories_function: "Empty_stories",
            meta: "m",
            export_names: Vec::new(),
        };
        let items = appendix.items();
        assert_eq!(items.len(), 4);
        let code = appendix
            .print(&Printer::new(Lrc::new(SourceMap::default())))
            .unwrap();
        assert!(
            code.contains("export const __namedExportsOrder = [];"),
            "code: {}",
            code
        );
        assert!(code.contains("export default m;"), "code: {}", code);
    }
}
