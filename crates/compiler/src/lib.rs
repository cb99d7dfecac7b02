#![deny(missing_docs)]
//! Svelte CSF compiler integration.
//!
//! Wraps a component compiler with a pre-transform of the stories file and a
//! post-transform of the compiled module, producing a module whose default
//! export is the stories meta and whose named exports are the stories.

/// Export surface appended to compiled modules.
pub mod appendix;
/// AST builders and printing.
pub mod codegen;
/// Compiled-module parsing and extraction.
pub mod compiled;
/// Positional pairing of source and compiled stories.
pub mod correlate;
/// Offset-based text editing.
pub mod edit;
/// Object literal and pattern rewrites.
pub mod object;
/// Transform options.
pub mod options;
/// End-to-end transform through a component compiler.
pub mod pipeline;
/// Build-tool hooks.
pub mod plugin;
/// Post-compile transform.
pub mod post_transform;
/// Pre-compile transform.
pub mod pre_transform;

pub use compiled::{CompiledAstBundle, CompiledProgram, extract_compiled_ast, parse_compiled};
pub use edit::CodeEditor;
pub use options::{DEFAULT_RUNTIME_MODULE, TransformOptions};
pub use pipeline::{
    CompileOptions, CompiledComponent, CompilerError, ComponentCompiler, transform_stories_file,
};
pub use plugin::{StoriesPlugin, is_stories_file};
pub use post_transform::post_transform;
pub use pre_transform::pre_transform;
