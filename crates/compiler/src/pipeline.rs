//! Full transform of a stories file through an external component compiler.

use svelte_csf_core::{CsfError, ErrorKind};

use crate::options::TransformOptions;
use crate::post_transform::post_transform;
use crate::pre_transform::pre_transform;

/// Error type reported by a component compiler implementation.
pub type CompilerError = Box<dyn std::error::Error + Send + Sync>;

/// Options forwarded to [`ComponentCompiler::compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Stories file being compiled.
    pub filename: String,
    /// Development mode output.
    pub dev: bool,
}

/// Output of the component compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledComponent {
    /// Compiled ES module.
    pub code: String,
}

/// The component compiler the stories transform wraps.
pub trait ComponentCompiler {
    /// Preprocess `source`, e.g. to lower an alternate script language.
    fn preprocess(&self, source: &str, _filename: &str) -> Result<String, CompilerError> {
        Ok(source.to_string())
    }

    /// Compile a component into an ES module.
    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledComponent, CompilerError>;
}

fn compiler_error(filename: &str, err: CompilerError) -> CsfError {
    CsfError::new(
        ErrorKind::ComponentCompile {
            message: err.to_string(),
        },
        filename,
    )
}

/// Preprocess, pre-transform, compile and post-transform a stories file.
pub fn transform_stories_file<C: ComponentCompiler + ?Sized>(
    filename: &str,
    source: &str,
    compiler: &C,
    options: &TransformOptions,
) -> Result<String, CsfError> {
    let preprocessed = compiler
        .preprocess(source, filename)
        .map_err(|err| compiler_error(filename, err))?;
    let prepared = pre_transform(filename, &preprocessed)?;
    let compiled = compiler
        .compile(
            &prepared,
            &CompileOptions {
                filename: filename.to_string(),
                dev: options.dev,
            },
        )
        .map_err(|err| compiler_error(filename, err))?;
    log::debug!("{filename}: compiled to {} bytes", compiled.code.len());
    post_transform(filename, &compiled.code, &preprocessed, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl ComponentCompiler for Failing {
        fn compile(
            &self,
            _source: &str,
            _options: &CompileOptions,
        ) -> Result<CompiledComponent, CompilerError> {
            Err("unexpected token".into())
        }
    }

    struct BrokenPreprocessor;

    impl ComponentCompiler for BrokenPreprocessor {
        fn preprocess(&self, _source: &str, _filename: &str) -> Result<String, CompilerError> {
            Err("preprocessor crashed".into())
        }

        fn compile(
            &self,
            _source: &str,
            _options: &CompileOptions,
        ) -> Result<CompiledComponent, CompilerError> {
            unreachable!("compile runs after preprocess")
        }
    }

    const SOURCE: &str = concat!(
        "<script module>\n",
        "  import { defineMeta } from '@storybook/addon-svelte-csf';\n",
        "  const { Story } = defineMeta({});\n",
        "</script>\n",
        "<Story name=\"A\" />\n",
    );

    #[test]
    fn compiler_failures_are_typed() {
        let err = transform_stories_file(
            "A.stories.svelte",
            SOURCE,
            &Failing,
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ComponentCompile {
                message: "unexpected token".into()
            }
        );
        assert_eq!(err.filename, "A.stories.svelte");
    }

    #[test]
    fn preprocess_failures_stop_the_pipeline() {
        let err = transform_stories_file(
            "A.stories.svelte",
            SOURCE,
            &BrokenPreprocessor,
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ComponentCompile { .. }));
    }
}
