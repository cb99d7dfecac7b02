#![deny(missing_docs)]
//! Node.js bindings for the Svelte CSF stories transform.

use napi::bindgen_prelude::*;
use napi_derive::napi;
use svelte_csf_compiler::TransformOptions;
use svelte_csf_core::{CsfError, ErrorClass};

/// Batch indexing types and functions.
pub mod batch;
/// The stateful compiler and its configuration.
pub mod compiler;
/// NAPI-exposed data structures.
pub mod types;

pub use batch::*;
pub use compiler::StoriesCompiler;
pub use types::*;

/// Index a single stories file without constructing a compiler.
#[napi(js_name = "indexStoriesFile")]
pub fn index_stories_file_napi(
    source: String,
    filename: String,
    config: Option<TransformConfig>,
) -> Result<IndexResult> {
    let options: TransformOptions = config.unwrap_or_default().into();
    let input = svelte_csf_core::index_stories_file(&filename, &source, &options.index_options())
        .map_err(convert_error)?;
    Ok(input.into())
}

/// Stable error code of a formatted error message, if it carries one.
#[napi(js_name = "errorCode")]
pub fn error_code(message: String) -> Option<String> {
    let rest = message.strip_prefix('[')?;
    let (code, _) = rest.split_once(']')?;
    code.starts_with("SB_SVELTE_CSF_").then(|| code.to_string())
}

/// Author mistakes are invalid arguments; transform defects and compiler
/// failures are generic failures.
pub(crate) fn convert_error(err: CsfError) -> Error {
    match err.kind.class() {
        ErrorClass::Structural | ErrorClass::StaticAnalysis | ErrorClass::Legacy => {
            Error::new(Status::InvalidArg, err.to_string())
        }
        ErrorClass::Internal | ErrorClass::External => Error::from_reason(err.to_string()),
    }
}
