use std::fmt;
use thiserror::Error;

/// Base URL of the error reference; each error code is an anchor on that page.
pub const ERRORS_DOCS_URL: &str =
    "https://github.com/storybookjs/addon-svelte-csf/blob/main/ERRORS.md";

/// Position of the offending node in the stories file.
///
/// `offset` is the byte offset edits and spans use; `line` and `column` are
/// 1-indexed and count characters, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Byte offset into the stories file.
    pub offset: usize,
    /// Line, from 1.
    pub line: usize,
    /// Column in characters, from 1.
    pub column: usize,
}

impl SourceLocation {
    /// Location of byte `offset`, found at `line`:`column`.
    pub fn at(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Pipeline stage an error originates from. Drives the error code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Walking the stories file's own AST.
    ExtractSvelte,
    /// Walking the component compiler's output.
    ExtractCompiled,
    /// Reading the meta declaration's argument.
    AnalyseDefineMeta,
    /// Reading a story tag's attributes.
    AnalyseStory,
    /// Building and applying the compiled-output edits.
    Compiler,
    /// Failure reported by the external component compiler.
    ComponentCompiler,
    /// Legacy authoring API detected.
    LegacyApi,
}

impl ErrorCategory {
    fn code_segment(self) -> &'static str {
        match self {
            ErrorCategory::ExtractSvelte => "PARSER_EXTRACT_SVELTE",
            ErrorCategory::ExtractCompiled => "PARSER_EXTRACT_COMPILED",
            ErrorCategory::AnalyseDefineMeta => "PARSER_ANALYSE_DEFINE_META",
            ErrorCategory::AnalyseStory => "PARSER_ANALYSE_STORY",
            ErrorCategory::Compiler => "COMPILER",
            ErrorCategory::ComponentCompiler => "COMPONENT_COMPILER",
            ErrorCategory::LegacyApi => "LEGACY_API",
        }
    }
}

/// Who is expected to act on an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The stories file does not follow the supported authoring contract.
    Structural,
    /// A value that must be a literal is a dynamic expression.
    StaticAnalysis,
    /// The transform's assumptions about compiler output no longer hold.
    Internal,
    /// The file uses the legacy template API.
    Legacy,
    /// The external component compiler rejected the file.
    External,
}

/// Every failure the transform can raise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// No `<script module>` block.
    #[error(
        "The stories file must declare its meta inside a module script (`<script module>`)."
    )]
    MissingModuleTag,
    /// `defineMeta` imported through a default or namespace import.
    #[error(
        "Only named imports are supported from '{package}'. Use `import {{ defineMeta }} from '{package}'`."
    )]
    DefaultOrNamespaceImportUsed {
        /// Package the import came from.
        package: String,
    },
    /// The module script never imports `defineMeta`.
    #[error("The module script does not import `defineMeta` from the addon package.")]
    MissingDefineMetaImport,
    /// `defineMeta` imported but its result is never bound.
    #[error(
        "Could not find a variable declaration initialised with a `{define_meta}(...)` call in the module script."
    )]
    MissingDefineMetaVariableDeclaration {
        /// Local name of the meta-declaration function.
        define_meta: String,
    },
    /// The destructuring pattern lacks the `Story` component.
    #[error(
        "The `Story` component was not destructured from the `{define_meta}(...)` call, e.g. `const {{ Story }} = {define_meta}({{...}})`."
    )]
    NoStoryComponentDestructured {
        /// Local name of the meta-declaration function.
        define_meta: String,
    },
    /// `defineMeta` called with something other than a single object literal.
    #[error(
        "`{define_meta}(...)` must be called with exactly one object literal argument, found {found}."
    )]
    InvalidDefineMetaArgument {
        /// Local name of the meta-declaration function.
        define_meta: String,
        /// Description of what was passed instead.
        found: String,
    },
    /// The meta-declaration result is not destructured with an object pattern.
    #[error(
        "The meta declaration must destructure its call result with an object pattern, found {found}."
    )]
    NoDestructuredDefineMetaCall {
        /// Description of the binding pattern that was found.
        found: String,
    },
    /// Two top-level snippets share a name.
    #[error(
        "The snippet `{name}` is declared more than once at the top level of the stories file."
    )]
    DuplicateSnippetBlock {
        /// Snippet name.
        name: String,
    },
    /// `template` attribute is not a plain snippet reference.
    #[error(
        "The `template` attribute of story '{story}' must reference a top-level snippet by name, e.g. `template={{mySnippet}}`."
    )]
    InvalidTemplateAttribute {
        /// Story display name.
        story: String,
    },
    /// `template` attribute references a snippet that does not exist.
    #[error(
        "Story '{story}' references the snippet `{snippet}`, which is not declared at the top level."
    )]
    MissingTemplateSnippet {
        /// Story display name.
        story: String,
        /// Referenced snippet name.
        snippet: String,
    },
    /// Markup could not be parsed.
    #[error("Markup syntax error: {message}")]
    MarkupSyntax {
        /// Parser message.
        message: String,
    },
    /// A script block or attribute expression could not be parsed.
    #[error("Script syntax error: {message}")]
    ScriptSyntax {
        /// Parser message.
        message: String,
    },
    /// Compiled output could not be parsed as an ES module.
    #[error("The compiled output is not a valid ES module: {message}")]
    CompiledSyntax {
        /// Parser message.
        message: String,
    },
    /// No meta declaration in the compiled output.
    #[error("Could not find the meta declaration in the compiled output.")]
    MissingCompiledDefineMeta,
    /// No default export in the compiled output.
    #[error("The compiled output has no default export.")]
    NoExportDefault,
    /// More than one default export in the compiled output.
    #[error("The compiled output has {count} default exports, expected exactly one.")]
    AmbiguousExportDefault {
        /// Number of default exports seen.
        count: usize,
    },
    /// Default export references a function that cannot be found.
    #[error("Could not find the stories function declaration `{name}` in the compiled output.")]
    NoStoriesFunctionDeclaration {
        /// Identifier the default export references.
        name: String,
    },
    /// Default export is neither a named function nor an identifier.
    #[error("Unsupported default export shape in the compiled output: {found}.")]
    UnsupportedExportDefault {
        /// Description of the exported node.
        found: String,
    },
    /// A compiled story call has no props object literal.
    #[error(
        "The compiled call of story #{index} has no props object literal as its second argument."
    )]
    NoCompiledStoryPropsObject {
        /// Position of the story in document order (0-based).
        index: usize,
    },
    /// Meta property that must be a string literal is dynamic.
    #[error(
        "The `{property}` property of the meta declaration must be a static string literal, found {found}."
    )]
    PropertyNotStringLiteral {
        /// Property name.
        property: String,
        /// Description of the value.
        found: String,
    },
    /// Meta property that must be an array of string literals is dynamic.
    #[error(
        "The `{property}` property of the meta declaration must be a static array of string literals, found {found}."
    )]
    PropertyNotArrayOfStrings {
        /// Property name.
        property: String,
        /// Description of the value.
        found: String,
    },
    /// `meta` destructured into something other than an identifier.
    #[error("The `meta` property of the meta declaration must be bound to a plain identifier.")]
    NoMetaIdentifier,
    /// Story attribute that must be a string literal is dynamic.
    #[error(
        "The `{attribute}` attribute of a story must be a static string literal, found {found}. Stories are analysed at build time, so the value cannot be computed."
    )]
    AttributeNotStringLiteral {
        /// Attribute name.
        attribute: String,
        /// Description of the value.
        found: String,
    },
    /// Story attribute that must be an array of string literals is dynamic.
    #[error(
        "The `{attribute}` attribute of a story must be a static array of string literals, found {found}. Stories are analysed at build time, so the value cannot be computed."
    )]
    AttributeNotArrayOfStrings {
        /// Attribute name.
        attribute: String,
        /// Description of the value.
        found: String,
    },
    /// Story without `name` or `exportName`.
    #[error("A story must have a `name` or an `exportName` attribute.")]
    NoStoryIdentifier,
    /// `exportName` is not a usable JS identifier.
    #[error(
        "'{export_name}' is not a valid export name. It must be a non-reserved JavaScript identifier."
    )]
    InvalidStoryExportName {
        /// Offending export name.
        export_name: String,
    },
    /// Two stories resolve to the same export name.
    #[error(
        "Stories '{first}' and '{second}' both resolve to the export name `{export_name}`. Set a distinct `exportName` on one of them."
    )]
    DuplicateStoryIdentifiers {
        /// Colliding export name.
        export_name: String,
        /// First story display name.
        first: String,
        /// Second story display name.
        second: String,
    },
    /// Export name the produced module already uses for its own exports.
    #[error(
        "The export name `{export_name}` is reserved by the produced stories module. Set a different `exportName`."
    )]
    ReservedStoryExportName {
        /// Offending export name.
        export_name: String,
    },
    /// Source and compiled story lists differ in length.
    #[error(
        "Found {source_count} story tags in the source but {compiled_count} story calls in the compiled output."
    )]
    StoryCountMismatch {
        /// Number of story tags in the source.
        source_count: usize,
        /// Number of story calls in the compiled output.
        compiled_count: usize,
    },
    /// Two queued text edits touch the same range.
    #[error("Overlapping edits queued on the compiled output at {start}..{end}.")]
    OverlappingEdits {
        /// Start of the rejected edit.
        start: usize,
        /// End of the rejected edit.
        end: usize,
    },
    /// An edit range lies outside the text or splits a character.
    #[error("Invalid edit range {start}..{end} on a text of {len} bytes.")]
    InvalidEditRange {
        /// Start of the rejected edit.
        start: usize,
        /// End of the rejected edit.
        end: usize,
        /// Length of the edited text.
        len: usize,
    },
    /// Serialising synthesized nodes failed.
    #[error("Failed to print generated code: {message}")]
    Codegen {
        /// Emitter message.
        message: String,
    },
    /// The external component compiler failed.
    #[error("The component compiler failed: {message}")]
    ComponentCompile {
        /// Compiler message.
        message: String,
    },
    /// Legacy syntax without the compatibility flag.
    #[error(
        "This stories file uses the legacy template API, which is not enabled. Migrate it to `defineMeta` or enable the `legacyTemplate` option."
    )]
    LegacyTemplateNotEnabled,
}

impl ErrorKind {
    /// Stage the error belongs to.
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            MissingModuleTag
            | DefaultOrNamespaceImportUsed { .. }
            | MissingDefineMetaImport
            | MissingDefineMetaVariableDeclaration { .. }
            | NoStoryComponentDestructured { .. }
            | InvalidDefineMetaArgument { .. }
            | NoDestructuredDefineMetaCall { .. }
            | DuplicateSnippetBlock { .. }
            | InvalidTemplateAttribute { .. }
            | MissingTemplateSnippet { .. }
            | MarkupSyntax { .. }
            | ScriptSyntax { .. } => ErrorCategory::ExtractSvelte,
            CompiledSyntax { .. }
            | MissingCompiledDefineMeta
            | NoExportDefault
            | AmbiguousExportDefault { .. }
            | NoStoriesFunctionDeclaration { .. }
            | UnsupportedExportDefault { .. }
            | NoCompiledStoryPropsObject { .. } => ErrorCategory::ExtractCompiled,
            PropertyNotStringLiteral { .. }
            | PropertyNotArrayOfStrings { .. }
            | NoMetaIdentifier => ErrorCategory::AnalyseDefineMeta,
            AttributeNotStringLiteral { .. }
            | AttributeNotArrayOfStrings { .. }
            | NoStoryIdentifier
            | InvalidStoryExportName { .. }
            | DuplicateStoryIdentifiers { .. }
            | ReservedStoryExportName { .. } => ErrorCategory::AnalyseStory,
            StoryCountMismatch { .. }
            | OverlappingEdits { .. }
            | InvalidEditRange { .. }
            | Codegen { .. } => {
                ErrorCategory::Compiler
            }
            ComponentCompile { .. } => ErrorCategory::ComponentCompiler,
            LegacyTemplateNotEnabled => ErrorCategory::LegacyApi,
        }
    }

    /// Number of the error within its category.
    fn number(&self) -> u16 {
        use ErrorKind::*;
        match self {
            MissingModuleTag => 1,
            DefaultOrNamespaceImportUsed { .. } => 2,
            MissingDefineMetaImport => 3,
            MissingDefineMetaVariableDeclaration { .. } => 4,
            NoStoryComponentDestructured { .. } => 5,
            InvalidDefineMetaArgument { .. } => 6,
            NoDestructuredDefineMetaCall { .. } => 7,
            DuplicateSnippetBlock { .. } => 8,
            InvalidTemplateAttribute { .. } => 9,
            MissingTemplateSnippet { .. } => 10,
            MarkupSyntax { .. } => 11,
            ScriptSyntax { .. } => 12,

            CompiledSyntax { .. } => 1,
            MissingCompiledDefineMeta => 2,
            NoExportDefault => 3,
            AmbiguousExportDefault { .. } => 4,
            NoStoriesFunctionDeclaration { .. } => 5,
            UnsupportedExportDefault { .. } => 6,
            NoCompiledStoryPropsObject { .. } => 7,

            PropertyNotStringLiteral { .. } => 1,
            PropertyNotArrayOfStrings { .. } => 2,
            NoMetaIdentifier => 3,

            AttributeNotStringLiteral { .. } => 1,
            AttributeNotArrayOfStrings { .. } => 2,
            NoStoryIdentifier => 3,
            InvalidStoryExportName { .. } => 4,
            DuplicateStoryIdentifiers { .. } => 5,
            ReservedStoryExportName { .. } => 6,

            StoryCountMismatch { .. } => 1,
            OverlappingEdits { .. } => 2,
            Codegen { .. } => 3,
            InvalidEditRange { .. } => 4,

            ComponentCompile { .. } => 1,

            LegacyTemplateNotEnabled => 1,
        }
    }

    /// Stable error code, e.g. `SB_SVELTE_CSF_PARSER_ANALYSE_STORY_0001`.
    pub fn code(&self) -> String {
        format!(
            "SB_SVELTE_CSF_{}_{:04}",
            self.category().code_segment(),
            self.number()
        )
    }

    /// Link to the documentation entry for this error.
    pub fn docs_url(&self) -> String {
        format!("{}#{}", ERRORS_DOCS_URL, self.code().to_ascii_lowercase())
    }

    /// Who is expected to act on this error.
    pub fn class(&self) -> ErrorClass {
        use ErrorKind::*;
        match self {
            PropertyNotStringLiteral { .. }
            | PropertyNotArrayOfStrings { .. }
            | AttributeNotStringLiteral { .. }
            | AttributeNotArrayOfStrings { .. } => ErrorClass::StaticAnalysis,
            LegacyTemplateNotEnabled => ErrorClass::Legacy,
            ComponentCompile { .. } => ErrorClass::External,
            _ => match self.category() {
                ErrorCategory::ExtractCompiled | ErrorCategory::Compiler => ErrorClass::Internal,
                _ => ErrorClass::Structural,
            },
        }
    }

    /// Errors the indexer re-raises as [`ErrorKind::LegacyTemplateNotEnabled`]
    /// when the legacy flag is off.
    pub fn is_legacy_signal(&self) -> bool {
        matches!(
            self,
            ErrorKind::MissingModuleTag
                | ErrorKind::NoDestructuredDefineMetaCall { .. }
                | ErrorKind::NoStoryComponentDestructured { .. }
        )
    }
}

/// File-scoped error raised anywhere in the stories pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "[{}] {}\n\nIn the stories file: {}{}{}\n\nMore info: {}",
    .kind.code(),
    .kind,
    .filename,
    position(.location),
    defect_note(.kind),
    .kind.docs_url()
)]
pub struct CsfError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Stories file being transformed.
    pub filename: String,
    /// Position of the offending node, when known.
    pub location: Option<SourceLocation>,
}

impl CsfError {
    /// Create an error without a position.
    pub fn new(kind: ErrorKind, filename: impl Into<String>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            location: None,
        }
    }

    /// Attach the position of the offending node.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Stable error code.
    pub fn code(&self) -> String {
        self.kind.code()
    }

    /// Whether the error points at a defect in the transform rather than in the file.
    pub fn is_internal(&self) -> bool {
        self.kind.class() == ErrorClass::Internal
    }
}

fn position(location: &Option<SourceLocation>) -> String {
    location
        .map(|location| format!(":{location}"))
        .unwrap_or_default()
}

fn defect_note(kind: &ErrorKind) -> &'static str {
    if kind.class() == ErrorClass::Internal {
        "\n\nThis is a defect in the stories transform, not in your file. Please report it along with the component compiler version."
    } else {
        ""
    }
}
