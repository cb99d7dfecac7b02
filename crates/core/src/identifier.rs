use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::error::ErrorKind;

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
        "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
        "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
        "new", "null", "package", "private", "protected", "public", "return", "static", "super",
        "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
        "with", "yield",
    ]
    .into_iter()
    .collect()
});

/// Named export listing story export names in document order.
pub const NAMED_EXPORTS_ORDER: &str = "__namedExportsOrder";

/// Named exports the produced module declares besides the stories.
pub const RESERVED_EXPORT_NAMES: &[&str] = &[NAMED_EXPORTS_ORDER];

/// Names a story is addressed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryIdentifiers {
    /// Named export of the story in the produced module.
    pub export_name: String,
    /// Display name shown by the catalog.
    pub name: String,
}

impl StoryIdentifiers {
    /// Resolve a story's names from its optional `name` and `exportName` attributes.
    ///
    /// # Examples
    ///
    /// ```
    /// use svelte_csf_core::identifier::StoryIdentifiers;
    ///
    /// let ids = StoryIdentifiers::resolve(Some("With children".into()), None).unwrap();
    /// assert_eq!(ids.export_name, "WithChildren");
    ///
    /// let ids = StoryIdentifiers::resolve(None, Some("WithChildren".into())).unwrap();
    /// assert_eq!(ids.name, "With Children");
    /// ```
    pub fn resolve(name: Option<String>, export_name: Option<String>) -> Result<Self, ErrorKind> {
        match (name, export_name) {
            (None, None) => Err(ErrorKind::NoStoryIdentifier),
            (name, Some(export_name)) => {
                let export_name = check_export_name(export_name)?;
                let name = name.unwrap_or_else(|| export_name_to_story_name(&export_name));
                Ok(Self { export_name, name })
            }
            (Some(name), None) => {
                let export_name = check_export_name(story_name_to_export_name(&name))?;
                Ok(Self { export_name, name })
            }
        }
    }
}

fn check_export_name(export_name: String) -> Result<String, ErrorKind> {
    if !is_valid_export_name(&export_name) {
        return Err(ErrorKind::InvalidStoryExportName { export_name });
    }
    if RESERVED_EXPORT_NAMES.contains(&export_name.as_str()) {
        return Err(ErrorKind::ReservedStoryExportName { export_name });
    }
    Ok(export_name)
}

/// PascalCase export name for a story display name.
///
/// Non-alphanumeric characters separate words. A leading digit gets an `_` prefix.
///
/// ```
/// use svelte_csf_core::identifier::story_name_to_export_name;
///
/// assert_eq!(story_name_to_export_name("With children"), "WithChildren");
/// assert_eq!(story_name_to_export_name("some-story name"), "SomeStoryName");
/// assert_eq!(story_name_to_export_name("3 columns"), "_3Columns");
/// ```
pub fn story_name_to_export_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|word| !word.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Start-cased display name for an export name.
///
/// ```
/// use svelte_csf_core::identifier::export_name_to_story_name;
///
/// assert_eq!(export_name_to_story_name("WithChildren"), "With Children");
/// assert_eq!(export_name_to_story_name("primary_story"), "Primary Story");
/// assert_eq!(export_name_to_story_name("HTMLButton2"), "HTML Button 2");
/// ```
pub fn export_name_to_story_name(export_name: &str) -> String {
    split_words(export_name)
        .into_iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() && c.is_ascii_digit())
                || (prev.is_ascii_digit() && c.is_alphabetic())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Whether `name` can be used as a named export.
pub fn is_valid_export_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(name)
}

/// Lowercase, dash-separated form of a title or story name used in story ids.
///
/// Punctuation and whitespace runs collapse into a single `-`; leading and
/// trailing dashes are dropped.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Story id in the catalog, `<component>--<story>`.
///
/// ```
/// use svelte_csf_core::identifier::to_id;
///
/// assert_eq!(to_id("Atoms/Button", "With icon"), "atoms-button--with-icon");
/// ```
pub fn to_id(component: &str, story: &str) -> String {
    format!("{}--{}", sanitize(component), sanitize(story))
}

/// Tracks export names already taken within one stories file.
#[derive(Default)]
pub struct ExportNames {
    taken: HashMap<String, String>,
}

impl ExportNames {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            taken: HashMap::new(),
        }
    }

    /// Claim `ids.export_name`, failing when another story already holds it.
    pub fn claim(&mut self, ids: &StoryIdentifiers) -> Result<(), ErrorKind> {
        if let Some(first) = self.taken.get(&ids.export_name) {
            return Err(ErrorKind::DuplicateStoryIdentifiers {
                export_name: ids.export_name.clone(),
                first: first.clone(),
                second: ids.name.clone(),
            });
        }
        self.taken
            .insert(ids.export_name.clone(), ids.name.clone());
        Ok(())
    }
}
