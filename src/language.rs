//! Languages offered by the interactive menu

use crate::config::DEFAULT_LANGUAGE;

/// Supported languages as `(code, native name)`
pub const LANGUAGES: &[(&str, &str)] = &[
    ("pt", "Português"),
    ("en", "English"),
    ("es", "Español"),
    ("fr", "Français"),
    ("de", "Deutsch"),
    ("it", "Italiano"),
    ("ja", "日本語"),
    ("zh", "中文"),
];

/// Native name for a language code
#[must_use]
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// Code at `index` in [`LANGUAGES`], or the default language when out of range
#[must_use]
pub fn language_at(index: usize) -> &'static str {
    LANGUAGES
        .get(index)
        .map_or(DEFAULT_LANGUAGE, |(code, _)| *code)
}

/// Position of `code` in [`LANGUAGES`]
#[must_use]
pub fn language_index(code: &str) -> Option<usize> {
    LANGUAGES
        .iter()
        .position(|(c, _)| c.eq_ignore_ascii_case(code))
}

/// Menu labels in the form `pt - Português`
#[must_use]
pub fn language_labels() -> Vec<String> {
    LANGUAGES
        .iter()
        .map(|(code, name)| format!("{code} - {name}"))
        .collect()
}
