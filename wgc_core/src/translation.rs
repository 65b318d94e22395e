//! Display names for waste fractions.
//!
//! The upstream service labels fractions in Polish. A translation table maps a key derived
//! from that label to a display name; labels without an entry are shown as they are.

use std::{collections::HashMap, fs, path::Path, sync::OnceLock};

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("could not read translation file: {0}")]
    Io(#[from] std::io::Error),
    #[error("translation file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("translation file must contain an object of fraction names")]
    Format,
}

/// Fraction display names keyed by [`fraction_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable(HashMap<String, String>);

impl TranslationTable {
    /// Read a table from JSON.
    ///
    /// Accepts a flat `{"key": "name"}` object as well as the nested
    /// `{"config": {"fractions": {...}}}` layout of a translation document.
    pub fn from_json(json: &str) -> Result<Self, TranslationError> {
        let value: Value = serde_json::from_str(json)?;
        let fractions = value.pointer("/config/fractions").unwrap_or(&value);
        let Value::Object(map) = fractions else {
            return Err(TranslationError::Format);
        };
        Ok(map
            .iter()
            .filter_map(|(key, name)| Some((key.clone(), name.as_str()?.to_string())))
            .collect())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TranslationError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for TranslationTable {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn non_alphanumeric_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

fn parenthesized_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s*\([^)]*\)\s*").unwrap())
}

fn underscores_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"_+").unwrap())
}

fn fold_diacritic(c: char) -> char {
    match c {
        'ą' => 'a',
        'ć' => 'c',
        'ę' => 'e',
        'ł' => 'l',
        'ń' => 'n',
        'ó' => 'o',
        'ś' => 's',
        'ź' | 'ż' => 'z',
        c => c,
    }
}

/// Derive the translation key of a fraction label.
///
/// `"Odpady kuchenne ulegające biodegradacji (bio)"` becomes
/// `"odpady_kuchenne_ulegajace_biodegradacji_bio"`.
pub fn fraction_key(raw_name: &str) -> String {
    let folded: String = raw_name.to_lowercase().chars().map(fold_diacritic).collect();
    let key = non_alphanumeric_regex().replace_all(&folded, "_");
    key.trim_matches('_').to_string()
}

/// Derive the key used by older translation files.
///
/// Those drop a parenthesized qualifier entirely and do not fold diacritics, so
/// `"Odpady kuchenne ulegające biodegradacji (bio)"` becomes
/// `"odpady_kuchenne_ulegaj_ce_biodegradacji"`.
pub fn legacy_fraction_key(raw_name: &str) -> String {
    let lowercase = raw_name.to_lowercase();
    let key = parenthesized_regex().replace_all(&lowercase, "_");
    let key = non_alphanumeric_regex().replace_all(&key, "_");
    let key = underscores_regex().replace_all(&key, "_");
    key.trim_matches('_').to_string()
}

/// Translate a fraction label, falling back to the label itself.
pub fn translate(raw_name: &str, translations: &TranslationTable) -> String {
    translations
        .get(&fraction_key(raw_name))
        .or_else(|| translations.get(&legacy_fraction_key(raw_name)))
        .map(String::from)
        .unwrap_or_else(|| raw_name.to_string())
}
