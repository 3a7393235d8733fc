//! Resource label derivation: plural resource names to singular/plural label pairs.

use crate::error::ConfigError;

/// Singular/plural labels for one resource, derived once at service construction.
/// Used in error messages and as relation keys on peer resources.
#[derive(Clone, Debug)]
pub struct LabelPair {
    pub singular: String,
    pub plural: String,
    pub singular_capitalized: String,
    pub plural_capitalized: String,
}

impl LabelPair {
    /// Derive labels from a plural resource name.
    /// Fails if the name is empty or not plural-shaped.
    pub fn derive(plural: &str) -> Result<LabelPair, ConfigError> {
        if plural.is_empty() {
            return Err(ConfigError::MissingResource);
        }
        if !is_plural(plural) {
            return Err(ConfigError::NotPlural(plural.to_string()));
        }
        let singular = singularize(plural);
        Ok(LabelPair {
            singular_capitalized: capitalize(&singular),
            plural_capitalized: capitalize(plural),
            singular,
            plural: plural.to_string(),
        })
    }
}

/// Plural-shape check: ends in "s" but not "ss" (e.g. "address" is not plural).
pub fn is_plural(word: &str) -> bool {
    word.ends_with('s') && !word.ends_with("ss")
}

/// Singular form of a plural English noun.
/// e.g. "companies" -> "company", "boxes" -> "box", "posts" -> "post"
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = word.strip_suffix("es") {
        for suffix in ["s", "x", "z", "ch", "sh"] {
            if stem.ends_with(suffix) {
                return stem.to_string();
            }
        }
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// Uppercase the first character.
/// e.g. "posts" -> "Posts"
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
