//! Normalized keyword set used for relevance matching.

use std::collections::BTreeSet;
use std::path::Path;

use crate::CoreError;

/// Lowercase, trimmed, non-empty keywords.
///
/// Matching is substring containment against lowercased text, so a keyword
/// `"cat"` matches inside `"catalog"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: BTreeSet<String>,
}

impl KeywordSet {
    /// Build a set from raw keyword strings, normalizing each one.
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = raw
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Build a set from newline-delimited text.
    #[must_use]
    pub fn from_lines(text: &str) -> Self {
        Self::new(text.lines())
    }

    /// Read a newline-delimited keyword file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_lines(&text))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Returns `true` if any keyword occurs in `lowercased`.
    ///
    /// The caller is responsible for lowercasing; an empty set never matches.
    #[must_use]
    pub fn any_in(&self, lowercased: &str) -> bool {
        self.keywords.iter().any(|k| lowercased.contains(k.as_str()))
    }
}
