//! Candidate feeds and the curated feed-list format.

use std::path::Path;

use crate::CoreError;

const FEED_LIST_SEPARATOR: &str = " - ";

/// One feed URL to check, with the label it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub url: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// A non-empty line of a feed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedListLine {
    /// A line without the `" - "` separator; rendered as a report heading.
    Section(String),
    Candidate(Candidate),
}

/// Parse newline-delimited `"<label> - <url>"` entries.
///
/// Lines are trimmed and blank lines dropped. Only the first separator
/// splits, so labels may not contain `" - "` but URLs may.
#[must_use]
pub fn parse_feed_list(text: &str) -> Vec<FeedListLine> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(FEED_LIST_SEPARATOR) {
            Some((label, url)) => FeedListLine::Candidate(Candidate::new(label, url)),
            None => FeedListLine::Section(line.to_string()),
        })
        .collect()
}

impl FeedListLine {
    /// Read and parse a feed-list file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file cannot be read.
    pub fn load_all(path: &Path) -> Result<Vec<Self>, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(parse_feed_list(&text))
    }
}
