//! Normalized feed documents.

use chrono::{DateTime, Utc};

/// Syndication dialect detected in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedVersion {
    Rss,
    Atom,
    Unknown,
}

impl std::fmt::Display for FeedVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedVersion::Rss => write!(f, "RSS"),
            FeedVersion::Atom => write!(f, "ATOM"),
            FeedVersion::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One article-like item from a feed.
///
/// Field fallbacks are resolved once at parse time: `body_text` is the
/// summary, else the first content block, else empty; `timestamp` is the
/// updated time, else the published time, else `None`. A missing timestamp
/// is never replaced with "now" or the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub title: String,
    pub body_text: String,
    pub link: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Entry {
    /// Lowercased `title` and `body_text`, space separated.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.body_text).to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub version: FeedVersion,
    /// The document broke its format's grammar. Entries may still have been
    /// salvaged.
    pub malformed: bool,
    pub malformed_reason: Option<String>,
    pub entries: Vec<Entry>,
}

impl FeedDocument {
    /// A document that could not be obtained or parsed at all.
    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        Self {
            version: FeedVersion::Unknown,
            malformed: true,
            malformed_reason: Some(reason.into()),
            entries: Vec::new(),
        }
    }

    /// Malformed, dialect unknown, and nothing salvaged.
    #[must_use]
    pub fn is_unusable(&self) -> bool {
        self.malformed && self.version == FeedVersion::Unknown && self.entries.is_empty()
    }
}
