//! Keyword relevance and recency filtering.

use chrono::{DateTime, Utc};
use jwatch_core::KeywordSet;

use crate::document::{Entry, FeedDocument};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Evaluation {
    /// Some keyword occurs somewhere in the feed's combined entry text.
    pub feed_relevant: bool,
    /// Entries that are recent and keyword-matching. Always empty when no
    /// cutoff was supplied.
    pub matches: Vec<Entry>,
}

/// Decide feed-level relevance and, when `cutoff` is set, pick the recent
/// matching entries.
///
/// An empty keyword set matches everything only when
/// `match_all_when_no_keywords` is set. Entries without a timestamp are
/// never recent.
#[must_use]
pub fn evaluate(
    doc: &FeedDocument,
    keywords: &KeywordSet,
    cutoff: Option<DateTime<Utc>>,
    match_all_when_no_keywords: bool,
) -> Evaluation {
    let text_matches = |lowercased: &str| {
        if keywords.is_empty() {
            match_all_when_no_keywords
        } else {
            keywords.any_in(lowercased)
        }
    };

    let feed_relevant = text_matches(&feed_text(doc));

    let matches = match cutoff {
        Some(cutoff) if feed_relevant => doc
            .entries
            .iter()
            .filter(|entry| entry.timestamp.is_some_and(|ts| ts >= cutoff))
            .filter(|entry| text_matches(&entry.searchable_text()))
            .cloned()
            .collect(),
        _ => Vec::new(),
    };

    Evaluation {
        feed_relevant,
        matches,
    }
}

/// Lowercased title and body text of every entry, space separated.
fn feed_text(doc: &FeedDocument) -> String {
    doc.entries
        .iter()
        .map(Entry::searchable_text)
        .collect::<Vec<_>>()
        .join(" ")
}
