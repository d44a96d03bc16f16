//! Feed parser adapter.
//!
//! Turns raw bytes into a [`FeedDocument`] without ever failing: strict
//! parsing goes through `feed-rs`, and when that rejects the document the
//! lenient [`crate::salvage`] scanner recovers what it can and the result is
//! flagged `malformed`.

use std::time::Duration;

use feed_rs::model::{self, FeedType};
use reqwest::Client;

use crate::document::{Entry, FeedDocument, FeedVersion};
use crate::error::FetchError;
use crate::fetch::parse_feed_url;
use crate::salvage;

/// Input to the parser adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Bytes(Vec<u8>),
    /// Fetch-and-parse in one step. Used after a 403, with the parser's own
    /// client identity instead of the fetch client's.
    Url(String),
}

/// Parser adapter with an optional client for [`FeedSource::Url`].
#[derive(Debug, Clone)]
pub struct FeedParser {
    client: Option<Client>,
}

impl FeedParser {
    /// A parser that can fetch [`FeedSource::Url`] sources itself.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client: Some(client),
        })
    }

    /// A parser without network access; URL sources come back malformed.
    #[must_use]
    pub fn offline() -> Self {
        Self { client: None }
    }

    /// Parse `source`. The XML work runs on the blocking pool so concurrent
    /// pipelines parse in parallel.
    pub async fn parse(&self, source: FeedSource) -> FeedDocument {
        let bytes = match source {
            FeedSource::Bytes(bytes) => bytes,
            FeedSource::Url(url) => match self.fetch_direct(&url).await {
                Ok(bytes) => bytes,
                Err(doc) => return doc,
            },
        };
        tokio::task::spawn_blocking(move || parse_bytes(&bytes))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "feed parse task failed");
                FeedDocument::failed(format!("parse task failed: {e}"))
            })
    }

    async fn fetch_direct(&self, url: &str) -> Result<Vec<u8>, FeedDocument> {
        let Some(client) = &self.client else {
            return Err(FeedDocument::failed("direct fetch unavailable"));
        };
        direct_fetch(client, url).await.map_err(|err| {
            tracing::debug!(url, error = %err, "direct feed fetch failed");
            FeedDocument::failed(format!("direct fetch failed: {err}"))
        })
    }
}

/// Single GET, no retries.
async fn direct_fetch(client: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let url = parse_feed_url(url)?;
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

/// Parse raw feed bytes. Pure: identical input gives identical output.
#[must_use]
pub fn parse_bytes(bytes: &[u8]) -> FeedDocument {
    match feed_rs::parser::parse(bytes) {
        Ok(feed) => FeedDocument {
            version: version_of(&feed.feed_type),
            malformed: false,
            malformed_reason: None,
            entries: feed.entries.into_iter().map(entry_from).collect(),
        },
        Err(err) => {
            tracing::debug!(error = %err, "strict feed parse failed, salvaging");
            salvage::salvage(bytes, err.to_string())
        }
    }
}

fn version_of(feed_type: &FeedType) -> FeedVersion {
    match feed_type {
        FeedType::Atom => FeedVersion::Atom,
        FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2 => FeedVersion::Rss,
        // JSON Feed, and anything added upstream later.
        _ => FeedVersion::Unknown,
    }
}

fn entry_from(entry: model::Entry) -> Entry {
    let title = entry
        .title
        .map(|t| decode_text(&t.content).trim().to_owned())
        .unwrap_or_default();

    let summary = entry
        .summary
        .map(|t| t.content)
        .filter(|s| !s.trim().is_empty());
    let body_text = summary
        .or_else(|| entry.content.and_then(|c| c.body))
        .map(|body| decode_text(&body))
        .unwrap_or_default();

    Entry {
        title,
        body_text,
        link: article_link(entry.links),
        timestamp: entry.updated.or(entry.published),
    }
}

/// The alternate (article) link, else the first link of any relation.
fn article_link(links: Vec<model::Link>) -> Option<String> {
    let mut first = None;
    for link in links {
        if link.rel.as_deref().is_none_or(|rel| rel == "alternate") {
            return Some(link.href);
        }
        first.get_or_insert(link.href);
    }
    first
}

/// Decode HTML entities left in feed text (`&nbsp;`, `&eacute;`, ...).
/// Non-breaking spaces become plain spaces so multi-word keywords match.
pub(crate) fn decode_text(raw: &str) -> String {
    html_escape::decode_html_entities(raw).replace('\u{a0}', " ")
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
