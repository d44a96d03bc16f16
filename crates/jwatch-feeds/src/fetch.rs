//! HTTP fetch client for feed URLs.

use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client, StatusCode, Url};

use crate::error::FetchError;
use crate::retry::retry_with_backoff;

/// Redirect hops followed before a request counts as a redirect loop.
const MAX_REDIRECTS: usize = 30;

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8";

/// Result of a single logical fetch (retries included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { body: Vec<u8>, status: u16 },
    /// HTTP 403. The body is unusable; callers fall back to the direct-URL
    /// parse path.
    Forbidden,
    Failure(FetchError),
}

/// Source of raw feed bytes.
///
/// [`HttpFeedClient`] is the production implementation; tests substitute an
/// in-memory one.
pub trait FeedFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchOutcome> + Send;
}

/// GET-only feed client with a browser identity, per-request timeout, and
/// retry on transient server statuses.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: Client,
    /// Total attempts per fetch, first try included.
    max_attempts: u32,
    /// Base delay for exponential back-off: `backoff_base * 2^(n-1)` before
    /// the n-th retry.
    backoff_base: Duration,
}

impl HttpFeedClient {
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the underlying `reqwest::Client` cannot be
    /// constructed (e.g., invalid TLS config).
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        max_attempts: u32,
        backoff_base: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            client,
            max_attempts,
            backoff_base,
        })
    }

    async fn get(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let url = parse_feed_url(url)?;

        let response = retry_with_backoff(self.max_attempts, self.backoff_base, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url)
                    .header(header::ACCEPT, FEED_ACCEPT)
                    .send()
                    .await?;
                let status = response.status().as_u16();
                if FetchError::RETRY_STATUSES.contains(&status) {
                    return Err(FetchError::Http { status });
                }
                Ok(response)
            }
        })
        .await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Ok(FetchOutcome::Forbidden);
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?.to_vec();
        Ok(FetchOutcome::Success {
            body,
            status: status.as_u16(),
        })
    }
}

impl FeedFetcher for HttpFeedClient {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.get(url).await {
            Ok(outcome) => outcome,
            Err(err) => FetchOutcome::Failure(err),
        }
    }
}

/// Parses `raw` as an absolute http(s) URL.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] for anything else.
pub(crate) fn parse_feed_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        tracing::debug!(url = raw, error = %e, "rejecting unparseable feed URL");
        FetchError::InvalidUrl
    })?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(FetchError::InvalidUrl),
    }
}
