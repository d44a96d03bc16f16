use thiserror::Error;

/// Why a feed could not be fetched.
///
/// The `Display` text of each variant is the stable message shown in
/// reports, so operators can tell network-layer failures apart when tuning
/// timeouts and retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Timeout")]
    Timeout,

    #[error("Connection Error")]
    Connection,

    #[error("SSL Error")]
    Tls,

    #[error("Invalid or Malformed URL")]
    InvalidUrl,

    #[error("Redirect Loop Detected")]
    TooManyRedirects,

    #[error("HTTP Error: {status}")]
    Http { status: u16 },

    #[error("General Request Error: {0}")]
    Other(String),
}

impl FetchError {
    /// HTTP statuses worth retrying: rate limiting and transient gateway or
    /// server failures.
    pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

    /// Returns `true` for an HTTP status in [`Self::RETRY_STATUSES`].
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, FetchError::Http { status } if Self::RETRY_STATUSES.contains(status))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let classified = if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_redirect() {
            FetchError::TooManyRedirects
        } else if err.is_builder() {
            FetchError::InvalidUrl
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else if mentions_tls(&err) {
            FetchError::Tls
        } else if err.is_connect() {
            FetchError::Connection
        } else {
            FetchError::Other(err.to_string())
        };
        tracing::debug!(error = %err, kind = %classified, "classified request failure");
        classified
    }
}

/// Walks the source chain looking for a TLS/certificate failure; reqwest
/// reports those as generic connect errors. The top-level message is skipped
/// because it embeds the request URL.
fn mentions_tls(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = err.source();
    while let Some(e) = current {
        let message = e.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| message.contains(needle))
        {
            return true;
        }
        current = e.source();
    }
    false
}
