//! Shared configuration and input types for jwatch.
//!
//! Everything the feed engine consumes but does not own lives here: the
//! runtime configuration, the normalized keyword set, and the candidate
//! sources (curated feed lists and generated identifier codes).

mod app_config;
mod candidate;
mod codes;
mod config;
mod error;
mod keywords;

pub use app_config::WatchConfig;
pub use candidate::{parse_feed_list, Candidate, FeedListLine};
pub use codes::{AlphaCodes, NumericCodes, UrlTemplate, CODE_PLACEHOLDER};
pub use config::{load_watch_config, load_watch_config_from_env};
pub use error::{ConfigError, CoreError};
pub use keywords::KeywordSet;
