//! Concurrent feed acquisition and keyword filtering.
//!
//! A candidate URL flows through fetch → parse → evaluate and comes out as a
//! [`Verdict`]. The [`Dispatcher`] runs many of these pipelines at once over
//! a bounded worker pool and keeps the run-wide [`RunCounters`].

pub mod dispatch;
pub mod document;
pub mod error;
pub mod evaluate;
pub mod fetch;
pub mod parse;
pub mod policy;
pub mod verdict;

mod retry;
mod salvage;

pub use dispatch::{Dispatcher, RunResult, RunSummary};
pub use document::{Entry, FeedDocument, FeedVersion};
pub use error::FetchError;
pub use evaluate::{evaluate, Evaluation};
pub use fetch::{FeedFetcher, FetchOutcome, HttpFeedClient};
pub use parse::{parse_bytes, FeedParser, FeedSource};
pub use policy::{PipelinePolicy, Preset, UnknownPreset};
pub use verdict::{Outcome, Rejection, RunCounters, Verdict};
