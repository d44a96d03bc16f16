//! Settings shared by the `check` and `discover` commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use jwatch_core::{KeywordSet, WatchConfig};
use jwatch_feeds::{Dispatcher, FeedParser, HttpFeedClient, PipelinePolicy, Preset};
use tokio::sync::watch;

/// Flags that override `JWATCH_*` settings for one invocation.
#[derive(Debug, Args)]
pub struct RunOptions {
    /// Keyword file, one keyword per line
    #[arg(long)]
    pub keywords: Option<PathBuf>,
    /// Directory the report is written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Maximum simultaneous feed requests
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,
    /// Candidates admitted per batch
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,
}

impl RunOptions {
    pub fn keywords_path(&self, config: &WatchConfig) -> PathBuf {
        self.keywords
            .clone()
            .unwrap_or_else(|| config.keywords_path.clone())
    }

    pub fn output_dir(&self, config: &WatchConfig) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone())
    }
}

/// Recency window in days: positive and finite.
pub fn parse_days(raw: &str) -> Result<f64, String> {
    let days: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if days.is_finite() && days > 0.0 {
        Ok(days)
    } else {
        Err("must be a positive number of days".to_string())
    }
}

/// The preset's policy with configuration and flag overrides applied.
///
/// Presets built for quick probing take the discovery timeout, the others
/// the check timeout. `days` only affects presets that have a recency
/// window.
pub fn policy_for(
    preset: Preset,
    config: &WatchConfig,
    opts: &RunOptions,
    days: Option<f64>,
) -> PipelinePolicy {
    let mut policy = preset.policy();

    let default_timeout_ms = match preset {
        Preset::DiscoverLenient | Preset::DiscoverStrict | Preset::CheckFast => {
            config.discover_timeout_ms
        }
        Preset::CheckListing | Preset::CheckWeekly => config.check_timeout_ms,
    };
    policy.timeout = Duration::from_millis(opts.timeout_ms.unwrap_or(default_timeout_ms));
    policy.max_attempts = config.max_attempts;
    policy.backoff_base = Duration::from_millis(config.backoff_base_ms);

    if policy.recency_window.is_some() {
        policy = policy.with_recency_days(days.unwrap_or(config.recency_days));
    } else if days.is_some() {
        tracing::warn!(preset = %preset, "preset has no recency window, --days ignored");
    }
    policy
}

/// Recency window of `policy` in days, for report summaries.
pub fn recency_days(policy: &PipelinePolicy) -> Option<f64> {
    policy
        .recency_window
        .map(|window| window.as_secs_f64() / 86_400.0)
}

pub fn load_keywords(path: &std::path::Path) -> anyhow::Result<Arc<KeywordSet>> {
    let keywords = KeywordSet::load(path)
        .with_context(|| format!("failed to load keywords from {}", path.display()))?;
    tracing::info!(path = %path.display(), count = keywords.len(), "keywords loaded");
    tracing::debug!(keywords = ?keywords.iter().collect::<Vec<_>>(), "active keywords");
    Ok(Arc::new(keywords))
}

/// Wire the HTTP client, parser, and worker settings into a dispatcher.
pub fn build_dispatcher(
    config: &WatchConfig,
    opts: &RunOptions,
    policy: PipelinePolicy,
    keywords: Arc<KeywordSet>,
    cancel: watch::Receiver<bool>,
) -> anyhow::Result<Dispatcher<HttpFeedClient>> {
    let client = HttpFeedClient::new(
        policy.timeout,
        &config.user_agent,
        policy.max_attempts,
        policy.backoff_base,
    )
    .context("failed to build feed HTTP client")?;
    let parser = FeedParser::new(policy.timeout, &config.fallback_user_agent)
        .context("failed to build fallback feed client")?;

    let workers = opts
        .workers
        .map_or(Ok(config.max_workers), usize::try_from)
        .context("--workers out of range")?;
    let batch_size = opts
        .batch_size
        .map_or(Ok(config.batch_size), usize::try_from)
        .context("--batch-size out of range")?;

    Ok(Dispatcher::new(client, parser, policy, keywords)
        .with_workers(workers)
        .with_batch_size(batch_size)
        .with_cancellation(cancel))
}

/// A receiver that flips to `true` on the first Ctrl-C. A second Ctrl-C
/// exits immediately.
pub fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::warn!("received ctrl-c, finishing in-flight feeds (press again to abort)");
        tx.send_replace(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    rx
}
