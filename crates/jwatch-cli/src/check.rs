//! `jwatch check`: run the feed list and write a digest report.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::Args;
use jwatch_core::{FeedListLine, WatchConfig};
use jwatch_feeds::Preset;
use tokio::sync::watch;

use crate::report::{self, ReportMeta};
use crate::run::{self, RunOptions};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Run mode: check-weekly, check-fast, check-listing, ...
    #[arg(long, default_value = "check-weekly")]
    pub preset: Preset,
    /// Feed list, one `<label> - <url>` per line; other lines are section headers
    #[arg(long)]
    pub feeds: Option<PathBuf>,
    /// Recency window in days (presets with a window only)
    #[arg(long, value_parser = run::parse_days)]
    pub days: Option<f64>,
    #[command(flatten)]
    pub run: RunOptions,
}

pub async fn run_check(
    config: &WatchConfig,
    args: &CheckArgs,
    cancel: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let started = Local::now();
    let policy = run::policy_for(args.preset, config, &args.run, args.days);
    let recency_days = run::recency_days(&policy);
    let match_all = policy.match_all_when_no_keywords;

    let keywords = run::load_keywords(&args.run.keywords_path(config))?;
    if keywords.is_empty() && !match_all {
        tracing::warn!(preset = %args.preset, "keyword list is empty, no feed can match");
    }

    let feeds_path = args.feeds.clone().unwrap_or_else(|| config.feeds_path.clone());
    let lines = FeedListLine::load_all(&feeds_path)
        .with_context(|| format!("failed to load feed list from {}", feeds_path.display()))?;
    let candidates: Vec<_> = lines
        .iter()
        .filter_map(|line| match line {
            FeedListLine::Candidate(candidate) => Some(candidate.clone()),
            FeedListLine::Section(_) => None,
        })
        .collect();
    tracing::info!(
        preset = %args.preset,
        feeds = candidates.len(),
        path = %feeds_path.display(),
        "starting feed check"
    );

    let meta = ReportMeta {
        started,
        recency_days,
        keyword_count: keywords.len(),
    };
    let dispatcher = run::build_dispatcher(config, &args.run, policy, keywords, cancel)?;
    let result = dispatcher.run(candidates).await;

    let text = report::render_check(&lines, &result, &meta);
    let path = report::write_report(&args.run.output_dir(config), "Check", started, &text)?;

    tracing::info!(
        path = %path.display(),
        attempted = result.counters.attempted,
        relevant = result.counters.relevant,
        cancelled = result.cancelled,
        "check complete"
    );
    println!("Results written to {}", path.display());
    Ok(())
}
