//! `jwatch discover`: scan generated feed URLs for live, relevant feeds.

use anyhow::Context;
use chrono::Local;
use clap::Args;
use jwatch_core::{AlphaCodes, Candidate, NumericCodes, UrlTemplate, WatchConfig};
use jwatch_feeds::Preset;
use tokio::sync::watch;

use crate::report::{self, ReportMeta};
use crate::run::{self, RunOptions};

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Feed URL containing a `{code}` placeholder
    #[arg(long)]
    pub template: String,
    /// Run mode: discover-lenient or discover-strict
    #[arg(long, default_value = "discover-lenient")]
    pub preset: Preset,
    /// Probe every lowercase alphabetic code of this length instead of numeric codes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=6))]
    pub alpha: Option<u64>,
    /// Zero-padded width of numeric codes
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub width: u32,
    /// First numeric code (inclusive)
    #[arg(long, default_value_t = 0)]
    pub start: u64,
    /// Last numeric code (exclusive); defaults to 10^width
    #[arg(long)]
    pub end: Option<u64>,
    /// Allowed first digits of numeric codes; empty allows all
    #[arg(long, default_value = "01")]
    pub leading_digits: String,
    #[command(flatten)]
    pub run: RunOptions,
}

impl DiscoverArgs {
    /// The code sequence selected by the flags, rendered into candidates.
    fn candidates(
        &self,
        template: UrlTemplate,
    ) -> anyhow::Result<Box<dyn Iterator<Item = Candidate>>> {
        if let Some(length) = self.alpha {
            let length = usize::try_from(length).context("--alpha out of range")?;
            tracing::info!(length, total = AlphaCodes::total(length), "probing alphabetic codes");
            return Ok(Box::new(
                AlphaCodes::new(length).map(move |code| template.candidate(code)),
            ));
        }

        let end = self.end.unwrap_or_else(|| 10_u64.pow(self.width));
        tracing::info!(
            width = self.width,
            start = self.start,
            end,
            leading = %self.leading_digits,
            "probing numeric codes"
        );
        let width = usize::try_from(self.width).context("--width out of range")?;
        let codes =
            NumericCodes::new(width, self.start, end).with_leading_digits(&self.leading_digits);
        Ok(Box::new(codes.map(move |code| template.candidate(code))))
    }
}

pub async fn run_discover(
    config: &WatchConfig,
    args: &DiscoverArgs,
    cancel: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let started = Local::now();
    let template = UrlTemplate::parse(&args.template).context("invalid --template")?;
    let policy = run::policy_for(args.preset, config, &args.run, None);
    let recency_days = run::recency_days(&policy);

    let keywords = run::load_keywords(&args.run.keywords_path(config))?;
    let meta = ReportMeta {
        started,
        recency_days,
        keyword_count: keywords.len(),
    };
    let candidates = args.candidates(template)?;
    let dispatcher = run::build_dispatcher(config, &args.run, policy, keywords, cancel)?;

    // Only hits are kept; the code space can be far larger than memory.
    let mut found: Vec<(u64, Candidate)> = Vec::new();
    let summary = dispatcher
        .run_with(candidates, |verdict| {
            if verdict.is_relevant() {
                tracing::info!(
                    code = %verdict.candidate.label,
                    url = %verdict.candidate.url,
                    "relevant feed found"
                );
                found.push((verdict.sequence, verdict.candidate));
            }
        })
        .await;
    found.sort_by_key(|(sequence, _)| *sequence);
    let found: Vec<Candidate> = found.into_iter().map(|(_, candidate)| candidate).collect();

    let text = report::render_discovery(&found, &summary.counters, summary.cancelled, &meta);
    let path = report::write_report(
        &args.run.output_dir(config),
        "Relevant_Journals",
        started,
        &text,
    )?;

    tracing::info!(
        path = %path.display(),
        attempted = summary.counters.attempted,
        relevant = summary.counters.relevant,
        cancelled = summary.cancelled,
        "discovery complete"
    );
    println!("Results written to {}", path.display());
    Ok(())
}
