//! Plain-text report rendering and output.
//!
//! Rendering is pure; [`write_report`] is the only function that touches the
//! filesystem.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use jwatch_core::{Candidate, FeedListLine};
use jwatch_feeds::{Outcome, RunCounters, RunResult, Verdict};

const BLOCK_RULE_WIDTH: usize = 50;
const FILE_TIMESTAMP: &str = "%Y-%m-%d_%H-%M-%S";

/// Run facts printed in every summary block.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub started: DateTime<Local>,
    pub recency_days: Option<f64>,
    pub keyword_count: usize,
}

/// `<prefix>_<YYYY-mm-dd_HH-MM-SS>.txt`
pub fn file_name(prefix: &str, started: DateTime<Local>) -> String {
    format!("{prefix}_{}.txt", started.format(FILE_TIMESTAMP))
}

/// Write `contents` to a timestamped file under `dir`, creating `dir` if
/// needed.
pub fn write_report(
    dir: &Path,
    prefix: &str,
    started: DateTime<Local>,
    contents: &str,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let path = dir.join(file_name(prefix, started));
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    Ok(path)
}

/// Digest report for a feed-list run.
///
/// Blocks follow the feed list; section headers stay where they were.
/// Candidates without a verdict (cancelled runs) are marked as not checked.
pub fn render_check(lines: &[FeedListLine], result: &RunResult, meta: &ReportMeta) -> String {
    let mut out = Vec::new();
    let mut verdicts = result.verdicts.iter().peekable();
    let mut sequence = 0_u64;

    for line in lines {
        match line {
            FeedListLine::Section(title) => {
                let rule = "=".repeat(title.chars().count());
                out.push(String::new());
                out.push(rule.clone());
                out.push(title.clone());
                out.push(rule);
                out.push(String::new());
            }
            FeedListLine::Candidate(candidate) => {
                let verdict = verdicts.next_if(|v| v.sequence == sequence);
                sequence += 1;
                check_block(&mut out, candidate, verdict);
            }
        }
    }

    summary_block(&mut out, &result.counters, result.cancelled, meta);
    join_lines(out)
}

fn check_block(out: &mut Vec<String>, candidate: &Candidate, verdict: Option<&Verdict>) {
    let rule = "-".repeat(BLOCK_RULE_WIDTH);
    out.push(rule.clone());
    out.push(format!("Source: {}", candidate.label));

    let Some(verdict) = verdict else {
        out.push("Not checked (run cancelled)".to_string());
        out.push(rule);
        return;
    };

    match &verdict.outcome {
        Outcome::Unreachable(err) => {
            out.push(format!("Unable to Access Feed ({err})"));
        }
        Outcome::ParseRejected(rejection) => {
            out.push(format!("Detected Feed Type: {}", verdict.version));
            out.push(format!("Unable to Parse Feed ({rejection})"));
        }
        Outcome::Relevant | Outcome::NotRelevant => {
            out.push(format!("Detected Feed Type: {}", verdict.version));
            if let Some(warning) = &verdict.parse_warning {
                out.push(format!("Feed Parsing Warning: {warning}"));
            }
            out.push("Titles:".to_string());
            for entry in &verdict.matched_entries {
                let title = if entry.title.is_empty() {
                    "No Title"
                } else {
                    entry.title.as_str()
                };
                out.push(format!("- {title}"));
                out.push(format!("Link: {}", entry.link.as_deref().unwrap_or_default()));
            }
            if verdict.is_relevant() && verdict.matched_entries.is_empty() {
                out.push(format!(
                    "(keywords found across {} entries)",
                    verdict.entry_count
                ));
            }
        }
    }
    out.push(rule);
}

/// Discovery report: one `<code> - <url>` line per relevant candidate, in
/// the order given.
pub fn render_discovery(
    found: &[Candidate],
    counters: &RunCounters,
    cancelled: bool,
    meta: &ReportMeta,
) -> String {
    let mut out: Vec<String> = found
        .iter()
        .map(|c| format!("{} - {}", c.label, c.url))
        .collect();
    summary_block(&mut out, counters, cancelled, meta);
    join_lines(out)
}

fn summary_block(
    out: &mut Vec<String>,
    counters: &RunCounters,
    cancelled: bool,
    meta: &ReportMeta,
) {
    out.push(String::new());
    out.push("=======".to_string());
    out.push("Summary".to_string());
    out.push("=======".to_string());
    out.push(format!("Total Feeds Attempted: {}", counters.attempted));
    out.push(format!("Total Feeds Processed: {}", counters.processed));
    out.push(format!("Total Relevant Feeds: {}", counters.relevant));
    out.push(format!("Total Entries Checked: {}", counters.total_entries));
    out.push(format!("Total Relevant Entries: {}", counters.relevant_entries));
    out.push(format!("Keywords: {}", meta.keyword_count));

    let checked_at = meta.started.format("%Y-%m-%d %H:%M:%S %Z");
    match meta.recency_days {
        Some(days) => out.push(format!(
            "Feeds checked at {checked_at}, entries compiled from prior {days} days"
        )),
        None => out.push(format!("Feeds checked at {checked_at}")),
    }
    if cancelled {
        out.push("Run cancelled before every candidate was checked.".to_string());
    }
    out.push(
        "Inaccessible feeds and feeds without relevant posts are excluded; this is not a comprehensive list."
            .to_string(),
    );
}

fn join_lines(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
