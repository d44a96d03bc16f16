//! Bounded-concurrency dispatcher over the fetch → parse → evaluate pipeline.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::{self, StreamExt};
use jwatch_core::{Candidate, KeywordSet};
use tokio::sync::watch;

use crate::document::FeedDocument;
use crate::evaluate::{evaluate, Evaluation};
use crate::fetch::{FeedFetcher, FetchOutcome};
use crate::parse::{FeedParser, FeedSource};
use crate::policy::PipelinePolicy;
use crate::verdict::{Outcome, RunCounters, Verdict};

pub const DEFAULT_MAX_WORKERS: usize = 15;
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Verdicts (in candidate order) and counters from a collecting run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub verdicts: Vec<Verdict>,
    pub counters: RunCounters,
    pub cancelled: bool,
}

/// Counters from a streaming run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub counters: RunCounters,
    /// The run stopped admitting candidates because the cancellation signal
    /// fired.
    pub cancelled: bool,
}

/// Runs candidates through the pipeline on at most `max_workers` concurrent
/// tasks, `batch_size` candidates at a time.
///
/// Every admitted candidate yields exactly one [`Verdict`]. All members of a
/// batch finish before the next batch is admitted.
pub struct Dispatcher<F> {
    fetcher: F,
    parser: FeedParser,
    policy: PipelinePolicy,
    keywords: Arc<KeywordSet>,
    max_workers: usize,
    batch_size: usize,
    cancel: Option<watch::Receiver<bool>>,
}

impl<F: FeedFetcher> Dispatcher<F> {
    #[must_use]
    pub fn new(
        fetcher: F,
        parser: FeedParser,
        policy: PipelinePolicy,
        keywords: Arc<KeywordSet>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            policy,
            keywords,
            max_workers: DEFAULT_MAX_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: None,
        }
    }

    /// Cap on simultaneous in-flight pipelines. Zero is treated as one.
    #[must_use]
    pub fn with_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Candidates admitted per batch. Zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Stop admitting new batches once `cancel` carries `true`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run every candidate and collect the verdicts, sorted by sequence.
    pub async fn run<I>(&self, candidates: I) -> RunResult
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut verdicts = Vec::new();
        let summary = self.run_with(candidates, |v| verdicts.push(v)).await;
        verdicts.sort_by_key(|v| v.sequence);
        RunResult {
            verdicts,
            counters: summary.counters,
            cancelled: summary.cancelled,
        }
    }

    /// Run every candidate, handing each verdict to `on_verdict` as it
    /// completes. Verdicts arrive in completion order.
    pub async fn run_with<I, C>(&self, candidates: I, mut on_verdict: C) -> RunSummary
    where
        I: IntoIterator<Item = Candidate>,
        C: FnMut(Verdict),
    {
        let counters = Mutex::new(RunCounters::default());
        let cutoff = self.policy.cutoff_from(Utc::now());
        let mut pending = candidates.into_iter().zip(0_u64..).peekable();
        let mut admitted = 0_u64;
        let mut cancelled = false;

        while pending.peek().is_some() {
            if self.is_cancelled() {
                tracing::warn!(admitted, "cancellation requested, no further batches admitted");
                cancelled = true;
                break;
            }

            let batch: Vec<(Candidate, u64)> = pending.by_ref().take(self.batch_size).collect();
            if let Some((_, last)) = batch.last() {
                admitted = last + 1;
            }

            stream::iter(batch)
                .map(|(candidate, sequence)| self.process(sequence, candidate, cutoff, &counters))
                .buffer_unordered(self.max_workers)
                .for_each(|verdict| {
                    on_verdict(verdict);
                    future::ready(())
                })
                .await;

            let snapshot = *lock(&counters);
            tracing::info!(
                admitted,
                attempted = snapshot.attempted,
                processed = snapshot.processed,
                relevant = snapshot.relevant,
                relevant_entries = snapshot.relevant_entries,
                "batch complete"
            );
        }

        let counters = *lock(&counters);
        RunSummary {
            counters,
            cancelled,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    async fn process(
        &self,
        sequence: u64,
        candidate: Candidate,
        cutoff: Option<DateTime<Utc>>,
        counters: &Mutex<RunCounters>,
    ) -> Verdict {
        lock(counters).attempted += 1;

        let source = match self.fetcher.fetch(&candidate.url).await {
            FetchOutcome::Success { body, .. } => FeedSource::Bytes(body),
            FetchOutcome::Forbidden => {
                tracing::debug!(
                    label = %candidate.label,
                    url = %candidate.url,
                    "403, retrying through the parser"
                );
                FeedSource::Url(candidate.url.clone())
            }
            FetchOutcome::Failure(err) => {
                tracing::debug!(
                    label = %candidate.label,
                    url = %candidate.url,
                    error = %err,
                    "feed unreachable"
                );
                return Verdict::unreachable(sequence, candidate, err);
            }
        };

        let doc = self.parser.parse(source).await;
        if let Some(rejection) = self.policy.rejection(&doc) {
            tracing::debug!(
                label = %candidate.label,
                url = %candidate.url,
                reason = %rejection,
                "feed rejected"
            );
            return Verdict::rejected(sequence, candidate, &doc, rejection);
        }

        let doc = Arc::new(doc);
        let evaluation = self.evaluate_off_runtime(Arc::clone(&doc), cutoff).await;
        // With a recency window a feed only counts once it has a recent match.
        let relevant = if cutoff.is_some() {
            !evaluation.matches.is_empty()
        } else {
            evaluation.feed_relevant
        };

        {
            let mut c = lock(counters);
            c.processed += 1;
            c.total_entries += as_count(doc.entries.len());
            c.relevant_entries += as_count(evaluation.matches.len());
            if relevant {
                c.relevant += 1;
            }
        }

        let parse_warning = if doc.malformed {
            doc.malformed_reason.clone()
        } else {
            None
        };

        Verdict {
            sequence,
            candidate,
            outcome: if relevant {
                Outcome::Relevant
            } else {
                Outcome::NotRelevant
            },
            version: doc.version,
            parse_warning,
            matched_entries: evaluation.matches,
            entry_count: doc.entries.len(),
        }
    }

    /// Keyword and recency evaluation on the blocking pool.
    async fn evaluate_off_runtime(
        &self,
        doc: Arc<FeedDocument>,
        cutoff: Option<DateTime<Utc>>,
    ) -> Evaluation {
        let keywords = Arc::clone(&self.keywords);
        let match_all = self.policy.match_all_when_no_keywords;
        tokio::task::spawn_blocking(move || evaluate(&doc, &keywords, cutoff, match_all))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "feed evaluation task failed");
                Evaluation::default()
            })
    }
}

fn lock(counters: &Mutex<RunCounters>) -> MutexGuard<'_, RunCounters> {
    counters.lock().unwrap_or_else(PoisonError::into_inner)
}

fn as_count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
