use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;

use super::*;
use crate::error::FetchError;
use crate::policy::Preset;
use crate::verdict::Rejection;

/// Serves canned outcomes by URL; unknown URLs are connection failures.
#[derive(Default)]
struct MemoryFetcher {
    responses: HashMap<String, FetchOutcome>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryFetcher {
    fn with(mut self, url: &str, outcome: FetchOutcome) -> Self {
        self.responses.insert(url.to_owned(), outcome);
        self
    }

    fn with_feed(self, url: &str, xml: &str) -> Self {
        self.with(
            url,
            FetchOutcome::Success {
                body: xml.as_bytes().to_vec(),
                status: 200,
            },
        )
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl FeedFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses
            .get(url)
            .cloned()
            .unwrap_or(FetchOutcome::Failure(FetchError::Connection))
    }
}

fn rss(items: &[(&str, Option<chrono::DateTime<Utc>>)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, ts)| {
            let date = ts
                .map(|t| format!("<pubDate>{}</pubDate>", t.to_rfc2822()))
                .unwrap_or_default();
            format!(
                "<item><title>{title}</title><link>https://example.org/{}</link>{date}</item>",
                title.len()
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title><link>https://example.org</link><description>d</description>{items}</channel></rss>"#
    )
}

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:example:feed</id>
  <title>Atom Journal</title>
  <updated>2025-03-05T00:00:00Z</updated>
  <entry>
    <id>urn:example:1</id>
    <title>Peptide Atom Entry</title>
    <updated>2025-03-04T12:30:00Z</updated>
  </entry>
</feed>"#;

fn keywords(words: &[&str]) -> Arc<KeywordSet> {
    Arc::new(KeywordSet::new(words.iter().copied()))
}

fn dispatcher(
    fetcher: MemoryFetcher,
    preset: Preset,
    kw: Arc<KeywordSet>,
) -> Dispatcher<MemoryFetcher> {
    Dispatcher::new(fetcher, FeedParser::offline(), preset.policy(), kw)
}

fn candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| Candidate::new(format!("c{i}"), format!("http://feeds.test/{i}")))
        .collect()
}

#[tokio::test]
async fn end_to_end_relevant_and_unreachable() {
    let now = Utc::now();
    let fetcher = MemoryFetcher::default()
        .with_feed(
            "http://good.test/rss",
            &rss(&[("New Peptide Synthesis Method", Some(now - chrono::Duration::hours(6)))]),
        )
        .with(
            "http://bad.test/missing",
            FetchOutcome::Failure(FetchError::Http { status: 404 }),
        );
    let d = dispatcher(fetcher, Preset::CheckWeekly, keywords(&["peptide"]));

    let result = d
        .run(vec![
            Candidate::new("JournalA", "http://good.test/rss"),
            Candidate::new("JournalB", "http://bad.test/missing"),
        ])
        .await;

    assert!(!result.cancelled);
    assert_eq!(result.verdicts.len(), 2);

    let a = &result.verdicts[0];
    assert_eq!(a.candidate.label, "JournalA");
    assert_eq!(a.outcome, Outcome::Relevant);
    let titles: Vec<&str> = a.matched_entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["New Peptide Synthesis Method"]);

    let b = &result.verdicts[1];
    assert_eq!(b.candidate.label, "JournalB");
    assert!(matches!(b.outcome, Outcome::Unreachable(_)));
    assert!(b.failure_detail().is_some_and(|d| d.contains("404")));

    assert_eq!(
        result.counters,
        RunCounters {
            attempted: 2,
            processed: 1,
            relevant: 1,
            total_entries: 1,
            relevant_entries: 1,
        }
    );
}

#[tokio::test]
async fn every_candidate_yields_one_verdict_and_counters_stay_ordered() {
    let now = Utc::now();
    let mut fetcher = MemoryFetcher::default();
    for i in 0..40 {
        let url = format!("http://feeds.test/{i}");
        fetcher = match i % 4 {
            0 => fetcher.with_feed(&url, &rss(&[("Peptide news", Some(now))])),
            1 => fetcher.with_feed(&url, &rss(&[("Enzyme news", Some(now))])),
            2 => fetcher.with(
                &url,
                FetchOutcome::Success {
                    body: b"not xml".to_vec(),
                    status: 200,
                },
            ),
            _ => fetcher,
        };
    }
    let d = dispatcher(fetcher, Preset::CheckWeekly, keywords(&["peptide"]))
        .with_workers(4)
        .with_batch_size(7);

    let result = d.run(candidates(40)).await;
    let c = result.counters;

    assert_eq!(result.verdicts.len(), 40);
    let sequences: Vec<u64> = result.verdicts.iter().map(|v| v.sequence).collect();
    assert_eq!(sequences, (0..40).collect::<Vec<_>>());
    assert_eq!(c.attempted, 40);
    assert!(c.relevant <= c.processed && c.processed <= c.attempted);
    assert_eq!(c.processed, 20);
    assert_eq!(c.relevant, 10);
    assert_eq!(d.fetcher.calls.load(Ordering::SeqCst), 40);

    let garbage = &result.verdicts[2];
    assert!(matches!(
        garbage.outcome,
        Outcome::ParseRejected(Rejection::Malformed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn in_flight_pipelines_never_exceed_worker_cap() {
    let mut fetcher = MemoryFetcher::default().with_delay(Duration::from_millis(50));
    for i in 0..30 {
        fetcher = fetcher.with_feed(&format!("http://feeds.test/{i}"), &rss(&[("x", None)]));
    }
    let d = dispatcher(fetcher, Preset::CheckListing, keywords(&["peptide"]))
        .with_workers(5)
        .with_batch_size(100);

    let result = d.run(candidates(30)).await;

    assert_eq!(result.counters.attempted, 30);
    assert_eq!(d.fetcher.peak_in_flight.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn empty_keywords_with_match_all_mark_every_parseable_feed_relevant() {
    let fetcher = MemoryFetcher::default()
        .with_feed("http://feeds.test/0", &rss(&[("Anything at all", None)]))
        .with_feed("http://feeds.test/1", &rss(&[]))
        .with_feed("http://feeds.test/2", ATOM);
    let d = dispatcher(fetcher, Preset::DiscoverLenient, Arc::new(KeywordSet::default()));

    let result = d.run(candidates(4)).await;

    let outcomes: Vec<&Outcome> = result.verdicts.iter().map(|v| &v.outcome).collect();
    assert_eq!(outcomes[0], &Outcome::Relevant);
    assert_eq!(outcomes[1], &Outcome::Relevant);
    assert_eq!(outcomes[2], &Outcome::Relevant);
    assert!(matches!(outcomes[3], Outcome::Unreachable(FetchError::Connection)));
    assert_eq!(result.counters.relevant, 3);
}

#[tokio::test]
async fn strict_discovery_rejects_atom_feeds() {
    let fetcher = MemoryFetcher::default().with_feed("http://feeds.test/0", ATOM);
    let d = dispatcher(fetcher, Preset::DiscoverStrict, keywords(&["peptide"]));

    let result = d.run(candidates(1)).await;

    assert_eq!(
        result.verdicts[0].outcome,
        Outcome::ParseRejected(Rejection::AtomExcluded)
    );
    assert_eq!(result.verdicts[0].failure_detail().as_deref(), Some("Atom Feed Excluded"));
    assert_eq!(result.counters.processed, 0);
    assert_eq!(result.counters.attempted, 1);
}

#[tokio::test]
async fn listing_mode_uses_feed_level_relevance_without_matches() {
    let stale = Utc::now() - chrono::Duration::days(400);
    let fetcher = MemoryFetcher::default().with_feed(
        "http://feeds.test/0",
        &rss(&[("Old peptide paper", Some(stale)), ("Unrelated", None)]),
    );
    let d = dispatcher(fetcher, Preset::CheckListing, keywords(&["peptide"]));

    let result = d.run(candidates(1)).await;

    let v = &result.verdicts[0];
    assert_eq!(v.outcome, Outcome::Relevant);
    assert!(v.matched_entries.is_empty());
    assert_eq!(v.entry_count, 2);
    assert_eq!(result.counters.total_entries, 2);
    assert_eq!(result.counters.relevant_entries, 0);
}

#[tokio::test]
async fn weekly_mode_needs_a_recent_match() {
    let now = Utc::now();
    let fetcher = MemoryFetcher::default()
        .with_feed(
            "http://feeds.test/0",
            &rss(&[("Old peptide paper", Some(now - chrono::Duration::days(30)))]),
        )
        .with_feed(
            "http://feeds.test/1",
            &rss(&[
                ("Peptide one", Some(now)),
                ("Peptide two", Some(now - chrono::Duration::days(2))),
                ("Peptide undated", None),
            ]),
        );
    let d = dispatcher(fetcher, Preset::CheckWeekly, keywords(&["peptide"]));

    let result = d.run(candidates(2)).await;

    assert_eq!(result.verdicts[0].outcome, Outcome::NotRelevant);
    assert_eq!(result.verdicts[1].outcome, Outcome::Relevant);
    assert_eq!(result.verdicts[1].matched_entries.len(), 2);
    // One feed, two entries: the counters are kept apart.
    assert_eq!(result.counters.relevant, 1);
    assert_eq!(result.counters.relevant_entries, 2);
    assert_eq!(result.counters.total_entries, 4);
}

#[tokio::test]
async fn oversized_recency_window_still_requires_a_match() {
    let stale = Utc::now() - chrono::Duration::days(400);
    let fetcher = MemoryFetcher::default()
        .with_feed("http://feeds.test/0", &rss(&[("Old peptide paper", Some(stale))]))
        .with_feed("http://feeds.test/1", &rss(&[("Unrelated", Some(stale))]));
    let policy = Preset::CheckWeekly.policy().with_recency_days(1e9);
    let d = Dispatcher::new(fetcher, FeedParser::offline(), policy, keywords(&["peptide"]));

    let result = d.run(candidates(2)).await;

    assert_eq!(result.verdicts[0].outcome, Outcome::Relevant);
    assert_eq!(result.verdicts[0].matched_entries.len(), 1);
    // A listing-mode fallback would have called this feed relevant.
    assert_eq!(result.verdicts[1].outcome, Outcome::NotRelevant);
    assert_eq!(result.counters.relevant_entries, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parse_and_evaluate_work_on_a_multi_threaded_runtime() {
    let mut fetcher = MemoryFetcher::default();
    for i in 0..20 {
        let title = if i % 2 == 0 { "Peptide paper" } else { "Other" };
        fetcher = fetcher.with_feed(&format!("http://feeds.test/{i}"), &rss(&[(title, None)]));
    }
    let d = dispatcher(fetcher, Preset::CheckListing, keywords(&["peptide"])).with_workers(4);

    let result = d.run(candidates(20)).await;

    assert_eq!(result.verdicts.len(), 20);
    assert_eq!(result.counters.processed, 20);
    assert_eq!(result.counters.relevant, 10);
    assert!(result
        .verdicts
        .iter()
        .enumerate()
        .all(|(i, v)| v.sequence == i as u64));
}

#[tokio::test]
async fn forbidden_without_direct_fetch_is_a_parse_rejection() {
    let fetcher = MemoryFetcher::default().with("http://feeds.test/0", FetchOutcome::Forbidden);
    let d = dispatcher(fetcher, Preset::CheckWeekly, keywords(&["peptide"]));

    let result = d.run(candidates(1)).await;

    assert_eq!(
        result.verdicts[0].outcome,
        Outcome::ParseRejected(Rejection::Malformed("direct fetch unavailable".to_owned()))
    );
    assert_eq!(result.counters.attempted, 1);
    assert_eq!(result.counters.processed, 0);
}

#[tokio::test]
async fn salvaged_document_is_evaluated_with_a_warning() {
    let broken = r#"<rss version="2.0"><channel><title>T</title>
        <item><title>Peptide salvage</title><link>https://example.org/s</link></item>
        <item><title>Broken</b></item>
        </channel></rss>"#;
    let fetcher = MemoryFetcher::default().with_feed("http://feeds.test/0", broken);
    let d = dispatcher(fetcher, Preset::CheckListing, keywords(&["peptide"]));

    let result = d.run(candidates(1)).await;

    let v = &result.verdicts[0];
    assert_eq!(v.outcome, Outcome::Relevant);
    assert!(v.parse_warning.is_some());
    assert_eq!(result.counters.processed, 1);
}

#[tokio::test]
async fn cancellation_before_start_admits_nothing() {
    let (tx, rx) = watch::channel(false);
    tx.send_replace(true);
    let d = dispatcher(MemoryFetcher::default(), Preset::CheckWeekly, keywords(&["peptide"]))
        .with_cancellation(rx);

    let result = d.run(candidates(10)).await;

    assert!(result.cancelled);
    assert!(result.verdicts.is_empty());
    assert_eq!(result.counters.attempted, 0);
}

#[tokio::test]
async fn cancellation_stops_at_the_next_batch_boundary() {
    let (tx, rx) = watch::channel(false);
    let d = dispatcher(MemoryFetcher::default(), Preset::CheckWeekly, keywords(&["peptide"]))
        .with_batch_size(3)
        .with_cancellation(rx);

    let mut seen = 0;
    let summary = d
        .run_with(candidates(10), |_| {
            seen += 1;
            if seen == 2 {
                tx.send_replace(true);
            }
        })
        .await;

    assert!(summary.cancelled);
    assert_eq!(seen, 3);
    assert_eq!(summary.counters.attempted, 3);
}

#[tokio::test]
async fn cancellation_after_the_last_batch_is_not_reported() {
    let (tx, rx) = watch::channel(false);
    let d = dispatcher(MemoryFetcher::default(), Preset::CheckWeekly, keywords(&["peptide"]))
        .with_batch_size(5)
        .with_cancellation(rx);

    let summary = d
        .run_with(candidates(5), |_| {
            tx.send_replace(true);
        })
        .await;

    assert!(!summary.cancelled);
    assert_eq!(summary.counters.attempted, 5);
}

#[tokio::test]
async fn streaming_run_hands_over_every_verdict() {
    let fetcher =
        MemoryFetcher::default().with_feed("http://feeds.test/3", &rss(&[("Peptide", None)]));
    let d = dispatcher(fetcher, Preset::CheckListing, keywords(&["peptide"])).with_batch_size(2);

    let mut sequences = Vec::new();
    let summary = d.run_with(candidates(5), |v| sequences.push(v.sequence)).await;

    sequences.sort_unstable();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    assert_eq!(summary.counters.attempted, 5);
    assert_eq!(summary.counters.relevant, 1);
}

#[tokio::test]
async fn empty_candidate_list_is_a_clean_run() {
    let d = dispatcher(MemoryFetcher::default(), Preset::CheckWeekly, keywords(&["peptide"]));
    let result = d.run(Vec::new()).await;
    assert!(result.verdicts.is_empty());
    assert_eq!(result.counters, RunCounters::default());
    assert!(!result.cancelled);
}
