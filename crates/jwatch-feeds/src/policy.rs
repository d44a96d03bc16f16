//! Pipeline policy: one engine, parameterized per run mode.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::document::{FeedDocument, FeedVersion};
use crate::verdict::Rejection;

const SECS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePolicy {
    /// Per-request timeout for the fetch client.
    pub timeout: Duration,
    /// Total fetch attempts, first try included.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    /// Entries older than `now - recency_window` are never matches. `None`
    /// selects discovery semantics: feed-level relevance only.
    pub recency_window: Option<Duration>,
    pub exclude_atom: bool,
    pub exclude_malformed: bool,
    pub match_all_when_no_keywords: bool,
}

impl PipelinePolicy {
    /// The recency cutoff for a run starting at `now`.
    ///
    /// `Some` whenever a window is set. A window reaching past the earliest
    /// representable time clamps to it, so every dated entry counts as recent.
    #[must_use]
    pub fn cutoff_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let window = self.recency_window?;
        let cutoff = chrono::Duration::from_std(window)
            .ok()
            .and_then(|window| now.checked_sub_signed(window));
        Some(cutoff.unwrap_or(DateTime::<Utc>::MIN_UTC))
    }

    /// Why `doc` is not evaluated under this policy, if it isn't.
    #[must_use]
    pub fn rejection(&self, doc: &FeedDocument) -> Option<Rejection> {
        let reason = || doc.malformed_reason.clone().unwrap_or_default();
        if doc.is_unusable() {
            Some(Rejection::Malformed(reason()))
        } else if self.exclude_malformed && doc.malformed {
            Some(Rejection::MalformedExcluded(reason()))
        } else if self.exclude_atom && doc.version == FeedVersion::Atom {
            Some(Rejection::AtomExcluded)
        } else {
            None
        }
    }

    /// Replace the recency window with a (possibly fractional) day count.
    ///
    /// Always leaves a window in place: counts too large for a `Duration`
    /// saturate, and non-positive or NaN counts give an empty window.
    #[must_use]
    pub fn with_recency_days(mut self, days: f64) -> Self {
        let secs = days * SECS_PER_DAY;
        let window = Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        });
        self.recency_window = Some(window);
        self
    }
}

/// Named run modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Probe every code, keep anything parseable that mentions a keyword.
    DiscoverLenient,
    /// Probe every code, skip Atom and malformed documents.
    DiscoverStrict,
    /// List every matching feed without a recency window.
    CheckListing,
    /// Weekly digest of recent matching entries.
    CheckWeekly,
    /// Weekly digest with the short discovery timeout.
    CheckFast,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::DiscoverLenient,
        Preset::DiscoverStrict,
        Preset::CheckListing,
        Preset::CheckWeekly,
        Preset::CheckFast,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Preset::DiscoverLenient => "discover-lenient",
            Preset::DiscoverStrict => "discover-strict",
            Preset::CheckListing => "check-listing",
            Preset::CheckWeekly => "check-weekly",
            Preset::CheckFast => "check-fast",
        }
    }

    #[must_use]
    pub fn policy(self) -> PipelinePolicy {
        let base = PipelinePolicy {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            recency_window: None,
            exclude_atom: false,
            exclude_malformed: false,
            match_all_when_no_keywords: false,
        };
        match self {
            // Discovery with an empty keyword file lists every live feed.
            Preset::DiscoverLenient => PipelinePolicy {
                timeout: Duration::from_secs(2),
                match_all_when_no_keywords: true,
                ..base
            },
            Preset::DiscoverStrict => PipelinePolicy {
                timeout: Duration::from_secs(2),
                exclude_atom: true,
                exclude_malformed: true,
                ..base
            },
            Preset::CheckListing => PipelinePolicy {
                match_all_when_no_keywords: true,
                ..base
            },
            Preset::CheckWeekly => base.with_recency_days(7.5),
            Preset::CheckFast => PipelinePolicy {
                timeout: Duration::from_secs(2),
                ..base
            }
            .with_recency_days(7.5),
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown preset \"{0}\" (expected one of: discover-lenient, discover-strict, check-listing, check-weekly, check-fast)")]
pub struct UnknownPreset(pub String);

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPreset(s.to_owned()))
    }
}
