//! Per-candidate verdicts and run-wide counters.

use jwatch_core::Candidate;
use thiserror::Error;

use crate::document::{Entry, FeedDocument, FeedVersion};
use crate::error::FetchError;

/// Why a fetched document was not evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Malformed Feed: {0}")]
    Malformed(String),

    #[error("Malformed Feed Excluded: {0}")]
    MalformedExcluded(String),

    #[error("Atom Feed Excluded")]
    AtomExcluded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Relevant,
    NotRelevant,
    Unreachable(FetchError),
    ParseRejected(Rejection),
}

/// The result of running one candidate through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Admission order within the run, starting at 0. Reports sort on this;
    /// verdicts themselves arrive in completion order.
    pub sequence: u64,
    pub candidate: Candidate,
    pub outcome: Outcome,
    pub version: FeedVersion,
    /// Parse anomaly for a document that was still evaluated.
    pub parse_warning: Option<String>,
    pub matched_entries: Vec<Entry>,
    pub entry_count: usize,
}

impl Verdict {
    pub(crate) fn unreachable(sequence: u64, candidate: Candidate, err: FetchError) -> Self {
        Self {
            sequence,
            candidate,
            outcome: Outcome::Unreachable(err),
            version: FeedVersion::Unknown,
            parse_warning: None,
            matched_entries: Vec::new(),
            entry_count: 0,
        }
    }

    pub(crate) fn rejected(
        sequence: u64,
        candidate: Candidate,
        doc: &FeedDocument,
        rejection: Rejection,
    ) -> Self {
        Self {
            sequence,
            candidate,
            outcome: Outcome::ParseRejected(rejection),
            version: doc.version,
            parse_warning: None,
            matched_entries: Vec::new(),
            entry_count: doc.entries.len(),
        }
    }

    #[must_use]
    pub fn is_relevant(&self) -> bool {
        self.outcome == Outcome::Relevant
    }

    /// Operator-facing reason for an `Unreachable` or `ParseRejected`
    /// outcome.
    #[must_use]
    pub fn failure_detail(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Unreachable(err) => Some(err.to_string()),
            Outcome::ParseRejected(rejection) => Some(rejection.to_string()),
            Outcome::Relevant | Outcome::NotRelevant => None,
        }
    }
}

/// Run-wide tallies.
///
/// `relevant` counts feeds, `relevant_entries` counts matching entries
/// across all feeds; the two are kept apart on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounters {
    pub attempted: u64,
    /// Documents accepted by the policy and evaluated.
    pub processed: u64,
    pub relevant: u64,
    pub total_entries: u64,
    pub relevant_entries: u64,
}
