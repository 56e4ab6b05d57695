//! Human-readable status summary for an enriched response.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::failure::{top_categories, FailureCategory};
use crate::types::{EnrichedResult, FetchStatus};

/// How many failure categories a summary names.
const TOP_CATEGORIES: usize = 3;

/// Counts describing how a search-and-extract request went.
///
/// Lets a caller tell "no results" apart from "results found but content
/// extraction mostly failed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Results the caller asked for.
    pub requested: usize,
    /// Results the provider returned.
    pub obtained: usize,
    /// Extractions that succeeded.
    pub succeeded: usize,
    /// Extractions that failed.
    pub failed: usize,
    /// Targets skipped as non-HTML.
    pub skipped: usize,
    /// Most common failure categories with their counts, most frequent first.
    pub top_failures: Vec<(FailureCategory, usize)>,
}

impl StatusSummary {
    /// Summarise every item that reached a terminal status.
    pub fn from_finished(requested: usize, obtained: usize, finished: &[EnrichedResult]) -> Self {
        let count = |status: FetchStatus| finished.iter().filter(|e| e.status == status).count();
        let categories = finished
            .iter()
            .filter_map(|e| e.error.as_ref())
            .map(|f| f.category);
        Self {
            requested,
            obtained,
            succeeded: count(FetchStatus::Success),
            failed: count(FetchStatus::Error),
            skipped: count(FetchStatus::Skipped),
            top_failures: top_categories(categories, TOP_CATEGORIES),
        }
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requested, ", self.requested)?;
        if self.obtained < self.requested {
            write!(f, "{} found, ", self.obtained)?;
        }
        write!(f, "{} successful, {} failed", self.succeeded, self.failed)?;
        if !self.top_failures.is_empty() {
            let labels: Vec<&str> = self.top_failures.iter().map(|(c, _)| c.label()).collect();
            write!(f, " ({})", labels.join(", "))?;
        }
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}
