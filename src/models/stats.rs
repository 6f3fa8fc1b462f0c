//! Pull request statistics.

use serde::Serialize;

/// Aggregate counts over all pull requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrStats {
    pub total_prs: i64,
    pub open_prs: i64,
    pub merged_prs: i64,
    /// Reviewer rows divided by distinct PRs; 0 when there are no PRs.
    pub avg_reviewers_per_pr: f64,
}
