//! Pull request model.

use super::UserId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a pull request. Only moves OPEN -> MERGED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestStatus {
    Open,
    Merged,
}

impl PullRequestStatus {
    /// Column value stored in `pull_requests.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }
}

impl From<&str> for PullRequestStatus {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MERGED" => Self::Merged,
            _ => Self::Open,
        }
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request row as stored in SQLite.
#[derive(Debug, Clone, FromRow)]
pub struct PullRequestRow {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: i64,
    pub status: String,
    /// Creation timestamp (Unix seconds).
    pub created_at: i64,
    /// Merge timestamp (Unix seconds, set once on merge).
    pub merged_at: Option<i64>,
}

/// A pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: UserId,
    pub status: PullRequestStatus,
    pub created_at: i64,
    pub merged_at: Option<i64>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.status == PullRequestStatus::Merged
    }
}

impl From<PullRequestRow> for PullRequest {
    fn from(row: PullRequestRow) -> Self {
        Self {
            status: PullRequestStatus::from(row.status.as_str()),
            pull_request_id: row.pull_request_id,
            pull_request_name: row.pull_request_name,
            author_id: UserId::new(row.author_id),
            created_at: row.created_at,
            merged_at: row.merged_at,
        }
    }
}

/// A pull request together with its current reviewer set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestWithReviewers {
    pub pr: PullRequest,
    pub reviewers: Vec<UserId>,
}

/// Input for creating a pull request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPullRequest {
    #[serde(default)]
    pub pull_request_id: String,
    #[serde(default)]
    pub pull_request_name: String,
    #[serde(default)]
    pub author_id: String,
}

/// Short pull request listing for a reviewer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PullRequestShort {
    pub pull_request_id: String,
    pub pull_request_name: String,
    #[sqlx(try_from = "i64")]
    pub author_id: UserId,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!(PullRequestStatus::from("OPEN"), PullRequestStatus::Open);
        assert_eq!(PullRequestStatus::from("merged"), PullRequestStatus::Merged);
        assert_eq!(PullRequestStatus::from("unknown"), PullRequestStatus::Open);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PullRequestStatus::Open.to_string(), "OPEN");
        assert_eq!(PullRequestStatus::Merged.to_string(), "MERGED");
        assert_eq!(
            serde_json::to_string(&PullRequestStatus::Merged).unwrap(),
            "\"MERGED\""
        );
    }
}
