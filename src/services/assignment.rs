//! Review assignment engine.
//!
//! Picks reviewers when a pull request is opened, swaps a reviewer on
//! request, and merges pull requests. Every write goes through the ledger in
//! `db::pull_requests`, which runs multi-row changes in one transaction.

use crate::db::pool::DbPool;
use crate::db::{pull_requests, teams};
use crate::error::{db_op, AppError, Resource};
use crate::models::user_id::parse_required;
use crate::models::{NewPullRequest, PullRequest, PullRequestStatus, PullRequestWithReviewers, UserId};
use crate::services::reviewer_selection::{RandomPicker, ReviewerPicker};
use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashSet;
use std::sync::Arc;

/// Reviewers assigned to a freshly opened pull request.
pub const REVIEWERS_PER_PR: usize = 2;

/// Read-pick-write rounds a reassignment gets before reporting a conflict.
const MAX_REASSIGN_ATTEMPTS: usize = 3;

/// Outcome of a reviewer reassignment.
#[derive(Debug, Clone)]
pub struct Reassignment {
    pub pr: PullRequestWithReviewers,
    pub replaced_by: UserId,
}

/// Assigns and reassigns reviewers within the author's team.
#[derive(Clone)]
pub struct ReviewAssignmentEngine {
    db: DbPool,
    picker: Arc<dyn ReviewerPicker>,
}

impl ReviewAssignmentEngine {
    /// Engine drawing reviewers from system entropy.
    pub fn new(db: DbPool) -> Self {
        Self::with_picker(db, Arc::new(RandomPicker::from_entropy()))
    }

    pub fn with_picker(db: DbPool, picker: Arc<dyn ReviewerPicker>) -> Self {
        Self { db, picker }
    }

    /// Open a pull request and assign up to two reviewers from the author's team.
    ///
    /// Reviewers are active team members other than the author. Fails with
    /// `NoReviewerCandidates` when nobody is eligible.
    pub async fn create_with_reviewers(
        &self,
        input: NewPullRequest,
    ) -> Result<PullRequestWithReviewers, AppError> {
        let pr_id = required(&input.pull_request_id, "pull_request_id")?;
        let pr_name = required(&input.pull_request_name, "pull_request_name")?;
        let author_id = parse_required(&input.author_id, "author_id")?;

        log::info!("[assign] Creating PR {} by {}", pr_id, author_id);

        let mut conn = self.db.acquire().await.map_err(db_op("assign::acquire"))?;

        if pull_requests::pr_exists(&mut conn, pr_id).await? {
            log::warn!("[assign] PR {} already exists", pr_id);
            return Err(AppError::already_exists(Resource::PullRequest, pr_id));
        }

        let team_name = teams::get_author_team(&mut conn, author_id).await?;
        let exclude = HashSet::from([author_id]);
        let candidates = teams::get_active_members(&mut conn, &team_name, &exclude).await?;

        if candidates.is_empty() {
            log::warn!("[assign] No reviewer candidates in team {}", team_name);
            return Err(AppError::no_reviewer_candidates(team_name));
        }

        let reviewers = self.picker.pick(candidates, REVIEWERS_PER_PR);

        let pr = PullRequest {
            pull_request_id: pr_id.to_string(),
            pull_request_name: pr_name.to_string(),
            author_id,
            status: PullRequestStatus::Open,
            created_at: Utc::now().timestamp(),
            merged_at: None,
        };
        pull_requests::create_with_reviewers(&mut conn, &pr, &reviewers).await?;

        let created = pull_requests::get_with_reviewers(&mut conn, pr_id).await?;
        log::info!(
            "[assign] PR {} created with {} reviewer(s)",
            pr_id,
            created.reviewers.len()
        );
        Ok(created)
    }

    /// Mark a pull request as merged.
    ///
    /// Merging an already merged pull request succeeds and changes nothing.
    pub async fn merge(&self, pr_id: &str) -> Result<PullRequestWithReviewers, AppError> {
        let pr_id = required(pr_id, "pull_request_id")?;

        let mut conn = self.db.acquire().await.map_err(db_op("assign::acquire"))?;

        let transitioned = pull_requests::merge(&mut conn, pr_id, Utc::now().timestamp()).await?;
        if transitioned {
            log::info!("[assign] PR {} merged", pr_id);
        } else {
            log::debug!("[assign] PR {} was already merged", pr_id);
        }

        pull_requests::get_with_reviewers(&mut conn, pr_id).await
    }

    /// Replace one reviewer with a random active teammate of the author.
    ///
    /// The replacement is never the author or a current reviewer. When a
    /// concurrent reassignment takes the chosen replacement first, the state
    /// is re-read and a new candidate picked, up to `MAX_REASSIGN_ATTEMPTS`
    /// rounds before failing with `ReassignConflict`.
    pub async fn reassign(&self, pr_id: &str, old_reviewer_id: &str) -> Result<Reassignment, AppError> {
        let pr_id = required(pr_id, "pull_request_id")?;
        let old_reviewer = parse_required(old_reviewer_id, "old_reviewer_id")?;

        log::info!("[assign] Reassigning {} on PR {}", old_reviewer, pr_id);

        let mut conn = self.db.acquire().await.map_err(db_op("assign::acquire"))?;

        let mut attempt = 1;
        let replaced_by = loop {
            match self.try_reassign(&mut conn, pr_id, old_reviewer).await {
                Err(AppError::ReassignConflict { .. }) if attempt < MAX_REASSIGN_ATTEMPTS => {
                    log::debug!(
                        "[assign] PR {}: replacement taken concurrently, retrying (attempt {})",
                        pr_id,
                        attempt
                    );
                    attempt += 1;
                }
                result => break result?,
            }
        };

        let pr = pull_requests::get_with_reviewers(&mut conn, pr_id).await?;
        log::info!(
            "[assign] PR {}: {} replaced by {}",
            pr_id,
            old_reviewer,
            replaced_by
        );
        Ok(Reassignment { pr, replaced_by })
    }

    /// One read-pick-write round of `reassign`.
    async fn try_reassign(
        &self,
        conn: &mut SqliteConnection,
        pr_id: &str,
        old_reviewer: UserId,
    ) -> Result<UserId, AppError> {
        let current = pull_requests::get_with_reviewers(conn, pr_id).await?;

        if current.pr.is_merged() {
            log::warn!("[assign] Cannot reassign on merged PR {}", pr_id);
            return Err(AppError::already_merged(pr_id));
        }

        if !current.reviewers.contains(&old_reviewer) {
            log::warn!("[assign] {} is not a reviewer of PR {}", old_reviewer, pr_id);
            return Err(AppError::reviewer_not_assigned(pr_id, old_reviewer.to_string()));
        }

        let team_name = teams::get_author_team(conn, current.pr.author_id).await?;

        let mut exclude: HashSet<UserId> = current.reviewers.iter().copied().collect();
        exclude.insert(current.pr.author_id);
        let candidates = teams::get_active_members(conn, &team_name, &exclude).await?;

        let replaced_by = self
            .picker
            .pick(candidates, 1)
            .into_iter()
            .next()
            .ok_or_else(|| {
                log::warn!("[assign] No replacement candidate in team {}", team_name);
                AppError::no_reviewer_candidates(&team_name)
            })?;

        pull_requests::replace_reviewer(conn, pr_id, old_reviewer, replaced_by).await?;
        Ok(replaced_by)
    }
}

/// Trimmed value of a mandatory string field.
fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::required(field))
    } else {
        Ok(value)
    }
}
