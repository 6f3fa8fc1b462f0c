//! Aggregate statistics over the pull request ledger. Read-only.

use crate::error::{db_op, AppError};
use crate::models::{PrStats, PullRequestStatus};
use sqlx::SqliteConnection;

/// Count pull requests by status and average reviewers per pull request.
pub async fn get_pr_stats(conn: &mut SqliteConnection) -> Result<PrStats, AppError> {
    let (total_prs, open_prs, merged_prs): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN status = ? THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = ? THEN 1 ELSE 0 END), 0)
        FROM pull_requests
        "#,
    )
    .bind(PullRequestStatus::Open.as_str())
    .bind(PullRequestStatus::Merged.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(db_op("stats::get_pr_stats.counts"))?;

    let avg_reviewers_per_pr: f64 = sqlx::query_scalar(
        r#"
        SELECT
            CASE
                WHEN COUNT(DISTINCT pr.pull_request_id) = 0 THEN 0.0
                ELSE CAST(COUNT(prr.reviewer_id) AS REAL) / COUNT(DISTINCT pr.pull_request_id)
            END
        FROM pull_requests pr
        LEFT JOIN pr_reviewers prr ON prr.pull_request_id = pr.pull_request_id
        "#,
    )
    .fetch_one(&mut *conn)
    .await
    .map_err(db_op("stats::get_pr_stats.avg_reviewers"))?;

    Ok(PrStats {
        total_prs,
        open_prs,
        merged_prs,
        avg_reviewers_per_pr,
    })
}
