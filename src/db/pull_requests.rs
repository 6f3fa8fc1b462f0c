//! Pull request ledger: pull requests, their status and reviewer sets.

use crate::error::{db_op, AppError, Resource};
use crate::models::{PullRequest, PullRequestRow, PullRequestStatus, PullRequestWithReviewers, UserId};
use sqlx::{Connection, SqliteConnection};

/// Check whether a pull request exists.
pub async fn pr_exists(conn: &mut SqliteConnection, pr_id: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pull_requests WHERE pull_request_id = ?")
        .bind(pr_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_op("pull_requests::pr_exists"))?;

    Ok(count > 0)
}

/// Insert a pull request row.
///
/// Fails with `AlreadyExists` on a duplicate id.
pub async fn create(conn: &mut SqliteConnection, pr: &PullRequest) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at, merged_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&pr.pull_request_id)
    .bind(&pr.pull_request_name)
    .bind(pr.author_id.key())
    .bind(pr.status.as_str())
    .bind(pr.created_at)
    .bind(pr.merged_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if AppError::is_unique_violation(&e) {
            AppError::already_exists(Resource::PullRequest, &pr.pull_request_id)
        } else {
            db_op("pull_requests::create")(e)
        }
    })?;

    Ok(())
}

/// Attach reviewers to a pull request.
pub async fn add_reviewers(
    conn: &mut SqliteConnection,
    pr_id: &str,
    reviewers: &[UserId],
) -> Result<(), AppError> {
    for reviewer in reviewers {
        sqlx::query("INSERT INTO pr_reviewers (pull_request_id, reviewer_id) VALUES (?, ?)")
            .bind(pr_id)
            .bind(reviewer.key())
            .execute(&mut *conn)
            .await
            .map_err(db_op("pull_requests::add_reviewers"))?;
    }

    Ok(())
}

/// Insert a pull request and its reviewer set as one atomic unit.
pub async fn create_with_reviewers(
    conn: &mut SqliteConnection,
    pr: &PullRequest,
    reviewers: &[UserId],
) -> Result<(), AppError> {
    let mut tx = conn
        .begin()
        .await
        .map_err(db_op("pull_requests::create_with_reviewers.begin"))?;

    create(&mut tx, pr).await?;
    add_reviewers(&mut tx, &pr.pull_request_id, reviewers).await?;

    tx.commit()
        .await
        .map_err(db_op("pull_requests::create_with_reviewers.commit"))
}

/// Load a pull request by id.
///
/// Fails with `NotFound` if it does not exist.
pub async fn get(conn: &mut SqliteConnection, pr_id: &str) -> Result<PullRequest, AppError> {
    let row: Option<PullRequestRow> = sqlx::query_as(
        r#"
        SELECT pull_request_id, pull_request_name, author_id, status, created_at, merged_at
        FROM pull_requests
        WHERE pull_request_id = ?
        "#,
    )
    .bind(pr_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_op("pull_requests::get"))?;

    row.map(PullRequest::from)
        .ok_or_else(|| AppError::not_found_with_id("PullRequest", pr_id))
}

/// Reviewer ids of a pull request, in assignment order.
pub async fn get_reviewers(conn: &mut SqliteConnection, pr_id: &str) -> Result<Vec<UserId>, AppError> {
    let keys: Vec<i64> = sqlx::query_scalar(
        "SELECT reviewer_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY rowid",
    )
    .bind(pr_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_op("pull_requests::get_reviewers"))?;

    Ok(keys.into_iter().map(UserId::new).collect())
}

/// Load a pull request together with its reviewer set.
pub async fn get_with_reviewers(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<PullRequestWithReviewers, AppError> {
    let pr = get(conn, pr_id).await?;
    let reviewers = get_reviewers(conn, pr_id).await?;
    Ok(PullRequestWithReviewers { pr, reviewers })
}

/// Transition OPEN -> MERGED, stamping `merged_at`.
///
/// Returns `true` if this call performed the transition and `false` if the
/// pull request was already merged. Fails with `NotFound` if it does not exist.
pub async fn merge(conn: &mut SqliteConnection, pr_id: &str, merged_at: i64) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE pull_requests
        SET status = ?, merged_at = ?
        WHERE pull_request_id = ? AND status != ?
        "#,
    )
    .bind(PullRequestStatus::Merged.as_str())
    .bind(merged_at)
    .bind(pr_id)
    .bind(PullRequestStatus::Merged.as_str())
    .execute(&mut *conn)
    .await
    .map_err(db_op("pull_requests::merge"))?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }

    if pr_exists(conn, pr_id).await? {
        Ok(false)
    } else {
        Err(AppError::not_found_with_id("PullRequest", pr_id))
    }
}

/// Swap one reviewer for another in a single transaction.
///
/// The delete only matches while `old` is still assigned and the pull
/// request is still OPEN; the first writer wins and a concurrent loser gets
/// `ReviewerNotAssigned` (or `AlreadyMerged` if a merge won instead).
/// If `new` was assigned in the meantime the transaction rolls back with
/// `ReassignConflict`.
pub async fn replace_reviewer(
    conn: &mut SqliteConnection,
    pr_id: &str,
    old: UserId,
    new: UserId,
) -> Result<(), AppError> {
    let mut tx = conn
        .begin()
        .await
        .map_err(db_op("pull_requests::replace_reviewer.begin"))?;

    let removed = sqlx::query(
        r#"
        DELETE FROM pr_reviewers
        WHERE pull_request_id = ? AND reviewer_id = ?
          AND EXISTS (
              SELECT 1 FROM pull_requests
              WHERE pull_request_id = ? AND status = ?
          )
        "#,
    )
    .bind(pr_id)
    .bind(old.key())
    .bind(pr_id)
    .bind(PullRequestStatus::Open.as_str())
    .execute(&mut *tx)
    .await
    .map_err(db_op("pull_requests::replace_reviewer.delete"))?
    .rows_affected();

    if removed == 0 {
        let pr = get(&mut tx, pr_id).await?;
        return Err(if pr.is_merged() {
            AppError::already_merged(pr_id)
        } else {
            AppError::reviewer_not_assigned(pr_id, old.to_string())
        });
    }

    sqlx::query("INSERT INTO pr_reviewers (pull_request_id, reviewer_id) VALUES (?, ?)")
        .bind(pr_id)
        .bind(new.key())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if AppError::is_unique_violation(&e) {
                log::warn!("[ledger] {} was assigned to PR {} concurrently", new, pr_id);
                AppError::reassign_conflict(pr_id)
            } else {
                db_op("pull_requests::replace_reviewer.insert")(e)
            }
        })?;

    tx.commit()
        .await
        .map_err(db_op("pull_requests::replace_reviewer.commit"))
}
