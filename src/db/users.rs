//! User queries: activity flag and review listings.

use crate::error::{db_op, AppError};
use crate::models::{PullRequestShort, User, UserId, UserRow};
use sqlx::SqliteConnection;

/// Set a user's active flag and return the updated user.
///
/// Fails with `NotFound` if the user does not exist.
pub async fn set_is_active(
    conn: &mut SqliteConnection,
    user_id: UserId,
    is_active: bool,
) -> Result<User, AppError> {
    let row: Option<UserRow> = sqlx::query_as(
        r#"
        UPDATE users SET is_active = ?
        WHERE user_id = ?
        RETURNING user_id, username, team_name, is_active
        "#,
    )
    .bind(is_active)
    .bind(user_id.key())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_op("users::set_is_active"))?;

    row.map(User::from)
        .ok_or_else(|| AppError::not_found_with_id("User", user_id.to_string()))
}

/// Pull requests the user is assigned to review, oldest first.
pub async fn get_reviews(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Vec<PullRequestShort>, AppError> {
    sqlx::query_as(
        r#"
        SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
        FROM pull_requests pr
        JOIN pr_reviewers prr ON prr.pull_request_id = pr.pull_request_id
        WHERE prr.reviewer_id = ?
        ORDER BY pr.created_at, pr.pull_request_id
        "#,
    )
    .bind(user_id.key())
    .fetch_all(&mut *conn)
    .await
    .map_err(db_op("users::get_reviews"))
}
