//! User activity and review listings.

use crate::db::pool::DbPool;
use crate::db::users;
use crate::error::{db_op, AppError};
use crate::models::user_id::parse_required;
use crate::models::{PullRequestShort, User, UserId};

/// Flip a user's active flag.
///
/// Inactive users stay on pull requests they already review but are skipped
/// by new assignments and reassignments.
pub async fn set_user_active(pool: &DbPool, user_id: &str, is_active: bool) -> Result<User, AppError> {
    let user_id = parse_required(user_id, "user_id")?;

    let mut conn = pool.acquire().await.map_err(db_op("users::acquire"))?;
    let user = users::set_is_active(&mut conn, user_id, is_active).await?;

    log::info!("[users] {} is_active={}", user.user_id, user.is_active);
    Ok(user)
}

/// Pull requests a user is assigned to review. Unknown users get an empty list.
pub async fn get_user_reviews(
    pool: &DbPool,
    user_id: &str,
) -> Result<(UserId, Vec<PullRequestShort>), AppError> {
    let user_id = parse_required(user_id, "user_id")?;

    let mut conn = pool.acquire().await.map_err(db_op("users::acquire"))?;
    let reviews = users::get_reviews(&mut conn, user_id).await?;

    log::debug!("[users] {} has {} review(s)", user_id, reviews.len());
    Ok((user_id, reviews))
}
