//! Pull request statistics.

use crate::db::pool::DbPool;
use crate::db::stats;
use crate::error::{db_op, AppError};
use crate::models::PrStats;

/// Aggregate counts over every pull request.
pub async fn get_stats(pool: &DbPool) -> Result<PrStats, AppError> {
    let mut conn = pool.acquire().await.map_err(db_op("stats::acquire"))?;
    stats::get_pr_stats(&mut conn).await
}
