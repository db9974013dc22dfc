//! Points Transaction Repository
//!
//! Balance transitions are composed by `referral::points`; this module only
//! reads balances and writes rows.

use super::{RepoError, RepoResult};
use shared::models::{PointsStatus, PointsTransaction, PointsTransactionType};
use sqlx::SqliteExecutor;

const POINTS_SELECT: &str = "SELECT id, user_id, tx_type, points, previous_balance, new_balance, related_id, related_model, metadata, status, created_at FROM points_transaction";

/// Insert payload for a points transaction row
#[derive(Debug, Clone)]
pub struct PointsInsert<'a> {
    pub user_id: i64,
    pub tx_type: PointsTransactionType,
    pub points: i64,
    pub previous_balance: i64,
    pub new_balance: i64,
    pub related_id: Option<&'a str>,
    pub related_model: Option<&'a str>,
    pub metadata: &'a serde_json::Value,
}

pub async fn balance_of(e: impl SqliteExecutor<'_>, user_id: i64) -> RepoResult<Option<i64>> {
    let balance = sqlx::query_scalar::<_, i64>("SELECT points_balance FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(e)
        .await?;
    Ok(balance)
}

/// Compare-and-set the balance; totals move with the sign of `points`
pub async fn update_balance(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    previous_balance: i64,
    points: i64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let earned = points.max(0);
    let redeemed = if points < 0 { -points } else { 0 };
    let rows = sqlx::query(
        "UPDATE users SET points_balance = points_balance + ?1, total_points_earned = total_points_earned + ?2, total_points_redeemed = total_points_redeemed + ?3, updated_at = ?4 \
         WHERE id = ?5 AND points_balance = ?6",
    )
    .bind(points)
    .bind(earned)
    .bind(redeemed)
    .bind(now)
    .bind(user_id)
    .bind(previous_balance)
    .execute(e)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::Database(format!(
            "Points balance of user {user_id} changed concurrently"
        )));
    }
    Ok(())
}

pub async fn insert(e: impl SqliteExecutor<'_>, data: PointsInsert<'_>) -> RepoResult<PointsTransaction> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let metadata = serde_json::to_string(data.metadata)?;
    let row = sqlx::query_as::<_, PointsTransaction>(
        "INSERT INTO points_transaction (id, user_id, tx_type, points, previous_balance, new_balance, related_id, related_model, metadata, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
         RETURNING id, user_id, tx_type, points, previous_balance, new_balance, related_id, related_model, metadata, status, created_at",
    )
    .bind(id)
    .bind(data.user_id)
    .bind(data.tx_type)
    .bind(data.points)
    .bind(data.previous_balance)
    .bind(data.new_balance)
    .bind(data.related_id)
    .bind(data.related_model)
    .bind(metadata)
    .bind(PointsStatus::Completed)
    .bind(now)
    .fetch_one(e)
    .await?;
    Ok(row)
}

/// Newest first
pub async fn history(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    limit: i64,
) -> RepoResult<Vec<PointsTransaction>> {
    let sql = format!("{POINTS_SELECT} WHERE user_id = ? ORDER BY id DESC LIMIT ?");
    let rows = sqlx::query_as::<_, PointsTransaction>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(e)
        .await?;
    Ok(rows)
}
