//! Referred User Repository (per-profile referral bookkeeping)

use super::RepoResult;
use shared::models::{ReferredUser, ReferredUserStatus};
use sqlx::SqliteExecutor;

const REFERRED_SELECT: &str = "SELECT id, profile_id, referred_user_id, tier, joined_at, first_purchase_amount, total_spent, status FROM referred_user";

/// Record a new referral. Returns false if the pair already exists.
pub async fn insert(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
    referred_user_id: i64,
    tier: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let rows = sqlx::query(
        "INSERT INTO referred_user (id, profile_id, referred_user_id, tier, joined_at, status) VALUES (?1, ?2, ?3, ?4, ?5, 'PENDING') \
         ON CONFLICT(profile_id, referred_user_id) DO NOTHING",
    )
    .bind(id)
    .bind(profile_id)
    .bind(referred_user_id)
    .bind(tier)
    .bind(now)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn find(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
    referred_user_id: i64,
) -> RepoResult<Option<ReferredUser>> {
    let sql = format!("{REFERRED_SELECT} WHERE profile_id = ? AND referred_user_id = ?");
    let row = sqlx::query_as::<_, ReferredUser>(&sql)
        .bind(profile_id)
        .bind(referred_user_id)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

pub async fn list_for_profile(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
) -> RepoResult<Vec<ReferredUser>> {
    let sql = format!("{REFERRED_SELECT} WHERE profile_id = ? ORDER BY joined_at DESC");
    let rows = sqlx::query_as::<_, ReferredUser>(&sql)
        .bind(profile_id)
        .fetch_all(e)
        .await?;
    Ok(rows)
}

pub async fn add_spend(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
    referred_user_id: i64,
    amount: f64,
) -> RepoResult<()> {
    sqlx::query(
        "UPDATE referred_user SET total_spent = ROUND(total_spent + ?1, 2) WHERE profile_id = ?2 AND referred_user_id = ?3",
    )
    .bind(amount)
    .bind(profile_id)
    .bind(referred_user_id)
    .execute(e)
    .await?;
    Ok(())
}

/// PENDING → ACTIVE with the first purchase amount. Returns true only on the transition.
pub async fn activate(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
    referred_user_id: i64,
    first_purchase_amount: f64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE referred_user SET status = 'ACTIVE', first_purchase_amount = COALESCE(first_purchase_amount, ?1) \
         WHERE profile_id = ?2 AND referred_user_id = ?3 AND status = 'PENDING'",
    )
    .bind(first_purchase_amount)
    .bind(profile_id)
    .bind(referred_user_id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Set the status unconditionally. Returns false when the row is missing.
pub async fn set_status(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
    referred_user_id: i64,
    status: ReferredUserStatus,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE referred_user SET status = ?1 WHERE profile_id = ?2 AND referred_user_id = ?3",
    )
    .bind(status)
    .bind(profile_id)
    .bind(referred_user_id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}
