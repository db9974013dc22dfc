//! Payout Repository

use super::RepoResult;
use shared::models::{Payout, PayoutStatus};
use sqlx::SqliteExecutor;

const PAYOUT_SELECT: &str = "SELECT id, referrer_id, total_amount, commission_count, payment_method, status, gateway_reference, failure_reason, created_at, completed_at, updated_at FROM payout";

/// Create a payout already in PROCESSING (commissions are attached in the same transaction)
pub async fn insert_processing(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
    total_amount: f64,
    commission_count: i64,
    payment_method: &str,
) -> RepoResult<Payout> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let row = sqlx::query_as::<_, Payout>(
        "INSERT INTO payout (id, referrer_id, total_amount, commission_count, payment_method, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
         RETURNING id, referrer_id, total_amount, commission_count, payment_method, status, gateway_reference, failure_reason, created_at, completed_at, updated_at",
    )
    .bind(id)
    .bind(referrer_id)
    .bind(total_amount)
    .bind(commission_count)
    .bind(payment_method)
    .bind(PayoutStatus::Processing)
    .bind(now)
    .fetch_one(e)
    .await?;
    Ok(row)
}

pub async fn complete(e: impl SqliteExecutor<'_>, id: i64, reference: &str) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE payout SET status = 'COMPLETED', gateway_reference = ?1, completed_at = ?2, updated_at = ?2 WHERE id = ?3 AND status = 'PROCESSING'",
    )
    .bind(reference)
    .bind(now)
    .bind(id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn fail(e: impl SqliteExecutor<'_>, id: i64, reason: &str) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE payout SET status = 'FAILED', failure_reason = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'PROCESSING'",
    )
    .bind(reason)
    .bind(now)
    .bind(id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// PROCESSING payouts not touched since `before`, oldest first
pub async fn find_stale_processing(e: impl SqliteExecutor<'_>, before: i64) -> RepoResult<Vec<Payout>> {
    let sql = format!("{PAYOUT_SELECT} WHERE status = 'PROCESSING' AND updated_at <= ? ORDER BY updated_at, id");
    let rows = sqlx::query_as::<_, Payout>(&sql)
        .bind(before)
        .fetch_all(e)
        .await?;
    Ok(rows)
}

/// Re-stamp a stale PROCESSING payout. Only one caller wins the claim.
pub async fn claim_stale(e: impl SqliteExecutor<'_>, id: i64, before: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE payout SET updated_at = ?1 WHERE id = ?2 AND status = 'PROCESSING' AND updated_at <= ?3",
    )
    .bind(now)
    .bind(id)
    .bind(before)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn find_by_id(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<Option<Payout>> {
    let sql = format!("{PAYOUT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Payout>(&sql)
        .bind(id)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

/// Newest first, optionally for one referrer
pub async fn list(
    e: impl SqliteExecutor<'_>,
    referrer_id: Option<i64>,
    limit: i64,
) -> RepoResult<Vec<Payout>> {
    let sql = format!(
        "{PAYOUT_SELECT} WHERE (?1 IS NULL OR referrer_id = ?1) ORDER BY created_at DESC, id DESC LIMIT ?2"
    );
    let rows = sqlx::query_as::<_, Payout>(&sql)
        .bind(referrer_id)
        .bind(limit)
        .fetch_all(e)
        .await?;
    Ok(rows)
}
