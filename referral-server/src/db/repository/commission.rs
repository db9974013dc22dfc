//! Commission Repository

use super::RepoResult;
use shared::models::{Commission, CommissionStatus};
use sqlx::SqliteExecutor;

const COMMISSION_SELECT: &str = "SELECT id, profile_id, referrer_id, referred_user_id, order_id, order_amount, commission_rate, commission_amount, tier, status, payment_method, payout_id, cancel_reason, approved_at, paid_at, created_at, updated_at FROM commission";

/// Insert payload for a new PENDING commission
#[derive(Debug, Clone)]
pub struct CommissionInsert<'a> {
    pub profile_id: i64,
    pub referrer_id: i64,
    pub referred_user_id: i64,
    pub order_id: &'a str,
    pub order_amount: f64,
    pub commission_amount: f64,
    pub tier: i64,
}

pub async fn insert(e: impl SqliteExecutor<'_>, data: CommissionInsert<'_>) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO commission (id, profile_id, referrer_id, referred_user_id, order_id, order_amount, commission_rate, commission_amount, tier, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10, ?10)",
    )
    .bind(id)
    .bind(data.profile_id)
    .bind(data.referrer_id)
    .bind(data.referred_user_id)
    .bind(data.order_id)
    .bind(data.order_amount)
    .bind(data.commission_amount)
    .bind(data.tier)
    .bind(CommissionStatus::Pending)
    .bind(now)
    .execute(e)
    .await?;
    Ok(id)
}

pub async fn find_by_id(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<Option<Commission>> {
    let sql = format!("{COMMISSION_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Commission>(&sql)
        .bind(id)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

pub async fn list_for_referrer(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
) -> RepoResult<Vec<Commission>> {
    let sql = format!("{COMMISSION_SELECT} WHERE referrer_id = ? ORDER BY created_at, id");
    let rows = sqlx::query_as::<_, Commission>(&sql)
        .bind(referrer_id)
        .fetch_all(e)
        .await?;
    Ok(rows)
}

/// APPROVED commissions not attached to any payout, ordered by referrer
pub async fn find_approved_unpaid(e: impl SqliteExecutor<'_>) -> RepoResult<Vec<Commission>> {
    let sql = format!(
        "{COMMISSION_SELECT} WHERE status = 'APPROVED' AND payout_id IS NULL ORDER BY referrer_id, created_at, id"
    );
    let rows = sqlx::query_as::<_, Commission>(&sql).fetch_all(e).await?;
    Ok(rows)
}

/// PENDING commissions created before `before` (auto-approval candidates)
pub async fn find_matured_pending(
    e: impl SqliteExecutor<'_>,
    before: i64,
) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM commission WHERE status = 'PENDING' AND created_at <= ? ORDER BY created_at",
    )
    .bind(before)
    .fetch_all(e)
    .await?;
    Ok(ids)
}

/// PENDING → APPROVED. Returns false if the row was not PENDING.
pub async fn approve(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE commission SET status = 'APPROVED', approved_at = ?1, updated_at = ?1 WHERE id = ?2 AND status = 'PENDING'",
    )
    .bind(now)
    .bind(id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// `from` → CANCELLED. Returns false if the row was not in `from`.
pub async fn cancel(
    e: impl SqliteExecutor<'_>,
    id: i64,
    from: CommissionStatus,
    reason: &str,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE commission SET status = 'CANCELLED', cancel_reason = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
    )
    .bind(reason)
    .bind(now)
    .bind(id)
    .bind(from)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// APPROVED → PROCESSING under a payout
pub async fn attach_to_payout(
    e: impl SqliteExecutor<'_>,
    id: i64,
    payout_id: i64,
    payment_method: &str,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE commission SET status = 'PROCESSING', payout_id = ?1, payment_method = ?2, updated_at = ?3 WHERE id = ?4 AND status = 'APPROVED' AND payout_id IS NULL",
    )
    .bind(payout_id)
    .bind(payment_method)
    .bind(now)
    .bind(id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// PROCESSING → PAID for every commission of the payout
pub async fn mark_paid(e: impl SqliteExecutor<'_>, payout_id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE commission SET status = 'PAID', paid_at = ?1, updated_at = ?1 WHERE payout_id = ?2 AND status = 'PROCESSING'",
    )
    .bind(now)
    .bind(payout_id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected())
}

/// PROCESSING → APPROVED (detached) after a failed payout
pub async fn release_from_payout(e: impl SqliteExecutor<'_>, payout_id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE commission SET status = 'APPROVED', payout_id = NULL, payment_method = NULL, updated_at = ?1 WHERE payout_id = ?2 AND status = 'PROCESSING'",
    )
    .bind(now)
    .bind(payout_id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected())
}

pub async fn find_by_payout(e: impl SqliteExecutor<'_>, payout_id: i64) -> RepoResult<Vec<Commission>> {
    let sql = format!("{COMMISSION_SELECT} WHERE payout_id = ? AND status = 'PROCESSING' ORDER BY created_at, id");
    let rows = sqlx::query_as::<_, Commission>(&sql)
        .bind(payout_id)
        .fetch_all(e)
        .await?;
    Ok(rows)
}

pub async fn ids_for_payout(e: impl SqliteExecutor<'_>, payout_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM commission WHERE payout_id = ? ORDER BY id")
        .bind(payout_id)
        .fetch_all(e)
        .await?;
    Ok(ids)
}
