//! Aggregate queries for analytics and reconciliation
//!
//! Ledger sums are recomputed from `commission`, `points_transaction` and
//! `referred_user`, the sources of truth for the cached counters.

use super::RepoResult;
use sqlx::SqliteExecutor;

/// A user's cached balances next to the values recomputed from the ledger
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserLedgerRow {
    pub id: i64,
    pub pending_commission: f64,
    pub total_commission_earned: f64,
    pub total_commission_paid: f64,
    pub points_balance: i64,
    pub ledger_pending: f64,
    pub ledger_earned: f64,
    pub ledger_paid: f64,
    /// `new_balance` of the newest completed points transaction
    pub latest_points_balance: Option<i64>,
}

/// A profile's cached counters next to the recomputed ones
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileLedgerRow {
    pub id: i64,
    pub total_referrals: i64,
    pub active_referrals: i64,
    pub pending_commission: f64,
    pub total_commission_earned: f64,
    pub total_commission_paid: f64,
    pub ledger_referrals: i64,
    pub ledger_active: i64,
    pub ledger_pending: f64,
    pub ledger_earned: f64,
    pub ledger_paid: f64,
}

/// Commission totals of one referrer, by status bucket
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct CommissionTotals {
    pub pending: f64,
    pub approved: f64,
    pub paid: f64,
}

pub async fn user_ledger_rows(e: impl SqliteExecutor<'_>) -> RepoResult<Vec<UserLedgerRow>> {
    let rows = sqlx::query_as::<_, UserLedgerRow>(
        "SELECT u.id, u.pending_commission, u.total_commission_earned, u.total_commission_paid, u.points_balance, \
           COALESCE((SELECT ROUND(SUM(c.commission_amount), 2) FROM commission c WHERE c.referrer_id = u.id AND c.status IN ('PENDING', 'APPROVED', 'PROCESSING')), 0.0) AS ledger_pending, \
           COALESCE((SELECT ROUND(SUM(c.commission_amount), 2) FROM commission c WHERE c.referrer_id = u.id AND c.status <> 'CANCELLED'), 0.0) AS ledger_earned, \
           COALESCE((SELECT ROUND(SUM(c.commission_amount), 2) FROM commission c WHERE c.referrer_id = u.id AND c.status = 'PAID'), 0.0) AS ledger_paid, \
           (SELECT p.new_balance FROM points_transaction p WHERE p.user_id = u.id AND p.status = 'COMPLETED' ORDER BY p.id DESC LIMIT 1) AS latest_points_balance \
         FROM users u ORDER BY u.id",
    )
    .fetch_all(e)
    .await?;
    Ok(rows)
}

pub async fn profile_ledger_rows(e: impl SqliteExecutor<'_>) -> RepoResult<Vec<ProfileLedgerRow>> {
    let rows = sqlx::query_as::<_, ProfileLedgerRow>(
        "SELECT p.id, p.total_referrals, p.active_referrals, p.pending_commission, p.total_commission_earned, p.total_commission_paid, \
           (SELECT COUNT(*) FROM referred_user r WHERE r.profile_id = p.id) AS ledger_referrals, \
           (SELECT COUNT(*) FROM referred_user r WHERE r.profile_id = p.id AND r.status = 'ACTIVE') AS ledger_active, \
           COALESCE((SELECT ROUND(SUM(c.commission_amount), 2) FROM commission c WHERE c.profile_id = p.id AND c.status IN ('PENDING', 'APPROVED', 'PROCESSING')), 0.0) AS ledger_pending, \
           COALESCE((SELECT ROUND(SUM(c.commission_amount), 2) FROM commission c WHERE c.profile_id = p.id AND c.status <> 'CANCELLED'), 0.0) AS ledger_earned, \
           COALESCE((SELECT ROUND(SUM(c.commission_amount), 2) FROM commission c WHERE c.profile_id = p.id AND c.status = 'PAID'), 0.0) AS ledger_paid \
         FROM referral_profile p ORDER BY p.id",
    )
    .fetch_all(e)
    .await?;
    Ok(rows)
}

pub async fn commission_totals(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
) -> RepoResult<CommissionTotals> {
    let row = sqlx::query_as::<_, CommissionTotals>(
        "SELECT \
           COALESCE(ROUND(SUM(CASE WHEN status = 'PENDING' THEN commission_amount ELSE 0.0 END), 2), 0.0) AS pending, \
           COALESCE(ROUND(SUM(CASE WHEN status IN ('APPROVED', 'PROCESSING') THEN commission_amount ELSE 0.0 END), 2), 0.0) AS approved, \
           COALESCE(ROUND(SUM(CASE WHEN status = 'PAID' THEN commission_amount ELSE 0.0 END), 2), 0.0) AS paid \
         FROM commission WHERE referrer_id = ?",
    )
    .bind(referrer_id)
    .fetch_one(e)
    .await?;
    Ok(row)
}

pub async fn referral_points_earned(e: impl SqliteExecutor<'_>, user_id: i64) -> RepoResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(points), 0) FROM points_transaction WHERE user_id = ? AND tx_type = 'EARNED_REFERRAL' AND status = 'COMPLETED'",
    )
    .bind(user_id)
    .fetch_one(e)
    .await?;
    Ok(total)
}

/// Overwrite a drifted points balance with the ledger value (reconciliation only)
pub async fn set_points_balance(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    balance: i64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query("UPDATE users SET points_balance = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(balance)
        .bind(now)
        .bind(user_id)
        .execute(e)
        .await?;
    Ok(())
}
