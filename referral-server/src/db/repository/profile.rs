//! Referral Profile Repository

use super::{RepoError, RepoResult};
use shared::models::{LeaderboardEntry, ReferralProfile};
use sqlx::SqliteExecutor;

const PROFILE_SELECT: &str = "SELECT id, referrer_id, referral_code, total_referrals, active_referrals, tier1_rate, tier2_rate, total_commission_earned, pending_commission, total_commission_paid, created_at, updated_at FROM referral_profile";

pub async fn find_by_code(
    e: impl SqliteExecutor<'_>,
    code: &str,
) -> RepoResult<Option<ReferralProfile>> {
    let sql = format!("{PROFILE_SELECT} WHERE referral_code = ?");
    let row = sqlx::query_as::<_, ReferralProfile>(&sql)
        .bind(code)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

pub async fn find_by_referrer(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
) -> RepoResult<Option<ReferralProfile>> {
    let sql = format!("{PROFILE_SELECT} WHERE referrer_id = ?");
    let row = sqlx::query_as::<_, ReferralProfile>(&sql)
        .bind(referrer_id)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

pub async fn code_exists(e: impl SqliteExecutor<'_>, code: &str) -> RepoResult<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM referral_profile WHERE referral_code = ?")
        .bind(code)
        .fetch_optional(e)
        .await?;
    Ok(found.is_some())
}

/// Insert a profile. Unique violations (code or referrer) surface as `Duplicate`.
pub async fn insert(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
    code: &str,
) -> RepoResult<ReferralProfile> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let sql = "INSERT INTO referral_profile (id, referrer_id, referral_code, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4) RETURNING id, referrer_id, referral_code, total_referrals, active_referrals, tier1_rate, tier2_rate, total_commission_earned, pending_commission, total_commission_paid, created_at, updated_at";
    let row = sqlx::query_as::<_, ReferralProfile>(sql)
        .bind(id)
        .bind(referrer_id)
        .bind(code)
        .bind(now)
        .fetch_one(e)
        .await?;
    Ok(row)
}

pub async fn increment_referrals(e: impl SqliteExecutor<'_>, profile_id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE referral_profile SET total_referrals = total_referrals + 1, updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(profile_id)
    .execute(e)
    .await?;
    Ok(())
}

/// Adjust `active_referrals` by +1/-1, never below zero
pub async fn adjust_active(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
    delta: i64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE referral_profile SET active_referrals = MAX(active_referrals + ?1, 0), updated_at = ?2 WHERE id = ?3",
    )
    .bind(delta)
    .bind(now)
    .bind(profile_id)
    .execute(e)
    .await?;
    Ok(())
}

/// Apply commission deltas to the profile aggregates (rounded to cents)
pub async fn add_commission(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
    pending_delta: f64,
    earned_delta: f64,
    paid_delta: f64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE referral_profile SET pending_commission = ROUND(pending_commission + ?1, 2), total_commission_earned = ROUND(total_commission_earned + ?2, 2), total_commission_paid = ROUND(total_commission_paid + ?3, 2), updated_at = ?4 WHERE id = ?5",
    )
    .bind(pending_delta)
    .bind(earned_delta)
    .bind(paid_delta)
    .bind(now)
    .bind(profile_id)
    .execute(e)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Referral profile {profile_id} not found")));
    }
    Ok(())
}

/// Overwrite all derived counters (reconciliation only)
#[allow(clippy::too_many_arguments)]
pub async fn set_totals(
    e: impl SqliteExecutor<'_>,
    profile_id: i64,
    total_referrals: i64,
    active_referrals: i64,
    pending: f64,
    earned: f64,
    paid: f64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE referral_profile SET total_referrals = ?1, active_referrals = ?2, pending_commission = ?3, total_commission_earned = ?4, total_commission_paid = ?5, updated_at = ?6 WHERE id = ?7",
    )
    .bind(total_referrals)
    .bind(active_referrals)
    .bind(pending)
    .bind(earned)
    .bind(paid)
    .bind(now)
    .bind(profile_id)
    .execute(e)
    .await?;
    Ok(())
}

pub async fn leaderboard(e: impl SqliteExecutor<'_>, limit: i64) -> RepoResult<Vec<LeaderboardEntry>> {
    let rows = sqlx::query_as::<_, LeaderboardEntry>(
        "SELECT p.referrer_id, u.name, p.referral_code, p.total_referrals, p.active_referrals, p.total_commission_earned \
         FROM referral_profile p JOIN users u ON u.id = p.referrer_id \
         ORDER BY p.total_referrals DESC, p.total_commission_earned DESC, p.referrer_id \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(e)
    .await?;
    Ok(rows)
}
