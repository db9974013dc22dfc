//! User Repository (reward-relevant fields of external users)

use super::{RepoError, RepoResult};
use shared::models::{QualifyingEventKind, ReferrerClass, User, UserUpsert};
use sqlx::{SqliteExecutor, SqlitePool};

const USER_SELECT: &str = "SELECT id, name, email, referral_user_type, points_balance, total_points_earned, total_points_redeemed, pending_commission, total_commission_earned, total_commission_paid, has_completed_first_order, first_order_at, has_completed_first_subscription, first_subscription_at, referred_by, created_at, updated_at FROM users";

/// Load the user row without its chain
pub async fn find_row(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<Option<User>> {
    let sql = format!("{USER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

/// Load the user together with its referral chain (ascending tier)
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let Some(mut user) = find_row(pool, id).await? else {
        return Ok(None);
    };
    user.referral_chain = super::chain::find_for_user(pool, id).await?;
    Ok(Some(user))
}

pub async fn find_class(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<Option<ReferrerClass>> {
    let class = sqlx::query_scalar::<_, ReferrerClass>(
        "SELECT referral_user_type FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(e)
    .await?;
    Ok(class)
}

pub async fn exists(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(e)
        .await?;
    Ok(found.is_some())
}

/// Insert or refresh the identity fields of a user.
///
/// Balances, flags and the chain are never touched here.
pub async fn upsert(pool: &SqlitePool, data: &UserUpsert) -> RepoResult<User> {
    let now = shared::util::now_millis();
    let id = data.id.unwrap_or_else(shared::util::snowflake_id);
    sqlx::query(
        "INSERT INTO users (id, name, email, referral_user_type, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email, referral_user_type = excluded.referral_user_type, updated_at = excluded.updated_at",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(data.referral_user_type)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to upsert user".into()))
}

/// Link the user to its direct referrer. Returns false when already linked.
pub async fn set_referred_by(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    referrer_id: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE users SET referred_by = ?1, updated_at = ?2 WHERE id = ?3 AND referred_by IS NULL",
    )
    .bind(referrer_id)
    .bind(now)
    .bind(user_id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Atomically flip the first-event flag from false to true.
///
/// Returns false when the flag was already set (or the user is missing);
/// this single conditional UPDATE is the claim that guards at-most-once rewards.
pub async fn claim_first_event(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    kind: QualifyingEventKind,
    at: i64,
) -> RepoResult<bool> {
    let sql = match kind {
        QualifyingEventKind::Order => {
            "UPDATE users SET has_completed_first_order = 1, first_order_at = ?1, updated_at = ?1 WHERE id = ?2 AND has_completed_first_order = 0"
        }
        QualifyingEventKind::Subscription => {
            "UPDATE users SET has_completed_first_subscription = 1, first_subscription_at = ?1, updated_at = ?1 WHERE id = ?2 AND has_completed_first_subscription = 0"
        }
    };
    let rows = sqlx::query(sql).bind(at).bind(user_id).execute(e).await?;
    Ok(rows.rows_affected() > 0)
}

/// Apply commission deltas to the user's money balances (rounded to cents)
pub async fn add_commission(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    pending_delta: f64,
    earned_delta: f64,
    paid_delta: f64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE users SET pending_commission = ROUND(pending_commission + ?1, 2), total_commission_earned = ROUND(total_commission_earned + ?2, 2), total_commission_paid = ROUND(total_commission_paid + ?3, 2), updated_at = ?4 WHERE id = ?5",
    )
    .bind(pending_delta)
    .bind(earned_delta)
    .bind(paid_delta)
    .bind(now)
    .bind(user_id)
    .execute(e)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {user_id} not found")));
    }
    Ok(())
}

/// Overwrite the money aggregates (reconciliation only)
pub async fn set_commission_totals(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    pending: f64,
    earned: f64,
    paid: f64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE users SET pending_commission = ?1, total_commission_earned = ?2, total_commission_paid = ?3, updated_at = ?4 WHERE id = ?5",
    )
    .bind(pending)
    .bind(earned)
    .bind(paid)
    .bind(now)
    .bind(user_id)
    .execute(e)
    .await?;
    Ok(())
}
