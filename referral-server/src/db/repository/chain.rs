//! Referral Chain Repository (tier 1 / tier 2 edges)

use super::RepoResult;
use shared::models::ChainEdge;
use sqlx::SqliteExecutor;

pub async fn find_for_user(e: impl SqliteExecutor<'_>, user_id: i64) -> RepoResult<Vec<ChainEdge>> {
    let rows = sqlx::query_as::<_, ChainEdge>(
        "SELECT referrer_id, tier FROM referral_chain WHERE user_id = ? ORDER BY tier",
    )
    .bind(user_id)
    .fetch_all(e)
    .await?;
    Ok(rows)
}

/// Insert one edge; the (user_id, tier) primary key rejects duplicates
pub async fn insert_edge(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    referrer_id: i64,
    tier: i64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO referral_chain (user_id, referrer_id, tier, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(user_id)
    .bind(referrer_id)
    .bind(tier)
    .bind(now)
    .execute(e)
    .await?;
    Ok(())
}
