//! Referral Link Repository

use super::RepoResult;
use shared::models::ReferralLink;
use sqlx::SqliteExecutor;

const LINK_SELECT: &str = "SELECT id, referrer_id, referral_code, short_code, target_url, campaign, click_count, conversion_count, created_at FROM referral_link";

pub async fn insert(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
    referral_code: &str,
    short_code: &str,
    target_url: &str,
    campaign: Option<&str>,
) -> RepoResult<ReferralLink> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let row = sqlx::query_as::<_, ReferralLink>(
        "INSERT INTO referral_link (id, referrer_id, referral_code, short_code, target_url, campaign, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         RETURNING id, referrer_id, referral_code, short_code, target_url, campaign, click_count, conversion_count, created_at",
    )
    .bind(id)
    .bind(referrer_id)
    .bind(referral_code)
    .bind(short_code)
    .bind(target_url)
    .bind(campaign)
    .bind(now)
    .fetch_one(e)
    .await?;
    Ok(row)
}

pub async fn find_by_short_code(
    e: impl SqliteExecutor<'_>,
    short_code: &str,
) -> RepoResult<Option<ReferralLink>> {
    let sql = format!("{LINK_SELECT} WHERE short_code = ?");
    let row = sqlx::query_as::<_, ReferralLink>(&sql)
        .bind(short_code)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

/// The campaign-less link created with the profile
pub async fn find_default_for_code(
    e: impl SqliteExecutor<'_>,
    referral_code: &str,
) -> RepoResult<Option<ReferralLink>> {
    let sql = format!(
        "{LINK_SELECT} WHERE referral_code = ? ORDER BY campaign IS NOT NULL, created_at, id LIMIT 1"
    );
    let row = sqlx::query_as::<_, ReferralLink>(&sql)
        .bind(referral_code)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

pub async fn list_for_referrer(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
) -> RepoResult<Vec<ReferralLink>> {
    let sql = format!("{LINK_SELECT} WHERE referrer_id = ? ORDER BY created_at, id");
    let rows = sqlx::query_as::<_, ReferralLink>(&sql)
        .bind(referrer_id)
        .fetch_all(e)
        .await?;
    Ok(rows)
}

pub async fn increment_clicks(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<()> {
    sqlx::query("UPDATE referral_link SET click_count = click_count + 1 WHERE id = ?")
        .bind(id)
        .execute(e)
        .await?;
    Ok(())
}

pub async fn increment_conversions(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<()> {
    sqlx::query("UPDATE referral_link SET conversion_count = conversion_count + 1 WHERE id = ?")
        .bind(id)
        .execute(e)
        .await?;
    Ok(())
}
