//! Referral Click Repository

use super::RepoResult;
use shared::models::{ConversionType, DeviceType, ReferralClick};
use sqlx::SqliteExecutor;

const CLICK_SELECT: &str = "SELECT id, link_id, referral_code, referrer_id, session_id, ip_address, user_agent, referer, device_type, os, browser, country, city, clicked_at, converted, converted_at, converted_user_id, conversion_type, fraud_flags, risk_score FROM referral_click";

/// Insert payload for a click row
#[derive(Debug, Clone)]
pub struct ClickInsert<'a> {
    pub link_id: i64,
    pub referral_code: &'a str,
    pub referrer_id: i64,
    pub session_id: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub referer: Option<&'a str>,
    pub device_type: DeviceType,
    pub os: Option<&'a str>,
    pub browser: Option<&'a str>,
    pub country: Option<&'a str>,
    pub city: Option<&'a str>,
    pub clicked_at: i64,
    pub fraud_flags: &'a [String],
    pub risk_score: i64,
}

pub async fn insert(e: impl SqliteExecutor<'_>, data: ClickInsert<'_>) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    let flags = serde_json::to_string(data.fraud_flags)?;
    sqlx::query(
        "INSERT INTO referral_click (id, link_id, referral_code, referrer_id, session_id, ip_address, user_agent, referer, device_type, os, browser, country, city, clicked_at, fraud_flags, risk_score) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )
    .bind(id)
    .bind(data.link_id)
    .bind(data.referral_code)
    .bind(data.referrer_id)
    .bind(data.session_id)
    .bind(data.ip_address)
    .bind(data.user_agent)
    .bind(data.referer)
    .bind(data.device_type)
    .bind(data.os)
    .bind(data.browser)
    .bind(data.country)
    .bind(data.city)
    .bind(data.clicked_at)
    .bind(flags)
    .bind(data.risk_score)
    .execute(e)
    .await?;
    Ok(id)
}

pub async fn find_by_id(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<Option<ReferralClick>> {
    let sql = format!("{CLICK_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, ReferralClick>(&sql)
        .bind(id)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

pub async fn count_by_ip_since(e: impl SqliteExecutor<'_>, ip: &str, since: i64) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM referral_click WHERE ip_address = ? AND clicked_at >= ?",
    )
    .bind(ip)
    .bind(since)
    .fetch_one(e)
    .await?;
    Ok(count)
}

pub async fn count_by_referrer_since(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
    since: i64,
) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM referral_click WHERE referrer_id = ? AND clicked_at >= ?",
    )
    .bind(referrer_id)
    .bind(since)
    .fetch_one(e)
    .await?;
    Ok(count)
}

pub async fn find_latest_unconverted_by_session(
    e: impl SqliteExecutor<'_>,
    session_id: &str,
) -> RepoResult<Option<ReferralClick>> {
    let sql = format!("{CLICK_SELECT} WHERE session_id = ? AND converted = 0 ORDER BY clicked_at DESC, id DESC LIMIT 1");
    let row = sqlx::query_as::<_, ReferralClick>(&sql)
        .bind(session_id)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

pub async fn find_latest_unconverted_by_code(
    e: impl SqliteExecutor<'_>,
    referral_code: &str,
) -> RepoResult<Option<ReferralClick>> {
    let sql = format!("{CLICK_SELECT} WHERE referral_code = ? AND converted = 0 ORDER BY clicked_at DESC, id DESC LIMIT 1");
    let row = sqlx::query_as::<_, ReferralClick>(&sql)
        .bind(referral_code)
        .fetch_optional(e)
        .await?;
    Ok(row)
}

/// Mark a click converted once. Returns false if another request got there first.
pub async fn mark_converted(
    e: impl SqliteExecutor<'_>,
    id: i64,
    user_id: i64,
    kind: ConversionType,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE referral_click SET converted = 1, converted_at = ?1, converted_user_id = ?2, conversion_type = ?3 WHERE id = ?4 AND converted = 0",
    )
    .bind(now)
    .bind(user_id)
    .bind(kind)
    .bind(id)
    .execute(e)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// (clicks, conversions) for one referrer
pub async fn totals_for_referrer(
    e: impl SqliteExecutor<'_>,
    referrer_id: i64,
) -> RepoResult<(i64, i64)> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COALESCE(SUM(converted), 0) FROM referral_click WHERE referrer_id = ?",
    )
    .bind(referrer_id)
    .fetch_one(e)
    .await?;
    Ok(row)
}
