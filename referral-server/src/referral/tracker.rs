//! Click and conversion attribution
//!
//! Purely informational: nothing here gates registration or rewards.

use shared::models::{
    ReferralClick, ReferralLink, RequestContext, TrackClickResult, TrackConversionRequest,
};
use shared::util::{DAY_MILLIS, HOUR_MILLIS};
use sqlx::SqlitePool;

use super::fraud::{self, ClickSignals};
use super::{ReferralError, ReferralResult, code, device};
use crate::core::Config;
use crate::db::repository::click::ClickInsert;
use crate::db::repository::{click, link};

/// Short code first (case-sensitive), then the referral code's default link
pub async fn resolve_link(pool: &SqlitePool, raw: &str) -> ReferralResult<ReferralLink> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ReferralError::InvalidReferralCode(String::new()));
    }
    if let Some(found) = link::find_by_short_code(pool, raw).await? {
        return Ok(found);
    }
    let normalized = code::normalize(raw);
    link::find_default_for_code(pool, &normalized)
        .await?
        .ok_or(ReferralError::InvalidReferralCode(normalized))
}

/// History counts for the scorer; a failed count scores as zero
async fn recent_counts(pool: &SqlitePool, ip: Option<&str>, referrer_id: i64, now: i64) -> (i64, i64) {
    let same_ip = match ip {
        Some(ip) => click::count_by_ip_since(pool, ip, now - DAY_MILLIS)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(target: "fraud", error = %e, "IP click count failed");
                0
            }),
        None => 0,
    };
    let same_referrer = click::count_by_referrer_since(pool, referrer_id, now - HOUR_MILLIS)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(target: "fraud", error = %e, "Referrer click count failed");
            0
        });
    (same_ip, same_referrer)
}

/// TrackClick
pub async fn track_click(
    pool: &SqlitePool,
    config: &Config,
    code_or_short: &str,
    ctx: &RequestContext,
) -> ReferralResult<TrackClickResult> {
    let target = resolve_link(pool, code_or_short).await?;
    let now = shared::util::now_millis();

    let session_id = ctx
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let ip = ctx.ip.as_deref().map(str::trim).filter(|ip| !ip.is_empty());
    let info = device::parse_user_agent(ctx.user_agent.as_deref());
    let geo = device::geo_location(ctx.country.as_deref(), ctx.city.as_deref());

    let (same_ip, same_referrer) = recent_counts(pool, ip, target.referrer_id, now).await;
    let risk = fraud::score_click(&ClickSignals {
        ip,
        user_agent: ctx.user_agent.as_deref(),
        same_ip_clicks_24h: same_ip,
        same_referrer_clicks_1h: same_referrer,
    });

    let mut tx = pool.begin().await?;
    click::insert(
        &mut *tx,
        ClickInsert {
            link_id: target.id,
            referral_code: &target.referral_code,
            referrer_id: target.referrer_id,
            session_id: &session_id,
            ip_address: ip,
            user_agent: ctx.user_agent.as_deref(),
            referer: ctx.referer.as_deref(),
            device_type: info.device_type,
            os: info.os.as_deref(),
            browser: info.browser.as_deref(),
            country: geo.country.as_deref(),
            city: geo.city.as_deref(),
            clicked_at: now,
            fraud_flags: &risk.flags,
            risk_score: risk.score,
        },
    )
    .await?;
    link::increment_clicks(&mut *tx, target.id).await?;
    tx.commit().await?;

    fraud::record_suspicious_click(
        pool,
        &config.fraud,
        target.referrer_id,
        &target.referral_code,
        &session_id,
        ip,
        &risk,
    )
    .await;

    tracing::debug!(
        code = %target.referral_code,
        short_code = %target.short_code,
        device = ?info.device_type,
        risk_score = risk.score,
        "Referral click tracked"
    );
    Ok(TrackClickResult {
        session_id,
        risk_score: risk.score,
        redirect_url: target.target_url,
    })
}

/// TrackConversion: mark the newest unconverted click of the session (or code) converted
pub async fn track_conversion(
    pool: &SqlitePool,
    req: &TrackConversionRequest,
) -> ReferralResult<ReferralClick> {
    let session = req.session_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let referral_code = req
        .code
        .as_deref()
        .map(code::normalize)
        .filter(|c| !c.is_empty());

    if session.is_none() && referral_code.is_none() {
        return Err(ReferralError::Validation(
            "session_id or code is required".into(),
        ));
    }

    // Session wins; the code covers a lost cookie
    let mut found = None;
    if let Some(session) = session {
        found = click::find_latest_unconverted_by_session(pool, session).await?;
    }
    if found.is_none()
        && let Some(code) = referral_code.as_deref()
    {
        found = click::find_latest_unconverted_by_code(pool, code).await?;
    }
    let key = session
        .map(str::to_string)
        .or(referral_code)
        .unwrap_or_default();
    let found = found.ok_or_else(|| ReferralError::ClickNotFound(key.clone()))?;

    let mut tx = pool.begin().await?;
    if !click::mark_converted(&mut *tx, found.id, req.user_id, req.kind).await? {
        tx.rollback().await?;
        return Err(ReferralError::ClickNotFound(key));
    }
    link::increment_conversions(&mut *tx, found.link_id).await?;
    tx.commit().await?;

    tracing::info!(click_id = found.id, user_id = req.user_id, kind = ?req.kind, "Referral click converted");
    click::find_by_id(pool, found.id)
        .await?
        .ok_or(ReferralError::ClickNotFound(key))
}
