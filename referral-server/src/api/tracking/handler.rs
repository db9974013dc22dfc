//! Tracking API Handlers

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Json, Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use shared::models::{
    LinkCreate, ReferralClick, ReferralLink, RequestContext, TrackClickRequest, TrackClickResult,
    TrackConversionRequest,
};

use super::session_from_headers;
use crate::core::AppState;
use crate::referral::{analytics, code, tracker};
use crate::utils::{ApiResponse, AppResult};

pub const SESSION_COOKIE: &str = "ref_session";

/// 30 天
const SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Client IP: X-Forwarded-For first entry, then the peer address
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return Some(ip.to_owned());
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build the click context from request headers (CDN geo headers included)
fn request_context(headers: &HeaderMap, peer: Option<SocketAddr>) -> RequestContext {
    RequestContext {
        ip: client_ip(headers, peer),
        user_agent: header_str(headers, header::USER_AGENT.as_str()),
        referer: header_str(headers, header::REFERER.as_str()),
        country: header_str(headers, "cf-ipcountry").or_else(|| header_str(headers, "x-country-code")),
        city: header_str(headers, "x-city"),
        session_id: session_from_headers(headers),
    }
}

/// GET /r/{code} - 记录点击并 302 跳转到注册页
pub async fn redirect(
    State(state): State<AppState>,
    Path(code): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let ctx = request_context(request.headers(), peer);
    let tracked = tracker::track_click(&state.pool, &state.config, &code, &ctx).await?;

    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; Max-Age={SESSION_MAX_AGE_SECS}; HttpOnly; SameSite=Lax",
        tracked.session_id
    );
    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, tracked.redirect_url),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response())
}

/// POST /api/referral/clicks - 记录点击（JSON，供前端/APP 调用）
pub async fn track_click(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TrackClickRequest>,
) -> AppResult<ApiResponse<TrackClickResult>> {
    let mut ctx = payload.context;
    let observed = request_context(&headers, None);
    ctx.ip = ctx.ip.or(observed.ip);
    ctx.user_agent = ctx.user_agent.or(observed.user_agent);
    ctx.session_id = ctx.session_id.or(observed.session_id);
    let result = tracker::track_click(&state.pool, &state.config, &payload.code, &ctx).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/referral/conversions - 标记转化
pub async fn track_conversion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut payload): Json<TrackConversionRequest>,
) -> AppResult<ApiResponse<ReferralClick>> {
    if payload.session_id.is_none() {
        payload.session_id = session_from_headers(&headers);
    }
    let click = tracker::track_conversion(&state.pool, &payload).await?;
    Ok(ApiResponse::success(click))
}

/// POST /api/referral/links - 创建活动链接
pub async fn create_link(
    State(state): State<AppState>,
    Json(payload): Json<LinkCreate>,
) -> AppResult<ApiResponse<ReferralLink>> {
    let link = code::create_campaign_link(
        &state.pool,
        &state.config,
        payload.referrer_id,
        payload.campaign.as_deref(),
    )
    .await?;
    Ok(ApiResponse::success(link))
}

/// GET /api/referral/links/{referrer_id} - 推荐人的全部链接
pub async fn list_links(
    State(state): State<AppState>,
    Path(referrer_id): Path<i64>,
) -> AppResult<ApiResponse<Vec<ReferralLink>>> {
    let links = analytics::list_links(&state.pool, referrer_id).await?;
    Ok(ApiResponse::success(links))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)).as_deref(), Some("127.0.0.1"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_request_context_reads_geo_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-country-code", HeaderValue::from_static("GB"));
        headers.insert("x-city", HeaderValue::from_static("London"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        let ctx = request_context(&headers, None);
        assert_eq!(ctx.country.as_deref(), Some("GB"));
        assert_eq!(ctx.city.as_deref(), Some("London"));
        assert_eq!(ctx.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(ctx.referer, None);
    }
}
