//! Tracking API 模块 - 推荐链接跳转、点击与转化

mod handler;

use axum::{
    Router,
    routing::{get, post},
};
use axum::http::HeaderMap;

use crate::core::AppState;

pub use handler::SESSION_COOKIE;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/r/{code}", get(handler::redirect))
        .nest("/api/referral", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/clicks", post(handler::track_click))
        .route("/conversions", post(handler::track_conversion))
        .route("/links", post(handler::create_link))
        .route("/links/{referrer_id}", get(handler::list_links))
}

/// Read the tracking session from the `Cookie` header
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
