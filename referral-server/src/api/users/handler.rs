//! User API Handlers

use axum::extract::{Json, Path, State};
use axum::http::HeaderMap;
use shared::models::{
    ConversionType, PointsRedeem, PointsSummary, PointsTransaction, TrackConversionRequest, User,
    UserUpsert,
};

use crate::api::tracking::session_from_headers;
use crate::core::AppState;
use crate::db::repository::user;
use crate::referral::{ReferralError, chain, points, tracker};
use crate::utils::{ApiResponse, AppError, AppResult};

/// POST /api/users - 注册或更新用户，可附带推荐码
///
/// 推荐码无效或自我推荐只记录日志，不影响注册。
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UserUpsert>,
) -> AppResult<ApiResponse<User>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    let created = user::upsert(&state.pool, &payload).await?;

    if let Some(code) = payload
        .referral_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        match chain::build_chain(&state.pool, &state.config, created.id, code).await {
            Ok(result) => {
                tracing::info!(
                    user_id = created.id,
                    referred_by = result.referred_by,
                    tiers = result.chain.len(),
                    "Signup attached to referral chain"
                );
                let conversion = TrackConversionRequest {
                    session_id: session_from_headers(&headers),
                    code: Some(code.to_string()),
                    user_id: created.id,
                    kind: ConversionType::Signup,
                };
                if let Err(e) = tracker::track_conversion(&state.pool, &conversion).await {
                    tracing::debug!(user_id = created.id, error = %e, "No click to attribute signup to");
                }
            }
            Err(e @ (ReferralError::InvalidReferralCode(_) | ReferralError::SelfReferralRejected(_))) => {
                tracing::warn!(user_id = created.id, error = %e, "Signup referral code ignored");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let user = user::find_by_id(&state.pool, created.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {}", created.id)))?;
    Ok(ApiResponse::success(user))
}

/// GET /api/users/{id} - 获取用户（含推荐链）
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<ApiResponse<User>> {
    let user = user::find_by_id(&state.pool, id)
        .await?
        .ok_or(ReferralError::UserNotFound(id))?;
    Ok(ApiResponse::success(user))
}

/// GET /api/users/{id}/points - 积分余额与流水
pub async fn points(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<PointsSummary>> {
    let summary = points::history(&state.pool, id).await?;
    Ok(ApiResponse::success(summary))
}

/// POST /api/users/{id}/points/redeem - 兑换积分
pub async fn redeem_points(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PointsRedeem>,
) -> AppResult<ApiResponse<PointsTransaction>> {
    let tx = points::redeem(&state.pool, id, payload.points, payload.related_id.as_deref()).await?;
    Ok(ApiResponse::success(tx))
}
