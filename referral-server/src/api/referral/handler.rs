//! Referral API Handlers

use axum::extract::{Json, State};
use shared::models::{
    BuildChainRequest, ChainResult, GenerateCodeRequest, QualifyingEventRequest, ReferralProfile,
    RewardResult,
};

use crate::core::AppState;
use crate::referral::{chain, code, engine};
use crate::utils::{ApiResponse, AppResult};

/// POST /api/referral/code - 获取或生成推荐码（幂等）
pub async fn generate_code(
    State(state): State<AppState>,
    Json(payload): Json<GenerateCodeRequest>,
) -> AppResult<ApiResponse<ReferralProfile>> {
    let profile = code::generate_code(&state.pool, &state.config, payload.user_id).await?;
    Ok(ApiResponse::success(profile))
}

/// POST /api/referral/chain - 建立推荐链
pub async fn build_chain(
    State(state): State<AppState>,
    Json(payload): Json<BuildChainRequest>,
) -> AppResult<ApiResponse<ChainResult>> {
    let result = chain::build_chain(&state.pool, &state.config, payload.user_id, &payload.code).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/referral/events - 处理首单/首次订阅事件
///
/// 重复投递返回 `processed = false`，不报错。
pub async fn process_event(
    State(state): State<AppState>,
    Json(payload): Json<QualifyingEventRequest>,
) -> AppResult<ApiResponse<RewardResult>> {
    let result = engine::process_qualifying_event(&state.pool, &state.rewards, &payload).await?;
    Ok(ApiResponse::success(result))
}
