//! Admin API Handlers

use axum::extract::{Json, Path, Query, State};
use serde::Deserialize;
use shared::models::{
    Commission, CommissionCancel, FraudDetection, FraudStatus, LeaderboardEntry, Payout,
    PayoutCycleResult, PayoutDetail, PointsAdjust, PointsTransaction, ReconcileReport,
    ReferredUser, ReferredUserStatusUpdate, ReferrerStats,
};

use crate::core::AppState;
use crate::referral::{analytics, chain, commission, payout, points, reconcile as ledger};
use crate::utils::{ApiResponse, AppResult};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FraudQuery {
    pub status: Option<FraudStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PayoutQuery {
    pub referrer_id: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/admin/referrers/{id}/stats - 推荐人统计
pub async fn referrer_stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<ReferrerStats>> {
    let stats = analytics::referrer_stats(&state.pool, id).await?;
    Ok(ApiResponse::success(stats))
}

/// GET /api/admin/referrers/{id}/commissions - 推荐人佣金明细
pub async fn list_commissions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Vec<Commission>>> {
    let items = commission::list_for_referrer(&state.pool, id).await?;
    Ok(ApiResponse::success(items))
}

/// GET /api/admin/referrers/{id}/referred - 被推荐用户列表
pub async fn list_referred(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Vec<ReferredUser>>> {
    let items = analytics::list_referred(&state.pool, id).await?;
    Ok(ApiResponse::success(items))
}

/// GET /api/admin/leaderboard?limit=N - 排行榜
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<ApiResponse<Vec<LeaderboardEntry>>> {
    let entries = analytics::leaderboard(&state.pool, query.limit).await?;
    Ok(ApiResponse::success(entries))
}

/// GET /api/admin/fraud?status=PENDING - 风控记录
pub async fn list_fraud(
    State(state): State<AppState>,
    Query(query): Query<FraudQuery>,
) -> AppResult<ApiResponse<Vec<FraudDetection>>> {
    let items = analytics::list_fraud(&state.pool, query.status, query.limit).await?;
    Ok(ApiResponse::success(items))
}

/// GET /api/admin/payouts?referrer_id=N - 提现记录
pub async fn list_payouts(
    State(state): State<AppState>,
    Query(query): Query<PayoutQuery>,
) -> AppResult<ApiResponse<Vec<Payout>>> {
    let items = analytics::list_payouts(&state.pool, query.referrer_id, query.limit).await?;
    Ok(ApiResponse::success(items))
}

/// GET /api/admin/payouts/{id} - 提现详情（含佣金）
pub async fn get_payout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<PayoutDetail>> {
    let detail = payout::get_payout(&state.pool, id).await?;
    Ok(ApiResponse::success(detail))
}

/// POST /api/admin/commissions/{id}/approve - 审核通过
pub async fn approve_commission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Commission>> {
    let approved = commission::approve(&state.pool, id).await?;
    Ok(ApiResponse::success(approved))
}

/// POST /api/admin/commissions/{id}/cancel - 取消佣金（冲回余额）
pub async fn cancel_commission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CommissionCancel>,
) -> AppResult<ApiResponse<Commission>> {
    let cancelled = commission::cancel(&state.pool, id, &payload.reason).await?;
    Ok(ApiResponse::success(cancelled))
}

/// POST /api/admin/payouts/run - 立即执行一次提现批处理
pub async fn run_payouts(State(state): State<AppState>) -> AppResult<ApiResponse<PayoutCycleResult>> {
    let result =
        payout::run_payout_cycle(&state.pool, &state.config.payout, &state.gateway).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/admin/reconcile - 立即对账
pub async fn reconcile(State(state): State<AppState>) -> AppResult<ApiResponse<ReconcileReport>> {
    let report = ledger::reconcile(&state.pool).await?;
    Ok(ApiResponse::success(report))
}

/// POST /api/admin/points/{id}/adjust - 手动调整积分
pub async fn adjust_points(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PointsAdjust>,
) -> AppResult<ApiResponse<PointsTransaction>> {
    let tx = points::adjust(&state.pool, id, payload.points, &payload.reason).await?;
    Ok(ApiResponse::success(tx))
}

/// PUT /api/admin/referrers/{id}/referred/{user_id}/status - 修改被推荐人状态
pub async fn set_referred_status(
    State(state): State<AppState>,
    Path((referrer_id, user_id)): Path<(i64, i64)>,
    Json(payload): Json<ReferredUserStatusUpdate>,
) -> AppResult<ApiResponse<()>> {
    chain::set_referred_user_status(&state.pool, referrer_id, user_id, payload.status).await?;
    Ok(ApiResponse::success(()))
}
