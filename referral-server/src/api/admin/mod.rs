//! Admin API 模块 - 统计、佣金审核、提现、对账
//!
//! 认证不在本服务范围内，部署时由网关保护 `/api/admin`。

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/admin", routes())
}

fn routes() -> Router<AppState> {
    let read_routes = Router::new()
        .route("/referrers/{id}/stats", get(handler::referrer_stats))
        .route("/referrers/{id}/commissions", get(handler::list_commissions))
        .route("/referrers/{id}/referred", get(handler::list_referred))
        .route("/leaderboard", get(handler::leaderboard))
        .route("/fraud", get(handler::list_fraud))
        .route("/payouts", get(handler::list_payouts))
        .route("/payouts/{id}", get(handler::get_payout));

    let manage_routes = Router::new()
        .route("/commissions/{id}/approve", post(handler::approve_commission))
        .route("/commissions/{id}/cancel", post(handler::cancel_commission))
        .route("/payouts/run", post(handler::run_payouts))
        .route("/reconcile", post(handler::reconcile))
        .route("/points/{id}/adjust", post(handler::adjust_points))
        .route(
            "/referrers/{id}/referred/{user_id}/status",
            put(handler::set_referred_status),
        );

    read_routes.merge(manage_routes)
}
