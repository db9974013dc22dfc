//! Referral API 模块

mod handler;

use axum::{Router, routing::post};

use crate::core::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/referral", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/code", post(handler::generate_code))
        .route("/chain", post(handler::build_chain))
        .route("/events", post(handler::process_event))
}
