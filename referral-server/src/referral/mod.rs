//! Referral domain
//!
//! # 模块
//!
//! - [`code`] - 推荐码生成 (按用户类别区分前缀)
//! - [`chain`] - 推荐链构建 (最多两级)
//! - [`reward_table`] - 固定奖励表
//! - [`engine`] - 首单/首次订阅奖励引擎
//! - [`points`] - 积分账本
//! - [`commission`] - 佣金生命周期
//! - [`payout`] - 提现批处理
//! - [`device`] / [`fraud`] / [`tracker`] - 点击追踪与风控
//! - [`reconcile`] - 对账
//! - [`analytics`] - 管理端统计

pub mod analytics;
pub mod chain;
pub mod code;
pub mod commission;
pub mod device;
pub mod engine;
pub mod fraud;
pub mod payout;
pub mod points;
pub mod reconcile;
pub mod reward_table;
pub mod tracker;

use crate::db::repository::RepoError;
use shared::error::{AppError, ErrorCode};
use shared::models::{CommissionStatus, ReferrerClass};
use thiserror::Error;

/// Referral domain errors
#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("Invalid referral code: {0}")]
    InvalidReferralCode(String),

    #[error("User {0} cannot use their own referral code")]
    SelfReferralRejected(i64),

    #[error("No reward configured for {class} tier {tier}")]
    NoRewardConfig { class: ReferrerClass, tier: i64 },

    #[error("Could not generate a unique referral code after {0} attempts")]
    CodeGenerationExhausted(u32),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Referral profile not found for user {0}")]
    ProfileNotFound(i64),

    #[error("Insufficient points: balance {balance}, requested {requested}")]
    InsufficientPoints { balance: i64, requested: i64 },

    #[error("Points amount must not be zero")]
    InvalidPointsAmount,

    #[error("Commission {0} not found")]
    CommissionNotFound(i64),

    #[error("Commission {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: &'static str,
        to: &'static str,
    },

    #[error("Referral link not found: {0}")]
    LinkNotFound(String),

    #[error("No click found for {0}")]
    ClickNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

impl From<sqlx::Error> for ReferralError {
    fn from(err: sqlx::Error) -> Self {
        ReferralError::Storage(err.into())
    }
}

impl ReferralError {
    pub fn invalid_transition(id: i64, from: CommissionStatus, to: CommissionStatus) -> Self {
        ReferralError::InvalidTransition {
            id,
            from: from.as_str(),
            to: to.as_str(),
        }
    }

    /// Storage failures leave no partial state and can be retried as a whole
    pub fn is_retriable(&self) -> bool {
        matches!(self, ReferralError::Storage(RepoError::Database(_)))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ReferralError::InvalidReferralCode(_) => ErrorCode::InvalidReferralCode,
            ReferralError::SelfReferralRejected(_) => ErrorCode::SelfReferralRejected,
            ReferralError::NoRewardConfig { .. } => ErrorCode::NoRewardConfig,
            ReferralError::CodeGenerationExhausted(_) => ErrorCode::CodeGenerationExhausted,
            ReferralError::UserNotFound(_) => ErrorCode::UserNotFound,
            ReferralError::ProfileNotFound(_) => ErrorCode::ReferralProfileNotFound,
            ReferralError::InsufficientPoints { .. } => ErrorCode::InsufficientPoints,
            ReferralError::InvalidPointsAmount => ErrorCode::InvalidPointsAmount,
            ReferralError::CommissionNotFound(_) => ErrorCode::CommissionNotFound,
            ReferralError::InvalidTransition { .. } => ErrorCode::InvalidCommissionTransition,
            ReferralError::LinkNotFound(_) => ErrorCode::LinkNotFound,
            ReferralError::ClickNotFound(_) => ErrorCode::ClickNotFound,
            ReferralError::Validation(_) => ErrorCode::ValidationFailed,
            ReferralError::Storage(RepoError::NotFound(_)) => ErrorCode::NotFound,
            ReferralError::Storage(RepoError::Duplicate(_)) => ErrorCode::AlreadyExists,
            ReferralError::Storage(RepoError::Validation(_)) => ErrorCode::ValidationFailed,
            ReferralError::Storage(RepoError::Database(_)) => ErrorCode::DatabaseError,
        }
    }
}

impl From<ReferralError> for AppError {
    fn from(err: ReferralError) -> Self {
        let code = err.code();
        match &err {
            // Storage details stay in the log, not in the response
            ReferralError::Storage(RepoError::Database(msg)) => {
                tracing::error!(error = %msg, "Referral storage failure");
                AppError::new(code)
            }
            ReferralError::InsufficientPoints { balance, requested } => {
                AppError::with_message(code, err.to_string())
                    .with_detail("balance", *balance)
                    .with_detail("requested", *requested)
            }
            ReferralError::NoRewardConfig { class, tier } => {
                AppError::with_message(code, err.to_string())
                    .with_detail("class", class.as_str())
                    .with_detail("tier", *tier)
            }
            _ => AppError::with_message(code, err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        ReferralError::Storage(err).into()
    }
}

/// Result type for referral operations
pub type ReferralResult<T> = Result<T, ReferralError>;
