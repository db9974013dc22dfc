//! Referral Profile & Chain Models

use serde::{Deserialize, Serialize};

use super::user::ChainEdge;

/// Status of a referred user within a referrer's profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ReferredUserStatus {
    /// Signed up, no qualifying purchase yet
    Pending,
    /// Completed a qualifying purchase
    Active,
    Inactive,
}

/// Referral profile: one per referring user (推荐档案)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ReferralProfile {
    pub id: i64,
    pub referrer_id: i64,
    pub referral_code: String,
    pub total_referrals: i64,
    pub active_referrals: i64,
    /// Legacy percentage rates, kept for display only
    pub tier1_rate: f64,
    pub tier2_rate: f64,
    pub total_commission_earned: f64,
    pub pending_commission: f64,
    pub total_commission_paid: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A user referred through a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ReferredUser {
    pub id: i64,
    pub profile_id: i64,
    pub referred_user_id: i64,
    pub tier: i64,
    pub joined_at: i64,
    pub first_purchase_amount: Option<f64>,
    pub total_spent: f64,
    pub status: ReferredUserStatus,
}

/// Outcome of `BuildChain`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainResult {
    pub user_id: i64,
    pub referred_by: i64,
    pub chain: Vec<ChainEdge>,
    /// false when the chain already existed (repeat call)
    pub created: bool,
}

/// Generate code payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateCodeRequest {
    pub user_id: i64,
}

/// Build chain payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildChainRequest {
    pub user_id: i64,
    pub code: String,
}

/// Admin payload to change a referred user's status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferredUserStatusUpdate {
    pub status: ReferredUserStatus,
}
