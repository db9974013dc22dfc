//! Points Transaction Model

use serde::{Deserialize, Serialize};

/// Points transaction type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PointsTransactionType {
    /// Referrer reward for a referred user's qualifying event
    EarnedReferral,
    /// Welcome bonus on a user's own qualifying event
    EarnedSignup,
    Redeemed,
    Adjustment,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PointsStatus {
    Completed,
    Reversed,
}

/// Signed points movement (积分流水)
///
/// `new_balance == previous_balance + points` and `new_balance >= 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PointsTransaction {
    pub id: i64,
    pub user_id: i64,
    pub tx_type: PointsTransactionType,
    pub points: i64,
    pub previous_balance: i64,
    pub new_balance: i64,
    pub related_id: Option<String>,
    pub related_model: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub metadata: serde_json::Value,
    pub status: PointsStatus,
    pub created_at: i64,
}

/// Balance + history view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsSummary {
    pub user_id: i64,
    pub points_balance: i64,
    pub total_points_earned: i64,
    pub total_points_redeemed: i64,
    pub transactions: Vec<PointsTransaction>,
}

/// Redeem points payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsRedeem {
    pub points: i64,
    pub related_id: Option<String>,
}

/// Admin adjustment payload (signed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsAdjust {
    pub points: i64,
    pub reason: String,
}
