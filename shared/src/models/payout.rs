//! Payout Model (batched commission disbursement)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// Payout batch (提现批次)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Payout {
    pub id: i64,
    pub referrer_id: i64,
    pub total_amount: f64,
    pub commission_count: i64,
    pub payment_method: String,
    pub status: PayoutStatus,
    pub gateway_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
}

/// Payout with the commission ids it settles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutDetail {
    #[serde(flatten)]
    pub payout: Payout,
    pub commission_ids: Vec<i64>,
}

/// Outcome of one payout cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PayoutCycleResult {
    pub payouts_created: usize,
    pub total_amount: f64,
    /// Payouts the gateway rejected (commissions returned to APPROVED)
    pub failed: usize,
}
