//! Commission Model (money rewards for agent-class referrers)

use serde::{Deserialize, Serialize};

/// Commission lifecycle
///
/// `PENDING → APPROVED → PROCESSING → PAID`, with `CANCELLED` reachable
/// from `PENDING` or `APPROVED`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CommissionStatus {
    Pending,
    Approved,
    Processing,
    Paid,
    Cancelled,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "PENDING",
            CommissionStatus::Approved => "APPROVED",
            CommissionStatus::Processing => "PROCESSING",
            CommissionStatus::Paid => "PAID",
            CommissionStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether an admin/payout step may move a commission from `self` to `next`
    pub fn can_transition_to(&self, next: CommissionStatus) -> bool {
        use CommissionStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Cancelled)
                | (Approved, Cancelled)
                | (Approved, Processing)
                | (Processing, Paid)
                | (Processing, Approved)
        )
    }
}

/// Commission record (佣金)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Commission {
    pub id: i64,
    pub profile_id: i64,
    pub referrer_id: i64,
    pub referred_user_id: i64,
    pub order_id: String,
    /// Stored for audit only; the amount below is a flat per-tier value
    pub order_amount: f64,
    pub commission_rate: f64,
    pub commission_amount: f64,
    pub tier: i64,
    pub status: CommissionStatus,
    pub payment_method: Option<String>,
    pub payout_id: Option<i64>,
    pub cancel_reason: Option<String>,
    pub approved_at: Option<i64>,
    pub paid_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Cancel commission payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionCancel {
    pub reason: String,
}
