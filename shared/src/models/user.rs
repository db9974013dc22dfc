//! User Model (reward-relevant fields of the external user identity)

use serde::{Deserialize, Serialize};

/// Referrer class: decides which reward a referrer earns.
///
/// Stored once on the user record; the referral code prefix mirrors it
/// for convenience only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum ReferrerClass {
    Customer,
    PropertyAgent,
}

impl ReferrerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferrerClass::Customer => "customer",
            ReferrerClass::PropertyAgent => "property_agent",
        }
    }
}

impl std::fmt::Display for ReferrerClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edge of a user's referral chain (tier 1 = direct referrer)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ChainEdge {
    pub referrer_id: i64,
    pub tier: i64,
}

/// User entity (用户) as seen by the referral ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub referral_user_type: ReferrerClass,
    pub points_balance: i64,
    pub total_points_earned: i64,
    pub total_points_redeemed: i64,
    pub pending_commission: f64,
    pub total_commission_earned: f64,
    pub total_commission_paid: f64,
    pub has_completed_first_order: bool,
    pub first_order_at: Option<i64>,
    pub has_completed_first_subscription: bool,
    pub first_subscription_at: Option<i64>,
    pub referred_by: Option<i64>,
    /// Loaded from `referral_chain`, ordered by ascending tier
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub referral_chain: Vec<ChainEdge>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Registration payload (upsert)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpsert {
    /// External user id; generated when absent
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub referral_user_type: ReferrerClass,
    /// Referral code entered at signup
    pub referral_code: Option<String>,
}
