//! Admin analytics views (read-only aggregates)

use serde::{Deserialize, Serialize};

/// Per-referrer dashboard numbers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReferrerStats {
    pub referrer_id: i64,
    pub referral_code: Option<String>,
    pub total_clicks: i64,
    pub total_conversions: i64,
    /// conversions / clicks, 0 when there are no clicks
    pub conversion_rate: f64,
    pub total_referrals: i64,
    pub active_referrals: i64,
    pub pending_commission: f64,
    pub approved_commission: f64,
    pub paid_commission: f64,
    pub referral_points_earned: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LeaderboardEntry {
    pub referrer_id: i64,
    pub name: String,
    pub referral_code: String,
    pub total_referrals: i64,
    pub active_referrals: i64,
    pub total_commission_earned: f64,
}

/// Rows rewritten by a reconciliation sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub users_checked: usize,
    pub users_corrected: usize,
    pub profiles_checked: usize,
    pub profiles_corrected: usize,
    /// Users whose balance disagrees with their latest points transaction
    pub points_mismatches: Vec<i64>,
}
