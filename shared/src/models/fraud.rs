//! Fraud Detection Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum FraudType {
    SelfReferral,
    SuspiciousClicks,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum FraudSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum FraudStatus {
    Pending,
    Investigating,
    Resolved,
    FalsePositive,
}

/// Fraud detection record (风控记录). Resolution is a manual workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct FraudDetection {
    pub id: i64,
    pub fraud_type: FraudType,
    pub severity: FraudSeverity,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub affected_users: Vec<i64>,
    pub referral_code: Option<String>,
    pub description: String,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub evidence: Vec<String>,
    pub risk_score: i64,
    pub status: FraudStatus,
    pub resolution: Option<String>,
    pub notify_admin: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert payload
#[derive(Debug, Clone)]
pub struct FraudDetectionCreate {
    pub fraud_type: FraudType,
    pub severity: FraudSeverity,
    pub affected_users: Vec<i64>,
    pub referral_code: Option<String>,
    pub description: String,
    pub evidence: Vec<String>,
    pub risk_score: i64,
    pub notify_admin: bool,
}
