//! Qualifying Event & Reward Result Models

use serde::{Deserialize, Serialize};

/// Kind of qualifying event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum QualifyingEventKind {
    /// First completed, paid order
    Order,
    /// First paid subscription cycle
    Subscription,
}

impl QualifyingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualifyingEventKind::Order => "order",
            QualifyingEventKind::Subscription => "subscription",
        }
    }
}

/// Recorded state of a user's qualifying event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum QualifyingEventState {
    Unprocessed,
    Rewarded,
}

/// One row per (user, kind): the claim that makes rewards at-most-once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct QualifyingEvent {
    pub id: i64,
    pub user_id: i64,
    pub kind: QualifyingEventKind,
    pub event_id: String,
    pub event_amount: f64,
    pub state: QualifyingEventState,
    pub processed_at: i64,
}

/// Process qualifying event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifyingEventRequest {
    pub user_id: i64,
    pub event_id: String,
    pub amount: f64,
    pub kind: QualifyingEventKind,
}

/// Reward payload type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Money,
    Points,
}

/// A reward applied to one chain edge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardGrant {
    pub referrer_id: i64,
    pub tier: i64,
    pub kind: RewardKind,
    /// Money amount (kind = money) or points (kind = points)
    pub amount: f64,
    /// Commission id or points transaction id
    pub transaction_id: i64,
}

/// A chain edge that could not be rewarded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeFailure {
    pub referrer_id: i64,
    pub tier: i64,
    pub error_code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotProcessedReason {
    NotFirstEvent,
}

/// Outcome of `ProcessQualifyingEvent`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardResult {
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<NotProcessedReason>,
    pub welcome_bonus: bool,
    pub welcome_points: i64,
    pub rewards: Vec<RewardGrant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<EdgeFailure>,
}

impl RewardResult {
    pub fn not_first_event() -> Self {
        Self {
            processed: false,
            reason: Some(NotProcessedReason::NotFirstEvent),
            welcome_bonus: false,
            welcome_points: 0,
            rewards: Vec::new(),
            failures: Vec::new(),
        }
    }
}
