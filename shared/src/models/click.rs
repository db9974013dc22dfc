//! Referral Link & Click Models

use serde::{Deserialize, Serialize};

/// Device class derived from the user agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Bot,
    Unknown,
}

/// What a click converted into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum ConversionType {
    Signup,
    FirstOrder,
    FirstSubscription,
}

/// Shareable short link pointing at a signup URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ReferralLink {
    pub id: i64,
    pub referrer_id: i64,
    pub referral_code: String,
    pub short_code: String,
    pub target_url: String,
    pub campaign: Option<String>,
    pub click_count: i64,
    pub conversion_count: i64,
    pub created_at: i64,
}

/// Device info parsed from a user agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub os: Option<String>,
    pub browser: Option<String>,
}

/// Coarse location from edge headers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Referral link visit (点击记录): analytics record, never deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ReferralClick {
    pub id: i64,
    pub link_id: i64,
    pub referral_code: String,
    pub referrer_id: i64,
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub device_type: DeviceType,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub clicked_at: i64,
    pub converted: bool,
    pub converted_at: Option<i64>,
    pub converted_user_id: Option<i64>,
    pub conversion_type: Option<ConversionType>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub fraud_flags: Vec<String>,
    pub risk_score: i64,
}

/// Inbound request metadata for click tracking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    /// Existing session (cookie) if the visitor already has one
    pub session_id: Option<String>,
}

/// Track click payload (JSON variant of `GET /r/{code}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackClickRequest {
    pub code: String,
    #[serde(default)]
    pub context: RequestContext,
}

/// Outcome of `TrackClick`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackClickResult {
    pub session_id: String,
    pub risk_score: i64,
    pub redirect_url: String,
}

/// Track conversion payload: session id preferred, code as fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConversionRequest {
    pub session_id: Option<String>,
    pub code: Option<String>,
    pub user_id: i64,
    pub kind: ConversionType,
}

/// Create campaign link payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCreate {
    pub referrer_id: i64,
    pub campaign: Option<String>,
}
