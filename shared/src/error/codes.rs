//! Unified error codes for the referral ledger
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Referral errors
//! - 2xxx: Reward errors
//! - 3xxx: Payout errors
//! - 4xxx: Tracking errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values on the wire so API clients in any language
/// can switch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Referral ====================
    /// Referral code does not resolve to a referrer
    InvalidReferralCode = 1001,
    /// Referral code resolves to the registering user
    SelfReferralRejected = 1002,
    /// No unique referral code could be generated
    CodeGenerationExhausted = 1003,
    /// User not found
    UserNotFound = 1004,
    /// Referral profile not found
    ReferralProfileNotFound = 1005,

    // ==================== 2xxx: Reward ====================
    /// No reward configured for referrer class and tier
    NoRewardConfig = 2001,
    /// Points balance would become negative
    InsufficientPoints = 2002,
    /// Points amount must be non-zero
    InvalidPointsAmount = 2003,

    // ==================== 3xxx: Payout ====================
    /// Commission not found
    CommissionNotFound = 3001,
    /// Commission status transition not allowed
    InvalidCommissionTransition = 3002,
    /// Payout not found
    PayoutNotFound = 3003,
    /// Payout dispatch failed
    PayoutFailed = 3004,

    // ==================== 4xxx: Tracking ====================
    /// Referral link not found
    LinkNotFound = 4001,
    /// Click session not found
    ClickNotFound = 4002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// System busy (storage locked, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Referral
            ErrorCode::InvalidReferralCode => "Referral code is not valid",
            ErrorCode::SelfReferralRejected => "Users cannot refer themselves",
            ErrorCode::CodeGenerationExhausted => "Could not generate a unique referral code",
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::ReferralProfileNotFound => "Referral profile not found",

            // Reward
            ErrorCode::NoRewardConfig => "No reward configured for this referrer class and tier",
            ErrorCode::InsufficientPoints => "Insufficient points balance",
            ErrorCode::InvalidPointsAmount => "Points amount must not be zero",

            // Payout
            ErrorCode::CommissionNotFound => "Commission not found",
            ErrorCode::InvalidCommissionTransition => "Commission status change not allowed",
            ErrorCode::PayoutNotFound => "Payout not found",
            ErrorCode::PayoutFailed => "Payout dispatch failed",

            // Tracking
            ErrorCode::LinkNotFound => "Referral link not found",
            ErrorCode::ClickNotFound => "Click session not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Referral
            1001 => Ok(ErrorCode::InvalidReferralCode),
            1002 => Ok(ErrorCode::SelfReferralRejected),
            1003 => Ok(ErrorCode::CodeGenerationExhausted),
            1004 => Ok(ErrorCode::UserNotFound),
            1005 => Ok(ErrorCode::ReferralProfileNotFound),

            // Reward
            2001 => Ok(ErrorCode::NoRewardConfig),
            2002 => Ok(ErrorCode::InsufficientPoints),
            2003 => Ok(ErrorCode::InvalidPointsAmount),

            // Payout
            3001 => Ok(ErrorCode::CommissionNotFound),
            3002 => Ok(ErrorCode::InvalidCommissionTransition),
            3003 => Ok(ErrorCode::PayoutNotFound),
            3004 => Ok(ErrorCode::PayoutFailed),

            // Tracking
            4001 => Ok(ErrorCode::LinkNotFound),
            4002 => Ok(ErrorCode::ClickNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
