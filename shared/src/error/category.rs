//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 1xxx: Referral errors
/// - 2xxx: Reward errors
/// - 3xxx: Payout errors
/// - 4xxx: Tracking errors
/// - 5xxx..9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Referral code / chain errors (1xxx)
    Referral,
    /// Reward table / points errors (2xxx)
    Reward,
    /// Commission / payout errors (3xxx)
    Payout,
    /// Link / click tracking errors (4xxx)
    Tracking,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Referral,
            2000..3000 => Self::Reward,
            3000..4000 => Self::Payout,
            4000..5000 => Self::Tracking,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Referral => "referral",
            Self::Reward => "reward",
            Self::Payout => "payout",
            Self::Tracking => "tracking",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
