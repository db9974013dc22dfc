//! Unified error system for the referral ledger
//!
//! - [`ErrorCode`]: numeric codes shared by the server and API clients
//! - [`ErrorCategory`]: classification by code range
//! - [`AppError`]: error with code, message and optional details
//! - [`ApiResponse`]: JSON envelope used by every endpoint
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Referral errors (codes, chains, users)
//! - 2xxx: Reward errors (reward table, points ledger)
//! - 3xxx: Payout errors (commissions, payouts)
//! - 4xxx: Tracking errors (links, clicks)
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::with_message(ErrorCode::InvalidReferralCode, "Unknown code AGENTJD1234")
//!     .with_detail("code", "AGENTJD1234");
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(1001));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
