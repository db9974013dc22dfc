//! Data models
//!
//! Shared between the referral server and API consumers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are UTC millis.

pub mod click;
pub mod commission;
pub mod fraud;
pub mod payout;
pub mod points;
pub mod referral;
pub mod reward;
pub mod stats;
pub mod user;

// Re-exports
pub use click::*;
pub use commission::*;
pub use fraud::*;
pub use payout::*;
pub use points::*;
pub use referral::*;
pub use reward::*;
pub use stats::*;
pub use user::*;
