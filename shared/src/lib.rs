//! Shared types for the referral ledger
//!
//! Domain models, the unified error system and small utilities used by
//! the referral server and by anything that consumes its HTTP API.

pub mod error;
pub mod models;
pub mod util;
