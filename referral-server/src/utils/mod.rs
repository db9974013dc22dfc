//! 工具模块 - 日志与金额计算

pub mod logger;
pub mod money;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
