//! referral-server - 推荐奖励账本服务
//!
//! 物业维修平台的推荐码、推荐链、首单奖励、佣金与积分账本。
//!
//! # 模块
//!
//! - [`core`] - 配置、共享状态、后台任务
//! - [`db`] - SQLite 连接池与仓储
//! - [`referral`] - 推荐业务逻辑（推荐码、推荐链、奖励引擎、风控、提现、对账）
//! - [`api`] - HTTP 接口
//! - [`utils`] - 日志与金额工具

pub mod api;
pub mod core;
pub mod db;
pub mod referral;
pub mod utils;

pub use crate::core::{AppState, BackgroundTasks, Config};
