use rust_decimal::Decimal;
use std::str::FromStr;

/// 服务配置 - 推荐奖励账本的所有配置项
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_PATH | data/referral.db | SQLite 数据库文件 |
/// | HTTP_PORT | 8080 | HTTP 服务端口 |
/// | PUBLIC_BASE_URL | http://localhost:8080 | 推荐链接跳转的站点地址 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (none) | 日志目录，设置后按天滚动写文件 |
/// | WELCOME_BONUS_POINTS | 50 | 首单/首次订阅欢迎积分 |
/// | AGENT_TIER1_COMMISSION | 5.00 | 中介一级佣金 |
/// | AGENT_TIER2_COMMISSION | 2.00 | 中介二级佣金 |
/// | CUSTOMER_TIER1_POINTS | 100 | 客户一级积分 |
/// | CUSTOMER_TIER2_POINTS | 50 | 客户二级积分 |
/// | MIN_PAYOUT_AMOUNT | 50.00 | 最低提现金额 |
/// | PAYOUT_INTERVAL_SECS | 86400 | 提现批处理间隔 |
/// | RECONCILE_INTERVAL_SECS | 3600 | 对账间隔 |
/// | COMMISSION_HOLD_DAYS | 14 | 佣金自动审核等待天数 (0 = 关闭) |
/// | FRAUD_DETECTION_THRESHOLD | 70 | 风控记录阈值 |
/// | FRAUD_CRITICAL_THRESHOLD | 90 | 严重风控阈值 |
/// | CODE_GENERATION_ATTEMPTS | 10 | 推荐码生成重试次数 |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub http_port: u16,
    /// Base URL that referral links redirect into
    pub public_base_url: String,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub rewards: RewardConfig,
    pub payout: PayoutConfig,
    pub fraud: FraudConfig,
    pub reconcile_interval_secs: u64,
    pub code_generation_attempts: u32,
    /// Fallbacks taken while loading
    pub warnings: Vec<String>,
}

/// Fixed reward amounts per referrer class and tier
#[derive(Debug, Clone, PartialEq)]
pub struct RewardConfig {
    pub welcome_bonus_points: i64,
    pub agent_tier1_commission: Decimal,
    pub agent_tier2_commission: Decimal,
    pub customer_tier1_points: i64,
    pub customer_tier2_points: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayoutConfig {
    pub min_payout_amount: Decimal,
    pub interval_secs: u64,
    /// Days a PENDING commission waits before auto-approval; None disables it
    pub commission_hold_days: Option<u32>,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FraudConfig {
    pub detection_threshold: i64,
    pub critical_threshold: i64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            welcome_bonus_points: 50,
            agent_tier1_commission: Decimal::new(500, 2),
            agent_tier2_commission: Decimal::new(200, 2),
            customer_tier1_points: 100,
            customer_tier2_points: 50,
        }
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            min_payout_amount: Decimal::new(5000, 2),
            interval_secs: 86_400,
            commission_hold_days: Some(14),
            payment_method: "bank_transfer".to_string(),
        }
    }
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 70,
            critical_threshold: 90,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置 (测试中使用闭包代替环境变量)
    ///
    /// 非法值回退到默认值并记入 `warnings`，日志初始化后由 [`Config::log_warnings`] 输出
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut loader = Loader {
            lookup,
            warnings: Vec::new(),
        };
        let rewards_default = RewardConfig::default();
        let payout_default = PayoutConfig::default();
        let fraud_default = FraudConfig::default();

        let hold_days: u32 = loader.parse_or("COMMISSION_HOLD_DAYS", 14);
        let rewards = RewardConfig {
            welcome_bonus_points: loader.non_negative(
                "WELCOME_BONUS_POINTS",
                rewards_default.welcome_bonus_points,
            ),
            agent_tier1_commission: loader.non_negative(
                "AGENT_TIER1_COMMISSION",
                rewards_default.agent_tier1_commission,
            ),
            agent_tier2_commission: loader.non_negative(
                "AGENT_TIER2_COMMISSION",
                rewards_default.agent_tier2_commission,
            ),
            customer_tier1_points: loader.non_negative(
                "CUSTOMER_TIER1_POINTS",
                rewards_default.customer_tier1_points,
            ),
            customer_tier2_points: loader.non_negative(
                "CUSTOMER_TIER2_POINTS",
                rewards_default.customer_tier2_points,
            ),
        };
        if rewards.agent_tier2_commission >= rewards.agent_tier1_commission {
            loader.warn(format!(
                "AGENT_TIER2_COMMISSION ({}) is not below AGENT_TIER1_COMMISSION ({})",
                rewards.agent_tier2_commission, rewards.agent_tier1_commission
            ));
        }
        if rewards.customer_tier2_points >= rewards.customer_tier1_points {
            loader.warn(format!(
                "CUSTOMER_TIER2_POINTS ({}) is not below CUSTOMER_TIER1_POINTS ({})",
                rewards.customer_tier2_points, rewards.customer_tier1_points
            ));
        }

        Self {
            database_path: loader.get("DATABASE_PATH").unwrap_or_else(|| "data/referral.db".into()),
            http_port: loader.parse_or("HTTP_PORT", 8080),
            public_base_url: loader
                .get("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:8080".into()),
            environment: loader.get("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            log_level: loader.get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: loader.get("LOG_DIR"),
            rewards,
            payout: PayoutConfig {
                min_payout_amount: loader
                    .non_negative("MIN_PAYOUT_AMOUNT", payout_default.min_payout_amount),
                interval_secs: loader.parse_or("PAYOUT_INTERVAL_SECS", payout_default.interval_secs),
                commission_hold_days: (hold_days > 0).then_some(hold_days),
                payment_method: loader
                    .get("PAYOUT_METHOD")
                    .unwrap_or(payout_default.payment_method),
            },
            fraud: FraudConfig {
                detection_threshold: loader
                    .parse_or("FRAUD_DETECTION_THRESHOLD", fraud_default.detection_threshold),
                critical_threshold: loader
                    .parse_or("FRAUD_CRITICAL_THRESHOLD", fraud_default.critical_threshold),
            },
            reconcile_interval_secs: loader.parse_or("RECONCILE_INTERVAL_SECS", 3600),
            code_generation_attempts: loader.parse_or("CODE_GENERATION_ATTEMPTS", 10),
            warnings: loader.warnings,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Emit the warnings collected while loading
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("Config: {warning}");
        }
    }
}

/// Key lookup that records every fallback it takes
struct Loader<F> {
    lookup: F,
    warnings: Vec<String>,
}

impl<F> Loader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Parse a value, falling back to the default when malformed
    fn parse_or<T: FromStr>(&mut self, key: &str, default: T) -> T {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                self.warn(format!("invalid value {raw:?} for {key}, using default"));
                default
            }
        }
    }

    /// Like [`Self::parse_or`], and negative amounts fall back too
    fn non_negative<T>(&mut self, key: &str, default: T) -> T
    where
        T: FromStr + PartialOrd + Default + std::fmt::Display + Copy,
    {
        let value = self.parse_or(key, default);
        if value < T::default() {
            self.warn(format!("negative value {value} for {key}, using default {default}"));
            return default;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, "data/referral.db");
        assert_eq!(config.rewards, RewardConfig::default());
        assert_eq!(config.payout.min_payout_amount, Decimal::new(50, 0));
        assert_eq!(config.payout.commission_hold_days, Some(14));
        assert_eq!(config.fraud.detection_threshold, 70);
        assert_eq!(config.code_generation_attempts, 10);
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HTTP_PORT", "9000"),
            ("AGENT_TIER1_COMMISSION", "7.50"),
            ("CUSTOMER_TIER2_POINTS", "25"),
            ("MIN_PAYOUT_AMOUNT", "100"),
            ("PUBLIC_BASE_URL", "https://fixit.example.com/"),
            ("ENVIRONMENT", "production"),
        ]);
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.rewards.agent_tier1_commission, Decimal::new(750, 2));
        assert_eq!(config.rewards.customer_tier2_points, 25);
        assert_eq!(config.payout.min_payout_amount, Decimal::new(100, 0));
        assert_eq!(config.public_base_url, "https://fixit.example.com");
        assert!(config.is_production());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[("HTTP_PORT", "not-a-port"), ("WELCOME_BONUS_POINTS", "")]);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.rewards.welcome_bonus_points, 50);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let config = config_from(&[("HTTP_PORT", "not-a-port")]);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("HTTP_PORT"));
        assert!(config_from(&[]).warnings.is_empty());
    }

    #[test]
    fn test_negative_rewards_fall_back() {
        let config = config_from(&[
            ("CUSTOMER_TIER1_POINTS", "-100"),
            ("AGENT_TIER1_COMMISSION", "-5.00"),
            ("AGENT_TIER2_COMMISSION", "-1"),
            ("WELCOME_BONUS_POINTS", "-1"),
        ]);
        assert_eq!(config.rewards, RewardConfig::default());
        assert_eq!(config.warnings.len(), 4);
        assert!(config.warnings.iter().any(|w| w.contains("CUSTOMER_TIER1_POINTS")));
    }

    #[test]
    fn test_tier_two_not_below_tier_one_is_reported() {
        let config = config_from(&[("CUSTOMER_TIER2_POINTS", "100"), ("AGENT_TIER2_COMMISSION", "9.00")]);
        assert_eq!(config.rewards.customer_tier2_points, 100);
        assert_eq!(config.rewards.agent_tier2_commission, Decimal::new(900, 2));
        assert_eq!(config.warnings.len(), 2);
        assert!(config.warnings.iter().any(|w| w.starts_with("CUSTOMER_TIER2_POINTS")));
        assert!(config.warnings.iter().any(|w| w.starts_with("AGENT_TIER2_COMMISSION")));
    }

    #[test]
    fn test_zero_hold_days_disables_auto_approval() {
        let config = config_from(&[("COMMISSION_HOLD_DAYS", "0")]);
        assert_eq!(config.payout.commission_hold_days, None);
    }
}
