//! Fixed reward table keyed by (referrer class, tier)
//!
//! Agents earn flat money commissions, customers earn flat points. Amounts
//! never depend on the order value.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::models::ReferrerClass;

use super::{ReferralError, ReferralResult};
use crate::core::config::RewardConfig;

/// Reward granted to one chain edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardRule {
    Money(Decimal),
    Points(i64),
}

impl RewardRule {
    pub fn is_zero(&self) -> bool {
        match self {
            RewardRule::Money(amount) => amount.is_zero(),
            RewardRule::Points(points) => *points == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewardTable {
    rules: HashMap<(ReferrerClass, i64), RewardRule>,
    welcome_bonus_points: i64,
}

impl RewardTable {
    pub fn from_config(config: &RewardConfig) -> Self {
        let rules = HashMap::from([
            (
                (ReferrerClass::PropertyAgent, 1),
                RewardRule::Money(config.agent_tier1_commission),
            ),
            (
                (ReferrerClass::PropertyAgent, 2),
                RewardRule::Money(config.agent_tier2_commission),
            ),
            (
                (ReferrerClass::Customer, 1),
                RewardRule::Points(config.customer_tier1_points),
            ),
            (
                (ReferrerClass::Customer, 2),
                RewardRule::Points(config.customer_tier2_points),
            ),
        ]);
        Self {
            rules,
            welcome_bonus_points: config.welcome_bonus_points,
        }
    }

    /// An empty table (every lookup is `NoRewardConfig`)
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
            welcome_bonus_points: 0,
        }
    }

    pub fn with_rule(mut self, class: ReferrerClass, tier: i64, rule: RewardRule) -> Self {
        self.rules.insert((class, tier), rule);
        self
    }

    pub fn resolve(&self, class: ReferrerClass, tier: i64) -> ReferralResult<RewardRule> {
        self.rules
            .get(&(class, tier))
            .copied()
            .ok_or(ReferralError::NoRewardConfig { class, tier })
    }

    pub fn welcome_bonus_points(&self) -> i64 {
        self.welcome_bonus_points
    }
}

impl Default for RewardTable {
    fn default() -> Self {
        Self::from_config(&RewardConfig::default())
    }
}
