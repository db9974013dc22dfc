//! Fraud scoring for referral clicks
//!
//! [`score_click`] is pure: it only looks at the click and the recent-history
//! counts handed to it. Persisting a detection is best-effort and never fails
//! the click or signup that triggered it.

use shared::models::{FraudDetectionCreate, FraudSeverity, FraudType};
use sqlx::SqlitePool;

use crate::core::config::FraudConfig;
use crate::db::repository::fraud as fraud_repo;

const BOT_PATTERNS: [&str; 9] = [
    "bot",
    "crawler",
    "spider",
    "curl",
    "wget",
    "python-requests",
    "headless",
    "scrapy",
    "httpclient",
];
const MIN_USER_AGENT_LEN: usize = 10;
const MAX_SCORE: i64 = 100;
pub const SELF_REFERRAL_RISK: i64 = 80;

/// Inputs of the scorer
#[derive(Debug, Clone, Default)]
pub struct ClickSignals<'a> {
    pub ip: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    /// Earlier clicks from the same IP in the last 24h
    pub same_ip_clicks_24h: i64,
    /// Earlier clicks on the same referrer in the last hour
    pub same_referrer_clicks_1h: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: i64,
    pub flags: Vec<String>,
}

impl RiskAssessment {
    fn add(&mut self, points: i64, flag: &str) {
        self.score += points;
        self.flags.push(flag.to_string());
    }
}

pub fn is_bot_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    BOT_PATTERNS.iter().any(|p| ua.contains(p))
}

pub fn score_click(signals: &ClickSignals<'_>) -> RiskAssessment {
    let mut risk = RiskAssessment::default();

    if signals.same_ip_clicks_24h >= 10 {
        risk.add(40, "excessive_ip_clicks");
    } else if signals.same_ip_clicks_24h >= 5 {
        risk.add(25, "repeated_ip_clicks");
    }

    if signals.same_referrer_clicks_1h >= 50 {
        risk.add(30, "click_burst");
    } else if signals.same_referrer_clicks_1h >= 20 {
        risk.add(15, "elevated_click_rate");
    }

    match signals.user_agent.map(str::trim) {
        Some(ua) if ua.len() >= MIN_USER_AGENT_LEN => {
            if is_bot_user_agent(ua) {
                risk.add(50, "bot_user_agent");
            }
        }
        Some(ua) => {
            risk.add(20, "suspicious_user_agent");
            if !ua.is_empty() && is_bot_user_agent(ua) {
                risk.add(50, "bot_user_agent");
            }
        }
        None => risk.add(20, "suspicious_user_agent"),
    }

    if signals.ip.is_none_or(|ip| ip.trim().is_empty()) {
        risk.add(10, "missing_ip");
    }

    risk.score = risk.score.min(MAX_SCORE);
    risk
}

/// Severity of a click detection, None below the detection threshold
pub fn severity_for(score: i64, config: &FraudConfig) -> Option<FraudSeverity> {
    if score >= config.critical_threshold {
        Some(FraudSeverity::Critical)
    } else if score >= config.detection_threshold {
        Some(FraudSeverity::High)
    } else {
        None
    }
}

/// Persist a detection; failures are logged and swallowed
pub async fn record(pool: &SqlitePool, detection: FraudDetectionCreate) -> Option<i64> {
    match fraud_repo::insert(pool, &detection).await {
        Ok(id) => {
            tracing::warn!(
                target: "fraud",
                id,
                fraud_type = ?detection.fraud_type,
                severity = ?detection.severity,
                risk_score = detection.risk_score,
                code = detection.referral_code.as_deref().unwrap_or("-"),
                notify_admin = detection.notify_admin,
                "{}",
                detection.description
            );
            Some(id)
        }
        Err(e) => {
            tracing::warn!(target: "fraud", error = %e, "Failed to record fraud detection");
            None
        }
    }
}

pub async fn record_self_referral(pool: &SqlitePool, user_id: i64, code: &str) -> Option<i64> {
    record(
        pool,
        FraudDetectionCreate {
            fraud_type: FraudType::SelfReferral,
            severity: FraudSeverity::High,
            affected_users: vec![user_id],
            referral_code: Some(code.to_string()),
            description: format!("User {user_id} tried to sign up with their own referral code"),
            evidence: vec![format!("user_id={user_id}"), format!("code={code}")],
            risk_score: SELF_REFERRAL_RISK,
            notify_admin: true,
        },
    )
    .await
}

/// Record a click detection when the score crosses the threshold
pub async fn record_suspicious_click(
    pool: &SqlitePool,
    config: &FraudConfig,
    referrer_id: i64,
    code: &str,
    session_id: &str,
    ip: Option<&str>,
    risk: &RiskAssessment,
) -> Option<i64> {
    let severity = severity_for(risk.score, config)?;
    let mut evidence = risk.flags.clone();
    evidence.push(format!("session_id={session_id}"));
    if let Some(ip) = ip {
        evidence.push(format!("ip={ip}"));
    }
    record(
        pool,
        FraudDetectionCreate {
            fraud_type: FraudType::SuspiciousClicks,
            severity,
            affected_users: vec![referrer_id],
            referral_code: Some(code.to_string()),
            description: format!("Suspicious click on referral code {code} (risk {})", risk.score),
            evidence,
            risk_score: risk.score,
            notify_admin: severity >= FraudSeverity::High,
        },
    )
    .await
}
