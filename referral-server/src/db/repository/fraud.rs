//! Fraud Detection Repository

use super::RepoResult;
use shared::models::{FraudDetection, FraudDetectionCreate, FraudStatus};
use sqlx::SqliteExecutor;

const FRAUD_SELECT: &str = "SELECT id, fraud_type, severity, affected_users, referral_code, description, evidence, risk_score, status, resolution, notify_admin, created_at, updated_at FROM fraud_detection";

pub async fn insert(e: impl SqliteExecutor<'_>, data: &FraudDetectionCreate) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let affected = serde_json::to_string(&data.affected_users)?;
    let evidence = serde_json::to_string(&data.evidence)?;
    sqlx::query(
        "INSERT INTO fraud_detection (id, fraud_type, severity, affected_users, referral_code, description, evidence, risk_score, status, notify_admin, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
    )
    .bind(id)
    .bind(data.fraud_type)
    .bind(data.severity)
    .bind(affected)
    .bind(&data.referral_code)
    .bind(&data.description)
    .bind(evidence)
    .bind(data.risk_score)
    .bind(FraudStatus::Pending)
    .bind(data.notify_admin)
    .bind(now)
    .execute(e)
    .await?;
    Ok(id)
}

/// Newest first, optionally filtered by status
pub async fn list(
    e: impl SqliteExecutor<'_>,
    status: Option<FraudStatus>,
    limit: i64,
) -> RepoResult<Vec<FraudDetection>> {
    let sql = format!(
        "{FRAUD_SELECT} WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at DESC, id DESC LIMIT ?2"
    );
    let rows = sqlx::query_as::<_, FraudDetection>(&sql)
        .bind(status)
        .bind(limit)
        .fetch_all(e)
        .await?;
    Ok(rows)
}
