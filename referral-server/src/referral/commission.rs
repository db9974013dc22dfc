//! Commission lifecycle
//!
//! `PENDING → APPROVED → PROCESSING → PAID`, with `PENDING | APPROVED → CANCELLED`.
//! PROCESSING and PAID are only entered by the payout batcher.

use shared::models::{Commission, CommissionStatus};
use sqlx::SqlitePool;

use super::{ReferralError, ReferralResult};
use crate::db::repository::{RepoError, commission as commission_repo, profile, user};

/// ApproveCommission
pub async fn approve(pool: &SqlitePool, id: i64) -> ReferralResult<Commission> {
    let current = commission_repo::find_by_id(pool, id)
        .await?
        .ok_or(ReferralError::CommissionNotFound(id))?;
    if !current.status.can_transition_to(CommissionStatus::Approved) {
        return Err(ReferralError::invalid_transition(
            id,
            current.status,
            CommissionStatus::Approved,
        ));
    }
    if !commission_repo::approve(pool, id).await? {
        // lost a race with another transition; report what it is now
        let now = commission_repo::find_by_id(pool, id)
            .await?
            .ok_or(ReferralError::CommissionNotFound(id))?;
        return Err(ReferralError::invalid_transition(
            id,
            now.status,
            CommissionStatus::Approved,
        ));
    }
    tracing::info!(commission_id = id, referrer_id = current.referrer_id, "Commission approved");
    commission_repo::find_by_id(pool, id)
        .await?
        .ok_or(ReferralError::CommissionNotFound(id))
}

/// CancelCommission: reverses the pending and earned totals on user and profile
pub async fn cancel(pool: &SqlitePool, id: i64, reason: &str) -> ReferralResult<Commission> {
    if reason.trim().is_empty() {
        return Err(ReferralError::Validation("Cancel reason is required".into()));
    }
    let mut tx = pool.begin().await?;
    let current = commission_repo::find_by_id(&mut *tx, id)
        .await?
        .ok_or(ReferralError::CommissionNotFound(id))?;
    if !current.status.can_transition_to(CommissionStatus::Cancelled) {
        return Err(ReferralError::invalid_transition(
            id,
            current.status,
            CommissionStatus::Cancelled,
        ));
    }
    if !commission_repo::cancel(&mut *tx, id, current.status, reason).await? {
        return Err(RepoError::Database(format!("Commission {id} changed during cancel")).into());
    }
    let amount = current.commission_amount;
    user::add_commission(&mut *tx, current.referrer_id, -amount, -amount, 0.0).await?;
    profile::add_commission(&mut *tx, current.profile_id, -amount, -amount, 0.0).await?;
    tx.commit().await?;

    tracing::info!(commission_id = id, referrer_id = current.referrer_id, amount, reason, "Commission cancelled");
    commission_repo::find_by_id(pool, id)
        .await?
        .ok_or(ReferralError::CommissionNotFound(id))
}

/// ApproveMatured: approve every PENDING commission created at or before `older_than`
pub async fn approve_matured(pool: &SqlitePool, older_than: i64) -> ReferralResult<usize> {
    let ids = commission_repo::find_matured_pending(pool, older_than).await?;
    let mut approved = 0;
    for id in ids {
        if commission_repo::approve(pool, id).await? {
            approved += 1;
        }
    }
    if approved > 0 {
        tracing::info!(approved, "Matured commissions auto-approved");
    }
    Ok(approved)
}

pub async fn list_for_referrer(pool: &SqlitePool, referrer_id: i64) -> ReferralResult<Vec<Commission>> {
    Ok(commission_repo::list_for_referrer(pool, referrer_id).await?)
}
