//! Points ledger
//!
//! Every balance change goes through [`apply_points`]: read the balance,
//! check the transition, update the user and write the transaction row, all
//! inside the caller's transaction.

use shared::models::{PointsSummary, PointsTransaction, PointsTransactionType};
use sqlx::SqlitePool;

use super::{ReferralError, ReferralResult};
use crate::db::repository::points::PointsInsert;
use crate::db::repository::{Tx, points as points_repo};

const HISTORY_LIMIT: i64 = 100;

/// One requested balance change
#[derive(Debug, Clone)]
pub struct PointsChange<'a> {
    pub user_id: i64,
    pub tx_type: PointsTransactionType,
    /// Signed amount
    pub points: i64,
    pub related_id: Option<&'a str>,
    pub related_model: Option<&'a str>,
    pub metadata: serde_json::Value,
}

/// New balance for a transition, or `InsufficientPoints` if it would go negative
pub fn next_balance(balance: i64, points: i64) -> ReferralResult<i64> {
    let next = balance
        .checked_add(points)
        .ok_or_else(|| ReferralError::Validation("Points amount out of range".into()))?;
    if next < 0 {
        let requested = points
            .checked_neg()
            .ok_or_else(|| ReferralError::Validation("Points amount out of range".into()))?;
        return Err(ReferralError::InsufficientPoints { balance, requested });
    }
    Ok(next)
}

pub async fn apply_points(
    tx: &mut Tx<'_>,
    change: PointsChange<'_>,
) -> ReferralResult<PointsTransaction> {
    if change.points == 0 {
        return Err(ReferralError::InvalidPointsAmount);
    }
    let balance = points_repo::balance_of(&mut **tx, change.user_id)
        .await?
        .ok_or(ReferralError::UserNotFound(change.user_id))?;
    let new_balance = next_balance(balance, change.points)?;

    points_repo::update_balance(&mut **tx, change.user_id, balance, change.points).await?;
    let row = points_repo::insert(
        &mut **tx,
        PointsInsert {
            user_id: change.user_id,
            tx_type: change.tx_type,
            points: change.points,
            previous_balance: balance,
            new_balance,
            related_id: change.related_id,
            related_model: change.related_model,
            metadata: &change.metadata,
        },
    )
    .await?;

    tracing::debug!(
        user_id = change.user_id,
        tx_type = ?change.tx_type,
        points = change.points,
        new_balance,
        "Points applied"
    );
    Ok(row)
}

/// RedeemPoints
pub async fn redeem(
    pool: &SqlitePool,
    user_id: i64,
    points: i64,
    related_id: Option<&str>,
) -> ReferralResult<PointsTransaction> {
    if points <= 0 {
        return Err(ReferralError::InvalidPointsAmount);
    }
    let mut tx = pool.begin().await?;
    let row = apply_points(
        &mut tx,
        PointsChange {
            user_id,
            tx_type: PointsTransactionType::Redeemed,
            points: -points,
            related_id,
            related_model: related_id.map(|_| "redemption"),
            metadata: serde_json::json!({}),
        },
    )
    .await?;
    tx.commit().await?;
    tracing::info!(user_id, points, new_balance = row.new_balance, "Points redeemed");
    Ok(row)
}

/// AdjustPoints (admin correction, signed)
pub async fn adjust(
    pool: &SqlitePool,
    user_id: i64,
    points: i64,
    reason: &str,
) -> ReferralResult<PointsTransaction> {
    if reason.trim().is_empty() {
        return Err(ReferralError::Validation("Adjustment reason is required".into()));
    }
    let mut tx = pool.begin().await?;
    let row = apply_points(
        &mut tx,
        PointsChange {
            user_id,
            tx_type: PointsTransactionType::Adjustment,
            points,
            related_id: None,
            related_model: None,
            metadata: serde_json::json!({ "reason": reason }),
        },
    )
    .await?;
    tx.commit().await?;
    tracing::info!(user_id, points, reason, "Points adjusted");
    Ok(row)
}

/// PointsHistory (newest first) with the current balances
pub async fn history(pool: &SqlitePool, user_id: i64) -> ReferralResult<PointsSummary> {
    let owner = crate::db::repository::user::find_row(pool, user_id)
        .await?
        .ok_or(ReferralError::UserNotFound(user_id))?;
    let transactions = points_repo::history(pool, user_id, HISTORY_LIMIT).await?;
    Ok(PointsSummary {
        user_id,
        points_balance: owner.points_balance,
        total_points_earned: owner.total_points_earned,
        total_points_redeemed: owner.total_points_redeemed,
        transactions,
    })
}
