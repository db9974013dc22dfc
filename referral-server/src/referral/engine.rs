//! Reward engine
//!
//! Processes a user's first order / first subscription exactly once. The
//! first-event claim, the welcome bonus, every chain reward and the
//! qualifying-event record commit together in one transaction: a failure
//! anywhere rolls all of it back and the event can be retried as a whole.
//!
//! ```text
//! claim flag ──► record event ──► welcome bonus ──► tier 1 ──► tier 2 ──► REWARDED
//!     │ already set
//!     └──► { processed: false, reason: NotFirstEvent }
//! ```

use shared::models::{
    ChainEdge, EdgeFailure, PointsTransactionType, QualifyingEventRequest, RewardGrant,
    RewardKind, RewardResult,
};
use sqlx::SqlitePool;

use super::points::{PointsChange, apply_points};
use super::reward_table::{RewardRule, RewardTable};
use super::{ReferralError, ReferralResult};
use crate::db::repository::commission::CommissionInsert;
use crate::db::repository::{RepoError, Tx, chain, commission, event, profile, referred_user, user};
use crate::utils::money;

fn validate(req: &QualifyingEventRequest) -> ReferralResult<()> {
    if req.event_id.trim().is_empty() {
        return Err(ReferralError::Validation("event_id is required".into()));
    }
    if !req.amount.is_finite() || req.amount < 0.0 {
        return Err(ReferralError::Validation(format!(
            "event amount must be a non-negative number, got {}",
            req.amount
        )));
    }
    Ok(())
}

/// ProcessQualifyingEvent
pub async fn process_qualifying_event(
    pool: &SqlitePool,
    table: &RewardTable,
    req: &QualifyingEventRequest,
) -> ReferralResult<RewardResult> {
    validate(req)?;
    let now = shared::util::now_millis();
    let amount = money::round_money(req.amount);

    let mut tx = pool.begin().await?;

    // The first statement is the conditional write, so concurrent deliveries
    // queue on the write lock and the loser sees the flag already set.
    if !user::claim_first_event(&mut *tx, req.user_id, req.kind, now).await? {
        let known = user::exists(&mut *tx, req.user_id).await?;
        tx.rollback().await?;
        if !known {
            return Err(ReferralError::UserNotFound(req.user_id));
        }
        tracing::debug!(user_id = req.user_id, kind = req.kind.as_str(), event_id = %req.event_id, "Not a first event, skipping rewards");
        return Ok(RewardResult::not_first_event());
    }

    let event_row = match event::insert(&mut *tx, req.user_id, req.kind, &req.event_id, amount, now).await {
        Ok(id) => id,
        Err(RepoError::Duplicate(_)) => {
            tx.rollback().await?;
            tracing::warn!(user_id = req.user_id, kind = req.kind.as_str(), "Qualifying event already recorded");
            return Ok(RewardResult::not_first_event());
        }
        Err(e) => return Err(e.into()),
    };

    let mut result = RewardResult {
        processed: true,
        reason: None,
        welcome_bonus: false,
        welcome_points: 0,
        rewards: Vec::new(),
        failures: Vec::new(),
    };

    let welcome = table.welcome_bonus_points();
    if welcome > 0 {
        apply_points(
            &mut tx,
            PointsChange {
                user_id: req.user_id,
                tx_type: PointsTransactionType::EarnedSignup,
                points: welcome,
                related_id: Some(&req.event_id),
                related_model: Some(req.kind.as_str()),
                metadata: serde_json::json!({ "qualifying_event_id": event_row }),
            },
        )
        .await?;
        result.welcome_bonus = true;
        result.welcome_points = welcome;
    }

    let mut edges = chain::find_for_user(&mut *tx, req.user_id).await?;
    edges.sort_by_key(|e| e.tier);

    for edge in edges {
        match reward_edge(&mut tx, table, req, amount, edge).await {
            Ok(Some(grant)) => result.rewards.push(grant),
            Ok(None) => {}
            Err(err @ ReferralError::NoRewardConfig { .. }) => {
                tracing::error!(user_id = req.user_id, referrer_id = edge.referrer_id, tier = edge.tier, error = %err, "Chain edge not rewarded");
                result.failures.push(EdgeFailure {
                    referrer_id: edge.referrer_id,
                    tier: edge.tier,
                    error_code: err.code().code(),
                    message: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    event::mark_rewarded(&mut *tx, event_row).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = req.user_id,
        kind = req.kind.as_str(),
        event_id = %req.event_id,
        welcome_points = result.welcome_points,
        rewards = result.rewards.len(),
        failures = result.failures.len(),
        "Qualifying event rewarded"
    );
    Ok(result)
}

/// Reward one chain edge. `Ok(None)` when skipped (missing referrer, zero amount).
async fn reward_edge(
    tx: &mut Tx<'_>,
    table: &RewardTable,
    req: &QualifyingEventRequest,
    amount: f64,
    edge: ChainEdge,
) -> ReferralResult<Option<RewardGrant>> {
    let Some(class) = user::find_class(&mut **tx, edge.referrer_id).await? else {
        tracing::warn!(referrer_id = edge.referrer_id, tier = edge.tier, "Referrer no longer exists, skipping");
        return Ok(None);
    };

    let referrer_profile = profile::find_by_referrer(&mut **tx, edge.referrer_id).await?;
    if let Some(p) = &referrer_profile {
        referred_user::add_spend(&mut **tx, p.id, req.user_id, amount).await?;
        if referred_user::activate(&mut **tx, p.id, req.user_id, amount).await? {
            profile::adjust_active(&mut **tx, p.id, 1).await?;
        }
    }

    let rule = table.resolve(class, edge.tier)?;
    if rule.is_zero() {
        tracing::debug!(referrer_id = edge.referrer_id, tier = edge.tier, "Zero reward configured, no-op");
        return Ok(None);
    }

    let grant = match rule {
        RewardRule::Money(value) => {
            let referrer_profile =
                referrer_profile.ok_or(ReferralError::ProfileNotFound(edge.referrer_id))?;
            let value = money::to_f64(value);
            let commission_id = commission::insert(
                &mut **tx,
                CommissionInsert {
                    profile_id: referrer_profile.id,
                    referrer_id: edge.referrer_id,
                    referred_user_id: req.user_id,
                    order_id: &req.event_id,
                    order_amount: amount,
                    commission_amount: value,
                    tier: edge.tier,
                },
            )
            .await?;
            user::add_commission(&mut **tx, edge.referrer_id, value, value, 0.0).await?;
            profile::add_commission(&mut **tx, referrer_profile.id, value, value, 0.0).await?;
            RewardGrant {
                referrer_id: edge.referrer_id,
                tier: edge.tier,
                kind: RewardKind::Money,
                amount: value,
                transaction_id: commission_id,
            }
        }
        RewardRule::Points(points) => {
            let row = apply_points(
                tx,
                PointsChange {
                    user_id: edge.referrer_id,
                    tx_type: PointsTransactionType::EarnedReferral,
                    points,
                    related_id: Some(&req.event_id),
                    related_model: Some(req.kind.as_str()),
                    metadata: serde_json::json!({
                        "referred_user_id": req.user_id,
                        "tier": edge.tier,
                        "referrer_class": class.as_str(),
                    }),
                },
            )
            .await?;
            RewardGrant {
                referrer_id: edge.referrer_id,
                tier: edge.tier,
                kind: RewardKind::Points,
                amount: points as f64,
                transaction_id: row.id,
            }
        }
    };

    tracing::info!(
        referrer_id = grant.referrer_id,
        tier = grant.tier,
        kind = ?grant.kind,
        amount = grant.amount,
        "Referral reward granted"
    );
    Ok(Some(grant))
}
