//! Referral chain builder
//!
//! Links a newly registered user to its direct referrer (tier 1) and, when
//! the direct referrer was itself referred by a property agent, to that agent
//! (tier 2). Chains never grow deeper than two tiers.

use shared::models::{ChainEdge, ChainResult, ReferredUserStatus, ReferrerClass};
use sqlx::SqlitePool;

use super::{ReferralError, ReferralResult, code, fraud};
use crate::core::Config;
use crate::db::repository::{Tx, chain, profile, referred_user, user};

pub const MAX_TIER: i64 = 2;

/// BuildChain: attach `user_id` to the owner of `referral_code`
pub async fn build_chain(
    pool: &SqlitePool,
    config: &Config,
    user_id: i64,
    referral_code: &str,
) -> ReferralResult<ChainResult> {
    let code = code::normalize(referral_code);
    let direct = profile::find_by_code(pool, &code)
        .await?
        .ok_or_else(|| ReferralError::InvalidReferralCode(code.clone()))?;

    if direct.referrer_id == user_id {
        tracing::warn!(user_id, code = %code, "Self-referral rejected");
        fraud::record_self_referral(pool, user_id, &code).await;
        return Err(ReferralError::SelfReferralRejected(user_id));
    }

    let mut tx = pool.begin().await?;

    // Conditional write first: the claim on referred_by serialises concurrent signups
    if !user::set_referred_by(&mut *tx, user_id, direct.referrer_id).await? {
        let existing = user::find_row(&mut *tx, user_id)
            .await?
            .ok_or(ReferralError::UserNotFound(user_id))?;
        let chain = chain::find_for_user(&mut *tx, user_id).await?;
        tx.rollback().await?;
        tracing::debug!(user_id, "Referral chain already built");
        return Ok(ChainResult {
            user_id,
            referred_by: existing.referred_by.unwrap_or(direct.referrer_id),
            chain,
            created: false,
        });
    }

    let mut edges = vec![ChainEdge {
        referrer_id: direct.referrer_id,
        tier: 1,
    }];
    chain::insert_edge(&mut *tx, user_id, direct.referrer_id, 1).await?;
    track_referral(&mut tx, direct.id, user_id, 1).await?;

    if let Some(indirect_id) = tier_two_referrer(&mut tx, direct.referrer_id, user_id).await? {
        chain::insert_edge(&mut *tx, user_id, indirect_id, 2).await?;
        let indirect_profile = code::ensure_profile(&mut tx, config, indirect_id).await?;
        track_referral(&mut tx, indirect_profile.id, user_id, 2).await?;
        edges.push(ChainEdge {
            referrer_id: indirect_id,
            tier: 2,
        });
    }

    tx.commit().await?;

    tracing::info!(
        user_id,
        referrer_id = direct.referrer_id,
        tiers = edges.len(),
        code = %code,
        "Referral chain built"
    );
    Ok(ChainResult {
        user_id,
        referred_by: direct.referrer_id,
        chain: edges,
        created: true,
    })
}

/// The direct referrer's own referrer, if it is a property agent
async fn tier_two_referrer(
    tx: &mut Tx<'_>,
    direct_referrer_id: i64,
    user_id: i64,
) -> ReferralResult<Option<i64>> {
    let Some(direct) = user::find_row(&mut **tx, direct_referrer_id).await? else {
        return Ok(None);
    };
    let Some(indirect_id) = direct.referred_by else {
        return Ok(None);
    };
    // depth is capped at two, so a loop back to the new user is simply not linked
    if indirect_id == user_id {
        return Ok(None);
    }
    let class = user::find_class(&mut **tx, indirect_id).await?;
    Ok((class == Some(ReferrerClass::PropertyAgent)).then_some(indirect_id))
}

async fn track_referral(
    tx: &mut Tx<'_>,
    profile_id: i64,
    user_id: i64,
    tier: i64,
) -> ReferralResult<()> {
    if referred_user::insert(&mut **tx, profile_id, user_id, tier).await? {
        profile::increment_referrals(&mut **tx, profile_id).await?;
    }
    Ok(())
}

/// SetReferredUserStatus: admin override that keeps `active_referrals` in step
pub async fn set_referred_user_status(
    pool: &SqlitePool,
    referrer_id: i64,
    referred_user_id: i64,
    status: ReferredUserStatus,
) -> ReferralResult<()> {
    let mut tx = pool.begin().await?;
    let owner = profile::find_by_referrer(&mut *tx, referrer_id)
        .await?
        .ok_or(ReferralError::ProfileNotFound(referrer_id))?;
    let current = referred_user::find(&mut *tx, owner.id, referred_user_id)
        .await?
        .ok_or(ReferralError::UserNotFound(referred_user_id))?;

    if current.status == status {
        return Ok(());
    }
    referred_user::set_status(&mut *tx, owner.id, referred_user_id, status).await?;

    let delta = match (current.status, status) {
        (ReferredUserStatus::Active, _) => -1,
        (_, ReferredUserStatus::Active) => 1,
        _ => 0,
    };
    if delta != 0 {
        profile::adjust_active(&mut *tx, owner.id, delta).await?;
    }
    tx.commit().await?;

    tracing::info!(referrer_id, referred_user_id, status = ?status, "Referred user status changed");
    Ok(())
}
