//! Admin analytics (read-only)

use shared::models::{
    FraudDetection, FraudStatus, LeaderboardEntry, Payout, ReferralLink, ReferredUser,
    ReferrerStats,
};
use sqlx::SqlitePool;

use super::{ReferralError, ReferralResult};
use crate::db::repository::{
    click, fraud as fraud_repo, link, payout, profile, referred_user, stats, user,
};
use crate::utils::money;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Conversions per click as a percentage, two decimals
pub fn conversion_rate(clicks: i64, conversions: i64) -> f64 {
    if clicks <= 0 {
        return 0.0;
    }
    let rate = rust_decimal::Decimal::from(conversions) * rust_decimal::Decimal::ONE_HUNDRED
        / rust_decimal::Decimal::from(clicks);
    money::to_f64(rate)
}

/// ReferrerStats
pub async fn referrer_stats(pool: &SqlitePool, referrer_id: i64) -> ReferralResult<ReferrerStats> {
    if !user::exists(pool, referrer_id).await? {
        return Err(ReferralError::UserNotFound(referrer_id));
    }
    let owner = profile::find_by_referrer(pool, referrer_id).await?;
    let (total_clicks, total_conversions) = click::totals_for_referrer(pool, referrer_id).await?;
    let totals = stats::commission_totals(pool, referrer_id).await?;
    let referral_points_earned = stats::referral_points_earned(pool, referrer_id).await?;

    Ok(ReferrerStats {
        referrer_id,
        referral_code: owner.as_ref().map(|p| p.referral_code.clone()),
        total_clicks,
        total_conversions,
        conversion_rate: conversion_rate(total_clicks, total_conversions),
        total_referrals: owner.as_ref().map_or(0, |p| p.total_referrals),
        active_referrals: owner.as_ref().map_or(0, |p| p.active_referrals),
        pending_commission: totals.pending,
        approved_commission: totals.approved,
        paid_commission: totals.paid,
        referral_points_earned,
    })
}

/// Leaderboard
pub async fn leaderboard(pool: &SqlitePool, limit: Option<i64>) -> ReferralResult<Vec<LeaderboardEntry>> {
    Ok(profile::leaderboard(pool, clamp_limit(limit)).await?)
}

/// ListFraud
pub async fn list_fraud(
    pool: &SqlitePool,
    status: Option<FraudStatus>,
    limit: Option<i64>,
) -> ReferralResult<Vec<FraudDetection>> {
    Ok(fraud_repo::list(pool, status, clamp_limit(limit)).await?)
}

/// ListPayouts
pub async fn list_payouts(
    pool: &SqlitePool,
    referrer_id: Option<i64>,
    limit: Option<i64>,
) -> ReferralResult<Vec<Payout>> {
    Ok(payout::list(pool, referrer_id, clamp_limit(limit)).await?)
}

/// Users referred through the referrer's profile, newest first
pub async fn list_referred(pool: &SqlitePool, referrer_id: i64) -> ReferralResult<Vec<ReferredUser>> {
    let owner = profile::find_by_referrer(pool, referrer_id)
        .await?
        .ok_or(ReferralError::ProfileNotFound(referrer_id))?;
    Ok(referred_user::list_for_profile(pool, owner.id).await?)
}

pub async fn list_links(pool: &SqlitePool, referrer_id: i64) -> ReferralResult<Vec<ReferralLink>> {
    Ok(link::list_for_referrer(pool, referrer_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_rate() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(3, 1), 33.33);
        assert_eq!(conversion_rate(8, 2), 25.0);
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIMIT);
    }
}
