//! Reconciliation sweep
//!
//! Recomputes cached balances and counters from the transaction log and
//! rewrites the rows that drifted. Points balances are compared with the
//! `new_balance` of the user's newest completed transaction.

use shared::models::ReconcileReport;
use sqlx::SqlitePool;

use super::ReferralResult;
use crate::db::repository::{profile, stats, user};
use crate::utils::money::money_eq;

/// Reconcile
pub async fn reconcile(pool: &SqlitePool) -> ReferralResult<ReconcileReport> {
    let mut report = ReconcileReport::default();
    let mut tx = pool.begin().await?;

    for row in stats::user_ledger_rows(&mut *tx).await? {
        report.users_checked += 1;
        let mut corrected = false;

        if !money_eq(row.pending_commission, row.ledger_pending)
            || !money_eq(row.total_commission_earned, row.ledger_earned)
            || !money_eq(row.total_commission_paid, row.ledger_paid)
        {
            tracing::warn!(
                user_id = row.id,
                cached_pending = row.pending_commission,
                ledger_pending = row.ledger_pending,
                cached_paid = row.total_commission_paid,
                ledger_paid = row.ledger_paid,
                "User commission totals drifted"
            );
            user::set_commission_totals(
                &mut *tx,
                row.id,
                row.ledger_pending,
                row.ledger_earned,
                row.ledger_paid,
            )
            .await?;
            corrected = true;
        }

        let expected_points = row.latest_points_balance.unwrap_or(0);
        if row.points_balance != expected_points {
            tracing::warn!(
                user_id = row.id,
                cached = row.points_balance,
                ledger = expected_points,
                "Points balance drifted"
            );
            stats::set_points_balance(&mut *tx, row.id, expected_points).await?;
            report.points_mismatches.push(row.id);
            corrected = true;
        }

        if corrected {
            report.users_corrected += 1;
        }
    }

    for row in stats::profile_ledger_rows(&mut *tx).await? {
        report.profiles_checked += 1;
        let drifted = row.total_referrals != row.ledger_referrals
            || row.active_referrals != row.ledger_active
            || !money_eq(row.pending_commission, row.ledger_pending)
            || !money_eq(row.total_commission_earned, row.ledger_earned)
            || !money_eq(row.total_commission_paid, row.ledger_paid);
        if drifted {
            tracing::warn!(profile_id = row.id, "Referral profile counters drifted");
            profile::set_totals(
                &mut *tx,
                row.id,
                row.ledger_referrals,
                row.ledger_active,
                row.ledger_pending,
                row.ledger_earned,
                row.ledger_paid,
            )
            .await?;
            report.profiles_corrected += 1;
        }
    }

    tx.commit().await?;

    if report.users_corrected > 0 || report.profiles_corrected > 0 {
        tracing::warn!(
            users_corrected = report.users_corrected,
            profiles_corrected = report.profiles_corrected,
            "Reconciliation corrected drifted rows"
        );
    } else {
        tracing::debug!(users = report.users_checked, profiles = report.profiles_checked, "Ledger consistent");
    }
    Ok(report)
}
