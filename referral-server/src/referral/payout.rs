//! Payout batcher
//!
//! Groups APPROVED commissions per referrer and pays out every group whose
//! total reaches the configured minimum. Smaller groups wait for the next
//! cycle untouched (no partial payouts).
//!
//! Each payout moves through two transactions around the gateway call:
//!
//! 1. payout `PROCESSING`, its commissions `APPROVED → PROCESSING`
//! 2. gateway ok  → commissions `PAID`, payout `COMPLETED`, pending → paid
//!    gateway err → payout `FAILED`, commissions back to `APPROVED`
//!
//! Step 2 runs in its own task, so a dropped caller cannot strand it. A payout
//! still `PROCESSING` after [`STALE_PAYOUT_AFTER`] (crash, storage error) is
//! dispatched again at the start of the next cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{Commission, Payout, PayoutCycleResult, PayoutDetail};
use sqlx::SqlitePool;
use thiserror::Error;

use super::{ReferralError, ReferralResult};
use crate::core::config::PayoutConfig;
use crate::db::repository::{RepoError, commission, payout as payout_repo, profile, user};
use crate::utils::money;

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// A PROCESSING payout older than this has lost its dispatcher
pub const STALE_PAYOUT_AFTER: Duration = Duration::from_secs(60);

/// Error reported by the payment collaborator
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

/// External payment collaborator that disburses a payout
///
/// A payout can be dispatched more than once after an interruption;
/// implementations must treat `payout.id` as the idempotency key.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    /// Payment method recorded on the payout and its commissions
    fn payment_method(&self) -> &str;

    /// Send the money; returns the gateway reference
    async fn dispatch(&self, payout: &Payout) -> Result<String, GatewayError>;
}

/// Records payouts for manual bank transfer
#[derive(Debug, Clone)]
pub struct ManualPayoutGateway {
    method: String,
}

impl ManualPayoutGateway {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
        }
    }
}

impl Default for ManualPayoutGateway {
    fn default() -> Self {
        Self::new("bank_transfer")
    }
}

#[async_trait]
impl PayoutGateway for ManualPayoutGateway {
    fn payment_method(&self) -> &str {
        &self.method
    }

    async fn dispatch(&self, payout: &Payout) -> Result<String, GatewayError> {
        tracing::info!(
            payout_id = payout.id,
            referrer_id = payout.referrer_id,
            amount = payout.total_amount,
            "Payout queued for manual transfer"
        );
        Ok(format!("MANUAL-{}", payout.id))
    }
}

/// One referrer's payable group
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutBatch {
    pub referrer_id: i64,
    pub profile_id: i64,
    pub commission_ids: Vec<i64>,
    pub total: Decimal,
}

impl PayoutBatch {
    /// Rebuild the batch of an existing payout from its attached commissions
    pub fn from_attached(commissions: &[Commission]) -> Option<Self> {
        let first = commissions.first()?;
        Some(Self {
            referrer_id: first.referrer_id,
            profile_id: first.profile_id,
            commission_ids: commissions.iter().map(|c| c.id).collect(),
            total: commissions
                .iter()
                .map(|c| money::to_decimal(c.commission_amount))
                .sum(),
        })
    }
}

/// Group commissions by referrer and keep the groups at or above `minimum`
pub fn plan_batches(commissions: &[Commission], minimum: Decimal) -> Vec<PayoutBatch> {
    let mut groups: BTreeMap<i64, PayoutBatch> = BTreeMap::new();
    for c in commissions {
        let batch = groups.entry(c.referrer_id).or_insert_with(|| PayoutBatch {
            referrer_id: c.referrer_id,
            profile_id: c.profile_id,
            commission_ids: Vec::new(),
            total: Decimal::ZERO,
        });
        batch.commission_ids.push(c.id);
        batch.total += money::to_decimal(c.commission_amount);
    }
    groups
        .into_values()
        .filter(|b| b.total > Decimal::ZERO && b.total >= minimum)
        .collect()
}

/// RunPayoutCycle
pub async fn run_payout_cycle(
    pool: &SqlitePool,
    config: &PayoutConfig,
    gateway: &Arc<dyn PayoutGateway>,
) -> ReferralResult<PayoutCycleResult> {
    let mut result = PayoutCycleResult::default();
    let mut paid_total = Decimal::ZERO;

    for (stale, batch) in claim_stale_payouts(pool).await? {
        tracing::warn!(
            payout_id = stale.id,
            referrer_id = stale.referrer_id,
            "Re-dispatching interrupted payout"
        );
        if dispatch_detached(pool, gateway, stale, batch.clone()).await {
            result.payouts_created += 1;
            paid_total += batch.total;
        } else {
            result.failed += 1;
        }
    }

    let approved = commission::find_approved_unpaid(pool).await?;
    for batch in plan_batches(&approved, config.min_payout_amount) {
        let created = match open_payout(pool, gateway.payment_method(), &batch).await {
            Ok(Some(created)) => created,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(referrer_id = batch.referrer_id, error = %e, "Failed to open payout, batch skipped");
                result.failed += 1;
                continue;
            }
        };
        if dispatch_detached(pool, gateway, created, batch.clone()).await {
            result.payouts_created += 1;
            paid_total += batch.total;
        } else {
            result.failed += 1;
        }
    }

    result.total_amount = money::to_f64(paid_total);
    tracing::info!(
        payouts = result.payouts_created,
        total_amount = result.total_amount,
        failed = result.failed,
        "Payout cycle finished"
    );
    Ok(result)
}

/// Claim PROCESSING payouts whose dispatcher is gone
async fn claim_stale_payouts(pool: &SqlitePool) -> ReferralResult<Vec<(Payout, PayoutBatch)>> {
    let before = shared::util::now_millis() - STALE_PAYOUT_AFTER.as_millis() as i64;
    let mut claimed = Vec::new();
    for stale in payout_repo::find_stale_processing(pool, before).await? {
        if !payout_repo::claim_stale(pool, stale.id, before).await? {
            continue;
        }
        let attached = commission::find_by_payout(pool, stale.id).await?;
        match PayoutBatch::from_attached(&attached) {
            Some(batch) => claimed.push((stale, batch)),
            None => fail_payout(pool, stale.id, "no commissions attached").await?,
        }
    }
    Ok(claimed)
}

/// Dispatch and settle in a spawned task. True once the payout is COMPLETED.
async fn dispatch_detached(
    pool: &SqlitePool,
    gateway: &Arc<dyn PayoutGateway>,
    created: Payout,
    batch: PayoutBatch,
) -> bool {
    let payout_id = created.id;
    let pool = pool.clone();
    let gateway = Arc::clone(gateway);
    let task = tokio::spawn(async move {
        dispatch_and_settle(&pool, gateway.as_ref(), &created, &batch).await
    });
    match task.await {
        Ok(Ok(completed)) => completed,
        Ok(Err(e)) => {
            tracing::error!(payout_id, error = %e, "Payout settlement failed, left PROCESSING for recovery");
            false
        }
        Err(e) => {
            tracing::error!(payout_id, error = %e, "Payout task aborted, left PROCESSING for recovery");
            false
        }
    }
}

async fn dispatch_and_settle(
    pool: &SqlitePool,
    gateway: &dyn PayoutGateway,
    created: &Payout,
    batch: &PayoutBatch,
) -> ReferralResult<bool> {
    let dispatched = match tokio::time::timeout(GATEWAY_TIMEOUT, gateway.dispatch(created)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(GatewayError("gateway timed out".into())),
    };
    match dispatched {
        Ok(reference) => settle_payout(pool, created, batch, &reference).await,
        Err(e) => {
            tracing::error!(payout_id = created.id, referrer_id = batch.referrer_id, error = %e, "Payout dispatch failed");
            fail_payout(pool, created.id, &e.to_string()).await?;
            Ok(false)
        }
    }
}

/// Create the PROCESSING payout and claim its commissions. None if a commission moved meanwhile.
async fn open_payout(
    pool: &SqlitePool,
    method: &str,
    batch: &PayoutBatch,
) -> ReferralResult<Option<Payout>> {
    let mut tx = pool.begin().await?;
    let created = payout_repo::insert_processing(
        &mut *tx,
        batch.referrer_id,
        money::to_f64(batch.total),
        batch.commission_ids.len() as i64,
        method,
    )
    .await?;
    for id in &batch.commission_ids {
        if !commission::attach_to_payout(&mut *tx, *id, created.id, method).await? {
            tx.rollback().await?;
            tracing::warn!(referrer_id = batch.referrer_id, commission_id = id, "Commission changed before payout, batch skipped");
            return Ok(None);
        }
    }
    tx.commit().await?;
    Ok(Some(created))
}

/// Gateway accepted: PAID + COMPLETED + pending → paid, in one transaction
async fn settle_payout(
    pool: &SqlitePool,
    created: &Payout,
    batch: &PayoutBatch,
    reference: &str,
) -> ReferralResult<bool> {
    let amount = money::to_f64(batch.total);
    let mut tx = pool.begin().await?;
    let paid = commission::mark_paid(&mut *tx, created.id).await?;
    if paid != batch.commission_ids.len() as u64 {
        tx.rollback().await?;
        tracing::error!(
            payout_id = created.id,
            expected = batch.commission_ids.len(),
            paid,
            reference,
            "Payout commissions out of step, left PROCESSING for review"
        );
        return Ok(false);
    }
    if !payout_repo::complete(&mut *tx, created.id, reference).await? {
        tx.rollback().await?;
        return Err(RepoError::Database(format!("Payout {} is no longer PROCESSING", created.id)).into());
    }
    user::add_commission(&mut *tx, batch.referrer_id, -amount, 0.0, amount).await?;
    profile::add_commission(&mut *tx, batch.profile_id, -amount, 0.0, amount).await?;
    tx.commit().await?;

    tracing::info!(payout_id = created.id, referrer_id = batch.referrer_id, amount, reference, "Payout completed");
    Ok(true)
}

async fn fail_payout(pool: &SqlitePool, payout_id: i64, reason: &str) -> ReferralResult<()> {
    let mut tx = pool.begin().await?;
    payout_repo::fail(&mut *tx, payout_id, reason).await?;
    let released = commission::release_from_payout(&mut *tx, payout_id).await?;
    tx.commit().await?;
    tracing::warn!(payout_id, released, reason, "Payout failed, commissions returned to APPROVED");
    Ok(())
}

pub async fn get_payout(pool: &SqlitePool, id: i64) -> ReferralResult<PayoutDetail> {
    let found = payout_repo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ReferralError::Storage(RepoError::NotFound(format!("Payout {id}"))))?;
    let commission_ids = commission::ids_for_payout(pool, id).await?;
    Ok(PayoutDetail {
        payout: found,
        commission_ids,
    })
}
