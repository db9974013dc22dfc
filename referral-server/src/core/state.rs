//! Application state shared by every handler and background job

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::core::{BackgroundTasks, Config};
use crate::db::DbService;
use crate::referral::payout::{ManualPayoutGateway, PayoutGateway};
use crate::referral::reward_table::RewardTable;
use crate::referral::{commission, payout, reconcile};
use crate::utils::AppError;

/// Shared application state
///
/// Cheap to clone: every field is a pool handle or an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    /// Immutable reward rules, built once at startup
    pub rewards: Arc<RewardTable>,
    /// Payout dispatch seam (manual transfer by default)
    pub gateway: Arc<dyn PayoutGateway>,
}

impl AppState {
    /// Open the database and build the reward table from config
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.database_path).await?;
        let gateway = ManualPayoutGateway::new(config.payout.payment_method.clone());
        Ok(Self::with_pool(db.pool, config.clone(), Arc::new(gateway)))
    }

    pub fn with_pool(pool: SqlitePool, config: Config, gateway: Arc<dyn PayoutGateway>) -> Self {
        let rewards = RewardTable::from_config(&config.rewards);
        Self {
            pool,
            config: Arc::new(config),
            rewards: Arc::new(rewards),
            gateway,
        }
    }

    /// 注册周期任务：提现批处理、佣金自动审核、对账
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let payout_every = Duration::from_secs(self.config.payout.interval_secs.max(1));
        let state = self.clone();
        tasks.spawn_periodic("payout_cycle", payout_every, move || {
            let state = state.clone();
            async move {
                match payout::run_payout_cycle(&state.pool, &state.config.payout, &state.gateway)
                    .await
                {
                    Ok(result) => tracing::info!(
                        created = result.payouts_created,
                        failed = result.failed,
                        total = result.total_amount,
                        "Payout cycle finished"
                    ),
                    Err(e) => tracing::error!(error = %e, "Payout cycle failed"),
                }
            }
        });

        if let Some(days) = self.config.payout.commission_hold_days {
            let state = self.clone();
            tasks.spawn_periodic("commission_auto_approve", payout_every, move || {
                let state = state.clone();
                async move {
                    let cutoff = shared::util::now_millis() - i64::from(days) * shared::util::DAY_MILLIS;
                    match commission::approve_matured(&state.pool, cutoff).await {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(approved = n, hold_days = days, "Matured commissions approved"),
                        Err(e) => tracing::error!(error = %e, "Commission auto-approval failed"),
                    }
                }
            });
        }

        let reconcile_every = Duration::from_secs(self.config.reconcile_interval_secs.max(1));
        let state = self.clone();
        tasks.spawn_periodic("reconcile", reconcile_every, move || {
            let state = state.clone();
            async move {
                match reconcile::reconcile(&state.pool).await {
                    Ok(report) if report.users_corrected == 0 && report.profiles_corrected == 0 => {
                        tracing::debug!(users = report.users_checked, "Ledger reconcile: no drift")
                    }
                    Ok(report) => tracing::warn!(?report, "Ledger reconcile corrected drift"),
                    Err(e) => tracing::error!(error = %e, "Ledger reconcile failed"),
                }
            }
        });
    }
}
