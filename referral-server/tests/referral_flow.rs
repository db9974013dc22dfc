//! 推荐奖励账本端到端测试
//!
//! 每个测试使用独立的临时 SQLite 文件，走完整的迁移和业务流程。

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rust_decimal::Decimal;
use shared::models::{
    CommissionStatus, ConversionType, FraudSeverity, FraudType, PayoutStatus,
    PointsTransactionType, QualifyingEventKind, QualifyingEventRequest, ReferredUserStatus,
    ReferrerClass, RequestContext, RewardKind, TrackConversionRequest, User, UserUpsert,
};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use referral_server::db::DbService;
use referral_server::db::repository::{
    commission as commission_repo, payout as payout_repo, profile, user,
};
use referral_server::referral::payout::{GatewayError, ManualPayoutGateway, PayoutGateway};
use referral_server::referral::reward_table::{RewardRule, RewardTable};
use referral_server::referral::{
    ReferralError, analytics, chain, code, commission, engine, payout, points, reconcile, tracker,
};
use referral_server::{AppState, Config, api};

struct Harness {
    _dir: TempDir,
    state: AppState,
}

impl Harness {
    fn pool(&self) -> &SqlitePool {
        &self.state.pool
    }

    fn config(&self) -> &Config {
        &self.state.config
    }
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("referral.db");
    let db = DbService::new(path.to_str().unwrap()).await.unwrap();
    let state = AppState::with_pool(
        db.pool,
        Config::default(),
        Arc::new(ManualPayoutGateway::default()),
    );
    Harness { _dir: dir, state }
}

async fn signup(pool: &SqlitePool, name: &str, class: ReferrerClass) -> User {
    user::upsert(
        pool,
        &UserUpsert {
            id: None,
            name: name.to_string(),
            email: None,
            referral_user_type: class,
            referral_code: None,
        },
    )
    .await
    .unwrap()
}

async fn reload(pool: &SqlitePool, id: i64) -> User {
    user::find_by_id(pool, id).await.unwrap().unwrap()
}

fn order(user_id: i64, event_id: &str, amount: f64) -> QualifyingEventRequest {
    QualifyingEventRequest {
        user_id,
        event_id: event_id.to_string(),
        amount,
        kind: QualifyingEventKind::Order,
    }
}

async fn points_rows(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM points_transaction")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn commission_rows(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM commission")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Referrer with a profile plus one referred user attached to it
async fn referred_pair(h: &Harness, referrer_class: ReferrerClass) -> (User, User, String) {
    let referrer = signup(h.pool(), "Jane Doe", referrer_class).await;
    let profile = code::generate_code(h.pool(), h.config(), referrer.id).await.unwrap();
    let referred = signup(h.pool(), "Bob Tenant", ReferrerClass::Customer).await;
    chain::build_chain(h.pool(), h.config(), referred.id, &profile.referral_code)
        .await
        .unwrap();
    (referrer, referred, profile.referral_code)
}

fn manual_gateway() -> Arc<dyn PayoutGateway> {
    Arc::new(ManualPayoutGateway::default())
}

struct FailingGateway;

#[async_trait]
impl PayoutGateway for FailingGateway {
    fn payment_method(&self) -> &str {
        "bank_transfer"
    }

    async fn dispatch(&self, _payout: &shared::models::Payout) -> Result<String, GatewayError> {
        Err(GatewayError("account closed".to_string()))
    }
}

/// Gateway that signals `started`, then answers only after `delay`
struct SlowGateway {
    started: Arc<tokio::sync::Notify>,
    delay: std::time::Duration,
}

#[async_trait]
impl PayoutGateway for SlowGateway {
    fn payment_method(&self) -> &str {
        "bank_transfer"
    }

    async fn dispatch(&self, payout: &shared::models::Payout) -> Result<String, GatewayError> {
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        Ok(format!("SLOW-{}", payout.id))
    }
}

// ========== Code generation ==========

#[tokio::test]
async fn test_code_generation_is_idempotent_and_class_prefixed() {
    let h = harness().await;
    let agent = signup(h.pool(), "Jane Doe", ReferrerClass::PropertyAgent).await;
    let customer = signup(h.pool(), "Carl Smith", ReferrerClass::Customer).await;

    let first = code::generate_code(h.pool(), h.config(), agent.id).await.unwrap();
    let again = code::generate_code(h.pool(), h.config(), agent.id).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(first.referral_code, again.referral_code);
    assert!(first.referral_code.starts_with("AGENTJD"));

    let other = code::generate_code(h.pool(), h.config(), customer.id).await.unwrap();
    assert!(other.referral_code.starts_with("REFCS"));
    assert_ne!(first.referral_code, other.referral_code);

    // the default link points at the signup page
    let links = analytics::list_links(h.pool(), agent.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert!(links[0].target_url.ends_with(&format!("?ref={}", first.referral_code)));
}

#[tokio::test]
async fn test_codes_are_unique_across_profiles() {
    let h = harness().await;
    let mut codes = std::collections::HashSet::new();
    for i in 0..40 {
        let u = signup(h.pool(), &format!("Agent Number{i}"), ReferrerClass::PropertyAgent).await;
        let p = code::generate_code(h.pool(), h.config(), u.id).await.unwrap();
        assert!(codes.insert(p.referral_code));
    }
}

#[tokio::test]
async fn test_generate_code_for_unknown_user() {
    let h = harness().await;
    let err = code::generate_code(h.pool(), h.config(), 424242).await.unwrap_err();
    assert!(matches!(err, ReferralError::UserNotFound(424242)));
}

#[tokio::test]
async fn test_code_generation_gives_up_when_every_code_is_taken() {
    let h = harness().await;
    // occupy REFJD0000..REFJD9999
    sqlx::query(
        "INSERT INTO users (id, name, referral_user_type, created_at, updated_at) \
         WITH RECURSIVE n(i) AS (SELECT 0 UNION ALL SELECT i + 1 FROM n WHERE i < 9999) \
         SELECT 1000000 + i, 'Seed', 'customer', 0, 0 FROM n",
    )
    .execute(h.pool())
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO referral_profile (id, referrer_id, referral_code, created_at, updated_at) \
         SELECT id, id, printf('REFJD%04d', id - 1000000), 0, 0 FROM users WHERE id >= 1000000",
    )
    .execute(h.pool())
    .await
    .unwrap();

    let jane = signup(h.pool(), "Jane Doe", ReferrerClass::Customer).await;
    let mut config = h.config().clone();
    config.code_generation_attempts = 3;
    let err = code::generate_code(h.pool(), &config, jane.id).await.unwrap_err();
    assert!(matches!(err, ReferralError::CodeGenerationExhausted(3)));

    assert!(profile::find_by_referrer(h.pool(), jane.id).await.unwrap().is_none());
    let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referral_profile")
        .fetch_one(h.pool())
        .await
        .unwrap();
    assert_eq!(profiles, 10_000);
    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referral_link")
        .fetch_one(h.pool())
        .await
        .unwrap();
    assert_eq!(links, 0);
}

// ========== Chain building ==========

#[tokio::test]
async fn test_chain_is_idempotent() {
    let h = harness().await;
    let (referrer, referred, code) = referred_pair(&h, ReferrerClass::PropertyAgent).await;

    let again = chain::build_chain(h.pool(), h.config(), referred.id, &code).await.unwrap();
    assert!(!again.created);
    assert_eq!(again.chain.len(), 1);
    assert_eq!(again.referred_by, referrer.id);

    let user = reload(h.pool(), referred.id).await;
    assert_eq!(user.referral_chain.len(), 1);
    let owner = profile::find_by_referrer(h.pool(), referrer.id).await.unwrap().unwrap();
    assert_eq!(owner.total_referrals, 1);
}

#[tokio::test]
async fn test_code_lookup_ignores_case_and_whitespace() {
    let h = harness().await;
    let agent = signup(h.pool(), "Jane Doe", ReferrerClass::PropertyAgent).await;
    let p = code::generate_code(h.pool(), h.config(), agent.id).await.unwrap();
    let newcomer = signup(h.pool(), "New Comer", ReferrerClass::Customer).await;

    let raw = format!("  {}  ", p.referral_code.to_lowercase());
    let result = chain::build_chain(h.pool(), h.config(), newcomer.id, &raw).await.unwrap();
    assert!(result.created);
    assert_eq!(result.referred_by, agent.id);
}

#[tokio::test]
async fn test_unknown_code_creates_nothing() {
    let h = harness().await;
    let newcomer = signup(h.pool(), "New Comer", ReferrerClass::Customer).await;
    let err = chain::build_chain(h.pool(), h.config(), newcomer.id, "AGENTZZ0000")
        .await
        .unwrap_err();
    assert!(matches!(err, ReferralError::InvalidReferralCode(_)));
    let user = reload(h.pool(), newcomer.id).await;
    assert!(user.referred_by.is_none());
    assert!(user.referral_chain.is_empty());
}

#[tokio::test]
async fn test_tier_two_only_through_agents_and_depth_capped() {
    let h = harness().await;
    // agent → middle → newcomer
    let agent = signup(h.pool(), "Alice Agent", ReferrerClass::PropertyAgent).await;
    let agent_code = code::generate_code(h.pool(), h.config(), agent.id).await.unwrap();
    let middle = signup(h.pool(), "Mid Dle", ReferrerClass::PropertyAgent).await;
    chain::build_chain(h.pool(), h.config(), middle.id, &agent_code.referral_code)
        .await
        .unwrap();
    let middle_code = code::generate_code(h.pool(), h.config(), middle.id).await.unwrap();
    let newcomer = signup(h.pool(), "New Comer", ReferrerClass::Customer).await;
    let result = chain::build_chain(h.pool(), h.config(), newcomer.id, &middle_code.referral_code)
        .await
        .unwrap();

    let tiers: Vec<(i64, i64)> = result.chain.iter().map(|e| (e.referrer_id, e.tier)).collect();
    assert_eq!(tiers, vec![(middle.id, 1), (agent.id, 2)]);

    // one level further: never a third tier
    let newcomer_code = code::generate_code(h.pool(), h.config(), newcomer.id).await.unwrap();
    let last = signup(h.pool(), "Last One", ReferrerClass::Customer).await;
    let deep = chain::build_chain(h.pool(), h.config(), last.id, &newcomer_code.referral_code)
        .await
        .unwrap();
    // newcomer's referrer (middle) is an agent, so tier 2 is middle; agent is not linked
    let tiers: Vec<(i64, i64)> = deep.chain.iter().map(|e| (e.referrer_id, e.tier)).collect();
    assert_eq!(tiers, vec![(newcomer.id, 1), (middle.id, 2)]);
    assert!(deep.chain.len() <= 2);
}

#[tokio::test]
async fn test_customer_indirect_referrer_gets_no_tier_two() {
    let h = harness().await;
    let root = signup(h.pool(), "Root Customer", ReferrerClass::Customer).await;
    let root_code = code::generate_code(h.pool(), h.config(), root.id).await.unwrap();
    let middle = signup(h.pool(), "Mid Dle", ReferrerClass::Customer).await;
    chain::build_chain(h.pool(), h.config(), middle.id, &root_code.referral_code)
        .await
        .unwrap();
    let middle_code = code::generate_code(h.pool(), h.config(), middle.id).await.unwrap();
    let newcomer = signup(h.pool(), "New Comer", ReferrerClass::Customer).await;

    let result = chain::build_chain(h.pool(), h.config(), newcomer.id, &middle_code.referral_code)
        .await
        .unwrap();
    assert_eq!(result.chain.len(), 1);
    assert_eq!(result.chain[0].referrer_id, middle.id);
}

// Scenario 4
#[tokio::test]
async fn test_self_referral_rejected_and_flagged() {
    let h = harness().await;
    let c = signup(h.pool(), "Chris Cheat", ReferrerClass::Customer).await;
    let own = code::generate_code(h.pool(), h.config(), c.id).await.unwrap();

    let err = chain::build_chain(h.pool(), h.config(), c.id, &own.referral_code)
        .await
        .unwrap_err();
    assert!(matches!(err, ReferralError::SelfReferralRejected(id) if id == c.id));

    let user = reload(h.pool(), c.id).await;
    assert!(user.referred_by.is_none());
    assert!(user.referral_chain.is_empty());

    let flagged = analytics::list_fraud(h.pool(), None, None).await.unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].fraud_type, FraudType::SelfReferral);
    assert_eq!(flagged[0].severity, FraudSeverity::High);
    assert_eq!(flagged[0].affected_users, vec![c.id]);
}

// ========== Reward engine ==========

// Scenario 1
#[tokio::test]
async fn test_agent_referral_first_order() {
    let h = harness().await;
    let (agent, tenant, _) = referred_pair(&h, ReferrerClass::PropertyAgent).await;

    let result = engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(tenant.id, "ORD-1", 110.0))
        .await
        .unwrap();
    assert!(result.processed);
    assert!(result.welcome_bonus);
    assert_eq!(result.welcome_points, 50);
    assert_eq!(result.rewards.len(), 1);
    assert_eq!(result.rewards[0].kind, RewardKind::Money);
    assert_eq!(result.rewards[0].amount, 5.0);

    let tenant = reload(h.pool(), tenant.id).await;
    assert!(tenant.has_completed_first_order);
    assert!(tenant.first_order_at.is_some());
    assert_eq!(tenant.points_balance, 50);

    let summary = points::history(h.pool(), tenant.id).await.unwrap();
    assert_eq!(summary.transactions.len(), 1);
    assert_eq!(summary.transactions[0].tx_type, PointsTransactionType::EarnedSignup);

    let commissions = commission::list_for_referrer(h.pool(), agent.id).await.unwrap();
    assert_eq!(commissions.len(), 1);
    assert_eq!(commissions[0].status, CommissionStatus::Pending);
    assert_eq!(commissions[0].commission_amount, 5.0);
    // flat amount; the order total is audit only
    assert_eq!(commissions[0].order_amount, 110.0);
    assert_eq!(commissions[0].order_id, "ORD-1");

    let agent = reload(h.pool(), agent.id).await;
    assert_eq!(agent.pending_commission, 5.0);
    assert_eq!(agent.total_commission_earned, 5.0);
    let owner = profile::find_by_referrer(h.pool(), agent.id).await.unwrap().unwrap();
    assert_eq!(owner.pending_commission, 5.0);
    assert_eq!(owner.active_referrals, 1);

    let referred = analytics::list_referred(h.pool(), agent.id).await.unwrap();
    assert_eq!(referred.len(), 1);
    assert_eq!(referred[0].referred_user_id, tenant.id);
    assert_eq!(referred[0].status, ReferredUserStatus::Active);
    assert_eq!(referred[0].first_purchase_amount, Some(110.0));
    assert_eq!(referred[0].total_spent, 110.0);
}

#[tokio::test]
async fn test_referred_status_override_tracks_active_count() {
    let h = harness().await;
    let (agent, tenant, _) = referred_pair(&h, ReferrerClass::PropertyAgent).await;
    engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(tenant.id, "ORD-1", 40.0))
        .await
        .unwrap();

    chain::set_referred_user_status(h.pool(), agent.id, tenant.id, ReferredUserStatus::Inactive)
        .await
        .unwrap();
    let owner = profile::find_by_referrer(h.pool(), agent.id).await.unwrap().unwrap();
    assert_eq!(owner.active_referrals, 0);

    chain::set_referred_user_status(h.pool(), agent.id, tenant.id, ReferredUserStatus::Active)
        .await
        .unwrap();
    let owner = profile::find_by_referrer(h.pool(), agent.id).await.unwrap().unwrap();
    assert_eq!(owner.active_referrals, 1);
}

// Scenarios 2 and 3
#[tokio::test]
async fn test_customer_referral_points_and_second_order_noop() {
    let h = harness().await;
    let (referrer, referred, _) = referred_pair(&h, ReferrerClass::Customer).await;

    let first = engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(referred.id, "ORD-1", 110.0))
        .await
        .unwrap();
    assert!(first.processed);
    assert_eq!(first.rewards[0].kind, RewardKind::Points);

    let after_first = reload(h.pool(), referrer.id).await;
    assert_eq!(after_first.points_balance, 100);
    assert_eq!(after_first.total_points_earned, 100);
    assert_eq!(commission_rows(h.pool()).await, 0);

    let rows = points_rows(h.pool()).await;
    let second = engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(referred.id, "ORD-2", 200.0))
        .await
        .unwrap();
    assert!(!second.processed);
    assert!(second.rewards.is_empty());
    assert_eq!(points_rows(h.pool()).await, rows);

    let after_second = reload(h.pool(), referrer.id).await;
    assert_eq!(after_second.points_balance, 100);
    assert_eq!(reload(h.pool(), referred.id).await.points_balance, 50);
}

#[tokio::test]
async fn test_order_and_subscription_are_separate_first_events() {
    let h = harness().await;
    let (referrer, referred, _) = referred_pair(&h, ReferrerClass::Customer).await;

    engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(referred.id, "ORD-1", 80.0))
        .await
        .unwrap();
    let sub = QualifyingEventRequest {
        user_id: referred.id,
        event_id: "SUB-1".into(),
        amount: 29.0,
        kind: QualifyingEventKind::Subscription,
    };
    let result = engine::process_qualifying_event(h.pool(), &h.state.rewards, &sub).await.unwrap();
    assert!(result.processed);

    let referred = reload(h.pool(), referred.id).await;
    assert!(referred.has_completed_first_order);
    assert!(referred.has_completed_first_subscription);
    assert_eq!(reload(h.pool(), referrer.id).await.points_balance, 200);
}

#[tokio::test]
async fn test_two_tier_agent_rewards() {
    let h = harness().await;
    let top = signup(h.pool(), "Top Agent", ReferrerClass::PropertyAgent).await;
    let top_code = code::generate_code(h.pool(), h.config(), top.id).await.unwrap();
    let mid = signup(h.pool(), "Mid Agent", ReferrerClass::PropertyAgent).await;
    chain::build_chain(h.pool(), h.config(), mid.id, &top_code.referral_code).await.unwrap();
    let mid_code = code::generate_code(h.pool(), h.config(), mid.id).await.unwrap();
    let tenant = signup(h.pool(), "Ten Ant", ReferrerClass::Customer).await;
    chain::build_chain(h.pool(), h.config(), tenant.id, &mid_code.referral_code).await.unwrap();

    let result = engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(tenant.id, "ORD-9", 300.0))
        .await
        .unwrap();
    let grants: Vec<(i64, i64, f64)> = result.rewards.iter().map(|g| (g.referrer_id, g.tier, g.amount)).collect();
    assert_eq!(grants, vec![(mid.id, 1, 5.0), (top.id, 2, 2.0)]);
    assert_eq!(reload(h.pool(), top.id).await.pending_commission, 2.0);
}

#[tokio::test]
async fn test_missing_reward_config_fails_edge_only() {
    let h = harness().await;
    let (agent, tenant, _) = referred_pair(&h, ReferrerClass::PropertyAgent).await;
    let table = RewardTable::empty();

    let result = engine::process_qualifying_event(h.pool(), &table, &order(tenant.id, "ORD-1", 50.0))
        .await
        .unwrap();
    assert!(result.processed);
    assert!(result.rewards.is_empty());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].referrer_id, agent.id);
    assert!(reload(h.pool(), tenant.id).await.has_completed_first_order);
}

#[tokio::test]
async fn test_zero_reward_creates_no_transaction() {
    let h = harness().await;
    let (_, tenant, _) = referred_pair(&h, ReferrerClass::PropertyAgent).await;
    let table = RewardTable::empty().with_rule(ReferrerClass::PropertyAgent, 1, RewardRule::Money(Decimal::ZERO));

    let result = engine::process_qualifying_event(h.pool(), &table, &order(tenant.id, "ORD-1", 50.0))
        .await
        .unwrap();
    assert!(result.processed);
    assert!(result.rewards.is_empty());
    assert!(result.failures.is_empty());
    assert_eq!(commission_rows(h.pool()).await, 0);
}

#[tokio::test]
async fn test_concurrent_deliveries_reward_once() {
    let h = harness().await;
    let (agent, tenant, _) = referred_pair(&h, ReferrerClass::PropertyAgent).await;

    let first = order(tenant.id, "ORD-A", 120.0);
    let second = order(tenant.id, "ORD-B", 120.0);
    let (a, b) = tokio::join!(
        engine::process_qualifying_event(h.pool(), &h.state.rewards, &first),
        engine::process_qualifying_event(h.pool(), &h.state.rewards, &second),
    );
    let processed = [a.unwrap(), b.unwrap()].iter().filter(|r| r.processed).count();
    assert_eq!(processed, 1);

    assert_eq!(commission_rows(h.pool()).await, 1);
    assert_eq!(reload(h.pool(), agent.id).await.pending_commission, 5.0);
    assert_eq!(reload(h.pool(), tenant.id).await.points_balance, 50);
}

#[tokio::test]
async fn test_event_for_unknown_user() {
    let h = harness().await;
    let err = engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(999, "ORD-1", 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ReferralError::UserNotFound(999)));
}

// ========== Points ledger ==========

#[tokio::test]
async fn test_points_balance_follows_transactions() {
    let h = harness().await;
    let (referrer, referred, _) = referred_pair(&h, ReferrerClass::Customer).await;
    engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(referred.id, "ORD-1", 60.0))
        .await
        .unwrap();

    points::redeem(h.pool(), referrer.id, 30, Some("voucher-1")).await.unwrap();
    points::adjust(h.pool(), referrer.id, 15, "goodwill").await.unwrap();
    let err = points::redeem(h.pool(), referrer.id, 500, None).await.unwrap_err();
    assert!(matches!(err, ReferralError::InsufficientPoints { balance: 85, requested: 500 }));
    let err = points::adjust(h.pool(), referrer.id, i64::MIN, "wipe").await.unwrap_err();
    assert!(matches!(err, ReferralError::Validation(_)));

    let summary = points::history(h.pool(), referrer.id).await.unwrap();
    assert_eq!(summary.points_balance, 85);
    assert_eq!(summary.total_points_redeemed, 30);
    for tx in &summary.transactions {
        assert_eq!(tx.new_balance, tx.previous_balance + tx.points);
        assert!(tx.new_balance >= 0);
    }
    // newest first
    assert_eq!(summary.transactions[0].new_balance, summary.points_balance);
}

// ========== Commission lifecycle & payouts ==========

#[tokio::test]
async fn test_cancel_reverses_balances() {
    let h = harness().await;
    let (agent, tenant, _) = referred_pair(&h, ReferrerClass::PropertyAgent).await;
    engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(tenant.id, "ORD-1", 70.0))
        .await
        .unwrap();
    let id = commission::list_for_referrer(h.pool(), agent.id).await.unwrap()[0].id;

    let cancelled = commission::cancel(h.pool(), id, "order refunded").await.unwrap();
    assert_eq!(cancelled.status, CommissionStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("order refunded"));

    let agent_after = reload(h.pool(), agent.id).await;
    assert_eq!(agent_after.pending_commission, 0.0);
    assert_eq!(agent_after.total_commission_earned, 0.0);

    let err = commission::approve(h.pool(), id).await.unwrap_err();
    assert!(matches!(err, ReferralError::InvalidTransition { .. }));
}

// Scenario 5
#[tokio::test]
async fn test_payout_respects_minimum_and_settles() {
    let h = harness().await;
    let agent = signup(h.pool(), "Jane Doe", ReferrerClass::PropertyAgent).await;
    let agent_code = code::generate_code(h.pool(), h.config(), agent.id).await.unwrap();
    let fifteen = RewardTable::empty().with_rule(
        ReferrerClass::PropertyAgent,
        1,
        RewardRule::Money(Decimal::new(1500, 2)),
    );
    for i in 0..3 {
        let tenant = signup(h.pool(), &format!("Tenant {i}"), ReferrerClass::Customer).await;
        chain::build_chain(h.pool(), h.config(), tenant.id, &agent_code.referral_code)
            .await
            .unwrap();
        engine::process_qualifying_event(h.pool(), &fifteen, &order(tenant.id, &format!("ORD-{i}"), 100.0))
            .await
            .unwrap();
    }
    assert_eq!(reload(h.pool(), agent.id).await.pending_commission, 45.0);

    let gateway = manual_gateway();
    let nothing = payout::run_payout_cycle(h.pool(), &h.config().payout, &gateway).await.unwrap();
    assert_eq!(nothing.payouts_created, 0);

    for c in commission::list_for_referrer(h.pool(), agent.id).await.unwrap() {
        commission::approve(h.pool(), c.id).await.unwrap();
    }
    let still_nothing = payout::run_payout_cycle(h.pool(), &h.config().payout, &gateway).await.unwrap();
    assert_eq!(still_nothing.payouts_created, 0);

    let ten = RewardTable::empty().with_rule(
        ReferrerClass::PropertyAgent,
        1,
        RewardRule::Money(Decimal::new(1000, 2)),
    );
    let tenant = signup(h.pool(), "Tenant Four", ReferrerClass::Customer).await;
    chain::build_chain(h.pool(), h.config(), tenant.id, &agent_code.referral_code)
        .await
        .unwrap();
    engine::process_qualifying_event(h.pool(), &ten, &order(tenant.id, "ORD-4", 100.0))
        .await
        .unwrap();
    let newest = commission::list_for_referrer(h.pool(), agent.id)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.status == CommissionStatus::Pending)
        .unwrap();
    commission::approve(h.pool(), newest.id).await.unwrap();

    let cycle = payout::run_payout_cycle(h.pool(), &h.config().payout, &gateway).await.unwrap();
    assert_eq!(cycle.payouts_created, 1);
    assert_eq!(cycle.total_amount, 55.0);

    let payouts = analytics::list_payouts(h.pool(), Some(agent.id), None).await.unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].status, PayoutStatus::Completed);
    assert_eq!(payouts[0].total_amount, 55.0);
    assert_eq!(payouts[0].commission_count, 4);

    let commissions = commission::list_for_referrer(h.pool(), agent.id).await.unwrap();
    assert!(commissions.iter().all(|c| c.status == CommissionStatus::Paid));
    let paid_sum: f64 = commissions.iter().map(|c| c.commission_amount).sum();

    let agent = reload(h.pool(), agent.id).await;
    assert_eq!(agent.total_commission_paid, paid_sum);
    assert_eq!(agent.pending_commission, 0.0);
    let owner = profile::find_by_referrer(h.pool(), agent.id).await.unwrap().unwrap();
    assert_eq!(owner.total_commission_paid, paid_sum);

    let detail = payout::get_payout(h.pool(), payouts[0].id).await.unwrap();
    assert_eq!(detail.commission_ids.len(), 4);
}

#[tokio::test]
async fn test_failed_gateway_returns_commissions() {
    let h = harness().await;
    let big = RewardTable::empty().with_rule(
        ReferrerClass::PropertyAgent,
        1,
        RewardRule::Money(Decimal::new(6000, 2)),
    );
    let (agent, tenant, _) = referred_pair(&h, ReferrerClass::PropertyAgent).await;
    engine::process_qualifying_event(h.pool(), &big, &order(tenant.id, "ORD-1", 900.0))
        .await
        .unwrap();
    let id = commission::list_for_referrer(h.pool(), agent.id).await.unwrap()[0].id;
    commission::approve(h.pool(), id).await.unwrap();

    let failing: Arc<dyn PayoutGateway> = Arc::new(FailingGateway);
    let result = payout::run_payout_cycle(h.pool(), &h.config().payout, &failing).await.unwrap();
    assert_eq!(result.payouts_created, 0);
    assert_eq!(result.failed, 1);

    let c = commission::list_for_referrer(h.pool(), agent.id).await.unwrap().remove(0);
    assert_eq!(c.status, CommissionStatus::Approved);
    assert!(c.payout_id.is_none());

    let payouts = analytics::list_payouts(h.pool(), Some(agent.id), None).await.unwrap();
    assert_eq!(payouts[0].status, PayoutStatus::Failed);
    assert_eq!(payouts[0].failure_reason.as_deref(), Some("account closed"));

    let agent = reload(h.pool(), agent.id).await;
    assert_eq!(agent.pending_commission, 60.0);
    assert_eq!(agent.total_commission_paid, 0.0);
}

/// Agent with one APPROVED 60.00 commission
async fn approved_sixty(h: &Harness) -> (User, i64) {
    let big = RewardTable::empty().with_rule(
        ReferrerClass::PropertyAgent,
        1,
        RewardRule::Money(Decimal::new(6000, 2)),
    );
    let (agent, tenant, _) = referred_pair(h, ReferrerClass::PropertyAgent).await;
    engine::process_qualifying_event(h.pool(), &big, &order(tenant.id, "ORD-1", 900.0))
        .await
        .unwrap();
    let id = commission::list_for_referrer(h.pool(), agent.id).await.unwrap()[0].id;
    commission::approve(h.pool(), id).await.unwrap();
    (agent, id)
}

#[tokio::test]
async fn test_dropped_payout_cycle_still_settles() {
    let h = harness().await;
    let (agent, commission_id) = approved_sixty(&h).await;

    let started = Arc::new(tokio::sync::Notify::new());
    let slow: Arc<dyn PayoutGateway> = Arc::new(SlowGateway {
        started: Arc::clone(&started),
        delay: std::time::Duration::from_millis(300),
    });

    // caller goes away while the gateway is still working
    let cycle = payout::run_payout_cycle(h.pool(), &h.config().payout, &slow);
    tokio::select! {
        _ = cycle => panic!("cycle finished before the gateway answered"),
        _ = started.notified() => {}
    }

    // the detached dispatch finishes on its own
    let mut settled = false;
    for _ in 0..50 {
        let c = commission_repo::find_by_id(h.pool(), commission_id).await.unwrap().unwrap();
        if c.status == CommissionStatus::Paid {
            settled = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    assert!(settled);

    let payouts = analytics::list_payouts(h.pool(), Some(agent.id), None).await.unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].status, PayoutStatus::Completed);
    assert!(payouts[0].gateway_reference.as_deref().unwrap().starts_with("SLOW-"));

    let agent = reload(h.pool(), agent.id).await;
    assert_eq!(agent.pending_commission, 0.0);
    assert_eq!(agent.total_commission_paid, 60.0);
}

#[tokio::test]
async fn test_stale_processing_payout_is_redispatched() {
    let h = harness().await;
    let (agent, commission_id) = approved_sixty(&h).await;

    // a payout whose dispatcher died after claiming the commission
    let stranded = payout_repo::insert_processing(h.pool(), agent.id, 60.0, 1, "bank_transfer")
        .await
        .unwrap();
    assert!(
        commission_repo::attach_to_payout(h.pool(), commission_id, stranded.id, "bank_transfer")
            .await
            .unwrap()
    );

    let gateway = manual_gateway();
    let fresh = payout::run_payout_cycle(h.pool(), &h.config().payout, &gateway).await.unwrap();
    assert_eq!(fresh.payouts_created, 0);
    let still = payout_repo::find_by_id(h.pool(), stranded.id).await.unwrap().unwrap();
    assert_eq!(still.status, PayoutStatus::Processing);

    sqlx::query("UPDATE payout SET updated_at = 0 WHERE id = ?")
        .bind(stranded.id)
        .execute(h.pool())
        .await
        .unwrap();
    let recovered = payout::run_payout_cycle(h.pool(), &h.config().payout, &gateway).await.unwrap();
    assert_eq!(recovered.payouts_created, 1);
    assert_eq!(recovered.total_amount, 60.0);

    let done = payout_repo::find_by_id(h.pool(), stranded.id).await.unwrap().unwrap();
    assert_eq!(done.status, PayoutStatus::Completed);
    assert_eq!(done.gateway_reference, Some(format!("MANUAL-{}", stranded.id)));
    let c = commission_repo::find_by_id(h.pool(), commission_id).await.unwrap().unwrap();
    assert_eq!(c.status, CommissionStatus::Paid);
    assert_eq!(c.payout_id, Some(stranded.id));

    let agent = reload(h.pool(), agent.id).await;
    assert_eq!(agent.pending_commission, 0.0);
    assert_eq!(agent.total_commission_paid, 60.0);
    let report = reconcile::reconcile(h.pool()).await.unwrap();
    assert_eq!(report.users_corrected, 0);
}

// ========== Reconciliation ==========

#[tokio::test]
async fn test_reconcile_repairs_drift() {
    let h = harness().await;
    let (agent, tenant, _) = referred_pair(&h, ReferrerClass::PropertyAgent).await;
    engine::process_qualifying_event(h.pool(), &h.state.rewards, &order(tenant.id, "ORD-1", 70.0))
        .await
        .unwrap();

    let clean = reconcile::reconcile(h.pool()).await.unwrap();
    assert_eq!(clean.users_corrected, 0);
    assert_eq!(clean.profiles_corrected, 0);

    sqlx::query("UPDATE users SET points_balance = 999, pending_commission = 42 WHERE id IN (?1, ?2)")
        .bind(tenant.id)
        .bind(agent.id)
        .execute(h.pool())
        .await
        .unwrap();

    let report = reconcile::reconcile(h.pool()).await.unwrap();
    assert_eq!(report.users_corrected, 2);
    assert!(report.points_mismatches.contains(&tenant.id));
    assert_eq!(reload(h.pool(), tenant.id).await.points_balance, 50);
    assert_eq!(reload(h.pool(), agent.id).await.pending_commission, 5.0);
}

// ========== Click tracking ==========

#[tokio::test]
async fn test_click_and_conversion_feed_stats() {
    let h = harness().await;
    let agent = signup(h.pool(), "Jane Doe", ReferrerClass::PropertyAgent).await;
    let p = code::generate_code(h.pool(), h.config(), agent.id).await.unwrap();

    let ctx = RequestContext {
        ip: Some("203.0.113.10".into()),
        user_agent: Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile Safari".into()),
        country: Some("GB".into()),
        ..Default::default()
    };
    let click = tracker::track_click(h.pool(), h.config(), &p.referral_code, &ctx).await.unwrap();
    assert_eq!(click.risk_score, 0);
    assert!(click.redirect_url.contains(&p.referral_code));

    let tenant = signup(h.pool(), "Ten Ant", ReferrerClass::Customer).await;
    let converted = tracker::track_conversion(
        h.pool(),
        &TrackConversionRequest {
            session_id: Some(click.session_id.clone()),
            code: None,
            user_id: tenant.id,
            kind: ConversionType::Signup,
        },
    )
    .await
    .unwrap();
    assert!(converted.converted);
    assert_eq!(converted.converted_user_id, Some(tenant.id));

    let stats = analytics::referrer_stats(h.pool(), agent.id).await.unwrap();
    assert_eq!(stats.total_clicks, 1);
    assert_eq!(stats.total_conversions, 1);
    assert_eq!(stats.conversion_rate, 100.0);
    assert_eq!(stats.referral_code.as_deref(), Some(p.referral_code.as_str()));
}

#[tokio::test]
async fn test_suspicious_clicks_are_recorded_not_blocked() {
    let h = harness().await;
    let agent = signup(h.pool(), "Jane Doe", ReferrerClass::PropertyAgent).await;
    let p = code::generate_code(h.pool(), h.config(), agent.id).await.unwrap();

    let ctx = RequestContext {
        ip: Some("198.51.100.9".into()),
        user_agent: Some("python-requests/2.31".into()),
        ..Default::default()
    };
    let mut last = None;
    for _ in 0..6 {
        last = Some(tracker::track_click(h.pool(), h.config(), &p.referral_code, &ctx).await.unwrap());
    }
    assert!(last.unwrap().risk_score >= 70);

    let flagged = analytics::list_fraud(h.pool(), None, None).await.unwrap();
    assert!(!flagged.is_empty());
    assert!(flagged.iter().all(|f| f.fraud_type == FraudType::SuspiciousClicks));
    assert!(flagged.iter().all(|f| f.severity >= FraudSeverity::High));
}

// ========== HTTP ==========

#[tokio::test]
async fn test_router_health_and_redirect() {
    let h = harness().await;
    let agent = signup(h.pool(), "Jane Doe", ReferrerClass::PropertyAgent).await;
    let p = code::generate_code(h.pool(), h.config(), agent.id).await.unwrap();
    let app = api::create_router(h.state.clone());

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let redirect = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/r/{}", p.referral_code))
                .header("x-forwarded-for", "203.0.113.5")
                .header(header::USER_AGENT, "Mozilla/5.0 (Windows NT 10.0) Chrome/120")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(redirect.status(), StatusCode::FOUND);
    let location = redirect.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.contains(&p.referral_code));
    let cookie = redirect.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("ref_session="));

    let unknown = app
        .oneshot(Request::builder().uri("/r/NOPE0000").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(unknown.status().is_client_error());
}

#[tokio::test]
async fn test_signup_with_bad_code_still_registers() {
    let h = harness().await;
    let app = api::create_router(h.state.clone());
    let body = serde_json::json!({
        "name": "New Comer",
        "referral_user_type": "customer",
        "referral_code": "AGENTZZ9999"
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(h.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}
