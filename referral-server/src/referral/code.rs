//! Referral code generation
//!
//! Code format: `{PREFIX}{INITIALS}{NNNN}`, e.g. `AGENTJD1234` or `REFMW0042`.
//! The prefix mirrors the referrer class for readability; the class stored on
//! the user record stays authoritative.

use rand::Rng;
use rand::distributions::Alphanumeric;
use shared::models::{ReferralLink, ReferralProfile, ReferrerClass};
use sqlx::SqlitePool;

use super::{ReferralError, ReferralResult};
use crate::core::Config;
use crate::db::repository::{RepoError, Tx, link, profile, user};

pub const AGENT_PREFIX: &str = "AGENT";
pub const CUSTOMER_PREFIX: &str = "REF";
const SHORT_CODE_LEN: usize = 8;
const SHORT_CODE_ATTEMPTS: u32 = 5;

pub fn prefix_for(class: ReferrerClass) -> &'static str {
    match class {
        ReferrerClass::PropertyAgent => AGENT_PREFIX,
        ReferrerClass::Customer => CUSTOMER_PREFIX,
    }
}

/// Up to two uppercase initials from the display name, `XX` when none
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_ascii_alphabetic()))
        .map(|c| c.to_ascii_uppercase())
        .take(2)
        .collect();
    if letters.is_empty() {
        "XX".to_string()
    } else {
        letters
    }
}

pub fn format_code(class: ReferrerClass, name: &str, number: u16) -> String {
    format!("{}{}{:04}", prefix_for(class), initials(name), number % 10_000)
}

/// Class hinted by the code prefix (display only)
pub fn class_from_code(code: &str) -> Option<ReferrerClass> {
    let code = normalize(code);
    if code.starts_with(AGENT_PREFIX) {
        Some(ReferrerClass::PropertyAgent)
    } else if code.starts_with(CUSTOMER_PREFIX) {
        Some(ReferrerClass::Customer)
    } else {
        None
    }
}

/// Canonical form used for storage and lookups
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn random_code(class: ReferrerClass, name: &str) -> String {
    let number: u16 = rand::thread_rng().gen_range(0..10_000);
    format_code(class, name, number)
}

pub fn random_short_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_CODE_LEN)
        .map(char::from)
        .collect()
}

pub fn signup_url(base_url: &str, code: &str) -> String {
    format!("{}/signup?ref={}", base_url.trim_end_matches('/'), code)
}

/// GenerateCode: return the user's profile, creating it (and its default link) on first call
pub async fn generate_code(
    pool: &SqlitePool,
    config: &Config,
    user_id: i64,
) -> ReferralResult<ReferralProfile> {
    if let Some(existing) = profile::find_by_referrer(pool, user_id).await? {
        return Ok(existing);
    }
    let mut tx = pool.begin().await?;
    let created = ensure_profile(&mut tx, config, user_id).await?;
    tx.commit().await?;
    Ok(created)
}

/// Idempotent profile creation inside an open transaction
pub async fn ensure_profile(
    tx: &mut Tx<'_>,
    config: &Config,
    user_id: i64,
) -> ReferralResult<ReferralProfile> {
    if let Some(existing) = profile::find_by_referrer(&mut **tx, user_id).await? {
        return Ok(existing);
    }
    let owner = user::find_row(&mut **tx, user_id)
        .await?
        .ok_or(ReferralError::UserNotFound(user_id))?;

    let attempts = config.code_generation_attempts.max(1);
    for attempt in 1..=attempts {
        let code = random_code(owner.referral_user_type, &owner.name);
        if profile::code_exists(&mut **tx, &code).await? {
            tracing::debug!(user_id, attempt, code = %code, "Referral code collision, retrying");
            continue;
        }
        match profile::insert(&mut **tx, user_id, &code).await {
            Ok(created) => {
                create_link(tx, config, user_id, &created.referral_code, None).await?;
                tracing::info!(user_id, code = %created.referral_code, "Referral profile created");
                return Ok(created);
            }
            Err(RepoError::Duplicate(_)) => {
                // referrer_id is unique too: another writer may have created the profile
                if let Some(existing) = profile::find_by_referrer(&mut **tx, user_id).await? {
                    return Ok(existing);
                }
                tracing::debug!(user_id, attempt, "Referral code taken during insert, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::error!(user_id, attempts, "Referral code generation exhausted");
    Err(ReferralError::CodeGenerationExhausted(attempts))
}

/// CreateLink: add a campaign link for an existing profile
pub async fn create_campaign_link(
    pool: &SqlitePool,
    config: &Config,
    referrer_id: i64,
    campaign: Option<&str>,
) -> ReferralResult<ReferralLink> {
    let mut tx = pool.begin().await?;
    let owner = profile::find_by_referrer(&mut *tx, referrer_id)
        .await?
        .ok_or(ReferralError::ProfileNotFound(referrer_id))?;
    let campaign = campaign.map(str::trim).filter(|c| !c.is_empty());
    let created = create_link(&mut tx, config, referrer_id, &owner.referral_code, campaign).await?;
    tx.commit().await?;
    Ok(created)
}

async fn create_link(
    tx: &mut Tx<'_>,
    config: &Config,
    referrer_id: i64,
    code: &str,
    campaign: Option<&str>,
) -> ReferralResult<ReferralLink> {
    let target = signup_url(&config.public_base_url, code);
    for _ in 0..SHORT_CODE_ATTEMPTS {
        let short_code = random_short_code();
        match link::insert(&mut **tx, referrer_id, code, &short_code, &target, campaign).await {
            Ok(created) => return Ok(created),
            Err(RepoError::Duplicate(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ReferralError::CodeGenerationExhausted(SHORT_CODE_ATTEMPTS))
}
