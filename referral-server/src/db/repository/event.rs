//! Qualifying Event Repository
//!
//! One row per (user, kind). The unique key backs up the first-event flag:
//! a second claim for the same user and kind fails with `Duplicate`.

use super::RepoResult;
use shared::models::{QualifyingEvent, QualifyingEventKind, QualifyingEventState};
use sqlx::SqliteExecutor;

pub async fn insert(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    kind: QualifyingEventKind,
    event_id: &str,
    event_amount: f64,
    at: i64,
) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO qualifying_event (id, user_id, kind, event_id, event_amount, state, processed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(id)
    .bind(user_id)
    .bind(kind)
    .bind(event_id)
    .bind(event_amount)
    .bind(QualifyingEventState::Unprocessed)
    .bind(at)
    .execute(e)
    .await?;
    Ok(id)
}

pub async fn mark_rewarded(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<()> {
    sqlx::query("UPDATE qualifying_event SET state = ? WHERE id = ?")
        .bind(QualifyingEventState::Rewarded)
        .bind(id)
        .execute(e)
        .await?;
    Ok(())
}

pub async fn find(
    e: impl SqliteExecutor<'_>,
    user_id: i64,
    kind: QualifyingEventKind,
) -> RepoResult<Option<QualifyingEvent>> {
    let row = sqlx::query_as::<_, QualifyingEvent>(
        "SELECT id, user_id, kind, event_id, event_amount, state, processed_at FROM qualifying_event WHERE user_id = ? AND kind = ?",
    )
    .bind(user_id)
    .bind(kind)
    .fetch_optional(e)
    .await?;
    Ok(row)
}
