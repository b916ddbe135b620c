//! FIFO queue for prompts awaiting copies.
//!
//! The queue has no state of its own: it is the `queue_position` projection
//! of the `rounds` table, so it survives a restart and needs no warm-up.
//! Dequeue is serialised by `Locks::queue` so two concurrent copy-round
//! starts can never claim the same prompt.

use chrono::Utc;
use quipflip_core::types::{PlayerId, Round, RoundId};
use quipflip_core::{Config, Result};

use crate::locks::Locks;

pub async fn enqueue_prompt(pool: &sqlx::PgPool, round_id: RoundId) -> Result<()> {
    quipflip_db::rounds::enqueue_prompt(pool, round_id, Utc::now())
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
}

pub async fn return_prompt(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    round_id: RoundId,
) -> Result<()> {
    quipflip_db::rounds::enqueue_prompt(&mut **tx, round_id, Utc::now())
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
}

pub async fn prompt_queue_depth(pool: &sqlx::PgPool) -> Result<i64> {
    quipflip_db::rounds::prompt_queue_depth(pool)
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
}

pub async fn is_discount_active(pool: &sqlx::PgPool, cfg: &Config) -> Result<bool> {
    Ok(prompt_queue_depth(pool).await? > cfg.copy_discount_queue_threshold)
}

/// Claim the next eligible prompt for `player_id`, holding the per-queue
/// lock for the duration of the claim. Returns `None` when the queue has
/// nothing this player is eligible to copy.
pub async fn dequeue_next_prompt_for(
    locks: &Locks,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
    cfg: &Config,
) -> Result<Option<Round>> {
    let _guard = locks.queue.lock(()).await;
    let cooldown = chrono::Duration::from_std(cfg.abandoned_assignment_cooldown).unwrap();
    quipflip_db::rounds::dequeue_next_prompt_for(tx, player_id, Utc::now(), cooldown)
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
}
