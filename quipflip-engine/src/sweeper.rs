//! Background timeout sweeper. Periodically scans for rounds
//! that have outlived their grace band and phrasesets that have outlived
//! their voting deadline, and drives them through the same transitions an
//! in-line request would. Safe to run zero, one, or many instances: every
//! row it touches is claimed with `FOR UPDATE`/`SKIP LOCKED` or re-checked
//! for its expected state before acting.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::round::{self, Engine};
use crate::vote;

/// Run one sweep pass: expire timed-out rounds, then advance any phraseset
/// timelines that have reached their close deadline.
pub async fn sweep_once(engine: &Engine) {
    let now = Utc::now();

    let grace_band = chrono::Duration::from_std(engine.config.grace_band).unwrap_or(chrono::Duration::zero());
    match quipflip_db::rounds::expired_active_rounds(&engine.pool, now, grace_band).await {
        Ok(rounds) => {
            for r in &rounds {
                if let Err(err) = round::apply_timeout(engine, r).await {
                    warn!(round_id = %r.round_id.0, %err, "failed to apply round timeout");
                }
            }
            if !rounds.is_empty() {
                info!(count = rounds.len(), "swept expired rounds");
            }
        }
        Err(err) => error!(%err, "failed to scan expired rounds"),
    }

    let third_vote_window =
        chrono::Duration::from_std(engine.config.third_vote_window).unwrap_or(chrono::Duration::zero());
    match quipflip_db::phrasesets::closable_by_deadline(&engine.pool, now, third_vote_window).await {
        Ok(phrasesets) => {
            for p in &phrasesets {
                let mut tx = match engine.pool.begin().await {
                    Ok(tx) => tx,
                    Err(err) => {
                        error!(%err, "failed to open sweeper transaction");
                        continue;
                    }
                };
                if let Err(err) = vote::check_and_advance_timeline(&mut tx, &engine.config, p).await {
                    warn!(phraseset_id = %p.phraseset_id.0, %err, "failed to advance phraseset timeline");
                    continue;
                }
                if let Err(err) = tx.commit().await {
                    error!(%err, "failed to commit sweeper transaction");
                }
            }
            if !phrasesets.is_empty() {
                info!(count = phrasesets.len(), "swept closable phrasesets");
            }
        }
        Err(err) => error!(%err, "failed to scan closable phrasesets"),
    }
}

/// Spawn the sweeper as a background task, sweeping every `interval` until
/// the returned handle is dropped or aborted. Shares the caller's `Engine`
/// (and therefore its lock registry) rather than owning a separate copy.
pub fn spawn(engine: Arc<Engine>, interval: StdDuration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            sweep_once(&engine).await;
        }
    })
}
