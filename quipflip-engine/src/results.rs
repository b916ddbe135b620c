//! Contributor-only details/results view and idempotent prize claim
//!.

use chrono::Utc;
use quipflip_core::types::{Phraseset, PhrasesetId, PhrasesetStatus, PlayerId, ResultView, TransactionKind};
use quipflip_core::{Error, Result};

use crate::ledger;
use crate::locks::Locks;

fn is_contributor(
    phraseset: &Phraseset,
    player_id: PlayerId,
    prompt_player: PlayerId,
    copy1_player: PlayerId,
    copy2_player: PlayerId,
) -> bool {
    let _ = phraseset;
    player_id == prompt_player || player_id == copy1_player || player_id == copy2_player
}

pub struct Details {
    pub phraseset: Phraseset,
    pub result: Option<ResultView>,
}

/// Contributor view of a phraseset. `403 not_a_contributor` otherwise; the
/// `results` block (carried in `result`) is only populated once finalized.
pub async fn get_details(
    pool: &sqlx::PgPool,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
) -> Result<Details> {
    let phraseset = quipflip_db::phrasesets::get_by_id(pool, phraseset_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    let prompt_round = quipflip_db::rounds::get_by_id(pool, phraseset.prompt_round_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;
    let copy1 = quipflip_db::rounds::get_by_id(pool, phraseset.copy_round_1_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;
    let copy2 = quipflip_db::rounds::get_by_id(pool, phraseset.copy_round_2_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    if !is_contributor(
        &phraseset,
        player_id,
        prompt_round.player_id,
        copy1.player_id,
        copy2.player_id,
    ) {
        return Err(Error::NotAContributor);
    }

    let result = if phraseset.status == PhrasesetStatus::Finalized {
        quipflip_db::results::get(pool, phraseset_id, player_id)
            .await
            .map_err(|_| Error::DependencyUnavailable)?
    } else {
        None
    };

    Ok(Details { phraseset, result })
}

/// Finalised phrasesets awaiting claim by this player
/// (`GET /player/pending-results`).
pub async fn pending_for_player(pool: &sqlx::PgPool, player_id: PlayerId) -> Result<Vec<ResultView>> {
    quipflip_db::results::list_unclaimed_for_player(pool, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)
}

pub struct ClaimOutcome {
    pub amount: i64,
    pub new_balance: Option<i64>,
    pub already_claimed: bool,
}

/// Idempotent claim. Only the first call of `claim`/auto-claim-on-results
/// credits the player; every subsequent call reports `already_claimed`.
pub async fn claim(
    pool: &sqlx::PgPool,
    locks: &Locks,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
) -> Result<ClaimOutcome> {
    let _guard = locks.phrasesets.lock(phraseset_id.0).await;
    let mut tx = pool.begin().await.map_err(|_| Error::DependencyUnavailable)?;

    let view = quipflip_db::results::get_for_update(&mut tx, phraseset_id, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotAContributor)?;

    if view.payout_claimed {
        tx.commit().await.ok();
        return Ok(ClaimOutcome {
            amount: view.payout_amount,
            new_balance: None,
            already_claimed: true,
        });
    }

    let now = Utc::now();
    quipflip_db::results::mark_claimed(&mut *tx, phraseset_id, player_id, now)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    let new_balance = ledger::credit(
        &mut tx,
        player_id,
        view.payout_amount,
        TransactionKind::PrizePayout,
        Some(phraseset_id.0),
    )
    .await?;

    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;

    Ok(ClaimOutcome {
        amount: view.payout_amount,
        new_balance: Some(new_balance),
        already_claimed: false,
    })
}

/// Legacy `/results` behaviour: the first view auto-claims on the caller's
/// behalf, sharing `claim`'s idempotent transactional path.
pub async fn get_results_with_autoclaim(
    pool: &sqlx::PgPool,
    locks: &Locks,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
) -> Result<(Details, ClaimOutcome)> {
    let details = get_details(pool, phraseset_id, player_id).await?;
    if details.phraseset.status != PhrasesetStatus::Finalized {
        return Err(Error::NotFound);
    }
    quipflip_db::results::mark_viewed(pool, phraseset_id, player_id, Utc::now())
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    let outcome = claim(pool, locks, phraseset_id, player_id).await?;
    Ok((details, outcome))
}
