//! Per-phraseset timeline state machine, vote acceptance, and finalisation,
//! built on the pure transitions in [`quipflip_core::timeline`]. Finalising
//! tallies votes and computes payouts but defers the per-contributor credit
//! to [`crate::results`] rather than crediting inline.

use chrono::Utc;
use quipflip_core::timeline::{self, TimelineState};
use quipflip_core::types::{
    Phraseset, PhrasesetId, PhrasesetStatus, PlayerId, Round, RoundPayload, TransactionKind,
    Vote, VoteId, VoteTarget,
};
use quipflip_core::{scoring, Config, Error, Result};
use rand::seq::SliceRandom;

use crate::ledger;
use crate::locks::Locks;

/// Apply the vote-assignment priority rule inside the caller's transaction,
/// locking the chosen phraseset row so a concurrent assignment can't pick
/// the same one.
pub async fn pick_phraseset_for_vote(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
) -> Result<Option<Phraseset>> {
    if let Some(p) = quipflip_db::phrasesets::next_for_vote_tier1(tx, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
    {
        return Ok(Some(p));
    }
    if let Some(p) = quipflip_db::phrasesets::next_for_vote_tier2(tx, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
    {
        return Ok(Some(p));
    }
    quipflip_db::phrasesets::next_for_vote_tier3(tx, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)
}

/// Shuffle the three phrases into the order this particular voter sees.
pub fn shuffle_phrases(phraseset: &Phraseset) -> [String; 3] {
    let mut phrases = [
        phraseset.original.clone(),
        phraseset.copy_1.clone(),
        phraseset.copy_2.clone(),
    ];
    phrases.shuffle(&mut rand::thread_rng());
    phrases
}

fn timeline_state(p: &Phraseset) -> TimelineState {
    TimelineState {
        status: p.status,
        vote_count: p.vote_count,
        third_vote_at: p.third_vote_at,
        fifth_vote_at: p.fifth_vote_at,
        closes_at: p.closes_at,
    }
}

/// Cast a vote from an active vote round. Returns `(correct, payout,
/// original_phrase)` for the caller to surface immediately.
pub async fn cast_vote(
    pool: &sqlx::PgPool,
    locks: &Locks,
    cfg: &Config,
    player_id: PlayerId,
    round: &Round,
    chosen_phrase: &str,
) -> Result<(bool, i64, String)> {
    let RoundPayload::Vote {
        phraseset_id,
        shuffled_phrases,
    } = &round.payload
    else {
        return Err(Error::NotFound);
    };
    let chosen_normalised = quipflip_core::validator::normalise(chosen_phrase);
    let shuffle_position = shuffled_phrases
        .iter()
        .position(|p| quipflip_core::validator::normalise(p) == chosen_normalised)
        .ok_or(Error::InvalidPhrase)? as i16;

    let now = Utc::now();
    if now > round.expires_at + cfg.grace_band {
        return Err(Error::Expired);
    }

    let _guard = locks.phrasesets.lock(phraseset_id.0).await;
    let mut tx = pool.begin().await.map_err(|_| Error::DependencyUnavailable)?;

    let phraseset = quipflip_db::phrasesets::get_for_update(&mut tx, *phraseset_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    if phraseset.status == PhrasesetStatus::Closed || phraseset.status == PhrasesetStatus::Finalized {
        return Err(Error::Expired);
    }
    if quipflip_db::rounds::has_player_voted_round(&mut *tx, *phraseset_id, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
    {
        return Err(Error::AlreadyVoted);
    }
    // Filtered out at assignment already; re-checked here since the
    // contributor set is fixed at the phraseset's creation and this is the
    // last point before a vote is recorded against it.
    if quipflip_db::rounds::is_contributor(
        &mut *tx,
        [
            phraseset.prompt_round_id,
            phraseset.copy_round_1_id,
            phraseset.copy_round_2_id,
        ],
        player_id,
    )
    .await
    .map_err(|_| Error::DependencyUnavailable)?
    {
        return Err(Error::NotFound);
    }

    let correct = chosen_normalised == quipflip_core::validator::normalise(&phraseset.original);
    let payout = if correct { cfg.correct_vote_payout } else { 0 };

    let vote = Vote {
        vote_id: VoteId::new(),
        phraseset_id: *phraseset_id,
        voter_id: player_id,
        voted_index: shuffle_position,
        voted_phrase: chosen_phrase.to_string(),
        correct,
        payout,
        created_at: now,
    };
    quipflip_db::votes::insert(&mut *tx, &vote)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    if payout > 0 {
        ledger::credit(
            &mut tx,
            player_id,
            payout,
            TransactionKind::VotePayout,
            Some(vote.vote_id.0),
        )
        .await?;
    }

    let mut state = timeline_state(&phraseset);
    timeline::record_vote(&mut state, now, cfg);

    quipflip_db::phrasesets::update_timeline(
        &mut *tx,
        *phraseset_id,
        state.status,
        state.vote_count,
        state.third_vote_at,
        state.fifth_vote_at,
        state.closes_at,
    )
    .await
    .map_err(|_| Error::DependencyUnavailable)?;

    quipflip_db::players::set_active_round(&mut *tx, player_id, None)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    if state.status == PhrasesetStatus::Closed && phraseset.status != PhrasesetStatus::Closed {
        finalize(&mut tx, cfg, *phraseset_id).await?;
    }

    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;
    Ok((correct, payout, phraseset.original))
}

/// Called by [`crate::round::apply_timeout`] when a vote round expires: the
/// grace-hold it represented is released, and if the phraseset's deadline
/// has already passed with no other holds outstanding, it closes now.
pub async fn release_grace_hold_and_maybe_close(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cfg: &Config,
    phraseset_id: PhrasesetId,
) -> Result<()> {
    let phraseset = quipflip_db::phrasesets::get_for_update(tx, phraseset_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    if phraseset.status != PhrasesetStatus::Closing {
        return Ok(());
    }

    try_close(tx, cfg, &phraseset).await
}

/// Idle-timeout and deadline checks the sweeper drives; also
/// reachable lazily from any read path that loads this phraseset.
pub async fn check_and_advance_timeline(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cfg: &Config,
    phraseset: &Phraseset,
) -> Result<()> {
    let now = Utc::now();
    let mut state = timeline_state(phraseset);
    if timeline::check_idle_timeout(&mut state, now, cfg) {
        quipflip_db::phrasesets::update_timeline(
            &mut **tx,
            phraseset.phraseset_id,
            state.status,
            state.vote_count,
            state.third_vote_at,
            state.fifth_vote_at,
            state.closes_at,
        )
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    }
    if state.status == PhrasesetStatus::Closing {
        // `try_close` reads `closes_at` off the phraseset it's handed;
        // the idle-timeout branch above just set one that isn't on the
        // caller's copy yet.
        let mut updated = phraseset.clone();
        updated.status = state.status;
        updated.closes_at = state.closes_at;
        try_close(tx, cfg, &updated).await?;
    }
    Ok(())
}

async fn try_close(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cfg: &Config,
    phraseset: &Phraseset,
) -> Result<()> {
    let now = Utc::now();
    let grace_holds = quipflip_db::rounds::active_vote_round_count(
        &mut **tx,
        phraseset.phraseset_id,
    )
    .await
    .map_err(|_| Error::DependencyUnavailable)?
        > 0;

    if !timeline::can_close(phraseset.closes_at, now, grace_holds) {
        return Ok(());
    }

    quipflip_db::phrasesets::update_timeline(
        &mut **tx,
        phraseset.phraseset_id,
        PhrasesetStatus::Closed,
        phraseset.vote_count,
        phraseset.third_vote_at,
        phraseset.fifth_vote_at,
        phraseset.closes_at,
    )
    .await
    .map_err(|_| Error::DependencyUnavailable)?;

    finalize(tx, cfg, phraseset.phraseset_id).await
}

/// Compute contributor payouts and create the (unclaimed) ResultView rows.
/// The contributor credit itself is deferred to `ResultsService::claim`.
async fn finalize(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cfg: &Config,
    phraseset_id: PhrasesetId,
) -> Result<()> {
    let phraseset = quipflip_db::phrasesets::get_for_update(tx, phraseset_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    let votes = quipflip_db::votes::list_for_phraseset(&mut **tx, phraseset_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    let votes_for_original = votes.iter().filter(|v| v.correct).count() as i64;
    let mut votes_for_copy_1 = 0i64;
    let mut votes_for_copy_2 = 0i64;
    for v in &votes {
        if v.correct {
            continue;
        }
        match target_of(&phraseset, v) {
            VoteTarget::Copy1 => votes_for_copy_1 += 1,
            VoteTarget::Copy2 => votes_for_copy_2 += 1,
            VoteTarget::Original => {}
        }
    }

    let payouts = scoring::score(
        votes_for_original,
        votes_for_copy_1,
        votes_for_copy_2,
        phraseset.total_pool,
        cfg.correct_vote_payout,
    );

    let prompt_round = quipflip_db::rounds::get_by_id(&mut **tx, phraseset.prompt_round_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;
    let copy_1 = quipflip_db::rounds::get_by_id(&mut **tx, phraseset.copy_round_1_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;
    let copy_2 = quipflip_db::rounds::get_by_id(&mut **tx, phraseset.copy_round_2_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    for (player_id, amount) in [
        (prompt_round.player_id, payouts.original),
        (copy_1.player_id, payouts.copy_1),
        (copy_2.player_id, payouts.copy_2),
    ] {
        quipflip_db::results::insert(&mut **tx, phraseset_id, player_id, amount)
            .await
            .map_err(|_| Error::DependencyUnavailable)?;
    }

    quipflip_db::phrasesets::finalize(&mut **tx, phraseset_id, Utc::now())
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    Ok(())
}

/// Which canonical slot a vote named, by phrase text rather than shuffle
/// position (the shuffle order is per-voter, not a stable index).
fn target_of(phraseset: &Phraseset, vote: &Vote) -> VoteTarget {
    let normalised = quipflip_core::validator::normalise(&vote.voted_phrase);
    if normalised == quipflip_core::validator::normalise(&phraseset.copy_1) {
        VoteTarget::Copy1
    } else if normalised == quipflip_core::validator::normalise(&phraseset.copy_2) {
        VoteTarget::Copy2
    } else {
        VoteTarget::Original
    }
}
