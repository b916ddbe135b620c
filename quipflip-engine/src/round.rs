//! Start/submit/timeout for prompt, copy, and vote rounds. Every player has
//! at most one active round at a time; starting a round debits the cost,
//! submitting validates and scores the phrase, and timing out applies the
//! penalty for letting the window lapse.

use chrono::Utc;
use quipflip_core::prompts::PromptSource;
use quipflip_core::types::{
    Phraseset, PhrasesetStatus, PlayerId, Round, RoundId, RoundPayload, RoundRole, RoundStatus,
    TransactionKind,
};
use quipflip_core::validator::{Dictionary, SimilarityModel};
use quipflip_core::{validator, Config, Error, Result};

use crate::ledger;
use crate::locks::Locks;
use crate::queue;
use crate::vote;

/// Shared resources every engine call needs: configuration, the lock
/// registry, and the dictionary/similarity/prompt boundary capabilities.
pub struct Engine {
    pub pool: sqlx::PgPool,
    pub config: Config,
    pub locks: Locks,
    pub dictionary: Box<dyn Dictionary>,
    pub similarity: Box<dyn SimilarityModel>,
    pub prompts: Box<dyn PromptSource>,
}

async fn require_no_active_round(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
) -> Result<()> {
    let player = quipflip_db::players::get_for_update(tx, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;
    if let Some(round_id) = player.active_round_id {
        return Err(Error::AlreadyInRound(round_id));
    }
    Ok(())
}

pub async fn start_prompt_round(engine: &Engine, player_id: PlayerId) -> Result<Round> {
    let _guard = engine.locks.players.lock(player_id.0).await;
    let cfg = &engine.config;

    let mut tx = engine
        .pool
        .begin()
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    require_no_active_round(&mut tx, player_id).await?;

    let outstanding = crate::player::outstanding_prompt_count(&mut *tx, player_id).await?;
    if outstanding >= cfg.max_outstanding_prompts {
        return Err(Error::MaxOutstandingPrompts);
    }

    let (prompt_id, prompt_text) = engine
        .prompts
        .random_prompt()
        .ok_or(Error::NoWordsetsAvailable)?;

    let now = Utc::now();
    let round = Round {
        round_id: RoundId::new(),
        player_id,
        role: RoundRole::Prompt,
        status: RoundStatus::Active,
        created_at: now,
        expires_at: now + cfg.prompt_window,
        cost: cfg.prompt_cost,
        system_contribution: 0,
        submitted_phrase: None,
        payload: RoundPayload::Prompt {
            prompt_id,
            prompt_text,
        },
    };

    ledger::debit(
        &mut tx,
        player_id,
        cfg.prompt_cost,
        TransactionKind::PromptEntry,
        Some(round.round_id.0),
    )
    .await?;

    quipflip_db::rounds::insert(&mut *tx, &round)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    quipflip_db::players::set_active_round(&mut *tx, player_id, Some(round.round_id))
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;
    Ok(round)
}

pub async fn start_copy_round(engine: &Engine, player_id: PlayerId) -> Result<Round> {
    let _guard = engine.locks.players.lock(player_id.0).await;
    let cfg = &engine.config;

    let discount = queue::is_discount_active(&engine.pool, cfg).await?;
    let cost = if discount {
        cfg.copy_cost_discount
    } else {
        cfg.copy_cost_normal
    };
    let system_contribution = cfg.copy_cost_normal - cost;

    let mut tx = engine
        .pool
        .begin()
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    require_no_active_round(&mut tx, player_id).await?;

    let prompt_round =
        queue::dequeue_next_prompt_for(&engine.locks, &mut tx, player_id, cfg)
            .await?
            .ok_or(Error::NoPromptsAvailable)?;

    let RoundPayload::Prompt { prompt_text, .. } = &prompt_round.payload else {
        return Err(Error::DependencyUnavailable);
    };
    let original_phrase = prompt_round
        .submitted_phrase
        .clone()
        .unwrap_or_else(|| prompt_text.clone());

    let now = Utc::now();
    let round = Round {
        round_id: RoundId::new(),
        player_id,
        role: RoundRole::Copy,
        status: RoundStatus::Active,
        created_at: now,
        expires_at: now + cfg.copy_window,
        cost,
        system_contribution,
        submitted_phrase: None,
        payload: RoundPayload::Copy {
            prompt_round_id: prompt_round.round_id,
            original_phrase,
        },
    };

    ledger::debit(
        &mut tx,
        player_id,
        cost,
        TransactionKind::CopyEntry,
        Some(round.round_id.0),
    )
    .await?;

    if system_contribution > 0 {
        ledger::record(
            &mut tx,
            player_id,
            system_contribution,
            TransactionKind::SystemContribution,
            Some(round.round_id.0),
        )
        .await?;
    }

    quipflip_db::rounds::insert(&mut *tx, &round)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    quipflip_db::players::set_active_round(&mut *tx, player_id, Some(round.round_id))
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;
    Ok(round)
}

pub async fn start_vote_round(engine: &Engine, player_id: PlayerId) -> Result<Round> {
    let _guard = engine.locks.players.lock(player_id.0).await;
    let cfg = &engine.config;

    let mut tx = engine
        .pool
        .begin()
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    require_no_active_round(&mut tx, player_id).await?;

    let phraseset = vote::pick_phraseset_for_vote(&mut tx, player_id)
        .await?
        .ok_or(Error::NoWordsetsAvailable)?;

    let shuffled = vote::shuffle_phrases(&phraseset);

    let now = Utc::now();
    let round = Round {
        round_id: RoundId::new(),
        player_id,
        role: RoundRole::Vote,
        status: RoundStatus::Active,
        created_at: now,
        expires_at: now + cfg.vote_window,
        cost: cfg.vote_cost,
        system_contribution: 0,
        submitted_phrase: None,
        payload: RoundPayload::Vote {
            phraseset_id: phraseset.phraseset_id,
            shuffled_phrases: shuffled,
        },
    };

    ledger::debit(
        &mut tx,
        player_id,
        cfg.vote_cost,
        TransactionKind::VoteEntry,
        Some(round.round_id.0),
    )
    .await?;

    quipflip_db::rounds::insert(&mut *tx, &round)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    quipflip_db::players::set_active_round(&mut *tx, player_id, Some(round.round_id))
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;
    Ok(round)
}

/// Outcome of a successful phrase submission, for the HTTP layer to shape
/// its response without re-querying.
pub enum SubmitOutcome {
    Prompt,
    Copy { phraseset_created: bool },
}

pub async fn submit(
    engine: &Engine,
    player_id: PlayerId,
    round_id: RoundId,
    phrase: &str,
) -> Result<SubmitOutcome> {
    let cfg = &engine.config;
    let _guard = engine.locks.players.lock(player_id.0).await;

    let mut tx = engine
        .pool
        .begin()
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    let round = quipflip_db::rounds::get_for_update(&mut tx, round_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    if round.player_id != player_id {
        return Err(Error::NotFound);
    }
    if round.status != RoundStatus::Active {
        return Err(Error::Expired);
    }
    let now = Utc::now();
    if now > round.expires_at + cfg.grace_band {
        return Err(Error::Expired);
    }

    let normalised = match &round.payload {
        RoundPayload::Prompt { .. } => {
            validator::validate_prompt(phrase, engine.dictionary.as_ref())?
        }
        RoundPayload::Copy {
            original_phrase, ..
        } => {
            let original_normalised = validator::normalise(original_phrase);
            validator::validate_copy(
                phrase,
                &original_normalised,
                engine.dictionary.as_ref(),
                engine.similarity.as_ref(),
                cfg.similarity_threshold,
            )?
        }
        RoundPayload::Vote { .. } => {
            // Votes go through `VoteService::cast_vote`, not this path.
            return Err(Error::NotFound);
        }
    };

    quipflip_db::rounds::submit(&mut *tx, round_id, &normalised)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    quipflip_db::players::set_active_round(&mut *tx, player_id, None)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    let outcome = match &round.payload {
        RoundPayload::Prompt { .. } => {
            queue::return_prompt(&mut tx, round_id).await?;
            SubmitOutcome::Prompt
        }
        RoundPayload::Copy {
            prompt_round_id, ..
        } => {
            let created = maybe_materialize_phraseset(
                &mut tx,
                cfg,
                *prompt_round_id,
                round_id,
                &normalised,
            )
            .await?;
            SubmitOutcome::Copy {
                phraseset_created: created,
            }
        }
        RoundPayload::Vote { .. } => unreachable!(),
    };

    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;
    Ok(outcome)
}

/// Called after a copy submission. If this is the prompt's first successful
/// copy, the prompt goes back into the queue for a second copier. If it's
/// the second, the phraseset is created and the prompt leaves the queue for
/// good.
async fn maybe_materialize_phraseset(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cfg: &Config,
    prompt_round_id: RoundId,
    this_copy_round_id: RoundId,
    this_copy_phrase: &str,
) -> Result<bool> {
    let prompt_round = quipflip_db::rounds::get_for_update(tx, prompt_round_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    let submitted = quipflip_db::rounds::submitted_copy_count(&mut **tx, prompt_round_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    if submitted < 2 {
        queue::return_prompt(tx, prompt_round_id).await?;
        return Ok(false);
    }

    let other_copy_row: (uuid::Uuid, String, i64) = sqlx::query_as(
        "SELECT round_id, submitted_phrase, system_contribution FROM rounds
         WHERE prompt_round_id = $1 AND role = 'copy' AND status = 'submitted' AND round_id != $2
         ORDER BY created_at ASC LIMIT 1",
    )
    .bind(prompt_round_id.0)
    .bind(this_copy_round_id.0)
    .fetch_one(&mut **tx)
    .await
    .map_err(|_| Error::DependencyUnavailable)?;

    let this_round = quipflip_db::rounds::get_by_id(&mut **tx, this_copy_round_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    let RoundPayload::Prompt { prompt_text, .. } = &prompt_round.payload else {
        return Err(Error::DependencyUnavailable);
    };
    let original = prompt_round
        .submitted_phrase
        .clone()
        .unwrap_or_else(|| prompt_text.clone());

    let total_pool = cfg.base_prize_pool + this_round.system_contribution + other_copy_row.2;

    let phraseset = Phraseset {
        phraseset_id: quipflip_core::types::PhrasesetId::new(),
        prompt_round_id,
        copy_round_1_id: RoundId(other_copy_row.0),
        copy_round_2_id: this_copy_round_id,
        prompt_text: prompt_text.clone(),
        original,
        copy_1: other_copy_row.1,
        copy_2: this_copy_phrase.to_string(),
        status: PhrasesetStatus::Open,
        vote_count: 0,
        third_vote_at: None,
        fifth_vote_at: None,
        closes_at: None,
        total_pool,
        system_contribution: this_round.system_contribution + other_copy_row.2,
        created_at: Utc::now(),
        finalized_at: None,
    };

    quipflip_db::phrasesets::insert(&mut **tx, &phraseset)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    Ok(true)
}

/// Apply the timeout policy for one expired round.
pub async fn apply_timeout(engine: &Engine, round: &Round) -> Result<()> {
    let cfg = &engine.config;
    let _guard = engine.locks.players.lock(round.player_id.0).await;

    let mut tx = engine
        .pool
        .begin()
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    let round = quipflip_db::rounds::get_for_update(&mut tx, round.round_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    if round.status != RoundStatus::Active {
        tx.commit().await.ok();
        return Ok(());
    }

    match &round.payload {
        RoundPayload::Prompt { .. } => {
            quipflip_db::rounds::set_status(&mut *tx, round.round_id, RoundStatus::Expired)
                .await
                .map_err(|_| Error::DependencyUnavailable)?;
            let refund = cfg.prompt_cost - cfg.prompt_timeout_penalty;
            ledger::credit(
                &mut tx,
                round.player_id,
                refund,
                TransactionKind::Refund,
                Some(round.round_id.0),
            )
            .await?;
            if cfg.prompt_timeout_penalty > 0 {
                ledger::record(
                    &mut tx,
                    round.player_id,
                    -cfg.prompt_timeout_penalty,
                    TransactionKind::Penalty,
                    Some(round.round_id.0),
                )
                .await?;
            }
            // The prompt never made it into the queue (it was never
            // submitted), so there's nothing to remove from it.
            quipflip_db::players::set_active_round(&mut *tx, round.player_id, None)
                .await
                .map_err(|_| Error::DependencyUnavailable)?;
        }
        RoundPayload::Copy {
            prompt_round_id, ..
        } => {
            quipflip_db::rounds::set_status(&mut *tx, round.round_id, RoundStatus::Abandoned)
                .await
                .map_err(|_| Error::DependencyUnavailable)?;
            let refund = round.cost - cfg.copy_timeout_penalty;
            ledger::credit(
                &mut tx,
                round.player_id,
                refund,
                TransactionKind::Refund,
                Some(round.round_id.0),
            )
            .await?;
            if cfg.copy_timeout_penalty > 0 {
                ledger::record(
                    &mut tx,
                    round.player_id,
                    -cfg.copy_timeout_penalty,
                    TransactionKind::Penalty,
                    Some(round.round_id.0),
                )
                .await?;
            }
            // A discounted copy's system_contribution only ever enters the
            // ledger once it funds a phraseset's total_pool; since this copy
            // never reached that point, there's nothing further to reverse.
            let assignment = quipflip_core::types::AbandonedAssignment {
                prompt_round_id: *prompt_round_id,
                player_id: round.player_id,
                created_at: Utc::now(),
            };
            quipflip_db::abandoned::insert(&mut *tx, &assignment)
                .await
                .map_err(|_| Error::DependencyUnavailable)?;
            queue::return_prompt(&mut tx, *prompt_round_id).await?;
            quipflip_db::players::set_active_round(&mut *tx, round.player_id, None)
                .await
                .map_err(|_| Error::DependencyUnavailable)?;
        }
        RoundPayload::Vote { phraseset_id, .. } => {
            quipflip_db::rounds::set_status(&mut *tx, round.round_id, RoundStatus::Expired)
                .await
                .map_err(|_| Error::DependencyUnavailable)?;
            quipflip_db::players::set_active_round(&mut *tx, round.player_id, None)
                .await
                .map_err(|_| Error::DependencyUnavailable)?;
            vote::release_grace_hold_and_maybe_close(&mut tx, cfg, *phraseset_id).await?;
        }
    }

    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;
    Ok(())
}
