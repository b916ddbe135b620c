//! `/phrasesets/{id}/*` endpoints: voting, contributor details/results,
//! and idempotent prize claim.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quipflip_core::types::{PhrasesetId, RoundRole, RoundStatus};

use crate::http::dto::PhrasesetView;
use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::AuthenticatedPlayer;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct VoteRequest {
    phrase: String,
}

#[derive(Serialize)]
pub struct VoteResponse {
    correct: bool,
    payout: i64,
    original_phrase: String,
}

pub async fn vote(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
    Path(phraseset_id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    let phraseset_id = PhrasesetId(phraseset_id);
    let player = quipflip_db::players::get_by_id(&state.engine.pool, player_id)
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
        .map_err(ApiError::Engine)?
        .ok_or(quipflip_core::Error::NotFound)
        .map_err(ApiError::Engine)?;

    let round_id = player.active_round_id.ok_or(quipflip_core::Error::NotFound).map_err(ApiError::Engine)?;
    let round = quipflip_db::rounds::get_by_id(&state.engine.pool, round_id)
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
        .map_err(ApiError::Engine)?
        .ok_or(quipflip_core::Error::NotFound)
        .map_err(ApiError::Engine)?;

    let matches_phraseset = match &round.payload {
        quipflip_core::types::RoundPayload::Vote { phraseset_id: pid, .. } => *pid == phraseset_id,
        _ => false,
    };
    if round.role != RoundRole::Vote || round.status != RoundStatus::Active || !matches_phraseset {
        return Err(ApiError::Engine(quipflip_core::Error::NotFound));
    }

    let (correct, payout, original_phrase) = quipflip_engine::vote::cast_vote(
        &state.engine.pool,
        &state.engine.locks,
        &state.engine.config,
        player_id,
        &round,
        &req.phrase,
    )
    .await
    .map_err(ApiError::Engine)?;

    Ok(Json(VoteResponse { correct, payout, original_phrase }))
}

#[derive(Serialize)]
pub struct DetailsResponse {
    phraseset: PhrasesetView,
    finalized: bool,
}

pub async fn details(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
    Path(phraseset_id): Path<Uuid>,
) -> ApiResult<Json<DetailsResponse>> {
    let details = quipflip_engine::results::get_details(&state.engine.pool, PhrasesetId(phraseset_id), player_id)
        .await
        .map_err(ApiError::Engine)?;
    let finalized = details.result.is_some();
    Ok(Json(DetailsResponse {
        phraseset: PhrasesetView::from(&details.phraseset),
        finalized,
    }))
}

#[derive(Serialize)]
pub struct ResultsResponse {
    payout_amount: i64,
    already_claimed: bool,
}

pub async fn results(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
    Path(phraseset_id): Path<Uuid>,
) -> ApiResult<Json<ResultsResponse>> {
    let (_, outcome) = quipflip_engine::results::get_results_with_autoclaim(
        &state.engine.pool,
        &state.engine.locks,
        PhrasesetId(phraseset_id),
        player_id,
    )
    .await
    .map_err(ApiError::Engine)?;

    Ok(Json(ResultsResponse {
        payout_amount: outcome.amount,
        already_claimed: outcome.already_claimed,
    }))
}

#[derive(Serialize)]
pub struct ClaimResponse {
    amount: i64,
    new_balance: Option<i64>,
    already_claimed: bool,
}

pub async fn claim(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
    Path(phraseset_id): Path<Uuid>,
) -> ApiResult<Json<ClaimResponse>> {
    let outcome = quipflip_engine::results::claim(
        &state.engine.pool,
        &state.engine.locks,
        PhrasesetId(phraseset_id),
        player_id,
    )
    .await
    .map_err(ApiError::Engine)?;

    Ok(Json(ClaimResponse {
        amount: outcome.amount,
        new_balance: outcome.new_balance,
        already_claimed: outcome.already_claimed,
    }))
}
