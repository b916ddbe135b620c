//! `/rounds/*` endpoints: availability, starting each role, submission,
//! and owner-only lookup.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quipflip_core::types::RoundId;
use quipflip_engine::round::SubmitOutcome;

use crate::http::dto::RoundView;
use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::AuthenticatedPlayer;
use crate::state::AppState;

#[derive(Serialize)]
pub struct AvailableResponse {
    can_prompt: bool,
    can_copy: bool,
    can_vote: bool,
    copy_cost: i64,
    discount_active: bool,
    prompt_queue_depth: i64,
}

pub async fn available(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<AvailableResponse>> {
    let cfg = &state.engine.config;
    let player = quipflip_db::players::get_by_id(&state.engine.pool, player_id)
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
        .map_err(ApiError::Engine)?
        .ok_or(quipflip_core::Error::NotFound)
        .map_err(ApiError::Engine)?;

    let outstanding = quipflip_engine::player::outstanding_prompt_count(&state.engine.pool, player_id)
        .await
        .map_err(ApiError::Engine)?;
    let depth = quipflip_engine::queue::prompt_queue_depth(&state.engine.pool)
        .await
        .map_err(ApiError::Engine)?;
    let discount = quipflip_engine::queue::is_discount_active(&state.engine.pool, cfg)
        .await
        .map_err(ApiError::Engine)?;
    let copy_cost = if discount { cfg.copy_cost_discount } else { cfg.copy_cost_normal };

    let idle = player.active_round_id.is_none();
    Ok(Json(AvailableResponse {
        can_prompt: idle && player.balance >= cfg.prompt_cost && outstanding < cfg.max_outstanding_prompts,
        can_copy: idle && player.balance >= copy_cost,
        can_vote: idle && player.balance >= cfg.vote_cost,
        copy_cost,
        discount_active: discount,
        prompt_queue_depth: depth,
    }))
}

pub async fn start_prompt(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<RoundView>> {
    let round = quipflip_engine::round::start_prompt_round(&state.engine, player_id)
        .await
        .map_err(ApiError::Engine)?;
    Ok(Json(RoundView::from(&round)))
}

pub async fn start_copy(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<RoundView>> {
    let round = quipflip_engine::round::start_copy_round(&state.engine, player_id)
        .await
        .map_err(ApiError::Engine)?;
    Ok(Json(RoundView::from(&round)))
}

pub async fn start_vote(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<RoundView>> {
    let round = quipflip_engine::round::start_vote_round(&state.engine, player_id)
        .await
        .map_err(ApiError::Engine)?;
    Ok(Json(RoundView::from(&round)))
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    phrase: String,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    phraseset_created: bool,
}

pub async fn submit(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
    Path(round_id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let outcome = quipflip_engine::round::submit(
        &state.engine,
        player_id,
        RoundId(round_id),
        &req.phrase,
    )
    .await
    .map_err(ApiError::Engine)?;

    let phraseset_created = matches!(
        outcome,
        SubmitOutcome::Copy { phraseset_created: true }
    );
    Ok(Json(SubmitResponse { phraseset_created }))
}

pub async fn get_round(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
    Path(round_id): Path<Uuid>,
) -> ApiResult<Json<RoundView>> {
    let round = quipflip_db::rounds::get_by_id(&state.engine.pool, RoundId(round_id))
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
        .map_err(ApiError::Engine)?
        .ok_or(quipflip_core::Error::NotFound)
        .map_err(ApiError::Engine)?;

    if round.player_id != player_id {
        return Err(ApiError::Engine(quipflip_core::Error::NotFound));
    }
    Ok(Json(RoundView::from(&round)))
}
