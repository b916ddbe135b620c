//! `/player/*` endpoints covering registration and the per-player
//! invariants (balance, daily bonus, outstanding prompts, resume).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::dto::{PlayerView, RoundView};
use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::AuthenticatedPlayer;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    player: PlayerView,
    api_key: Uuid,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let registered = quipflip_engine::player::register(
        &state.engine.pool,
        &state.engine.config,
        &req.username,
        &req.email,
        &req.password,
    )
    .await
    .map_err(ApiError::Engine)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            api_key: registered.player.api_key,
            player: PlayerView::from(&registered.player),
        }),
    ))
}

#[derive(Serialize)]
pub struct BalanceResponse {
    balance: i64,
    daily_bonus_available: bool,
    outstanding_prompt_count: i64,
}

pub async fn balance(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<BalanceResponse>> {
    let player = quipflip_db::players::get_by_id(&state.engine.pool, player_id)
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
        .map_err(ApiError::Engine)?
        .ok_or(quipflip_core::Error::NotFound)
        .map_err(ApiError::Engine)?;

    let outstanding = quipflip_engine::player::outstanding_prompt_count(&state.engine.pool, player_id)
        .await
        .map_err(ApiError::Engine)?;

    Ok(Json(BalanceResponse {
        balance: player.balance,
        daily_bonus_available: quipflip_engine::player::daily_bonus_available(&player, Utc::now()),
        outstanding_prompt_count: outstanding,
    }))
}

#[derive(Serialize)]
pub struct ClaimDailyBonusResponse {
    new_balance: i64,
}

pub async fn claim_daily_bonus(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<ClaimDailyBonusResponse>> {
    let new_balance = quipflip_engine::player::claim_daily_bonus(
        &state.engine.pool,
        &state.engine.locks,
        &state.engine.config,
        player_id,
    )
    .await
    .map_err(ApiError::Engine)?;
    Ok(Json(ClaimDailyBonusResponse { new_balance }))
}

pub async fn current_round(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<Option<RoundView>>> {
    let player = quipflip_db::players::get_by_id(&state.engine.pool, player_id)
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
        .map_err(ApiError::Engine)?
        .ok_or(quipflip_core::Error::NotFound)
        .map_err(ApiError::Engine)?;

    let Some(round_id) = player.active_round_id else {
        return Ok(Json(None));
    };
    let round = quipflip_db::rounds::get_by_id(&state.engine.pool, round_id)
        .await
        .map_err(|_| quipflip_core::Error::DependencyUnavailable)
        .map_err(ApiError::Engine)?;
    Ok(Json(round.as_ref().map(RoundView::from)))
}

#[derive(Serialize)]
pub struct PendingResult {
    phraseset_id: Uuid,
    payout_amount: i64,
}

pub async fn pending_results(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<Vec<PendingResult>>> {
    let views = quipflip_engine::results::pending_for_player(&state.engine.pool, player_id)
        .await
        .map_err(ApiError::Engine)?;
    Ok(Json(
        views
            .into_iter()
            .map(|v| PendingResult {
                phraseset_id: v.phraseset_id.0,
                payout_amount: v.payout_amount,
            })
            .collect(),
    ))
}
