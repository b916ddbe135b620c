pub mod auth;
pub mod dto;
pub mod error;
pub mod extract;
pub mod health;
pub mod phrasesets;
pub mod player;
pub mod rounds;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/player", post(player::register))
        .route("/player/login", post(auth::legacy_login))
        .route("/player/rotate-key", post(auth::rotate_key))
        .route("/player/balance", get(player::balance))
        .route("/player/claim-daily-bonus", post(player::claim_daily_bonus))
        .route("/player/current-round", get(player::current_round))
        .route("/player/pending-results", get(player::pending_results))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/rounds/available", get(rounds::available))
        .route("/rounds/prompt", post(rounds::start_prompt))
        .route("/rounds/copy", post(rounds::start_copy))
        .route("/rounds/vote", post(rounds::start_vote))
        .route("/rounds/:id/submit", post(rounds::submit))
        .route("/rounds/:id", get(rounds::get_round))
        .route("/phrasesets/:id/vote", post(phrasesets::vote))
        .route("/phrasesets/:id/details", get(phrasesets::details))
        .route("/phrasesets/:id/results", get(phrasesets::results))
        .route("/phrasesets/:id/claim", post(phrasesets::claim))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
