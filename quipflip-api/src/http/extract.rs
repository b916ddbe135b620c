//! `AuthenticatedPlayer` resolves `Authorization: Bearer` and legacy
//! `X-API-Key` to the same principal so handlers can never
//! observe which credential was presented.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use quipflip_core::types::PlayerId;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::state::AppState;

pub struct AuthenticatedPlayer(pub PlayerId);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn api_key(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get("X-API-Key")?
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v).ok())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPlayer
where
    AppState: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let bearer = bearer_token(parts);
        let key = api_key(parts);
        if bearer.is_none() && key.is_none() {
            return Err(ApiError::Unauthenticated);
        }
        let player_id = quipflip_engine::auth::resolve_principal(
            &app_state.engine.pool,
            &app_state.secret,
            bearer,
            key,
        )
        .await?;
        Ok(AuthenticatedPlayer(player_id))
    }
}
