//! `/auth/*` and the legacy credential endpoints.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::AuthenticatedPlayer;
use crate::state::AppState;

const REFRESH_COOKIE: &str = "refresh_token";

fn refresh_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{REFRESH_COOKIE}={token}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={max_age_secs}"
    )
}

fn clear_refresh_cookie() -> String {
    format!("{REFRESH_COOKIE}=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0")
}

fn read_refresh_cookie(headers: &axum::http::HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|kv| {
        let kv = kv.trim();
        let (k, v) = kv.split_once('=')?;
        (k == REFRESH_COOKIE).then(|| v.to_string())
    })
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    access_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    let (access, refresh, _) = quipflip_engine::auth::login(
        &state.engine.pool,
        &state.engine.config,
        &state.secret,
        &req.username,
        &req.password,
    )
    .await
    .map_err(ApiError::Engine)?;

    let ttl = state.engine.config.refresh_token_ttl.as_secs() as i64;
    let mut response = Json(LoginResponse { access_token: access }).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, refresh_cookie(&refresh, ttl).parse().unwrap());
    Ok(response)
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> ApiResult<Response> {
    let presented = read_refresh_cookie(&headers).ok_or(ApiError::Unauthenticated)?;
    let (access, new_refresh, _) = quipflip_engine::auth::refresh(
        &state.engine.pool,
        &state.engine.config,
        &state.secret,
        &presented,
    )
    .await
    .map_err(ApiError::Engine)?;

    let ttl = state.engine.config.refresh_token_ttl.as_secs() as i64;
    let mut response = Json(LoginResponse { access_token: access }).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        refresh_cookie(&new_refresh, ttl).parse().unwrap(),
    );
    Ok(response)
}

pub async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> ApiResult<Response> {
    if let Some(presented) = read_refresh_cookie(&headers) {
        quipflip_engine::auth::logout(&state.engine.pool, &presented)
            .await
            .map_err(ApiError::Engine)?;
    }
    let mut response = axum::http::StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, clear_refresh_cookie().parse().unwrap());
    Ok(response)
}

#[derive(Deserialize)]
pub struct LegacyLoginRequest {
    username: String,
}

#[derive(Serialize)]
pub struct LegacyLoginResponse {
    api_key: uuid::Uuid,
}

/// `POST /player/login` — legacy username-based API-key recovery.
pub async fn legacy_login(
    State(state): State<AppState>,
    Json(req): Json<LegacyLoginRequest>,
) -> ApiResult<Json<LegacyLoginResponse>> {
    let api_key = quipflip_engine::player::recover_api_key(&state.engine.pool, &req.username)
        .await
        .map_err(ApiError::Engine)?;
    Ok(Json(LegacyLoginResponse { api_key }))
}

#[derive(Serialize)]
pub struct RotateKeyResponse {
    api_key: uuid::Uuid,
}

pub async fn rotate_key(
    State(state): State<AppState>,
    AuthenticatedPlayer(player_id): AuthenticatedPlayer,
) -> ApiResult<Json<RotateKeyResponse>> {
    let api_key = quipflip_engine::player::rotate_key(&state.engine.pool, player_id)
        .await
        .map_err(ApiError::Engine)?;
    Ok(Json(RotateKeyResponse { api_key }))
}
