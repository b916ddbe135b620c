//! Credential verification, access/refresh token mint & rotate.
//!
//! Access tokens are stateless JWTs, short-lived. Refresh tokens are random
//! opaque strings; only their SHA-256 hash is ever persisted, so a stolen
//! database dump cannot be replayed as a refresh token. The legacy API key
//! is a third, long-lived credential that handlers must accept as an
//! equivalent principal without revealing which path authenticated (spec
//! §4.5 "handlers must not leak which was used").

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use quipflip_core::types::{PlayerId, Session};
use quipflip_core::{Config, Error, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    exp: i64,
}

pub fn mint_access_token(secret: &str, cfg: &Config, player_id: PlayerId) -> Result<String> {
    let exp = (Utc::now() + cfg.access_token_ttl).timestamp();
    let claims = Claims {
        sub: player_id.0,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| Error::DependencyUnavailable)
}

pub fn verify_access_token(secret: &str, token: &str) -> Result<PlayerId> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
        _ => Error::InvalidCredentials,
    })?;
    Ok(PlayerId(data.claims.sub))
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

async fn issue_session(
    pool: &sqlx::PgPool,
    cfg: &Config,
    player_id: PlayerId,
) -> Result<String> {
    let token = random_token();
    let session = Session {
        token_hash: hash_token(&token),
        player_id,
        expires_at: Utc::now() + cfg.refresh_token_ttl,
        revoked: false,
    };
    quipflip_db::sessions::insert(pool, &session)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    Ok(token)
}

/// Credentialed login. Returns `(access_token, refresh_token, player_id)`.
pub async fn login(
    pool: &sqlx::PgPool,
    cfg: &Config,
    secret: &str,
    username: &str,
    password: &str,
) -> Result<(String, String, PlayerId)> {
    let player = quipflip_db::players::get_by_username(pool, username)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::InvalidCredentials)?;

    let hash = quipflip_db::players::get_password_hash(pool, player.player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::InvalidCredentials)?;

    if !crate::player::verify_password(&hash, password) {
        return Err(Error::InvalidCredentials);
    }

    crate::player::touch_login(pool, &player).await?;

    let access = mint_access_token(secret, cfg, player.player_id)?;
    let refresh = issue_session(pool, cfg, player.player_id).await?;
    Ok((access, refresh, player.player_id))
}

/// Rotate a refresh token: the presented token must name a session that is
/// neither revoked nor expired. The old session is revoked in the same
/// transaction that creates the new one.
pub async fn refresh(
    pool: &sqlx::PgPool,
    cfg: &Config,
    secret: &str,
    presented_token: &str,
) -> Result<(String, String, PlayerId)> {
    let hash = hash_token(presented_token);
    let session = quipflip_db::sessions::get(pool, &hash)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::TokenRevoked)?;

    if session.revoked {
        return Err(Error::TokenRevoked);
    }
    if session.expires_at <= Utc::now() {
        return Err(Error::TokenExpired);
    }

    let mut tx = pool.begin().await.map_err(|_| Error::DependencyUnavailable)?;
    quipflip_db::sessions::revoke(&mut *tx, &hash)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    let new_refresh_token = random_token();
    let new_session = Session {
        token_hash: hash_token(&new_refresh_token),
        player_id: session.player_id,
        expires_at: Utc::now() + cfg.refresh_token_ttl,
        revoked: false,
    };
    quipflip_db::sessions::insert(&mut *tx, &new_session)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;

    let access = mint_access_token(secret, cfg, session.player_id)?;
    Ok((access, new_refresh_token, session.player_id))
}

pub async fn logout(pool: &sqlx::PgPool, presented_token: &str) -> Result<()> {
    let hash = hash_token(presented_token);
    quipflip_db::sessions::revoke(pool, &hash)
        .await
        .map_err(|_| Error::DependencyUnavailable)
}

/// Resolve the authenticated principal from either credential. A valid
/// access token and a valid legacy API key are equivalent; callers never
/// need to know which one was presented.
pub async fn resolve_principal(
    pool: &sqlx::PgPool,
    secret: &str,
    bearer: Option<&str>,
    api_key: Option<Uuid>,
) -> Result<PlayerId> {
    if let Some(token) = bearer {
        return verify_access_token(secret, token);
    }
    if let Some(key) = api_key {
        let player = quipflip_db::players::get_by_api_key(pool, key)
            .await
            .map_err(|_| Error::DependencyUnavailable)?
            .ok_or(Error::InvalidCredentials)?;
        return Ok(player.player_id);
    }
    Err(Error::InvalidCredentials)
}
