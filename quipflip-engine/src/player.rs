//! Account lifecycle and per-player invariants that are not purely
//! per-row.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use quipflip_core::types::{Player, PlayerId, TransactionKind};
use quipflip_core::{Config, Error, Result};
use uuid::Uuid;

use crate::ledger;
use crate::locks::Locks;

pub struct Registered {
    pub player: Player,
}

pub async fn register(
    pool: &sqlx::PgPool,
    cfg: &Config,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Registered> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| Error::DependencyUnavailable)?
        .to_string();

    let player_id = PlayerId::new();
    let api_key = Uuid::new_v4();
    let today = Utc::now().date_naive();

    quipflip_db::players::insert(
        pool,
        player_id,
        username,
        email,
        &password_hash,
        api_key,
        cfg.starting_balance,
        today,
    )
    .await
    .map_err(|_| Error::DependencyUnavailable)?;

    let player = quipflip_db::players::get_by_id(pool, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    Ok(Registered { player })
}

pub fn verify_password(password_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Daily bonus is available once `now`'s UTC date is strictly after the
/// player's last login, and the account is at least a day old.
pub fn daily_bonus_available(player: &Player, now: chrono::DateTime<Utc>) -> bool {
    let today = now.date_naive();
    today > player.last_login_date && player.last_login_date > player.creation_date
}

/// Advance `last_login_date` to today when a new calendar day has begun
/// since the player was last seen. Called from every login path — without
/// it `last_login_date` never moves past `creation_date` and
/// `daily_bonus_available` can never become true.
pub async fn touch_login<'e, E: sqlx::PgExecutor<'e>>(executor: E, player: &Player) -> Result<()> {
    let today = Utc::now().date_naive();
    if today > player.last_login_date {
        quipflip_db::players::set_last_login_date(executor, player.player_id, today)
            .await
            .map_err(|_| Error::DependencyUnavailable)?;
    }
    Ok(())
}

/// Credit the daily bonus and advance `last_login_date`, atomically.
/// `AlreadyClaimedToday` if the invariant above does not hold.
pub async fn claim_daily_bonus(
    pool: &sqlx::PgPool,
    locks: &Locks,
    cfg: &Config,
    player_id: PlayerId,
) -> Result<i64> {
    let _guard = locks.players.lock(player_id.0).await;
    let now = Utc::now();

    let player = quipflip_db::players::get_by_id(pool, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    if !daily_bonus_available(&player, now) {
        return Err(Error::AlreadyClaimedToday);
    }

    let mut tx = pool.begin().await.map_err(|_| Error::DependencyUnavailable)?;
    let new_balance = ledger::credit(&mut tx, player_id, cfg.daily_bonus, TransactionKind::DailyBonus, None).await?;
    quipflip_db::players::set_last_login_date(&mut *tx, player_id, now.date_naive())
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    quipflip_db::daily_bonus::claim(&mut *tx, player_id, now.date_naive())
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    tx.commit().await.map_err(|_| Error::DependencyUnavailable)?;

    Ok(new_balance)
}

/// Number of phrasesets in `{open, closing}` this player originated
/// (glossary: outstanding prompt; capped at `cfg.max_outstanding_prompts`).
pub async fn outstanding_prompt_count<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
) -> Result<i64> {
    quipflip_db::players::outstanding_prompt_count(executor, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)
}

/// Legacy username-based API key recovery (`POST /player/login`).
pub async fn recover_api_key(pool: &sqlx::PgPool, username: &str) -> Result<Uuid> {
    let player = quipflip_db::players::get_by_username(pool, username)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::UsernameNotFound)?;
    touch_login(pool, &player).await?;
    Ok(player.api_key)
}

/// Invalidate and replace the legacy API key.
pub async fn rotate_key(pool: &sqlx::PgPool, player_id: PlayerId) -> Result<Uuid> {
    let new_key = Uuid::new_v4();
    quipflip_db::players::set_api_key(pool, player_id, new_key)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;
    Ok(new_key)
}
