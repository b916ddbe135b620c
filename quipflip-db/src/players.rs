use chrono::NaiveDate;
use quipflip_core::types::{Player, PlayerId, RoundId};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
struct PlayerRow {
    player_id: Uuid,
    username: String,
    email: String,
    #[allow(dead_code)]
    password_hash: String,
    api_key: Uuid,
    balance: i64,
    last_login_date: NaiveDate,
    creation_date: NaiveDate,
    active_round_id: Option<Uuid>,
}

impl From<PlayerRow> for Player {
    fn from(r: PlayerRow) -> Self {
        Player {
            player_id: PlayerId(r.player_id),
            username: r.username,
            email: r.email,
            balance: r.balance,
            last_login_date: r.last_login_date,
            creation_date: r.creation_date,
            active_round_id: r.active_round_id.map(RoundId),
            api_key: r.api_key,
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    username: &str,
    email: &str,
    password_hash: &str,
    api_key: Uuid,
    balance: i64,
    creation_date: NaiveDate,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO players (player_id, username, email, password_hash, api_key, balance, last_login_date, creation_date, active_round_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7, NULL)",
    )
    .bind(player_id.0)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(api_key)
    .bind(balance)
    .bind(creation_date)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
) -> sqlx::Result<Option<Player>> {
    let row: Option<PlayerRow> = sqlx::query_as("SELECT * FROM players WHERE player_id = $1")
        .bind(player_id.0)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn get_by_username<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    username: &str,
) -> sqlx::Result<Option<Player>> {
    let row: Option<PlayerRow> = sqlx::query_as("SELECT * FROM players WHERE username = $1")
        .bind(username)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn get_by_api_key<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    api_key: Uuid,
) -> sqlx::Result<Option<Player>> {
    let row: Option<PlayerRow> = sqlx::query_as("SELECT * FROM players WHERE api_key = $1")
        .bind(api_key)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Into::into))
}

/// Fetch a player row locked `FOR UPDATE`, for use inside the ledger's
/// per-player critical section.
pub async fn get_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
) -> sqlx::Result<Option<Player>> {
    let row: Option<PlayerRow> =
        sqlx::query_as("SELECT * FROM players WHERE player_id = $1 FOR UPDATE")
            .bind(player_id.0)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(Into::into))
}

pub async fn set_balance<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    balance: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE players SET balance = $2 WHERE player_id = $1")
        .bind(player_id.0)
        .bind(balance)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_active_round<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    round_id: Option<RoundId>,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE players SET active_round_id = $2 WHERE player_id = $1")
        .bind(player_id.0)
        .bind(round_id.map(|r| r.0))
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_last_login_date<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    date: NaiveDate,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE players SET last_login_date = $2 WHERE player_id = $1")
        .bind(player_id.0)
        .bind(date)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_api_key<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    api_key: Uuid,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE players SET api_key = $2 WHERE player_id = $1")
        .bind(player_id.0)
        .bind(api_key)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_password_hash<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    password_hash: &str,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE players SET password_hash = $2 WHERE player_id = $1")
        .bind(player_id.0)
        .bind(password_hash)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn get_password_hash<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
) -> sqlx::Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT password_hash FROM players WHERE player_id = $1")
            .bind(player_id.0)
            .fetch_optional(executor)
            .await?;
    Ok(row.map(|r| r.0))
}

/// Number of phrasesets in `{open, closing}` originated by this player,
/// capped against the outstanding-prompts limit.
pub async fn outstanding_prompt_count<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM phrasesets p
         JOIN rounds r ON r.round_id = p.prompt_round_id
         WHERE r.player_id = $1 AND p.status IN ('open', 'closing')",
    )
    .bind(player_id.0)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}
