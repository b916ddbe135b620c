use chrono::{DateTime, Utc};
use quipflip_core::types::{PlayerId, Session};
use sqlx::FromRow;

#[derive(FromRow)]
struct SessionRow {
    token_hash: String,
    player_id: uuid::Uuid,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl From<SessionRow> for Session {
    fn from(r: SessionRow) -> Self {
        Session {
            token_hash: r.token_hash,
            player_id: PlayerId(r.player_id),
            expires_at: r.expires_at,
            revoked: r.revoked,
        }
    }
}

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(executor: E, s: &Session) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO sessions (token_hash, player_id, expires_at, revoked) VALUES ($1, $2, $3, $4)",
    )
    .bind(&s.token_hash)
    .bind(s.player_id.0)
    .bind(s.expires_at)
    .bind(s.revoked)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    token_hash: &str,
) -> sqlx::Result<Option<Session>> {
    let row: Option<SessionRow> = sqlx::query_as("SELECT * FROM sessions WHERE token_hash = $1")
        .bind(token_hash)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn revoke<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    token_hash: &str,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE sessions SET revoked = TRUE WHERE token_hash = $1")
        .bind(token_hash)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn revoke_all_for_player<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE sessions SET revoked = TRUE WHERE player_id = $1")
        .bind(player_id.0)
        .execute(executor)
        .await?;
    Ok(())
}
