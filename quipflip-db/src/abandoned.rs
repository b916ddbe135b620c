use chrono::{DateTime, Utc};
use quipflip_core::types::{AbandonedAssignment, PlayerId, RoundId};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
struct AbandonedRow {
    prompt_round_id: Uuid,
    player_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<AbandonedRow> for AbandonedAssignment {
    fn from(r: AbandonedRow) -> Self {
        AbandonedAssignment {
            prompt_round_id: RoundId(r.prompt_round_id),
            player_id: PlayerId(r.player_id),
            created_at: r.created_at,
        }
    }
}

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    a: &AbandonedAssignment,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO abandoned_assignments (prompt_round_id, player_id, created_at) VALUES ($1, $2, $3)",
    )
    .bind(a.prompt_round_id.0)
    .bind(a.player_id.0)
    .bind(a.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Players who have already been (re)assigned this abandoned prompt round,
/// so the queue never reassigns it to the same player twice.
pub async fn assigned_players<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    prompt_round_id: RoundId,
) -> sqlx::Result<Vec<PlayerId>> {
    let rows: Vec<AbandonedRow> =
        sqlx::query_as("SELECT * FROM abandoned_assignments WHERE prompt_round_id = $1")
            .bind(prompt_round_id.0)
            .fetch_all(executor)
            .await?;
    Ok(rows.into_iter().map(|r| PlayerId(r.player_id)).collect())
}
