use chrono::{DateTime, Utc};
use quipflip_core::types::{PhrasesetId, PlayerId, ResultView};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
struct ResultViewRow {
    phraseset_id: Uuid,
    player_id: Uuid,
    payout_claimed: bool,
    payout_amount: i64,
    first_viewed_at: Option<DateTime<Utc>>,
    payout_claimed_at: Option<DateTime<Utc>>,
}

impl From<ResultViewRow> for ResultView {
    fn from(r: ResultViewRow) -> Self {
        ResultView {
            phraseset_id: PhrasesetId(r.phraseset_id),
            player_id: PlayerId(r.player_id),
            payout_claimed: r.payout_claimed,
            payout_amount: r.payout_amount,
            first_viewed_at: r.first_viewed_at,
            payout_claimed_at: r.payout_claimed_at,
        }
    }
}

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
    payout_amount: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO result_views (phraseset_id, player_id, payout_claimed, payout_amount)
         VALUES ($1, $2, FALSE, $3)",
    )
    .bind(phraseset_id.0)
    .bind(player_id.0)
    .bind(payout_amount)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
) -> sqlx::Result<Option<ResultView>> {
    let row: Option<ResultViewRow> = sqlx::query_as(
        "SELECT * FROM result_views WHERE phraseset_id = $1 AND player_id = $2",
    )
    .bind(phraseset_id.0)
    .bind(player_id.0)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Into::into))
}

/// Locked read guarding the idempotent claim path shared by `/results`
/// auto-claim and the explicit `/claim` endpoint.
pub async fn get_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
) -> sqlx::Result<Option<ResultView>> {
    let row: Option<ResultViewRow> = sqlx::query_as(
        "SELECT * FROM result_views WHERE phraseset_id = $1 AND player_id = $2 FOR UPDATE",
    )
    .bind(phraseset_id.0)
    .bind(player_id.0)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn mark_viewed<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
    viewed_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE result_views SET first_viewed_at = COALESCE(first_viewed_at, $3)
         WHERE phraseset_id = $1 AND player_id = $2",
    )
    .bind(phraseset_id.0)
    .bind(player_id.0)
    .bind(viewed_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Finalised phrasesets this player contributed to and has not yet claimed.
pub async fn list_unclaimed_for_player<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
) -> sqlx::Result<Vec<ResultView>> {
    let rows: Vec<ResultViewRow> = sqlx::query_as(
        "SELECT * FROM result_views WHERE player_id = $1 AND payout_claimed = FALSE",
    )
    .bind(player_id.0)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn mark_claimed<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
    claimed_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE result_views SET payout_claimed = TRUE, payout_claimed_at = $3
         WHERE phraseset_id = $1 AND player_id = $2",
    )
    .bind(phraseset_id.0)
    .bind(player_id.0)
    .bind(claimed_at)
    .execute(executor)
    .await?;
    Ok(())
}
