use chrono::{DateTime, Utc};
use quipflip_core::types::{Phraseset, PhrasesetId, PhrasesetStatus, PlayerId, RoundId};
use sqlx::FromRow;
use uuid::Uuid;

const ELIGIBLE_FOR_VOTE: &str = "
    p.status IN ('open', 'closing')
    AND p.vote_count < 20
    AND NOT EXISTS (SELECT 1 FROM votes v WHERE v.phraseset_id = p.phraseset_id AND v.voter_id = $1)
    AND NOT EXISTS (
        SELECT 1 FROM rounds r
        WHERE r.round_id IN (p.prompt_round_id, p.copy_round_1_id, p.copy_round_2_id)
          AND r.player_id = $1
    )
";

#[derive(FromRow)]
struct PhrasesetRow {
    phraseset_id: Uuid,
    prompt_round_id: Uuid,
    copy_round_1_id: Uuid,
    copy_round_2_id: Uuid,
    prompt_text: String,
    original: String,
    copy_1: String,
    copy_2: String,
    status: String,
    vote_count: i32,
    third_vote_at: Option<DateTime<Utc>>,
    fifth_vote_at: Option<DateTime<Utc>>,
    closes_at: Option<DateTime<Utc>>,
    total_pool: i64,
    system_contribution: i64,
    created_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
}

fn status_str(status: PhrasesetStatus) -> &'static str {
    match status {
        PhrasesetStatus::Open => "open",
        PhrasesetStatus::Closing => "closing",
        PhrasesetStatus::Closed => "closed",
        PhrasesetStatus::Finalized => "finalized",
    }
}

fn parse_status(s: &str) -> PhrasesetStatus {
    match s {
        "open" => PhrasesetStatus::Open,
        "closing" => PhrasesetStatus::Closing,
        "closed" => PhrasesetStatus::Closed,
        _ => PhrasesetStatus::Finalized,
    }
}

impl From<PhrasesetRow> for Phraseset {
    fn from(r: PhrasesetRow) -> Self {
        Phraseset {
            phraseset_id: PhrasesetId(r.phraseset_id),
            prompt_round_id: RoundId(r.prompt_round_id),
            copy_round_1_id: RoundId(r.copy_round_1_id),
            copy_round_2_id: RoundId(r.copy_round_2_id),
            prompt_text: r.prompt_text,
            original: r.original,
            copy_1: r.copy_1,
            copy_2: r.copy_2,
            status: parse_status(&r.status),
            vote_count: r.vote_count,
            third_vote_at: r.third_vote_at,
            fifth_vote_at: r.fifth_vote_at,
            closes_at: r.closes_at,
            total_pool: r.total_pool,
            system_contribution: r.system_contribution,
            created_at: r.created_at,
            finalized_at: r.finalized_at,
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(executor: E, p: &Phraseset) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO phrasesets (phraseset_id, prompt_round_id, copy_round_1_id, copy_round_2_id,
            prompt_text, original, copy_1, copy_2, status, vote_count, third_vote_at, fifth_vote_at,
            closes_at, total_pool, system_contribution, created_at, finalized_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)",
    )
    .bind(p.phraseset_id.0)
    .bind(p.prompt_round_id.0)
    .bind(p.copy_round_1_id.0)
    .bind(p.copy_round_2_id.0)
    .bind(&p.prompt_text)
    .bind(&p.original)
    .bind(&p.copy_1)
    .bind(&p.copy_2)
    .bind(status_str(p.status))
    .bind(p.vote_count)
    .bind(p.third_vote_at)
    .bind(p.fifth_vote_at)
    .bind(p.closes_at)
    .bind(p.total_pool)
    .bind(p.system_contribution)
    .bind(p.created_at)
    .bind(p.finalized_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
) -> sqlx::Result<Option<Phraseset>> {
    let row: Option<PhrasesetRow> =
        sqlx::query_as("SELECT * FROM phrasesets WHERE phraseset_id = $1")
            .bind(phraseset_id.0)
            .fetch_optional(executor)
            .await?;
    Ok(row.map(Into::into))
}

/// Locked read for the per-phraseset critical section guarding vote
/// acceptance and timeline transitions.
pub async fn get_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    phraseset_id: PhrasesetId,
) -> sqlx::Result<Option<Phraseset>> {
    let row: Option<PhrasesetRow> =
        sqlx::query_as("SELECT * FROM phrasesets WHERE phraseset_id = $1 FOR UPDATE")
            .bind(phraseset_id.0)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(Into::into))
}

#[allow(clippy::too_many_arguments)]
pub async fn update_timeline<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
    status: PhrasesetStatus,
    vote_count: i32,
    third_vote_at: Option<DateTime<Utc>>,
    fifth_vote_at: Option<DateTime<Utc>>,
    closes_at: Option<DateTime<Utc>>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE phrasesets SET status = $2, vote_count = $3, third_vote_at = $4,
            fifth_vote_at = $5, closes_at = $6 WHERE phraseset_id = $1",
    )
    .bind(phraseset_id.0)
    .bind(status_str(status))
    .bind(vote_count)
    .bind(third_vote_at)
    .bind(fifth_vote_at)
    .bind(closes_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn finalize<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
    finalized_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE phrasesets SET status = 'finalized', finalized_at = $2 WHERE phraseset_id = $1",
    )
    .bind(phraseset_id.0)
    .bind(finalized_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Vote-assignment priority: tier 1 is phrasesets with 5-19
/// votes, earliest `fifth_vote_at` first.
pub async fn next_for_vote_tier1(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
) -> sqlx::Result<Option<Phraseset>> {
    let sql = format!(
        "SELECT p.* FROM phrasesets p WHERE {ELIGIBLE_FOR_VOTE} AND p.vote_count >= 5
         ORDER BY p.fifth_vote_at ASC LIMIT 1 FOR UPDATE OF p SKIP LOCKED"
    );
    let row: Option<PhrasesetRow> = sqlx::query_as(&sql)
        .bind(player_id.0)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Into::into))
}

/// Tier 2: phrasesets with 3-4 votes, earliest `third_vote_at` first.
pub async fn next_for_vote_tier2(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
) -> sqlx::Result<Option<Phraseset>> {
    let sql = format!(
        "SELECT p.* FROM phrasesets p WHERE {ELIGIBLE_FOR_VOTE} AND p.vote_count BETWEEN 3 AND 4
         ORDER BY p.third_vote_at ASC LIMIT 1 FOR UPDATE OF p SKIP LOCKED"
    );
    let row: Option<PhrasesetRow> = sqlx::query_as(&sql)
        .bind(player_id.0)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Into::into))
}

/// Tier 3: phrasesets with fewer than 3 votes, random pick.
pub async fn next_for_vote_tier3(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
) -> sqlx::Result<Option<Phraseset>> {
    let sql = format!(
        "SELECT p.* FROM phrasesets p WHERE {ELIGIBLE_FOR_VOTE} AND p.vote_count < 3
         ORDER BY random() LIMIT 1 FOR UPDATE OF p SKIP LOCKED"
    );
    let row: Option<PhrasesetRow> = sqlx::query_as(&sql)
        .bind(player_id.0)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Into::into))
}

/// Phrasesets whose voting window has elapsed without reaching five votes
/// (`closing`), plus `open` phrasesets that have gone quiet for
/// `third_vote_window` since their third vote without ever reaching a
/// fifth; the sweeper drives both through `check_and_advance_timeline`.
pub async fn closable_by_deadline<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    now: DateTime<Utc>,
    third_vote_window: chrono::Duration,
) -> sqlx::Result<Vec<Phraseset>> {
    let idle_cutoff = now - third_vote_window;
    let rows: Vec<PhrasesetRow> = sqlx::query_as(
        "SELECT * FROM phrasesets WHERE
            (status = 'closing' AND closes_at IS NOT NULL AND closes_at < $1)
            OR (status = 'open' AND third_vote_at IS NOT NULL AND third_vote_at < $2 AND vote_count < 5)",
    )
    .bind(now)
    .bind(idle_cutoff)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
