use chrono::{DateTime, Utc};
use quipflip_core::types::{PhrasesetId, PlayerId, Round, RoundId, RoundPayload, RoundRole, RoundStatus};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
struct RoundRow {
    round_id: Uuid,
    player_id: Uuid,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    cost: i64,
    system_contribution: i64,
    submitted_phrase: Option<String>,
    prompt_id: Option<Uuid>,
    prompt_text: Option<String>,
    #[allow(dead_code)]
    queue_position: Option<DateTime<Utc>>,
    prompt_round_id: Option<Uuid>,
    original_phrase: Option<String>,
    phraseset_id: Option<Uuid>,
    shuffled_phrase_0: Option<String>,
    shuffled_phrase_1: Option<String>,
    shuffled_phrase_2: Option<String>,
}

fn role_str(role: &RoundRole) -> &'static str {
    match role {
        RoundRole::Prompt => "prompt",
        RoundRole::Copy => "copy",
        RoundRole::Vote => "vote",
    }
}

fn status_str(status: RoundStatus) -> &'static str {
    match status {
        RoundStatus::Active => "active",
        RoundStatus::Submitted => "submitted",
        RoundStatus::Expired => "expired",
        RoundStatus::Abandoned => "abandoned",
    }
}

fn parse_status(s: &str) -> RoundStatus {
    match s {
        "active" => RoundStatus::Active,
        "submitted" => RoundStatus::Submitted,
        "expired" => RoundStatus::Expired,
        _ => RoundStatus::Abandoned,
    }
}

impl From<RoundRow> for Round {
    fn from(r: RoundRow) -> Self {
        let payload = match r.role.as_str() {
            "prompt" => RoundPayload::Prompt {
                prompt_id: r.prompt_id.unwrap_or_default(),
                prompt_text: r.prompt_text.unwrap_or_default(),
            },
            "copy" => RoundPayload::Copy {
                prompt_round_id: RoundId(r.prompt_round_id.unwrap_or_default()),
                original_phrase: r.original_phrase.unwrap_or_default(),
            },
            _ => RoundPayload::Vote {
                phraseset_id: PhrasesetId(r.phraseset_id.unwrap_or_default()),
                shuffled_phrases: [
                    r.shuffled_phrase_0.unwrap_or_default(),
                    r.shuffled_phrase_1.unwrap_or_default(),
                    r.shuffled_phrase_2.unwrap_or_default(),
                ],
            },
        };
        Round {
            round_id: RoundId(r.round_id),
            player_id: PlayerId(r.player_id),
            role: match r.role.as_str() {
                "prompt" => RoundRole::Prompt,
                "copy" => RoundRole::Copy,
                _ => RoundRole::Vote,
            },
            status: parse_status(&r.status),
            created_at: r.created_at,
            expires_at: r.expires_at,
            cost: r.cost,
            system_contribution: r.system_contribution,
            submitted_phrase: r.submitted_phrase,
            payload,
        }
    }
}

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(executor: E, round: &Round) -> sqlx::Result<()> {
    let (prompt_id, prompt_text, prompt_round_id, original_phrase, phraseset_id, p0, p1, p2) =
        match &round.payload {
            RoundPayload::Prompt {
                prompt_id,
                prompt_text,
            } => (
                Some(*prompt_id),
                Some(prompt_text.clone()),
                None,
                None,
                None,
                None,
                None,
                None,
            ),
            RoundPayload::Copy {
                prompt_round_id,
                original_phrase,
            } => (
                None,
                None,
                Some(prompt_round_id.0),
                Some(original_phrase.clone()),
                None,
                None,
                None,
                None,
            ),
            RoundPayload::Vote {
                phraseset_id,
                shuffled_phrases,
            } => (
                None,
                None,
                None,
                None,
                Some(phraseset_id.0),
                Some(shuffled_phrases[0].clone()),
                Some(shuffled_phrases[1].clone()),
                Some(shuffled_phrases[2].clone()),
            ),
        };

    sqlx::query(
        "INSERT INTO rounds (round_id, player_id, role, status, created_at, expires_at, cost,
            system_contribution, submitted_phrase, prompt_id, prompt_text, prompt_round_id,
            original_phrase, phraseset_id, shuffled_phrase_0, shuffled_phrase_1, shuffled_phrase_2)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)",
    )
    .bind(round.round_id.0)
    .bind(round.player_id.0)
    .bind(role_str(&round.role))
    .bind(status_str(round.status))
    .bind(round.created_at)
    .bind(round.expires_at)
    .bind(round.cost)
    .bind(round.system_contribution)
    .bind(&round.submitted_phrase)
    .bind(prompt_id)
    .bind(prompt_text)
    .bind(prompt_round_id)
    .bind(original_phrase)
    .bind(phraseset_id)
    .bind(p0)
    .bind(p1)
    .bind(p2)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    round_id: RoundId,
) -> sqlx::Result<Option<Round>> {
    let row: Option<RoundRow> = sqlx::query_as("SELECT * FROM rounds WHERE round_id = $1")
        .bind(round_id.0)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn get_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    round_id: RoundId,
) -> sqlx::Result<Option<Round>> {
    let row: Option<RoundRow> =
        sqlx::query_as("SELECT * FROM rounds WHERE round_id = $1 FOR UPDATE")
            .bind(round_id.0)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(Into::into))
}

pub async fn set_status<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    round_id: RoundId,
    status: RoundStatus,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE rounds SET status = $2 WHERE round_id = $1")
        .bind(round_id.0)
        .bind(status_str(status))
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn submit<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    round_id: RoundId,
    phrase: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE rounds SET status = 'submitted', submitted_phrase = $2 WHERE round_id = $1",
    )
    .bind(round_id.0)
    .bind(phrase)
    .execute(executor)
    .await?;
    Ok(())
}

/// Rounds whose `expires_at + grace_band` has already elapsed and which are
/// still `active`; what the sweeper scans for.
pub async fn expired_active_rounds<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    now: DateTime<Utc>,
    grace_band: chrono::Duration,
) -> sqlx::Result<Vec<Round>> {
    let cutoff = now - grace_band;
    let rows: Vec<RoundRow> =
        sqlx::query_as("SELECT * FROM rounds WHERE status = 'active' AND expires_at < $1")
            .bind(cutoff)
            .fetch_all(executor)
            .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// How many copy rounds on this prompt round have been submitted
/// successfully (used to decide first-vs-second copy on submit).
pub async fn submitted_copy_count<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    prompt_round_id: RoundId,
) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM rounds WHERE prompt_round_id = $1 AND role = 'copy' AND status = 'submitted'",
    )
    .bind(prompt_round_id.0)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Vote rounds currently `active` against a phraseset — the database
/// projection of "grace-holds".
pub async fn active_vote_round_count<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
) -> sqlx::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM rounds WHERE phraseset_id = $1 AND role = 'vote' AND status = 'active'",
    )
    .bind(phraseset_id.0)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Place a prompt round into `PromptsAwaitingCopies` at the tail.
/// Used both on the prompt's own submit and on copy-round return-to-queue.
pub async fn enqueue_prompt<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    round_id: RoundId,
    now: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE rounds SET queue_position = $2 WHERE round_id = $1")
        .bind(round_id.0)
        .bind(now)
        .execute(executor)
        .await?;
    Ok(())
}

/// Claim the earliest-queued prompt not authored by `player_id` and not
/// abandoned by `player_id` within `cooldown`, removing it from the queue.
/// Must run inside the transaction protected by the per-queue lock so two
/// concurrent copy-round starts never claim the same prompt.
pub async fn dequeue_next_prompt_for(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
    now: DateTime<Utc>,
    cooldown: chrono::Duration,
) -> sqlx::Result<Option<Round>> {
    let cutoff = now - cooldown;
    let row: Option<RoundRow> = sqlx::query_as(
        "SELECT * FROM rounds r
         WHERE r.role = 'prompt' AND r.queue_position IS NOT NULL
           AND r.player_id != $1
           AND NOT EXISTS (
             SELECT 1 FROM abandoned_assignments a
             WHERE a.prompt_round_id = r.round_id AND a.player_id = $1 AND a.created_at > $2
           )
         ORDER BY r.queue_position ASC
         LIMIT 1
         FOR UPDATE",
    )
    .bind(player_id.0)
    .bind(cutoff)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let round: Round = row.into();
    sqlx::query("UPDATE rounds SET queue_position = NULL WHERE round_id = $1")
        .bind(round.round_id.0)
        .execute(&mut **tx)
        .await?;
    Ok(Some(round))
}

pub async fn prompt_queue_depth<'e, E: sqlx::PgExecutor<'e>>(executor: E) -> sqlx::Result<i64> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM rounds WHERE role = 'prompt' AND queue_position IS NOT NULL")
            .fetch_one(executor)
            .await?;
    Ok(row.0)
}

/// Whether `player_id` authored any of the three rounds that contributed to
/// a phraseset (prompt or either copy).
pub async fn is_contributor<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    round_ids: [RoundId; 3],
    player_id: PlayerId,
) -> sqlx::Result<bool> {
    let ids: Vec<Uuid> = round_ids.iter().map(|r| r.0).collect();
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM rounds WHERE round_id = ANY($1) AND player_id = $2")
            .bind(&ids)
            .bind(player_id.0)
            .fetch_one(executor)
            .await?;
    Ok(row.0 > 0)
}

pub async fn has_player_voted_round<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
    player_id: PlayerId,
) -> sqlx::Result<bool> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM votes WHERE phraseset_id = $1 AND voter_id = $2",
    )
    .bind(phraseset_id.0)
    .bind(player_id.0)
    .fetch_one(executor)
    .await?;
    Ok(row.0 > 0)
}
