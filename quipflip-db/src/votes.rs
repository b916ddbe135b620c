use chrono::{DateTime, Utc};
use quipflip_core::types::{PhrasesetId, PlayerId, Vote, VoteId};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
struct VoteRow {
    vote_id: Uuid,
    phraseset_id: Uuid,
    voter_id: Uuid,
    voted_index: i16,
    voted_phrase: String,
    correct: bool,
    payout: i64,
    created_at: DateTime<Utc>,
}

impl From<VoteRow> for Vote {
    fn from(r: VoteRow) -> Self {
        Vote {
            vote_id: VoteId(r.vote_id),
            phraseset_id: PhrasesetId(r.phraseset_id),
            voter_id: PlayerId(r.voter_id),
            voted_index: r.voted_index,
            voted_phrase: r.voted_phrase,
            correct: r.correct,
            payout: r.payout,
            created_at: r.created_at,
        }
    }
}

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(executor: E, vote: &Vote) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO votes (vote_id, phraseset_id, voter_id, voted_index, voted_phrase, correct, payout, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(vote.vote_id.0)
    .bind(vote.phraseset_id.0)
    .bind(vote.voter_id.0)
    .bind(vote.voted_index)
    .bind(&vote.voted_phrase)
    .bind(vote.correct)
    .bind(vote.payout)
    .bind(vote.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_for_phraseset<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
) -> sqlx::Result<Vec<Vote>> {
    let rows: Vec<VoteRow> =
        sqlx::query_as("SELECT * FROM votes WHERE phraseset_id = $1 ORDER BY created_at")
            .bind(phraseset_id.0)
            .fetch_all(executor)
            .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn count_correct<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    phraseset_id: PhrasesetId,
) -> sqlx::Result<i64> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM votes WHERE phraseset_id = $1 AND correct = TRUE")
            .bind(phraseset_id.0)
            .fetch_one(executor)
            .await?;
    Ok(row.0)
}
