use chrono::{DateTime, Utc};
use quipflip_core::types::{PlayerId, Transaction, TransactionId, TransactionKind};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
struct TransactionRow {
    transaction_id: Uuid,
    player_id: Uuid,
    amount: i64,
    kind: String,
    reference_id: Option<Uuid>,
    balance_after: i64,
    created_at: DateTime<Utc>,
}

fn kind_str(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::PromptEntry => "prompt_entry",
        TransactionKind::CopyEntry => "copy_entry",
        TransactionKind::VoteEntry => "vote_entry",
        TransactionKind::VotePayout => "vote_payout",
        TransactionKind::PrizePayout => "prize_payout",
        TransactionKind::Refund => "refund",
        TransactionKind::Penalty => "penalty",
        TransactionKind::DailyBonus => "daily_bonus",
        TransactionKind::SystemContribution => "system_contribution",
    }
}

fn parse_kind(s: &str) -> TransactionKind {
    match s {
        "prompt_entry" => TransactionKind::PromptEntry,
        "copy_entry" => TransactionKind::CopyEntry,
        "vote_entry" => TransactionKind::VoteEntry,
        "vote_payout" => TransactionKind::VotePayout,
        "prize_payout" => TransactionKind::PrizePayout,
        "refund" => TransactionKind::Refund,
        "penalty" => TransactionKind::Penalty,
        "daily_bonus" => TransactionKind::DailyBonus,
        _ => TransactionKind::SystemContribution,
    }
}

impl From<TransactionRow> for Transaction {
    fn from(r: TransactionRow) -> Self {
        Transaction {
            transaction_id: TransactionId(r.transaction_id),
            player_id: PlayerId(r.player_id),
            amount: r.amount,
            kind: parse_kind(&r.kind),
            reference_id: r.reference_id,
            balance_after: r.balance_after,
            created_at: r.created_at,
        }
    }
}

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    t: &Transaction,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO transactions (transaction_id, player_id, amount, kind, reference_id, balance_after, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)",
    )
    .bind(t.transaction_id.0)
    .bind(t.player_id.0)
    .bind(t.amount)
    .bind(kind_str(t.kind))
    .bind(t.reference_id)
    .bind(t.balance_after)
    .bind(t.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_for_player<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    limit: i64,
) -> sqlx::Result<Vec<Transaction>> {
    let rows: Vec<TransactionRow> = sqlx::query_as(
        "SELECT * FROM transactions WHERE player_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(player_id.0)
    .bind(limit)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
