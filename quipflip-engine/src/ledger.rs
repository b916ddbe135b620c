//! Append-only transaction log and atomic balance mutation.
//!
//! The balance itself is the source of truth, locked `FOR UPDATE` by
//! [`quipflip_db::players::get_for_update`] for the duration of the
//! read-check-write.
//!
//! Every function here assumes the caller already holds the per-player lock
//! (`Locks::players`) for `player_id` and is operating inside a transaction
//! it will commit or roll back; the lock's scope is the whole round-start or
//! round-end operation, not just the ledger call, so it is not acquired here.

use chrono::Utc;
use quipflip_core::types::{PlayerId, Transaction, TransactionId, TransactionKind};
use quipflip_core::{Error, Result};
use uuid::Uuid;

/// Apply a signed balance delta, append the matching transaction row, and
/// return the new balance. `InsufficientBalance` leaves both balance and log
/// untouched.
async fn apply(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
    delta: i64,
    kind: TransactionKind,
    reference_id: Option<Uuid>,
) -> Result<i64> {
    let player = quipflip_db::players::get_for_update(tx, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    let new_balance = player.balance + delta;
    if new_balance < 0 {
        return Err(Error::InsufficientBalance);
    }

    quipflip_db::players::set_balance(&mut **tx, player_id, new_balance)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    let entry = Transaction {
        transaction_id: TransactionId::new(),
        player_id,
        amount: delta,
        kind,
        reference_id,
        balance_after: new_balance,
        created_at: Utc::now(),
    };
    quipflip_db::transactions::insert(&mut **tx, &entry)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    Ok(new_balance)
}

/// Debit `amount` (must be positive) from `player_id`. Fails with
/// `InsufficientBalance` if the resulting balance would be negative.
pub async fn debit(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
    amount: i64,
    kind: TransactionKind,
    reference_id: Option<Uuid>,
) -> Result<i64> {
    apply(tx, player_id, -amount, kind, reference_id).await
}

/// Credit `amount` (must be positive) to `player_id`.
pub async fn credit(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
    amount: i64,
    kind: TransactionKind,
    reference_id: Option<Uuid>,
) -> Result<i64> {
    apply(tx, player_id, amount, kind, reference_id).await
}

/// Append an audit-only transaction entry without mutating the balance
/// (e.g. the withheld portion of a round-timeout penalty, or the house's
/// top-up on a discounted copy round). `balance_after` records the balance
/// at the time, unchanged.
pub async fn record(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
    amount: i64,
    kind: TransactionKind,
    reference_id: Option<Uuid>,
) -> Result<()> {
    let player = quipflip_db::players::get_for_update(tx, player_id)
        .await
        .map_err(|_| Error::DependencyUnavailable)?
        .ok_or(Error::NotFound)?;

    let entry = Transaction {
        transaction_id: TransactionId::new(),
        player_id,
        amount,
        kind,
        reference_id,
        balance_after: player.balance,
        created_at: Utc::now(),
    };
    quipflip_db::transactions::insert(&mut **tx, &entry)
        .await
        .map_err(|_| Error::DependencyUnavailable)?;

    Ok(())
}

/// Move `amount` from `from` to `to` as two log entries sharing `reference_id`.
/// Callers must hold both players' locks, ordered consistently to avoid
/// deadlock (lowest uuid first).
pub async fn transfer(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    from: PlayerId,
    to: PlayerId,
    amount: i64,
    debit_kind: TransactionKind,
    credit_kind: TransactionKind,
    reference_id: Option<Uuid>,
) -> Result<()> {
    apply(tx, from, -amount, debit_kind, reference_id).await?;
    apply(tx, to, amount, credit_kind, reference_id).await?;
    Ok(())
}
