use chrono::NaiveDate;
use quipflip_core::types::PlayerId;

pub async fn has_claimed<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    date: NaiveDate,
) -> sqlx::Result<bool> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM daily_bonuses WHERE player_id = $1 AND date = $2")
            .bind(player_id.0)
            .bind(date)
            .fetch_one(executor)
            .await?;
    Ok(row.0 > 0)
}

pub async fn claim<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    player_id: PlayerId,
    date: NaiveDate,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO daily_bonuses (player_id, date) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(player_id.0)
        .bind(date)
        .execute(executor)
        .await?;
    Ok(())
}
