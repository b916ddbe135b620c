use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect and size the pool: one long-lived resource threaded through
/// every engine call.
pub async fn connect(database_url: &str) -> sqlx::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
