//! `GET /health` liveness probe: 503 if Postgres is unreachable.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    database: bool,
    redis: Option<bool>,
}

async fn ping_redis(url: &str) -> bool {
    let Ok(client) = redis::Client::open(url) else {
        return false;
    };
    let Ok(mut conn) = client.get_multiplexed_tokio_connection().await else {
        return false;
    };
    redis::cmd("PING").query_async::<String>(&mut conn).await.is_ok()
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = !state.engine.pool.is_closed() && sqlx::query("SELECT 1").execute(&state.engine.pool).await.is_ok();
    let redis = match &state.redis_url {
        Some(url) => Some(ping_redis(url).await),
        None => None,
    };
    let healthy = database && redis != Some(false);
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(HealthResponse { database, redis }))
}
