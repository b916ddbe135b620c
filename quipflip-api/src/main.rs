mod config;
mod http;
mod state;

use std::sync::Arc;

use quipflip_core::prompts::WordListPromptSource;
use quipflip_core::similarity::TrigramCosineModel;
use quipflip_core::validator::WordSetDictionary;
use quipflip_engine::{Engine, Locks};

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    let pool = quipflip_db::connect(&cfg.database_url).await?;
    quipflip_db::migrate(&pool).await?;

    let dictionary_text = std::fs::read_to_string(&cfg.dictionary_path)?;
    let prompts_text = std::fs::read_to_string(&cfg.prompts_path)?;

    let engine = Arc::new(Engine {
        pool,
        config: cfg.game,
        locks: Locks::default(),
        dictionary: Box::new(WordSetDictionary::from_text(&dictionary_text)),
        similarity: Box::new(TrigramCosineModel),
        prompts: Box::new(WordListPromptSource::from_text(&prompts_text)),
    });

    let sweep_interval = engine.config.sweep_interval;
    quipflip_engine::sweeper::spawn(engine.clone(), sweep_interval);

    let state = AppState {
        engine,
        secret: Arc::from(cfg.secret_key.as_str()),
        redis_url: cfg.redis_url.as_deref().map(Arc::from),
    };

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "quipflip-api listening");
    axum::serve(listener, http::router(state)).await?;

    Ok(())
}
