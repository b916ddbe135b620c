//! Environment configuration, read once at process startup.

use std::env;

use quipflip_core::Config;

pub struct AppConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub secret_key: String,
    pub bind_addr: String,
    pub dictionary_path: String,
    pub prompts_path: String,
    pub game: Config,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(AppConfig {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            redis_url: env::var("REDIS_URL").ok(),
            secret_key: env::var("SECRET_KEY")
                .map_err(|_| anyhow::anyhow!("SECRET_KEY must be set"))?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            dictionary_path: env_or("DICTIONARY_PATH", "data/dictionary.txt"),
            prompts_path: env_or("PROMPTS_PATH", "data/prompts.txt"),
            game: Config::default(),
        })
    }
}
