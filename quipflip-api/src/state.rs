use std::sync::Arc;

use quipflip_engine::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub secret: Arc<str>,
    pub redis_url: Option<Arc<str>>,
}
