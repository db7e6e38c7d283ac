use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::upstream::GiphyClient;

/// Axum application state shared by every handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub upstream: Arc<GiphyClient>,
    pub start_time: Instant,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        let upstream = Arc::new(GiphyClient::new(&config));
        Self { config: Arc::new(config), upstream, start_time: Instant::now() }
    }
}

/// Router knobs that come from the command line rather than the config file.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Static front-end directory; unknown paths fall back to its `index.html`.
    pub dist: Option<PathBuf>,
    /// Allow any origin (development only).
    pub permissive_cors: bool,
}
