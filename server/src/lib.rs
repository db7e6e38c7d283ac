//! gifscope server — GIF search proxy.
//!
//! Fronts the Giphy search and trending endpoints so the API key never leaves the
//! server, and optionally serves a static front end.
//!
//! # Modules
//!
//! - [`api`] — `/api/gifs`, `/api/gifs/trending`, and `/health` handlers
//! - [`config`] — Environment + `gifscope.toml` configuration
//! - [`upstream`] — Outbound Giphy client (key attached, logs redacted)
//! - [`logging`] — `/api` request log middleware
//! - [`types`] — Shared application state

pub mod api;
pub mod config;
pub mod logging;
pub mod types;
pub mod upstream;

use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::warn;

use api::{api_health, api_search, api_trending};
use types::{AppContext, RouterOptions};

/// Build the full application router.
pub fn build_router(ctx: AppContext, options: &RouterOptions) -> Router {
    let mut router = Router::new()
        .route("/health", get(api_health))
        .route("/api/gifs", get(api_search))
        .route("/api/gifs/trending", get(api_trending));

    if let Some(dist) = &options.dist {
        let index_html = dist.join("index.html");
        if !index_html.exists() {
            warn!(dist = %dist.display(), "No index.html in dist directory");
        }
        router = router.fallback_service(ServeDir::new(dist).fallback(ServeFile::new(index_html)));
    }

    let router = router
        .layer(axum::middleware::from_fn(logging::log_api_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    let router = if options.permissive_cors { router.layer(CorsLayer::permissive()) } else { router };

    router.with_state(ctx)
}
