//! gifscope binary — thin CLI shell over the [`gifscope_server`] library crate.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use gifscope_server::build_router;
use gifscope_server::config::ServerConfig;
use gifscope_server::types::{AppContext, RouterOptions};

// ---------------------------------------------------------------------------
// CLI definition (clap derive)
// ---------------------------------------------------------------------------

/// GIF search proxy — keeps the Giphy API key server-side.
#[derive(Parser)]
#[command(name = "gifscope", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Load settings from a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT and the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Bind to 0.0.0.0 instead of 127.0.0.1 (localhost)
    #[arg(long)]
    bind_all: bool,

    /// Development mode: allow cross-origin requests from any origin
    #[arg(long)]
    dev: bool,

    /// Path to a static front-end directory to serve for non-API routes
    #[arg(long)]
    dist: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Graceful shutdown signal
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gifscope=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "gifscope", &mut std::io::stdout());
        return;
    }

    let mut config = ServerConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        error!(error = %e, "Could not load configuration");
        if matches!(e, gifscope_core::Error::ConfigMissing(_)) {
            eprintln!("  Set GIPHY_API_KEY to your Giphy API key and try again.");
        }
        std::process::exit(1);
    });
    if let Some(port) = cli.port {
        config.port = port;
    }
    info!(upstream = config.upstream_url.as_str(), lang = config.lang.as_str(), "Proxy configured");

    // Bind address: 127.0.0.1 by default, --bind-all for 0.0.0.0
    let bind_addr = if cli.bind_all { "0.0.0.0" } else { "127.0.0.1" };
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("{bind_addr}:{port}")).await.unwrap_or_else(|e| {
        error!(port = port, error = %e, "Could not bind to port");
        eprintln!("  Try: PORT=<port> gifscope");
        std::process::exit(1);
    });

    let options = RouterOptions { dist: cli.dist, permissive_cors: cli.dev };
    if let Some(dist) = &options.dist {
        info!(dist = %dist.display(), "Serving static files");
    }
    if options.permissive_cors {
        info!("Development mode: CORS allows any origin");
    }

    let app = build_router(AppContext::new(config), &options);

    info!(port = port, "http://{bind_addr}:{port}");
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
