//! gifscope CLI — search and trending GIFs from the terminal.
//!
//! Talks to a running `gifscope` proxy; never sees the upstream API key.

mod browse;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use gifscope_core::client::ProxyClient;
use gifscope_core::clipboard::{copy_item, CopyOutcome, SystemClipboard};
use gifscope_core::config::{load_client_config, ClientConfig};
use gifscope_core::download::save_original;
use gifscope_core::presenter::GridView;
use gifscope_core::query::{load_pages, QueryController};
use gifscope_core::types::{MediaItem, QueryKey, Rating, MAX_PAGE_SIZE};

/// gifscope CLI — search and trending GIFs from the terminal.
#[derive(Parser)]
#[command(name = "gif", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Proxy base URL (default from config, then http://127.0.0.1:5000)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Content rating filter: g, pg, pg-13, r
    #[arg(long, global = true)]
    rating: Option<Rating>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for GIFs
    Search {
        /// Search query
        query: String,

        /// Number of pages to fetch
        #[arg(long, default_value = "1")]
        pages: usize,

        /// Results per page (1-50)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show trending GIFs
    Trending {
        /// Number of pages to fetch
        #[arg(long, default_value = "1")]
        pages: usize,

        /// Results per page (1-50)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Copy one search result to the clipboard
    Copy {
        /// Search query
        query: String,

        /// Result index, as shown by `gif search`
        index: usize,
    },
    /// Download one search result's original
    Save {
        /// Search query
        query: String,

        /// Result index, as shown by `gif search`
        index: usize,

        /// Target directory (default from config, then ~/Downloads)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Interactive browser
    Browse,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

/// Terminal width from `COLUMNS`, default 100.
fn term_width() -> usize {
    std::env::var("COLUMNS").ok().and_then(|c| c.parse().ok()).unwrap_or(100)
}

/// Run `key` for up to `pages` pages.
async fn fetch(client: &ProxyClient, key: QueryKey, page_size: u32, pages: usize) -> QueryController {
    let mut controller = QueryController::new(page_size);
    let first = controller.set_key(key);
    load_pages(&mut controller, client, first, pages).await;
    controller
}

/// Fetch enough pages of `query` to reach result `index`.
async fn find_item(client: &ProxyClient, config: &ClientConfig, query: &str, index: usize) -> MediaItem {
    let pages = index / config.page_size as usize + 1;
    let controller = fetch(client, QueryKey::search(query, config.rating), config.page_size, pages).await;
    if let Some(err) = controller.error() {
        fail(format!("Error: {err}"));
    }
    match controller.item(index) {
        Some(item) => item.clone(),
        None => fail(format!("No result #{index} for '{query}' ({} results)", controller.len())),
    }
}

fn print_results(controller: &QueryController, query: &str, json: bool) {
    if json {
        let items: Vec<&MediaItem> = controller.items().collect();
        let output = serde_json::json!({
            "key": controller.key().to_string(),
            "items": items,
            "has_next_page": controller.has_next_page(),
            "error": controller.error(),
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    } else {
        let view = GridView::build(&controller.snapshot(), query);
        print!("{}", view.render_text(term_width()));
        eprintln!("\n{} results", controller.len());
    }
    if controller.is_error() {
        std::process::exit(1);
    }
}

fn page_size(config: &ClientConfig, limit: Option<u32>) -> u32 {
    limit.map(|l| l.clamp(1, MAX_PAGE_SIZE)).unwrap_or(config.page_size)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gifscope=warn".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "gif", &mut std::io::stdout());
        return;
    }

    let cwd = std::env::current_dir().unwrap_or_else(|e| fail(format!("Could not determine current directory: {e}")));
    let mut config = load_client_config(&cwd).unwrap_or_else(|e| fail(format!("Error: {e}")));
    if let Some(server) = cli.server {
        config.server_url = server.trim_end_matches('/').to_string();
    }
    if let Some(rating) = cli.rating {
        config.rating = rating;
    }

    debug!(server = config.server_url.as_str(), rating = %config.rating, page_size = config.page_size, "Client configured");

    let client = ProxyClient::new(config.server_url.clone()).with_lang(config.lang.clone());

    match cli.command {
        Commands::Search { query, pages, limit } => {
            let size = page_size(&config, limit);
            let controller = fetch(&client, QueryKey::search(&query, config.rating), size, pages.max(1)).await;
            print_results(&controller, &query, cli.json);
        }
        Commands::Trending { pages, limit } => {
            let size = page_size(&config, limit);
            let controller = fetch(&client, QueryKey::trending(config.rating), size, pages.max(1)).await;
            print_results(&controller, "", cli.json);
        }
        Commands::Copy { query, index } => {
            let item = find_item(&client, &config, &query, index).await;
            let mut clipboard = SystemClipboard::open();
            let outcome = copy_item(&client, &mut clipboard, &item).await;
            if cli.json {
                let output = serde_json::json!({
                    "id": item.id,
                    "url": item.original_url(),
                    "outcome": match &outcome {
                        CopyOutcome::ImageCopied => "image",
                        CopyOutcome::UrlCopied => "url",
                        CopyOutcome::Failed { .. } => "failed",
                    },
                });
                println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            } else {
                println!("{}", outcome.notification().message);
            }
            if let CopyOutcome::Failed { reason } = outcome {
                fail(format!("  {reason}"));
            }
        }
        Commands::Save { query, index, dir } => {
            let item = find_item(&client, &config, &query, index).await;
            let dir = dir.unwrap_or_else(|| config.download_dir.clone());
            match save_original(&client, &item, &dir).await {
                Ok(path) if cli.json => {
                    println!("{}", serde_json::json!({ "id": item.id, "path": path.display().to_string() }));
                }
                Ok(path) => println!("Saved {}", path.display()),
                Err(e) => fail(format!("Download failed: {e}")),
            }
        }
        Commands::Browse => {
            if let Err(e) = browse::run(&config, client).await {
                fail(format!("Error: {e}"));
            }
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    }
}
