//! Client configuration from `.gifscope.toml`, plus the key-validation helpers the
//! server config reuses.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{Rating, DEFAULT_LANG, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// ---------------------------------------------------------------------------
// Cross-platform path helpers
// ---------------------------------------------------------------------------

/// Platform-aware home directory: `HOME` on Unix, `USERPROFILE` on Windows.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).ok().map(PathBuf::from)
}

/// `$XDG_CONFIG_HOME/gifscope` or `~/.config/gifscope` on Unix, `%APPDATA%/gifscope` on Windows.
pub fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        std::env::var("APPDATA").ok().map(|a| PathBuf::from(a).join("gifscope"))
    } else {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|h| h.join(".config")))
            .map(|c| c.join("gifscope"))
    }
}

// ---------------------------------------------------------------------------
// Key validation
// ---------------------------------------------------------------------------

/// Simple Levenshtein edit distance for typo suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest known key within edit distance 3.
pub fn suggest_key<'a>(key: &str, known: &[&'a str]) -> Option<&'a str> {
    let best = known.iter().min_by_key(|k| edit_distance(key, k))?;
    (edit_distance(key, best) <= 3).then_some(*best)
}

/// Warn about every key in `table` that isn't in `known`.
pub fn warn_unknown_keys(table: &toml::Table, known: &[&str], source: &str) {
    for key in table.keys() {
        if known.contains(&key.as_str()) {
            continue;
        }
        match suggest_key(key, known) {
            Some(suggestion) => warn!(
                key = key.as_str(),
                suggestion,
                "Unknown key in {source} — did you mean '{suggestion}'?"
            ),
            None => warn!(
                key = key.as_str(),
                "Unknown key in {source} (known keys: {})",
                known.join(", ")
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Client config
// ---------------------------------------------------------------------------

/// Known keys in `.gifscope.toml`.
const KNOWN_CLIENT_KEYS: &[&str] =
    &["server_url", "page_size", "rating", "lang", "debounce_ms", "download_dir"];

pub const CLIENT_CONFIG_FILE: &str = ".gifscope.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_url: String,
    pub page_size: u32,
    pub rating: Rating,
    pub lang: String,
    pub debounce_ms: u64,
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            rating: Rating::G,
            lang: DEFAULT_LANG.to_string(),
            debounce_ms: 500,
            download_dir: home_dir().map(|h| h.join("Downloads")).unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

impl ClientConfig {
    /// Overlay values from TOML `content`. `source` names the file in messages.
    pub fn merge_toml(&mut self, content: &str, source: &str) -> Result<()> {
        let table: toml::Table =
            content.parse().map_err(|e| Error::Config(format!("could not parse {source}: {e}")))?;

        warn_unknown_keys(&table, KNOWN_CLIENT_KEYS, source);

        if let Some(url) = table.get("server_url").and_then(|v| v.as_str()) {
            self.server_url = url.trim_end_matches('/').to_string();
        }
        if let Some(size) = table.get("page_size").and_then(|v| v.as_integer()) {
            if !(1..=MAX_PAGE_SIZE as i64).contains(&size) {
                return Err(Error::Config(format!(
                    "page_size in {source} must be between 1 and {MAX_PAGE_SIZE}, got {size}"
                )));
            }
            self.page_size = size as u32;
        }
        if let Some(rating) = table.get("rating").and_then(|v| v.as_str()) {
            self.rating = rating.parse().map_err(|e| Error::Config(format!("{source}: {e}")))?;
        }
        if let Some(lang) = table.get("lang").and_then(|v| v.as_str()) {
            self.lang = lang.to_string();
        }
        if let Some(ms) = table.get("debounce_ms").and_then(|v| v.as_integer()) {
            self.debounce_ms = ms.max(0) as u64;
        }
        if let Some(dir) = table.get("download_dir").and_then(|v| v.as_str()) {
            self.download_dir = expand_home(dir);
        }
        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Load `.gifscope.toml` from `cwd`, falling back to `<config_dir>/config.toml`.
/// No file at all means defaults.
pub fn load_client_config(cwd: &Path) -> Result<ClientConfig> {
    let mut config = ClientConfig::default();

    let candidates = [
        Some(cwd.join(CLIENT_CONFIG_FILE)),
        config_dir().map(|d| d.join("config.toml")),
    ];
    let Some(path) = candidates.into_iter().flatten().find(|p| p.is_file()) else {
        return Ok(config);
    };

    debug!(path = %path.display(), "Loading client config");
    let content = std::fs::read_to_string(&path)?;
    config.merge_toml(&content, &path.display().to_string())?;
    Ok(config)
}
