//! Server configuration: environment first, then an optional `gifscope.toml`, then defaults.

use std::fmt;
use std::path::Path;

use tracing::debug;

use gifscope_core::config::warn_unknown_keys;
use gifscope_core::types::{DEFAULT_LANG, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use gifscope_core::{Error, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_UPSTREAM: &str = "https://api.giphy.com";

/// Environment variable holding the upstream credential.
pub const API_KEY_VAR: &str = "GIPHY_API_KEY";

/// Known keys in `gifscope.toml`.
const KNOWN_SERVER_KEYS: &[&str] = &["upstream_url", "default_limit", "lang", "port"];

#[derive(Clone)]
pub struct ServerConfig {
    api_key: String,
    pub upstream_url: String,
    pub default_limit: u32,
    pub lang: String,
    pub port: u16,
}

// Hand-written so the key can't leak through `{:?}`.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"[redacted]")
            .field("upstream_url", &self.upstream_url)
            .field("default_limit", &self.default_limit)
            .field("lang", &self.lang)
            .field("port", &self.port)
            .finish()
    }
}

impl ServerConfig {
    /// Defaults for everything but the credential and upstream.
    pub fn new(api_key: impl Into<String>, upstream_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            upstream_url: upstream_url.into().trim_end_matches('/').to_string(),
            default_limit: DEFAULT_PAGE_SIZE,
            lang: DEFAULT_LANG.to_string(),
            port: DEFAULT_PORT,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Read the process environment and, if given, the TOML file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                debug!(path = %p.display(), "Loading server config");
                let content = std::fs::read_to_string(p).map_err(|e| {
                    Error::Config(format!("could not read {}: {e}", p.display()))
                })?;
                Some((content, p.display().to_string()))
            }
            None => None,
        };
        Self::from_sources(
            |name| std::env::var(name).ok(),
            file.as_ref().map(|(content, source)| (content.as_str(), source.as_str())),
        )
    }

    /// `env` looks up a variable; `file` is `(content, source name)`.
    /// Environment wins over the file for `PORT` and `GIFSCOPE_UPSTREAM`.
    pub fn from_sources(
        env: impl Fn(&str) -> Option<String>,
        file: Option<(&str, &str)>,
    ) -> Result<Self> {
        let api_key = env(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(Error::ConfigMissing(API_KEY_VAR))?;

        let mut config = Self::new(api_key, DEFAULT_UPSTREAM);

        if let Some((content, source)) = file {
            config.merge_toml(content, source)?;
        }

        if let Some(url) = env("GIFSCOPE_UPSTREAM").filter(|u| !u.trim().is_empty()) {
            config.upstream_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(port) = env("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got '{port}'")))?;
        }

        if !config.upstream_url.starts_with("http://") && !config.upstream_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "upstream_url must be an http(s) URL, got '{}'",
                config.upstream_url
            )));
        }
        Ok(config)
    }

    fn merge_toml(&mut self, content: &str, source: &str) -> Result<()> {
        let table: toml::Table =
            content.parse().map_err(|e| Error::Config(format!("could not parse {source}: {e}")))?;

        warn_unknown_keys(&table, KNOWN_SERVER_KEYS, source);

        if let Some(url) = table.get("upstream_url").and_then(|v| v.as_str()) {
            self.upstream_url = url.trim_end_matches('/').to_string();
        }
        if let Some(limit) = table.get("default_limit").and_then(|v| v.as_integer()) {
            if !(1..=MAX_PAGE_SIZE as i64).contains(&limit) {
                return Err(Error::Config(format!(
                    "default_limit in {source} must be between 1 and {MAX_PAGE_SIZE}, got {limit}"
                )));
            }
            self.default_limit = limit as u32;
        }
        if let Some(lang) = table.get("lang").and_then(|v| v.as_str()) {
            self.lang = lang.to_string();
        }
        if let Some(port) = table.get("port").and_then(|v| v.as_integer()) {
            self.port = u16::try_from(port)
                .map_err(|_| Error::Config(format!("port in {source} is out of range: {port}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let err = ServerConfig::from_sources(env(&[]), None).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing("GIPHY_API_KEY")));

        let err = ServerConfig::from_sources(env(&[("GIPHY_API_KEY", "  ")]), None).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
    }

    #[test]
    fn test_defaults() {
        let c = ServerConfig::from_sources(env(&[("GIPHY_API_KEY", "k")]), None).unwrap();
        assert_eq!(c.api_key(), "k");
        assert_eq!(c.upstream_url, DEFAULT_UPSTREAM);
        assert_eq!(c.port, 5000);
        assert_eq!(c.default_limit, 20);
        assert_eq!(c.lang, "en");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = "upstream_url = \"http://file.example/\"\nport = 7000\ndefault_limit = 10\nlang = \"fr\"\n";
        let c = ServerConfig::from_sources(
            env(&[("GIPHY_API_KEY", "k"), ("PORT", "8080")]),
            Some((file, "gifscope.toml")),
        )
        .unwrap();
        assert_eq!(c.upstream_url, "http://file.example");
        assert_eq!(c.port, 8080);
        assert_eq!(c.default_limit, 10);
        assert_eq!(c.lang, "fr");

        let c = ServerConfig::from_sources(
            env(&[("GIPHY_API_KEY", "k"), ("GIFSCOPE_UPSTREAM", "http://env.example")]),
            Some((file, "gifscope.toml")),
        )
        .unwrap();
        assert_eq!(c.upstream_url, "http://env.example");
        assert_eq!(c.port, 7000);
    }

    #[test]
    fn test_invalid_values() {
        let base = [("GIPHY_API_KEY", "k")];
        assert!(ServerConfig::from_sources(env(&base), Some(("default_limit = 0", "t"))).is_err());
        assert!(ServerConfig::from_sources(env(&base), Some(("port = 70000", "t"))).is_err());
        assert!(ServerConfig::from_sources(env(&base), Some(("upstream_url = \"ftp://x\"", "t"))).is_err());
        assert!(ServerConfig::from_sources(env(&[("GIPHY_API_KEY", "k"), ("PORT", "abc")]), None).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let c = ServerConfig::new("super-secret", DEFAULT_UPSTREAM);
        let shown = format!("{c:?}");
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("[redacted]"));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ServerConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(missing, Error::Config(_)));
    }
}
