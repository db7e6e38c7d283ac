//! Outbound calls to the Giphy API.
//!
//! The credential is attached here and nowhere else. Logged URLs carry a
//! placeholder in its place.

use std::time::Duration;

use reqwest::Url;
use tracing::{debug, error};

use gifscope_core::{Error, Result};

use crate::config::ServerConfig;

const REDACTED: &str = "[redacted]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    Trending,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Search => "/v1/gifs/search",
            Endpoint::Trending => "/v1/gifs/trending",
        }
    }
}

/// Sent on every upstream request so the provider can identify the proxy.
pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (+",
    env!("CARGO_PKG_REPOSITORY"),
    ")"
);

pub struct GiphyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GiphyClient {
    pub fn new(config: &ServerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { http, base_url: config.upstream_url.clone(), api_key: config.api_key().to_string() }
    }

    fn url(&self, endpoint: Endpoint, key: &str, params: &[(&str, String)]) -> Result<Url> {
        let base = format!("{}{}", self.base_url, endpoint.path());
        let pairs = std::iter::once(("api_key", key)).chain(params.iter().map(|(k, v)| (*k, v.as_str())));
        Url::parse_with_params(&base, pairs).map_err(|e| {
            error!(base = base.as_str(), error = %e, "Invalid upstream URL");
            Error::upstream_unreachable()
        })
    }

    /// One GET against `endpoint`. Returns the decoded JSON body untouched.
    pub async fn fetch(&self, endpoint: Endpoint, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = self.url(endpoint, &self.api_key, params)?;
        if let Ok(shown) = self.url(endpoint, REDACTED, params) {
            debug!(url = shown.as_str(), "Fetching from upstream");
        }

        let response = self.http.get(url).send().await.map_err(|e| {
            error!(endpoint = endpoint.path(), error = %without_url(&e), "Upstream unreachable");
            Error::upstream_unreachable()
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = body.as_str(), "Giphy API error");
            return Err(Error::upstream(status.as_u16(), format!("Giphy API error: {}", status.as_u16())));
        }

        response.json::<serde_json::Value>().await.map_err(|e| {
            error!(endpoint = endpoint.path(), error = %without_url(&e), "Undecodable upstream body");
            Error::upstream_unreachable()
        })
    }
}

/// reqwest errors embed the request URL, key included.
fn without_url(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(url) = e.url() {
        msg = msg.replace(url.as_str(), "<upstream>");
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GiphyClient {
        GiphyClient::new(&ServerConfig::new("secret-key", "http://upstream.test/"))
    }

    #[test]
    fn test_user_agent_names_package_and_repository() {
        assert!(USER_AGENT.starts_with(&format!("gifscope-server/{}", env!("CARGO_PKG_VERSION"))));
        assert!(USER_AGENT.contains("https://github.com/gifscope/gifscope"));
        assert!(!env!("CARGO_PKG_AUTHORS").is_empty());
        assert!(!env!("CARGO_PKG_HOMEPAGE").is_empty());
    }

    #[test]
    fn test_url_carries_key_and_params() {
        let url = client()
            .url(Endpoint::Search, "secret-key", &[("q", "cat & dog".into()), ("offset", "5".into())])
            .unwrap();
        assert_eq!(url.path(), "/v1/gifs/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("api_key".into(), "secret-key".into()));
        assert_eq!(pairs[1], ("q".into(), "cat & dog".into()));
        assert_eq!(pairs[2], ("offset".into(), "5".into()));
    }

    #[test]
    fn test_redacted_url_hides_key() {
        let url = client().url(Endpoint::Trending, REDACTED, &[]).unwrap();
        assert!(!url.as_str().contains("secret-key"));
        assert!(url.as_str().starts_with("http://upstream.test/v1/gifs/trending?api_key="));
    }
}
