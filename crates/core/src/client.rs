//! HTTP client for the gifscope proxy, plus raw media downloads.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Error, Result};
use crate::query::{PageRequest, PageSource};
use crate::types::{ErrorBody, Page, QueryMode, Rating, DEFAULT_LANG};

/// Fetches the bytes behind a media URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>>;
}

/// Talks to `/api/gifs` and `/api/gifs/trending` on a running proxy.
#[derive(Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
    lang: String,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url, lang: DEFAULT_LANG.to_string() }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn search(&self, query: &str, offset: u32, limit: u32, rating: Rating) -> Result<Page> {
        let url = format!("{}/api/gifs", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
            ("rating", rating.to_string()),
            ("lang", self.lang.clone()),
        ];
        self.get_page(&url, &params).await
    }

    pub async fn trending(&self, offset: u32, limit: u32, rating: Rating) -> Result<Page> {
        let url = format!("{}/api/gifs/trending", self.base_url);
        let params = [
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
            ("rating", rating.to_string()),
        ];
        self.get_page(&url, &params).await
    }

    async fn get_page(&self, url: &str, params: &[(&str, String)]) -> Result<Page> {
        debug!(url, ?params, "Requesting page");
        let response = self.http.get(url).query(params).send().await.map_err(|e| {
            Error::upstream(500, format!("Could not reach gifscope server at {}: {e}", self.base_url))
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| format!("Request failed with status {}", status.as_u16()));
            return Err(Error::upstream(status.as_u16(), message));
        }

        response.json::<Page>().await.map_err(|e| {
            Error::upstream(StatusCode::BAD_GATEWAY.as_u16(), format!("Malformed page from server: {e}"))
        })
    }
}

#[async_trait]
impl PageSource for ProxyClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let key = &request.key;
        match key.mode {
            QueryMode::Search => self.search(&key.text, request.offset, request.limit, key.rating).await,
            QueryMode::Trending => self.trending(request.offset, request.limit, key.rating).await,
        }
    }
}

#[async_trait]
impl MediaFetcher for ProxyClient {
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "Fetching media");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::FetchAborted(e.to_string()))?;
        let bytes = response.bytes().await.map_err(|e| Error::FetchAborted(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
