use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use gifscope_core::types::{Rating, MAX_PAGE_SIZE};
use gifscope_core::Error;

use crate::types::AppContext;
use crate::upstream::Endpoint;

pub type ApiError = (StatusCode, Json<Value>);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message })))
}

/// Every upstream failure is a 500 to our callers; the message says which kind.
fn upstream_failure(err: Error) -> ApiError {
    let message = match err {
        Error::UpstreamUnavailable { message, .. } => message,
        other => {
            warn!(error = %other, "Unexpected proxy error");
            "Internal server error".to_string()
        }
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": message })))
}

/// Paging parameters after defaults and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub offset: u32,
    pub limit: u32,
    pub rating: Rating,
}

impl PageParams {
    /// `limit` is clamped into `1..=50`; anything unparseable is a 400.
    pub fn parse(
        offset: Option<&str>,
        limit: Option<&str>,
        rating: Option<&str>,
        default_limit: u32,
    ) -> Result<Self, ApiError> {
        let offset = match offset.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| bad_request(format!("Invalid offset '{raw}': expected a non-negative integer")))?,
            None => 0,
        };
        let limit = match limit.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| bad_request(format!("Invalid limit '{raw}': expected an integer")))?
                .clamp(1, MAX_PAGE_SIZE as i64) as u32,
            None => default_limit,
        };
        let rating = match rating.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse::<Rating>().map_err(bad_request)?,
            None => Rating::G,
        };
        Ok(Self { offset, limit, rating })
    }

    fn into_pairs(self) -> Vec<(&'static str, String)> {
        vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
            ("rating", self.rating.to_string()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    offset: Option<String>,
    limit: Option<String>,
    rating: Option<String>,
    lang: Option<String>,
}

pub async fn api_search(
    State(ctx): State<AppContext>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = PageParams::parse(
        q.offset.as_deref(),
        q.limit.as_deref(),
        q.rating.as_deref(),
        ctx.config.default_limit,
    )?;
    let lang = q.lang.filter(|l| !l.trim().is_empty()).unwrap_or_else(|| ctx.config.lang.clone());

    let mut params = vec![("q", q.q.unwrap_or_default())];
    params.extend(page.into_pairs());
    params.push(("lang", lang));

    ctx.upstream.fetch(Endpoint::Search, &params).await.map(Json).map_err(upstream_failure)
}

// ---------------------------------------------------------------------------
// Trending
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    offset: Option<String>,
    limit: Option<String>,
    rating: Option<String>,
}

pub async fn api_trending(
    State(ctx): State<AppContext>,
    Query(q): Query<TrendingQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = PageParams::parse(
        q.offset.as_deref(),
        q.limit.as_deref(),
        q.rating.as_deref(),
        ctx.config.default_limit,
    )?;

    ctx.upstream
        .fetch(Endpoint::Trending, &page.into_pairs())
        .await
        .map(Json)
        .map_err(upstream_failure)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn api_health(State(ctx): State<AppContext>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": ctx.start_time.elapsed().as_secs(),
    }))
}
