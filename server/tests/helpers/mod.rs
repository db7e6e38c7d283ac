//! Test harness for proxy integration tests.
//!
//! Spins up a fake Giphy upstream and the real proxy router on ephemeral ports,
//! then talks to the proxy over HTTP with reqwest.

pub mod fixtures;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use gifscope_server::build_router;
use gifscope_server::config::ServerConfig;
use gifscope_server::types::{AppContext, RouterOptions};

pub const TEST_API_KEY: &str = "test-key-123";

/// One request the fake upstream received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub params: HashMap<String, String>,
}

/// How the fake upstream answers.
#[derive(Debug, Clone, Copy)]
pub enum Upstream {
    /// Serve pages out of a result set this long.
    Healthy { total: u32 },
    /// Answer every request with this status.
    Failing(u16),
    /// Nothing listening.
    Unreachable,
}

#[derive(Clone)]
struct FakeState {
    behavior: Upstream,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

async fn fake_search(State(s): State<FakeState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let prefix = params.get("q").cloned().unwrap_or_default();
    fake_respond(&s, "/v1/gifs/search", &prefix, params)
}

async fn fake_trending(State(s): State<FakeState>, Query(params): Query<HashMap<String, String>>) -> Response {
    fake_respond(&s, "/v1/gifs/trending", "trend", params)
}

fn fake_respond(s: &FakeState, path: &str, prefix: &str, params: HashMap<String, String>) -> Response {
    let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(25);
    s.calls.lock().unwrap().push(RecordedCall { path: path.to_string(), params });

    match s.behavior {
        Upstream::Healthy { total } => Json(fixtures::page_json(prefix, offset, limit, total)).into_response(),
        Upstream::Failing(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, "upstream exploded").into_response()
        }
        Upstream::Unreachable => unreachable!("unreachable upstream is never served"),
    }
}

/// Serve `app` on 127.0.0.1 with an OS-assigned port. Returns the base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

/// A URL with nothing behind it.
async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("no local addr");
    drop(listener);
    format!("http://{addr}")
}

pub struct TestHarness {
    pub base_url: String,
    pub http: reqwest::Client,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl TestHarness {
    /// Healthy upstream with a 12-item result set.
    pub async fn start() -> Self {
        Self::start_with(Upstream::Healthy { total: 12 }, RouterOptions::default()).await
    }

    pub async fn start_with(behavior: Upstream, options: RouterOptions) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let upstream_url = match behavior {
            Upstream::Unreachable => dead_url().await,
            _ => {
                let fake = Router::new()
                    .route("/v1/gifs/search", get(fake_search))
                    .route("/v1/gifs/trending", get(fake_trending))
                    .with_state(FakeState { behavior, calls: Arc::clone(&calls) });
                serve(fake).await
            }
        };

        let config = ServerConfig::new(TEST_API_KEY, upstream_url);
        let base_url = serve(build_router(AppContext::new(config), &options)).await;

        TestHarness { base_url, http: reqwest::Client::new(), calls }
    }

    /// GET `path_and_query` on the proxy. Returns the status and the JSON body
    /// (`Null` if the body isn't JSON).
    pub async fn get(&self, path_and_query: &str) -> (u16, Value) {
        let resp = self
            .http
            .get(format!("{}{path_and_query}", self.base_url))
            .send()
            .await
            .expect("proxy request failed");
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Requests the fake upstream has seen so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}
