//! One-line request log for `/api` routes.

use std::time::{Duration, Instant};

use axum::{extract::Request, http::Method, http::StatusCode, middleware::Next, response::Response};
use tracing::info;

/// Longest line the request log emits.
pub const MAX_LOG_LINE: usize = 80;

/// `GET /api/gifs 200 in 12ms`, cut to [`MAX_LOG_LINE`] characters.
pub fn format_log_line(method: &Method, path: &str, status: StatusCode, elapsed: Duration) -> String {
    let line = format!("{method} {path} {} in {}ms", status.as_u16(), elapsed.as_millis());
    if line.chars().count() <= MAX_LOG_LINE {
        return line;
    }
    let mut cut: String = line.chars().take(MAX_LOG_LINE - 1).collect();
    cut.push('…');
    cut
}

/// Middleware: times `/api` requests and logs one line each. Query strings are left out.
pub async fn log_api_requests(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !path.starts_with("/api") {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let start = Instant::now();
    let response = next.run(request).await;
    info!("{}", format_log_line(&method, &path, response.status(), start.elapsed()));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_line_is_unchanged() {
        let line = format_log_line(&Method::GET, "/api/gifs", StatusCode::OK, Duration::from_millis(12));
        assert_eq!(line, "GET /api/gifs 200 in 12ms");
    }

    #[test]
    fn test_long_line_is_truncated() {
        let path = format!("/api/{}", "x".repeat(200));
        let line = format_log_line(&Method::GET, &path, StatusCode::OK, Duration::from_millis(1));
        assert_eq!(line.chars().count(), MAX_LOG_LINE);
        assert!(line.ends_with('…'));
    }
}
