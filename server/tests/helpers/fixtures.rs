//! Canned upstream payloads for integration tests.

use serde_json::{json, Value};

/// One page of a result set `total` items long, shaped like the Giphy response.
/// Carries an extra `meta` block so tests can check it is relayed untouched.
pub fn page_json(prefix: &str, offset: u32, limit: u32, total: u32) -> Value {
    let end = (offset + limit).min(total);
    let data: Vec<Value> = (offset.min(end)..end)
        .map(|i| {
            json!({
                "id": format!("{prefix}{i}"),
                "title": format!("{prefix} gif {i}"),
                "type": "gif",
                "images": {
                    "original": {
                        "url": format!("https://media.test/{prefix}{i}/giphy.gif"),
                        "width": "480",
                        "height": "270"
                    },
                    "fixed_height": {
                        "url": format!("https://media.test/{prefix}{i}/200.gif"),
                        "width": "356",
                        "height": "200"
                    }
                }
            })
        })
        .collect();

    json!({
        "data": data,
        "pagination": {
            "offset": offset,
            "count": end.saturating_sub(offset),
            "total_count": total
        },
        "meta": { "status": 200, "msg": "OK", "response_id": "fixture" }
    })
}
