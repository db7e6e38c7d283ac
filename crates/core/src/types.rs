//! Data model shared by the proxy and the browser: media items and their renditions,
//! pages with pagination cursors, content ratings, and query identity.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Page size used when neither config nor caller asks for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page the upstream will hand out in one call.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Language sent upstream when none is configured.
pub const DEFAULT_LANG: &str = "en";

// ---------------------------------------------------------------------------
// Rating filter
// ---------------------------------------------------------------------------

/// Content-suitability tier constraining results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rating {
    #[default]
    #[serde(rename = "g")]
    G,
    #[serde(rename = "pg")]
    Pg,
    #[serde(rename = "pg-13")]
    Pg13,
    #[serde(rename = "r")]
    R,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::G, Rating::Pg, Rating::Pg13, Rating::R];

    /// Wire name, as the upstream expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::G => "g",
            Rating::Pg => "pg",
            Rating::Pg13 => "pg-13",
            Rating::R => "r",
        }
    }

    /// Label shown in the filter control.
    pub fn label(&self) -> &'static str {
        match self {
            Rating::G => "G",
            Rating::Pg => "PG",
            Rating::Pg13 => "PG-13",
            Rating::R => "R",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Rating::ALL.into_iter().find(|r| r.as_str() == lower).ok_or_else(|| {
            format!("unknown rating '{}' (expected one of g, pg, pg-13, r)", s.trim())
        })
    }
}

// ---------------------------------------------------------------------------
// Query mode + identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Search,
    Trending,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Search => f.write_str("search"),
            QueryMode::Trending => f.write_str("trending"),
        }
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(QueryMode::Search),
            "trending" => Ok(QueryMode::Trending),
            other => Err(format!("unknown mode '{other}' (expected search or trending)")),
        }
    }
}

/// Identity of a result set. Two keys that compare equal share one accumulated
/// result set; any difference discards it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryKey {
    pub mode: QueryMode,
    /// Trimmed query text. Always empty for trending.
    pub text: String,
    pub rating: Rating,
}

impl QueryKey {
    pub fn search(text: &str, rating: Rating) -> Self {
        Self { mode: QueryMode::Search, text: text.trim().to_string(), rating }
    }

    pub fn trending(rating: Rating) -> Self {
        Self { mode: QueryMode::Trending, text: String::new(), rating }
    }

    /// Search with no text is disabled: nothing gets fetched for it.
    pub fn is_enabled(&self) -> bool {
        match self.mode {
            QueryMode::Search => !self.text.is_empty(),
            QueryMode::Trending => true,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            QueryMode::Search => write!(f, "search \"{}\" [{}]", self.text, self.rating),
            QueryMode::Trending => write!(f, "trending [{}]", self.rating),
        }
    }
}

// ---------------------------------------------------------------------------
// Media items
// ---------------------------------------------------------------------------

/// One encoded variant of a media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub url: String,
    #[serde(default, deserialize_with = "de_dimension")]
    pub width: u32,
    #[serde(default, deserialize_with = "de_dimension")]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renditions {
    pub original: Rendition,
    pub fixed_height: Rendition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub images: Renditions,
}

impl MediaItem {
    pub fn original_url(&self) -> &str {
        &self.images.original.url
    }

    pub fn thumbnail(&self) -> &Rendition {
        &self.images.fixed_height
    }
}

/// The upstream sends dimensions as decimal strings ("200"); accept numbers too.
fn de_dimension<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Dim {
        Num(u32),
        Text(String),
    }

    match Dim::deserialize(deserializer)? {
        Dim::Num(n) => Ok(n),
        Dim::Text(s) if s.trim().is_empty() => Ok(0),
        Dim::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Pagination cursor returned with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub total_count: u32,
}

impl Pagination {
    /// Offset one past the last item of this page.
    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.count)
    }

    /// Offset of the following page, if the result set continues.
    pub fn next_offset(&self) -> Option<u32> {
        (self.total_count > self.end()).then(|| self.end())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub data: Vec<MediaItem>,
    pub pagination: Pagination,
}

/// Body of every non-2xx proxy response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_parse_and_wire_names() {
        assert_eq!("PG-13".parse::<Rating>().unwrap(), Rating::Pg13);
        assert_eq!(" g ".parse::<Rating>().unwrap(), Rating::G);
        assert!("nc-17".parse::<Rating>().is_err());
        assert_eq!(serde_json::to_string(&Rating::Pg13).unwrap(), "\"pg-13\"");
        assert_eq!(Rating::default(), Rating::G);
    }

    #[test]
    fn test_media_item_accepts_string_dimensions() {
        let raw = r#"{
            "id": "abc123",
            "title": "Cat Typing",
            "type": "gif",
            "images": {
                "original": { "url": "https://media.example/abc123/giphy.gif", "width": "480", "height": "270", "size": "1024" },
                "fixed_height": { "url": "https://media.example/abc123/200.gif", "width": 356, "height": "200" }
            }
        }"#;
        let item: MediaItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.id, "abc123");
        assert_eq!(item.images.original.width, 480);
        assert_eq!(item.thumbnail().width, 356);
        assert_eq!(item.thumbnail().height, 200);
        assert_eq!(item.original_url(), "https://media.example/abc123/giphy.gif");
    }

    #[test]
    fn test_next_offset() {
        let p = Pagination { offset: 0, count: 5, total_count: 12 };
        assert_eq!(p.next_offset(), Some(5));
        let last = Pagination { offset: 10, count: 2, total_count: 12 };
        assert_eq!(last.next_offset(), None);
        let empty = Pagination::default();
        assert_eq!(empty.next_offset(), None);
    }

    #[test]
    fn test_query_key_identity() {
        assert_eq!(QueryKey::search(" cat ", Rating::G), QueryKey::search("cat", Rating::G));
        assert_ne!(QueryKey::search("cat", Rating::G), QueryKey::search("cat", Rating::Pg));
        assert!(!QueryKey::search("   ", Rating::G).is_enabled());
        assert!(QueryKey::trending(Rating::R).is_enabled());
    }
}
