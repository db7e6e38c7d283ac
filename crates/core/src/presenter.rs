//! Grid presenter — turns a query snapshot into what the results area shows.

use crate::query::QuerySnapshot;
use crate::types::MediaItem;

/// Placeholder tiles shown while the first page loads.
pub const PLACEHOLDER_TILES: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub thumb_url: String,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    fn from_item(index: usize, item: &MediaItem) -> Self {
        let thumb = item.thumbnail();
        Self {
            index,
            id: item.id.clone(),
            title: item.title.clone(),
            thumb_url: thumb.url.clone(),
            width: thumb.width,
            height: thumb.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridBody {
    Placeholders(usize),
    NoResults { query: String },
    /// Possibly empty: idle, or an error with nothing fetched.
    Tiles(Vec<Tile>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub body: GridBody,
    /// Error message to show above the grid.
    pub error: Option<String>,
    /// Whether the end-of-list sentinel should be armed.
    pub has_more: bool,
}

impl GridView {
    /// `query_text` is the committed (debounced) search text; empty in trending mode.
    pub fn build(snapshot: &QuerySnapshot, query_text: &str) -> Self {
        let error = snapshot.error.clone();
        let body = if snapshot.is_loading() {
            GridBody::Placeholders(PLACEHOLDER_TILES)
        } else if snapshot.items.is_empty() && !query_text.trim().is_empty() && error.is_none() {
            GridBody::NoResults { query: query_text.trim().to_string() }
        } else {
            GridBody::Tiles(
                snapshot.items.iter().enumerate().map(|(i, item)| Tile::from_item(i, item)).collect(),
            )
        };
        Self { body, error, has_more: snapshot.has_next_page && !snapshot.is_error() }
    }

    pub fn tiles(&self) -> &[Tile] {
        match &self.body {
            GridBody::Tiles(tiles) => tiles,
            _ => &[],
        }
    }

    /// Render for a terminal `width` columns wide.
    pub fn render_text(&self, width: usize) -> String {
        let mut out = String::new();
        if let Some(err) = &self.error {
            out.push_str(&format!("! {err}\n"));
        }

        let columns = columns_for_width(width as u32 * 8).max(1);
        let cell = (width / columns).max(12);

        match &self.body {
            GridBody::Placeholders(n) => {
                let cells: Vec<String> = (0..*n).map(|_| "░".repeat(cell - 2)).collect();
                push_rows(&mut out, &cells, columns, cell);
            }
            GridBody::NoResults { query } => {
                out.push_str(&format!("No GIFs found for \"{query}\"\n"));
            }
            GridBody::Tiles(tiles) => {
                let cells: Vec<String> = tiles
                    .iter()
                    .map(|t| {
                        let title = if t.title.trim().is_empty() { t.id.as_str() } else { t.title.as_str() };
                        truncate(&format!("{:>3} {}", t.index, title), cell - 2)
                    })
                    .collect();
                push_rows(&mut out, &cells, columns, cell);
                if self.has_more {
                    out.push_str("… more (:more)\n");
                }
            }
        }
        out
    }
}

fn push_rows(out: &mut String, cells: &[String], columns: usize, cell: usize) {
    for row in cells.chunks(columns) {
        let line: Vec<String> = row.iter().map(|c| format!("{c:<width$}", width = cell)).collect();
        out.push_str(line.join("").trim_end());
        out.push('\n');
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
    t.push('…');
    t
}

/// Tile columns for a viewport width in pixels: 1 below 640, 2 from 640, 3 from 768,
/// 4 from 1024.
pub fn columns_for_width(px: u32) -> usize {
    match px {
        0..=639 => 1,
        640..=767 => 2,
        768..=1023 => 3,
        _ => 4,
    }
}

/// How a tile was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Click / enter: copy to clipboard.
    Primary,
    /// Right-click: download the original.
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileAction {
    Copy(MediaItem),
    Download(MediaItem),
}

/// Resolve an activation on tile `index` of `snapshot`.
pub fn activate(snapshot: &QuerySnapshot, index: usize, activation: Activation) -> Option<TileAction> {
    let item = snapshot.items.get(index)?.clone();
    Some(match activation {
        Activation::Primary => TileAction::Copy(item),
        Activation::Secondary => TileAction::Download(item),
    })
}
