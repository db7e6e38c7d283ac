//! Secondary activation: save a tile's original rendition to disk.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::client::MediaFetcher;
use crate::error::Result;
use crate::notify::Notification;
use crate::types::MediaItem;

/// `<id>.<ext>`, with the id reduced to characters safe in any filesystem and
/// the extension taken from the URL path (default `gif`).
pub fn file_name_for(item: &MediaItem) -> String {
    let stem: String = item
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "media".to_string() } else { stem };

    let path = item.original_url().split(['?', '#']).next().unwrap_or("");
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "gif".to_string());

    format!("{stem}.{ext}")
}

/// Download the original rendition of `item` into `dir`, creating it if needed.
pub async fn save_original<F: MediaFetcher + ?Sized>(
    fetcher: &F,
    item: &MediaItem,
    dir: &Path,
) -> Result<PathBuf> {
    let bytes = fetcher.fetch_media(item.original_url()).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name_for(item));
    tokio::fs::write(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Saved original rendition");
    Ok(path)
}

pub fn download_notification(result: &Result<PathBuf>) -> Notification {
    match result {
        Ok(path) => Notification::success(format!("Saved {}", path.display())),
        Err(e) => Notification::error(format!("Download failed: {e}")),
    }
}
