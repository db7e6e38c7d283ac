//! Best-effort copy of a media item to the system clipboard.
//!
//! The chain is fixed: fetch the original rendition, try to place it on the
//! clipboard as an image, and fall back to the item's URL as plain text. Each
//! strategy only sees the fetched bytes and the URL, and all platform variance
//! lives behind [`ClipboardBackend`].

use std::borrow::Cow;

use tracing::{debug, info, warn};

use crate::client::MediaFetcher;
use crate::error::{Error, Result};
use crate::notify::Notification;
use crate::types::MediaItem;

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Decoded RGBA pixels, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

/// Where copies land. Errors must be `ClipboardUnsupported` or `ClipboardWriteFailed`.
pub trait ClipboardBackend {
    fn set_image(&mut self, image: ClipboardImage) -> Result<()>;
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The OS clipboard via `arboard`. Opening can fail on headless systems; every
/// write then reports `ClipboardUnsupported`.
pub struct SystemClipboard {
    inner: std::result::Result<arboard::Clipboard, String>,
}

impl SystemClipboard {
    pub fn open() -> Self {
        let inner = arboard::Clipboard::new().map_err(|e| {
            warn!(error = %e, "System clipboard unavailable");
            e.to_string()
        });
        Self { inner }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_ok()
    }

    fn clipboard(&mut self) -> Result<&mut arboard::Clipboard> {
        self.inner.as_mut().map_err(|reason| Error::ClipboardUnsupported(reason.clone()))
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set_image(&mut self, image: ClipboardImage) -> Result<()> {
        let data = arboard::ImageData {
            width: image.width,
            height: image.height,
            bytes: Cow::Owned(image.bytes),
        };
        self.clipboard()?.set_image(data).map_err(map_arboard_error)
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.clipboard()?.set_text(text.to_string()).map_err(map_arboard_error)
    }
}

fn map_arboard_error(e: arboard::Error) -> Error {
    match e {
        arboard::Error::ClipboardNotSupported | arboard::Error::ConversionFailure => {
            Error::ClipboardUnsupported(e.to_string())
        }
        other => Error::ClipboardWriteFailed(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// What a strategy gets to work with. `bytes` is `None` when the media fetch failed.
pub struct CopyPayload<'a> {
    pub url: &'a str,
    pub bytes: Option<&'a [u8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// First frame of the original rendition, as an image.
    Image,
    /// The original rendition URL, as text.
    UrlText,
}

/// The order strategies are tried in.
pub const COPY_CHAIN: [CopyStrategy; 2] = [CopyStrategy::Image, CopyStrategy::UrlText];

impl CopyStrategy {
    pub fn attempt(&self, payload: &CopyPayload<'_>, backend: &mut dyn ClipboardBackend) -> Result<()> {
        match self {
            CopyStrategy::Image => {
                let bytes = payload.bytes.ok_or_else(|| {
                    Error::ClipboardUnsupported("media bytes unavailable".to_string())
                })?;
                backend.set_image(decode_first_frame(bytes)?)
            }
            CopyStrategy::UrlText => backend.set_text(payload.url),
        }
    }

    fn outcome(&self) -> CopyOutcome {
        match self {
            CopyStrategy::Image => CopyOutcome::ImageCopied,
            CopyStrategy::UrlText => CopyOutcome::UrlCopied,
        }
    }
}

/// Decode the first frame of any supported format into RGBA.
pub fn decode_first_frame(bytes: &[u8]) -> Result<ClipboardImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::ClipboardUnsupported(format!("cannot decode media: {e}")))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ClipboardImage { width: width as usize, height: height as usize, bytes: rgba.into_raw() })
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    ImageCopied,
    UrlCopied,
    Failed { reason: String },
}

impl CopyOutcome {
    /// The toast for this outcome. Each outcome has its own message and level.
    pub fn notification(&self) -> Notification {
        match self {
            CopyOutcome::ImageCopied => Notification::success("GIF copied to clipboard!"),
            CopyOutcome::UrlCopied => Notification::info("GIF URL copied to clipboard!"),
            CopyOutcome::Failed { .. } => Notification::error("Failed to copy GIF"),
        }
    }
}

/// Run `strategies` in order against already-fetched media. Never retries.
pub fn copy_payload(
    backend: &mut dyn ClipboardBackend,
    strategies: &[CopyStrategy],
    payload: &CopyPayload<'_>,
) -> CopyOutcome {
    let mut last_error = None;
    for strategy in strategies {
        match strategy.attempt(payload, backend) {
            Ok(()) => {
                info!(?strategy, url = payload.url, "Copied to clipboard");
                return strategy.outcome();
            }
            Err(e) => {
                debug!(?strategy, error = %e, "Copy strategy failed, falling back");
                last_error = Some(e);
            }
        }
    }

    let reason = last_error.map(|e| e.to_string()).unwrap_or_else(|| "no copy strategy".into());
    warn!(url = payload.url, reason = reason.as_str(), "Clipboard copy failed");
    CopyOutcome::Failed { reason }
}

/// Fetch the item's original rendition and run the full chain.
pub async fn copy_item<F: MediaFetcher + ?Sized>(
    fetcher: &F,
    backend: &mut dyn ClipboardBackend,
    item: &MediaItem,
) -> CopyOutcome {
    let url = item.original_url();
    let bytes = fetch_for_copy(fetcher, url).await;
    copy_payload(backend, &COPY_CHAIN, &CopyPayload { url, bytes: bytes.as_deref() })
}

/// Step one of the chain. A failed fetch is logged and turned into `None` so the
/// text fallback still runs.
pub async fn fetch_for_copy<F: MediaFetcher + ?Sized>(fetcher: &F, url: &str) -> Option<Vec<u8>> {
    match fetcher.fetch_media(url).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(url, error = %e, "Media fetch for clipboard failed");
            None
        }
    }
}
