//! Browse session — wires controls, query controller, presenter, clipboard, and
//! notifications into one event loop.
//!
//! Everything that touches session state happens in [`BrowseSession::handle`], one
//! event at a time. Slow work (page fetches, media downloads) runs on spawned tasks
//! that post their results back as events through the session's channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::client::MediaFetcher;
use crate::clipboard::{copy_payload, fetch_for_copy, ClipboardBackend, CopyPayload, COPY_CHAIN};
use crate::controls::SearchControls;
use crate::debounce::Debouncer;
use crate::download::{download_notification, save_original};
use crate::error::Result;
use crate::notify::{Notification, Notifications};
use crate::presenter::{activate, Activation, GridView, TileAction};
use crate::query::{FetchOutcome, PageSource, QueryController, QueryRunner};
use crate::types::{MediaItem, QueryMode, Rating};

#[derive(Debug)]
pub enum BrowseEvent {
    /// Raw text box contents after a keystroke.
    Typed(String),
    /// Debounced text, posted by the debouncer.
    TextCommitted(String),
    Cleared,
    RatingChanged(Rating),
    ModeChanged(QueryMode),
    /// End-of-list sentinel became visible.
    ScrolledToEnd,
    Fetched(FetchOutcome),
    Activate { index: usize, activation: Activation },
    /// Clipboard step one finished; `bytes` is `None` if the fetch aborted.
    MediaReady { item: MediaItem, bytes: Option<Vec<u8>> },
    Saved(Result<PathBuf>),
    /// Periodic housekeeping (expire notifications).
    Tick,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub page_size: u32,
    pub rating: Rating,
    pub debounce: Duration,
    pub download_dir: PathBuf,
}

pub struct BrowseSession<S, F, B> {
    controls: SearchControls,
    controller: QueryController,
    runner: QueryRunner<S>,
    fetcher: Arc<F>,
    clipboard: B,
    notifications: Notifications,
    download_dir: PathBuf,
    events: UnboundedSender<BrowseEvent>,
}

impl<S, F, B> BrowseSession<S, F, B>
where
    S: PageSource + 'static,
    F: MediaFetcher + 'static,
    B: ClipboardBackend,
{
    /// Must be called inside a tokio runtime. The receiver is the session's event
    /// queue: feed everything it yields back into [`BrowseSession::handle`].
    pub fn new(
        settings: SessionSettings,
        source: Arc<S>,
        fetcher: Arc<F>,
        clipboard: B,
    ) -> (Self, UnboundedReceiver<BrowseEvent>) {
        let (tx, rx) = unbounded_channel();

        let commit_tx = tx.clone();
        let debouncer = Debouncer::new(settings.debounce, move |text: String| {
            let _ = commit_tx.send(BrowseEvent::TextCommitted(text));
        });

        let fetched_tx = tx.clone();
        let runner = QueryRunner::new(source, move |outcome| {
            let _ = fetched_tx.send(BrowseEvent::Fetched(outcome));
        });

        let session = Self {
            controls: SearchControls::new(settings.rating, debouncer),
            controller: QueryController::new(settings.page_size),
            runner,
            fetcher,
            clipboard,
            notifications: Notifications::default(),
            download_dir: settings.download_dir,
            events: tx,
        };
        (session, rx)
    }

    pub fn sender(&self) -> UnboundedSender<BrowseEvent> {
        self.events.clone()
    }

    pub fn controls(&self) -> &SearchControls {
        &self.controls
    }

    pub fn controller(&self) -> &QueryController {
        &self.controller
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn view(&self) -> GridView {
        GridView::build(&self.controller.snapshot(), self.controls.display_query())
    }

    /// Apply one event. Returns whether anything visible changed.
    pub fn handle(&mut self, event: BrowseEvent) -> bool {
        match event {
            BrowseEvent::Typed(text) => {
                self.controls.type_text(text);
                false
            }
            BrowseEvent::TextCommitted(text) => {
                self.controls.commit_text(text) && self.sync_key()
            }
            BrowseEvent::Cleared => {
                self.controls.clear();
                self.sync_key()
            }
            BrowseEvent::RatingChanged(rating) => {
                self.controls.set_rating(rating) && self.sync_key()
            }
            BrowseEvent::ModeChanged(mode) => self.controls.set_mode(mode) && self.sync_key(),
            BrowseEvent::ScrolledToEnd => match self.controller.sentinel_visible() {
                Some(request) => {
                    self.runner.dispatch(request);
                    true
                }
                None => false,
            },
            BrowseEvent::Fetched(outcome) => {
                !matches!(self.controller.apply(outcome), crate::query::Applied::Stale)
            }
            BrowseEvent::Activate { index, activation } => {
                match activate(&self.controller.snapshot(), index, activation) {
                    Some(TileAction::Copy(item)) => self.start_copy(item),
                    Some(TileAction::Download(item)) => self.start_download(item),
                    None => {
                        self.notifications.push(Notification::error(format!("No GIF at #{index}")));
                    }
                }
                true
            }
            BrowseEvent::MediaReady { item, bytes } => {
                let payload = CopyPayload { url: item.original_url(), bytes: bytes.as_deref() };
                let outcome = copy_payload(&mut self.clipboard, &COPY_CHAIN, &payload);
                self.notifications.push(outcome.notification());
                true
            }
            BrowseEvent::Saved(result) => {
                self.notifications.push(download_notification(&result));
                true
            }
            BrowseEvent::Tick => self.notifications.prune(Instant::now()) > 0,
        }
    }

    fn sync_key(&mut self) -> bool {
        let key = self.controls.key();
        if &key == self.controller.key() {
            return false;
        }
        if let Some(request) = self.controller.set_key(key) {
            self.runner.dispatch(request);
        }
        true
    }

    fn start_copy(&self, item: MediaItem) {
        debug!(id = item.id.as_str(), "Copy requested");
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let bytes = fetch_for_copy(&*fetcher, item.original_url()).await;
            let _ = tx.send(BrowseEvent::MediaReady { item, bytes });
        });
    }

    fn start_download(&self, item: MediaItem) {
        debug!(id = item.id.as_str(), "Download requested");
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.events.clone();
        let dir = self.download_dir.clone();
        tokio::spawn(async move {
            let result = save_original(&*fetcher, &item, &dir).await;
            let _ = tx.send(BrowseEvent::Saved(result));
        });
    }
}
