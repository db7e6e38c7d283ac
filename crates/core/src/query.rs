//! Paginated query controller — infinite-scroll state for search and trending.
//!
//! [`QueryController`] is a pure state machine: callers feed it events (key changed,
//! end of list reached, page arrived, page failed) and it answers with the
//! [`PageRequest`] to issue, if any. [`QueryRunner`] executes those requests against
//! a [`PageSource`] on spawned tasks and hands the outcomes back through a sink, so the
//! owner of the controller applies them one at a time on its own loop.
//!
//! Ordering: a key has at most one request in flight, and page N+1 is only requested
//! once page N has been applied. Outcomes are matched by request id *and* key, so a
//! late response for an abandoned key is dropped instead of overwriting the new one.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{MediaItem, Page, QueryKey, DEFAULT_PAGE_SIZE};

// ---------------------------------------------------------------------------
// Requests, outcomes, states
// ---------------------------------------------------------------------------

/// One page fetch the controller wants issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub id: u64,
    pub key: QueryKey,
    pub offset: u32,
    pub limit: u32,
}

/// Result of executing a [`PageRequest`].
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    PageArrived { request: PageRequest, page: Page },
    PageFailed { request: PageRequest, message: String },
}

impl FetchOutcome {
    pub fn request(&self) -> &PageRequest {
        match self {
            FetchOutcome::PageArrived { request, .. } | FetchOutcome::PageFailed { request, .. } => {
                request
            }
        }
    }

    fn from_result(request: PageRequest, result: Result<Page>) -> Self {
        match result {
            Ok(page) => FetchOutcome::PageArrived { request, page },
            Err(e) => FetchOutcome::PageFailed { request, message: e.to_string() },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Key is disabled (search with no text); nothing to fetch.
    Idle,
    LoadingFirst,
    Ready,
    LoadingMore,
    /// Last fetch failed. Auto-pagination stops until the key changes.
    Error,
}

/// What [`QueryController::apply`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Page { appended: usize },
    Failed,
    /// Outcome belongs to an abandoned request or key.
    Stale,
    /// Page offset was already in the result set. The key enters `Error`.
    Duplicate,
    /// Page offset differs from the one requested. The key enters `Error`.
    Misplaced,
}

/// Read-only view of the controller handed to presenters.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub key: QueryKey,
    pub status: QueryStatus,
    pub items: Vec<MediaItem>,
    pub error: Option<String>,
    pub has_next_page: bool,
}

impl QuerySnapshot {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::LoadingFirst
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub struct QueryController {
    key: QueryKey,
    page_size: u32,
    status: QueryStatus,
    pages: Vec<Page>,
    error: Option<String>,
    in_flight: Option<PageRequest>,
    next_request_id: u64,
}

impl Default for QueryController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl QueryController {
    /// Starts idle on an empty search.
    pub fn new(page_size: u32) -> Self {
        Self {
            key: QueryKey::default(),
            page_size: page_size.max(1),
            status: QueryStatus::Idle,
            pages: Vec::new(),
            error: None,
            in_flight: None,
            next_request_id: 1,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// The accumulated result set, flattened in fetch order.
    pub fn items(&self) -> impl Iterator<Item = &MediaItem> + '_ {
        self.pages.iter().flat_map(|p| p.data.iter())
    }

    pub fn item(&self, index: usize) -> Option<&MediaItem> {
        self.items().nth(index)
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.data.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First page outstanding.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::LoadingFirst
    }

    pub fn is_fetching_next_page(&self) -> bool {
        self.status == QueryStatus::LoadingMore
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn in_flight(&self) -> Option<&PageRequest> {
        self.in_flight.as_ref()
    }

    /// Whether the last page's cursor says more results exist.
    ///
    /// An empty page never has a successor, even if `total_count` claims otherwise:
    /// its next offset would be its own offset.
    pub fn has_next_page(&self) -> bool {
        self.next_offset().is_some()
    }

    fn next_offset(&self) -> Option<u32> {
        let last = self.pages.last()?;
        if last.pagination.count == 0 {
            return None;
        }
        last.pagination.next_offset()
    }

    /// Switch to `key`. An equal key is a no-op; any other key discards the
    /// accumulated results and abandons the in-flight request.
    pub fn set_key(&mut self, key: QueryKey) -> Option<PageRequest> {
        if key == self.key {
            return None;
        }

        debug!(from = %self.key, to = %key, "Query key changed");
        self.key = key;
        self.pages.clear();
        self.error = None;
        self.in_flight = None;

        if !self.key.is_enabled() {
            self.status = QueryStatus::Idle;
            return None;
        }

        self.status = QueryStatus::LoadingFirst;
        Some(self.issue(0))
    }

    /// Request the next page. Only honoured from `Ready`, with a next cursor and
    /// nothing in flight; every other call is a no-op.
    pub fn fetch_next_page(&mut self) -> Option<PageRequest> {
        if self.status != QueryStatus::Ready || self.in_flight.is_some() {
            return None;
        }
        let offset = self.next_offset()?;
        self.status = QueryStatus::LoadingMore;
        Some(self.issue(offset))
    }

    /// The end-of-list sentinel scrolled into view.
    pub fn sentinel_visible(&mut self) -> Option<PageRequest> {
        if !self.has_next_page() {
            return None;
        }
        self.fetch_next_page()
    }

    /// Apply a finished fetch.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Applied {
        let current = match &self.in_flight {
            Some(r) if r.id == outcome.request().id && r.key == self.key => r.clone(),
            _ => {
                debug!(
                    request = outcome.request().id,
                    key = %outcome.request().key,
                    "Ignoring stale page outcome"
                );
                return Applied::Stale;
            }
        };
        self.in_flight = None;

        match outcome {
            FetchOutcome::PageArrived { page, .. } => {
                let offset = page.pagination.offset;
                if self.pages.iter().any(|p| p.pagination.offset == offset) {
                    warn!(key = %self.key, offset, "Rejecting page with an offset already applied");
                    self.fail(format!("Server repeated results at offset {offset}"));
                    return Applied::Duplicate;
                }
                if offset != current.offset {
                    warn!(
                        key = %self.key,
                        requested = current.offset,
                        received = offset,
                        "Rejecting page at an unexpected offset"
                    );
                    self.fail(format!(
                        "Server answered offset {offset} for a request at offset {}",
                        current.offset
                    ));
                    return Applied::Misplaced;
                }
                self.status = QueryStatus::Ready;
                let appended = page.data.len();
                self.pages.push(page);
                debug!(key = %self.key, offset, appended, total = self.len(), "Page applied");
                Applied::Page { appended }
            }
            FetchOutcome::PageFailed { message, .. } => {
                warn!(key = %self.key, offset = current.offset, error = %message, "Page fetch failed");
                self.fail(message);
                Applied::Failed
            }
        }
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            key: self.key.clone(),
            status: self.status,
            items: self.items().cloned().collect(),
            error: self.error.clone(),
            has_next_page: self.has_next_page(),
        }
    }

    /// Enter `Error`; pages already applied stay.
    fn fail(&mut self, message: String) {
        self.status = QueryStatus::Error;
        self.error = Some(message);
    }

    fn issue(&mut self, offset: u32) -> PageRequest {
        let request = PageRequest {
            id: self.next_request_id,
            key: self.key.clone(),
            offset,
            limit: self.page_size,
        };
        self.next_request_id += 1;
        self.in_flight = Some(request.clone());
        request
    }
}

// ---------------------------------------------------------------------------
// Page sources + runner
// ---------------------------------------------------------------------------

/// Anything that can turn a [`PageRequest`] into a [`Page`].
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page>;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for Arc<S> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        (**self).fetch_page(request).await
    }
}

type OutcomeSink = Arc<dyn Fn(FetchOutcome) + Send + Sync>;

/// Executes controller requests on spawned tasks, one task per request.
pub struct QueryRunner<S> {
    source: Arc<S>,
    sink: OutcomeSink,
}

impl<S: PageSource + 'static> QueryRunner<S> {
    pub fn new(source: Arc<S>, sink: impl Fn(FetchOutcome) + Send + Sync + 'static) -> Self {
        Self { source, sink: Arc::new(sink) }
    }

    pub fn dispatch(&self, request: PageRequest) {
        let source = Arc::clone(&self.source);
        let sink = Arc::clone(&self.sink);
        debug!(id = request.id, key = %request.key, offset = request.offset, "Dispatching page fetch");
        tokio::spawn(async move {
            let result = source.fetch_page(&request).await;
            sink(FetchOutcome::from_result(request, result));
        });
    }
}

/// Fetch pages inline until `max_pages` have been applied, the cursor runs out,
/// or a page is rejected. Starts from `first` (as returned by `set_key`) or, if
/// that is `None`, from the controller's next page. A `first` request is always
/// sent, even with `max_pages == 0`, so the controller never keeps an orphaned
/// in-flight request. Returns the number of pages applied.
pub async fn load_pages<S: PageSource + ?Sized>(
    controller: &mut QueryController,
    source: &S,
    first: Option<PageRequest>,
    max_pages: usize,
) -> usize {
    let max_pages = if first.is_some() { max_pages.max(1) } else { max_pages };
    let mut applied = 0;
    let mut next = match first {
        Some(request) => Some(request),
        None if max_pages > 0 => controller.fetch_next_page(),
        None => None,
    };

    while let Some(request) = next {
        let result = source.fetch_page(&request).await;
        match controller.apply(FetchOutcome::from_result(request, result)) {
            Applied::Page { .. } => applied += 1,
            Applied::Failed | Applied::Duplicate | Applied::Misplaced | Applied::Stale => break,
        }
        if applied >= max_pages {
            break;
        }
        next = controller.sentinel_visible();
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{Pagination, Rating, Rendition, Renditions};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn item(id: &str) -> MediaItem {
        let r = |size: &str| Rendition {
            url: format!("https://media.example/{id}/{size}.gif"),
            width: 200,
            height: 200,
        };
        MediaItem {
            id: id.to_string(),
            title: format!("gif {id}"),
            images: Renditions { original: r("giphy"), fixed_height: r("200") },
        }
    }

    fn page(offset: u32, count: u32, total: u32) -> Page {
        Page {
            data: (offset..offset + count).map(|i| item(&format!("g{i}"))).collect(),
            pagination: Pagination { offset, count, total_count: total },
        }
    }

    fn arrived(request: PageRequest, page: Page) -> FetchOutcome {
        FetchOutcome::PageArrived { request, page }
    }

    /// Serves slices of a fixed-size result set and counts calls.
    struct FakeSource {
        total: u32,
        calls: AtomicUsize,
        offsets: Mutex<Vec<u32>>,
    }

    impl FakeSource {
        fn new(total: u32) -> Self {
            Self { total, calls: AtomicUsize::new(0), offsets: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.offsets.lock().unwrap().push(request.offset);
            let count = request.limit.min(self.total.saturating_sub(request.offset));
            Ok(page(request.offset, count, self.total))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PageSource for FailingSource {
        async fn fetch_page(&self, _request: &PageRequest) -> Result<Page> {
            Err(Error::upstream(503, "Giphy API error: 503"))
        }
    }

    #[test]
    fn test_empty_search_stays_idle() {
        let mut c = QueryController::new(5);
        assert!(c.set_key(QueryKey::search("  ", Rating::G)).is_none());
        assert_eq!(c.status(), QueryStatus::Idle);
        assert!(c.fetch_next_page().is_none());
    }

    #[test]
    fn test_cat_scenario_three_pages() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        assert_eq!(first.offset, 0);
        assert!(c.is_loading());

        assert_eq!(c.apply(arrived(first, page(0, 5, 12))), Applied::Page { appended: 5 });
        assert_eq!(c.len(), 5);
        assert!(c.has_next_page());

        let second = c.sentinel_visible().unwrap();
        assert_eq!(second.offset, 5);
        assert!(c.is_fetching_next_page());
        c.apply(arrived(second, page(5, 5, 12)));
        assert_eq!(c.len(), 10);
        assert!(c.has_next_page());

        let third = c.sentinel_visible().unwrap();
        assert_eq!(third.offset, 10);
        c.apply(arrived(third, page(10, 2, 12)));
        assert_eq!(c.len(), 12);
        assert!(!c.has_next_page());
        assert!(c.sentinel_visible().is_none());
        assert!(c.fetch_next_page().is_none());
    }

    #[test]
    fn test_double_fetch_next_is_single_flight() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        c.apply(arrived(first, page(0, 5, 20)));

        assert!(c.fetch_next_page().is_some());
        assert!(c.fetch_next_page().is_none());
        assert!(c.sentinel_visible().is_none());
    }

    #[test]
    fn test_key_change_resets_before_next_page() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        c.apply(arrived(first, page(0, 5, 12)));
        assert_eq!(c.len(), 5);

        let req = c.set_key(QueryKey::search("cat", Rating::Pg)).unwrap();
        assert!(c.is_empty());
        assert_eq!(req.offset, 0);
        assert!(c.is_loading());

        c.set_key(QueryKey::search("dog", Rating::Pg));
        assert!(c.is_empty());
    }

    #[test]
    fn test_same_key_is_noop() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        c.apply(arrived(first, page(0, 5, 12)));
        assert!(c.set_key(QueryKey::search("cat ", Rating::G)).is_none());
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn test_late_response_for_old_key_is_ignored() {
        let mut c = QueryController::new(5);
        let req_a = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        let req_b = c.set_key(QueryKey::search("dog", Rating::G)).unwrap();

        assert_eq!(c.apply(arrived(req_a, page(0, 5, 12))), Applied::Stale);
        assert!(c.is_empty());
        assert!(c.is_loading());

        assert_eq!(c.apply(arrived(req_b, page(0, 3, 3))), Applied::Page { appended: 3 });
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_stale_after_returning_to_previous_key() {
        // A -> B -> A: the first A request is not the current A request.
        let mut c = QueryController::new(5);
        let old_a = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        c.set_key(QueryKey::search("dog", Rating::G));
        let new_a = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();

        assert_eq!(c.apply(arrived(old_a, page(0, 5, 12))), Applied::Stale);
        assert_eq!(c.apply(arrived(new_a, page(0, 5, 12))), Applied::Page { appended: 5 });
    }

    #[test]
    fn test_failure_stops_pagination_until_key_changes() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        c.apply(arrived(first, page(0, 5, 12)));
        let second = c.fetch_next_page().unwrap();

        let applied = c.apply(FetchOutcome::PageFailed {
            request: second,
            message: "Giphy API error: 503".to_string(),
        });
        assert_eq!(applied, Applied::Failed);
        assert!(c.is_error());
        assert_eq!(c.error(), Some("Giphy API error: 503"));
        assert_eq!(c.len(), 5, "already fetched items survive an error");
        assert!(c.sentinel_visible().is_none());
        assert!(c.fetch_next_page().is_none());

        assert!(c.set_key(QueryKey::trending(Rating::G)).is_some());
        assert!(!c.is_error());
        assert!(c.error().is_none());
    }

    #[test]
    fn test_duplicate_offset_stops_pagination() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::trending(Rating::G)).unwrap();
        c.apply(arrived(first, page(0, 5, 12)));
        let second = c.fetch_next_page().unwrap();
        assert_eq!(c.apply(arrived(second, page(0, 5, 12))), Applied::Duplicate);
        assert_eq!(c.len(), 5);
        assert!(c.is_error());
        assert!(c.sentinel_visible().is_none());
        assert!(c.fetch_next_page().is_none());
    }

    #[test]
    fn test_page_at_unrequested_offset_is_rejected() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        c.apply(arrived(first, page(0, 5, 12)));
        let second = c.fetch_next_page().unwrap();
        assert_eq!(second.offset, 5);

        assert_eq!(c.apply(arrived(second, page(3, 5, 12))), Applied::Misplaced);
        assert_eq!(c.len(), 5);
        let ids: Vec<&str> = c.items().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["g0", "g1", "g2", "g3", "g4"]);
        assert!(c.is_error());
        assert!(c.error().unwrap().contains("offset 3"));
        assert!(c.fetch_next_page().is_none());
    }

    #[test]
    fn test_empty_page_has_no_successor() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("zzz", Rating::G)).unwrap();
        c.apply(arrived(first, page(0, 0, 40)));
        assert!(!c.has_next_page());
    }

    #[tokio::test]
    async fn test_load_pages_concatenates_in_order() {
        let source = FakeSource::new(23);
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G));

        let applied = load_pages(&mut c, &source, first, usize::MAX).await;

        assert_eq!(applied, 5);
        assert_eq!(*source.offsets.lock().unwrap(), vec![0, 5, 10, 15, 20]);
        let ids: Vec<String> = c.items().map(|i| i.id.clone()).collect();
        let expected: Vec<String> = (0..23).map(|i| format!("g{i}")).collect();
        assert_eq!(ids, expected);
        assert!(!c.has_next_page());
    }

    #[tokio::test]
    async fn test_load_pages_respects_page_cap() {
        let source = FakeSource::new(100);
        let mut c = QueryController::new(10);
        let first = c.set_key(QueryKey::trending(Rating::Pg));

        assert_eq!(load_pages(&mut c, &source, first, 2).await, 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.len(), 20);

        // Continue from where we stopped.
        assert_eq!(load_pages(&mut c, &source, None, 1).await, 1);
        assert_eq!(*source.offsets.lock().unwrap(), vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn test_load_pages_stops_on_error() {
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G));
        assert_eq!(load_pages(&mut c, &FailingSource, first, 3).await, 0);
        assert!(c.is_error());
        assert_eq!(c.snapshot().error.as_deref(), Some("Giphy API error: 503"));
    }

    /// Always answers with the first page, whatever was asked.
    struct StuckSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for StuckSource {
        async fn fetch_page(&self, _request: &PageRequest) -> Result<Page> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(page(0, 5, 100))
        }
    }

    #[tokio::test]
    async fn test_load_pages_stops_when_server_repeats_offset() {
        let source = StuckSource { calls: AtomicUsize::new(0) };
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G));

        let applied = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            load_pages(&mut c, &source, first, 2),
        )
        .await
        .expect("load_pages must terminate");

        assert_eq!(applied, 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.len(), 5);
        assert!(c.is_error());
    }

    #[tokio::test]
    async fn test_load_pages_sends_first_request_even_with_zero_cap() {
        let source = FakeSource::new(12);
        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G));

        assert_eq!(load_pages(&mut c, &source, first, 0).await, 1);
        assert!(c.in_flight().is_none());
        assert_eq!(c.status(), QueryStatus::Ready);

        // Without a pending request, a zero cap fetches nothing.
        assert_eq!(load_pages(&mut c, &source, None, 0).await, 0);
        assert!(c.in_flight().is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_runner_posts_outcomes_to_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let source = Arc::new(FakeSource::new(8));
        let runner = QueryRunner::new(Arc::clone(&source), move |outcome| {
            let _ = tx.send(outcome);
        });

        let mut c = QueryController::new(5);
        let first = c.set_key(QueryKey::search("cat", Rating::G)).unwrap();
        runner.dispatch(first);
        // Second trigger while the first is outstanding: nothing to dispatch.
        assert!(c.fetch_next_page().is_none());

        let outcome = rx.recv().await.unwrap();
        assert_eq!(c.apply(outcome), Applied::Page { appended: 5 });
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        runner.dispatch(c.sentinel_visible().unwrap());
        let outcome = rx.recv().await.unwrap();
        assert_eq!(c.apply(outcome), Applied::Page { appended: 3 });
        assert!(!c.has_next_page());
    }
}
