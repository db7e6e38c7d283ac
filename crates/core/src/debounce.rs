//! Trailing-edge debounce on the tokio timer.
//!
//! Every `invoke` bumps a generation counter and schedules a delayed call; a
//! scheduled call only fires if no newer `invoke` happened in the meantime. The
//! superseded timer task is also aborted so quiet periods don't pile up sleepers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Delays a callback until input has been quiet for `delay`.
///
/// At most one call per quiet period, always with the arguments of the last
/// `invoke` in that period. Must be used from within a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    generation: Arc<AtomicU64>,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration, callback: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            callback: Arc::new(callback),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `callback(args)`, replacing whatever was scheduled before.
    pub fn invoke(&self, args: T) {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) == ticket {
                callback(args);
            }
        });

        if let Some(previous) = self.replace_pending(Some(handle)) {
            previous.abort();
        }
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.replace_pending(None) {
            previous.abort();
        }
    }

    fn replace_pending(&self, next: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        // The slot holds no invariant a panic could break.
        let mut slot = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *slot, next)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.pending.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    type Calls = Arc<Mutex<Vec<(String, Duration)>>>;

    fn recording_debouncer(delay_ms: u64) -> (Debouncer<String>, Calls, Instant) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let sink = Arc::clone(&calls);
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), move |v: String| {
            sink.lock().unwrap().push((v, start.elapsed()));
        });
        (debouncer, calls, start)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_call() {
        let (debouncer, calls, _start) = recording_debouncer(500);

        debouncer.invoke("c".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.invoke("ca".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.invoke("cat".to_string());

        sleep(Duration::from_millis(2000)).await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1, "expected exactly one call, got {calls:?}");
        assert_eq!(calls[0].0, "cat");
        let at = calls[0].1.as_millis();
        assert!((700..=710).contains(&at), "fired at {at}ms, expected ~700ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_periods_fire_separately() {
        let (debouncer, calls, _start) = recording_debouncer(500);

        debouncer.invoke("dog".to_string());
        sleep(Duration::from_millis(600)).await;
        debouncer.invoke("dogs".to_string());
        sleep(Duration::from_millis(600)).await;

        let calls = calls.lock().unwrap();
        let values: Vec<&str> = calls.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(values, vec!["dog", "dogs"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_call() {
        let (debouncer, calls, _start) = recording_debouncer(500);

        debouncer.invoke("bird".to_string());
        sleep(Duration::from_millis(200)).await;
        debouncer.cancel();
        sleep(Duration::from_millis(1000)).await;

        assert!(calls.lock().unwrap().is_empty());
    }
}
