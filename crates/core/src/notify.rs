//! Transient, time-limited notifications (toasts).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// How long a routine toast stays up.
pub const SHORT_TOAST: Duration = Duration::from_secs(2);

/// Failures linger a little longer.
pub const LONG_TOAST: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: Instant,
    pub duration: Duration,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            created_at: Instant::now(),
            duration,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message, SHORT_TOAST)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message, SHORT_TOAST)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message, LONG_TOAST)
    }

    pub fn expires_at(&self) -> Instant {
        self.created_at + self.duration
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

/// Bounded queue of live notifications, oldest first.
pub struct Notifications {
    queue: VecDeque<Notification>,
    capacity: usize,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::with_capacity(3)
    }
}

impl Notifications {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { queue: VecDeque::new(), capacity: capacity.max(1) }
    }

    pub fn push(&mut self, notification: Notification) {
        while self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(notification);
    }

    /// Drop everything expired at `now`. Returns how many went away.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.queue.len();
        self.queue.retain(|n| !n.is_expired_at(now));
        before - self.queue.len()
    }

    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.queue.back()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
