//! Keyspace Notifications
//!
//! The eviction and expiry machinery reports the keys it removes through one
//! global FIFO owned by the engine instance. Consumers poll it; nothing in the
//! engine ever blocks on it. Delivery is at-most-once-per-poll and ordering is
//! FIFO within one producer.

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Why a key left the keyspace without an explicit remove.
///
/// The discriminants are fixed: they cross the C boundary as a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NotificationKind {
    /// The key's TTL elapsed and the active sweep reaped it
    Expired = 1,
    /// The key was the LRU victim of a capacity-driven eviction
    Evicted = 2,
}

/// A single keyspace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub key: Bytes,
    /// Unix epoch milliseconds at which the event happened
    pub at_ms: u64,
}

impl Notification {
    pub fn expired(key: Bytes) -> Self {
        Self {
            kind: NotificationKind::Expired,
            key,
            at_ms: epoch_ms(),
        }
    }

    pub fn evicted(key: Bytes) -> Self {
        Self {
            kind: NotificationKind::Evicted,
            key,
            at_ms: epoch_ms(),
        }
    }
}

/// Current wall-clock time as unix epoch milliseconds.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The global, channel-less notification FIFO.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    inner: Mutex<VecDeque<Notification>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an event. Producers never block beyond the queue mutex.
    pub fn push(&self, notification: Notification) {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        queue.push_back(notification);
    }

    /// Dequeues the oldest pending event, non-blocking.
    pub fn try_poll(&self) -> Option<Notification> {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        queue.pop_front()
    }

    /// Drops all pending events.
    pub fn clear(&self) {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        queue.clear();
    }

    pub fn len(&self) -> usize {
        let queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
