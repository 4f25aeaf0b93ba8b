//! Polling Pub/Sub Bus
//!
//! Channel-based fan-out with per-subscriber queues. The host process owns no
//! callback surface into the engine, so delivery is pull-based: `publish`
//! appends a copy of the message to every current subscriber's queue, and
//! each subscriber drains its own queue with `try_poll`.
//!
//! ## Semantics
//!
//! - A subscription only sees messages published *after* it was created
//! - Every subscriber of a channel receives every message (fan-out, not
//!   work-stealing)
//! - Queues are unbounded; a subscriber that never polls accumulates
//!   messages until it unsubscribes
//! - Unsubscribing drops the queue and everything pending in it
//!
//! Subscription ids are engine-global and never reused, so a stale id after
//! unsubscribe is a harmless no-op rather than a hijack of someone else's
//! queue.

use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// One published message as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The channel it was published on
    pub channel: String,
    /// The payload, shared by refcount across all receiving queues
    pub payload: Bytes,
}

/// A single subscriber's pending-message queue.
#[derive(Debug)]
struct SubQueue {
    channel: String,
    pending: VecDeque<Message>,
}

#[derive(Debug, Default)]
struct BusInner {
    /// channel name -> subscription ids currently listening
    channels: HashMap<String, Vec<u64>>,
    /// subscription id -> its queue
    queues: HashMap<u64, SubQueue>,
}

/// The pub/sub bus for one engine instance.
#[derive(Debug, Default)]
pub struct PubSubBus {
    next_id: AtomicU64,
    inner: Mutex<BusInner>,
}

impl PubSubBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            inner: Mutex::new(BusInner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Creates a subscription on `channel` and returns its id (never 0).
    pub fn subscribe(&self, channel: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.lock();
        inner
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(id);
        inner.queues.insert(
            id,
            SubQueue {
                channel: channel.to_string(),
                pending: VecDeque::new(),
            },
        );
        debug!(channel, id, "Subscribed");
        id
    }

    /// Publishes `payload` on `channel`.
    ///
    /// Returns the number of subscriber queues the message was delivered to
    /// (0 when nobody is listening - the message is then dropped).
    pub fn publish(&self, channel: &str, payload: Bytes) -> u64 {
        let mut inner = self.lock();
        let Some(ids) = inner.channels.get(channel).cloned() else {
            return 0;
        };

        let mut delivered = 0u64;
        for id in ids {
            if let Some(queue) = inner.queues.get_mut(&id) {
                queue.pending.push_back(Message {
                    channel: channel.to_string(),
                    payload: payload.clone(),
                });
                delivered += 1;
            }
        }
        delivered
    }

    /// Dequeues the oldest pending message for a subscription, non-blocking.
    ///
    /// Returns `None` when the queue is empty or the id is unknown.
    pub fn try_poll(&self, id: u64) -> Option<Message> {
        let mut inner = self.lock();
        inner.queues.get_mut(&id)?.pending.pop_front()
    }

    /// Destroys a subscription and its pending messages.
    ///
    /// Returns `false` for an unknown (or already removed) id.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut inner = self.lock();
        let Some(queue) = inner.queues.remove(&id) else {
            return false;
        };
        if let Some(ids) = inner.channels.get_mut(&queue.channel) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                inner.channels.remove(&queue.channel);
            }
        }
        debug!(channel = %queue.channel, id, dropped = queue.pending.len(), "Unsubscribed");
        true
    }
}
