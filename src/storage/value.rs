//! Value Variants for the Multi-Model Keyspace
//!
//! Every key in the keyspace maps to exactly one [`Entry`], and every entry
//! holds exactly one [`Value`] variant. The variants form a closed sum type:
//! operations match on them exhaustively instead of inspecting types at
//! runtime, so adding a variant is a compile-time event.
//!
//! ## Variants
//!
//! - `Bytes` - an opaque byte string (the classic KV payload)
//! - `Hash` - field -> value map
//! - `List` - double-ended queue for O(1) push/pop at both ends
//! - `Set` - unordered unique members
//! - `SortedSet` - unique members ordered by (score, member)
//! - `Stream` - append-only log with strictly increasing ids

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A sorted set: unique members ranked by an `f64` score.
///
/// Members are stored in a plain map; ordered views are produced on demand by
/// sorting on `(score, member)`. Ties on score break lexicographically by
/// member so iteration order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a member's score in place.
    ///
    /// Returns `true` if the member was newly added, `false` if an existing
    /// member's score was updated.
    pub fn insert(&mut self, member: String, score: f64) -> bool {
        self.scores.insert(member, score).is_none()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Returns all members ordered ascending by score, ties broken by member.
    pub fn members_by_score(&self) -> Vec<String> {
        let mut ranked: Vec<(&String, f64)> =
            self.scores.iter().map(|(m, s)| (m, *s)).collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().map(|(m, _)| m.clone()).collect()
    }
}

/// An append-only stream of `(id, payload)` items.
///
/// Ids are assigned at append time, start at 1, and are strictly increasing
/// within one stream. No two items ever share an id.
#[derive(Debug, Clone)]
pub struct Stream {
    next_id: u64,
    items: Vec<(u64, Bytes)>,
}

impl Stream {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            items: Vec::new(),
        }
    }

    /// Appends a payload and returns the newly assigned id.
    pub fn append(&mut self, payload: Bytes) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push((id, payload));
        id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns items with `start_id <= id <= end_id` in ascending id order.
    pub fn range(&self, start_id: u64, end_id: u64) -> Vec<(u64, Bytes)> {
        self.items
            .iter()
            .filter(|(id, _)| *id >= start_id && *id <= end_id)
            .cloned()
            .collect()
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

/// The tagged union of everything a key can hold.
#[derive(Debug, Clone)]
pub enum Value {
    /// Opaque byte string
    Bytes(Bytes),
    /// Field -> value map
    Hash(HashMap<Bytes, Bytes>),
    /// Double-ended list
    List(VecDeque<Bytes>),
    /// Unordered unique members
    Set(HashSet<Bytes>),
    /// Score-ordered unique members
    SortedSet(SortedSet),
    /// Append-only id/payload log
    Stream(Stream),
}

impl Value {
    /// A short name for diagnostics and type-conflict logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "bytes",
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "zset",
            Value::Stream(_) => "stream",
        }
    }
}

/// A stored entry: the value plus per-key metadata.
///
/// `touched` is the key's LRU recency stamp. It is an atomic so reads can
/// refresh recency while holding only a shard read lock.
#[derive(Debug)]
pub struct Entry {
    /// The value variant this key currently holds
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
    /// LRU recency stamp, larger = touched more recently
    touched: AtomicU64,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Value, stamp: u64) -> Self {
        Self {
            value,
            expires_at: None,
            touched: AtomicU64::new(stamp),
        }
    }

    /// Creates a new entry that expires after `ttl`.
    pub fn with_ttl(value: Value, stamp: u64, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Instant::now() + ttl),
            touched: AtomicU64::new(stamp),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() >= exp)
            .unwrap_or(false)
    }

    /// Refreshes the recency stamp.
    #[inline]
    pub fn touch(&self, stamp: u64) {
        self.touched.store(stamp, Ordering::Relaxed);
    }

    /// Reads the recency stamp.
    #[inline]
    pub fn touched(&self) -> u64 {
        self.touched.load(Ordering::Relaxed)
    }

    /// Remaining TTL in whole milliseconds, or None if no expiry is set.
    ///
    /// Never negative: an expired entry reports 0 until it is reaped.
    pub fn ttl_ms(&self) -> Option<u64> {
        self.expires_at.map(|exp| {
            let now = Instant::now();
            if now >= exp {
                0
            } else {
                (exp - now).as_millis() as u64
            }
        })
    }
}

/// Resolves a Redis-style inclusive `[start, end]` range against a collection
/// of `len` elements.
///
/// Negative indices count from the end (`-1` = last element). Out-of-bound
/// ends are clamped. Returns `None` when the resolved range is empty.
pub fn resolve_range(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as i64;

    let mut start = if start < 0 { len + start } else { start };
    let mut end = if end < 0 { len + end } else { end };

    if start < 0 {
        start = 0;
    }
    if end >= len {
        end = len - 1;
    }
    if start > end || start >= len {
        return None;
    }
    Some((start as usize, end as usize))
}
