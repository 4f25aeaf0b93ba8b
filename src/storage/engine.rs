//! Multi-Model Keyspace Store
//!
//! This module implements the core engine: one unified keyspace mapping
//! binary keys to typed values, with LRU capacity enforcement, TTL expiry,
//! append-only journaling and secondary-index maintenance all hanging off the
//! mutation entry points defined here.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: 64 independent `RwLock<HashMap>` shards so that
//!    operations on unrelated keys do not serialize against each other.
//!    Operations on the same key are linearized by that key's shard lock.
//! 2. **Lazy + Active Expiry**: expired keys are reaped on access, and a
//!    background sweeper ([`crate::storage::expiry`]) reaps the rest.
//! 3. **Global LRU by Stamp**: a single atomic tick counter stamps every
//!    touched entry; eviction removes the smallest stamp across all shards.
//! 4. **Refcounted Values**: stored bytes are `bytes::Bytes`, so handing a
//!    value out (or leasing it) is a refcount bump, never a copy. A write
//!    replaces the whole buffer, which is what keeps outstanding leases
//!    valid: they observe the old version.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CacheEngine                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! │      notification FIFO │ AOF writer │ index registry       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are distributed across shards using a hash function. A poisoned
//! shard lock is re-entered via `into_inner`: a panicking caller thread must
//! never wedge the sweeper or other callers.

use crate::persist::{read_records, Aof, Record};
use crate::query::{jsonpath, IndexRegistry};
use crate::storage::notify::{Notification, NotificationQueue};
use crate::storage::value::{resolve_range, Entry, SortedSet, Stream, Value};
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Number of shards for the keyspace.
/// More shards = less lock contention, but more memory overhead.
/// 64 is a good balance for most workloads.
const NUM_SHARDS: usize = 64;

/// Capacity bound used when none is configured.
pub const DEFAULT_MAX_ITEMS: usize = 10_000;

/// Outcome of a caller-buffer read ([`CacheEngine::get_into`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The value was copied; carries the number of bytes written
    Copied(usize),
    /// The key is absent, expired, or not byte-valued
    Missing,
    /// The destination is too small; carries the required length
    TooSmall(usize),
}

/// A zero-copy read lease on a stored byte value.
///
/// The lease holds a refcount on the value's buffer: the bytes stay valid
/// and unchanged until the lease is dropped, even if the key is overwritten,
/// removed or evicted in the meantime. A later write creates a new version;
/// the lease keeps observing the old one.
#[derive(Debug, Clone)]
pub struct BytesLease {
    bytes: Bytes,
}

impl BytesLease {
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Engine statistics snapshot.
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Total read operations
    pub get_ops: u64,
    /// Total write operations
    pub set_ops: u64,
    /// Total remove operations
    pub del_ops: u64,
    /// Keys reaped by passive or active expiry
    pub expired: u64,
    /// Keys evicted by the capacity bound
    pub evicted: u64,
}

/// A single shard holding a portion of the keyspace.
#[derive(Debug, Default)]
struct Shard {
    map: RwLock<HashMap<Bytes, Entry>>,
}

impl Shard {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Entry>> {
        self.map.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry>> {
        self.map.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// The engine instance: one keyspace plus everything attached to it.
///
/// Instances are fully independent. Every operation takes `&self`, so an
/// instance wrapped in an `Arc` is shared across threads as-is.
///
/// # Example
///
/// ```
/// use embercache::storage::CacheEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = CacheEngine::new();
/// engine.set(Bytes::from("name"), Bytes::from("ember"));
/// assert_eq!(engine.get(b"name"), Some(Bytes::from("ember")));
///
/// engine.set_with_ttl(Bytes::from("session"), Bytes::from("abc"), Duration::from_secs(60));
/// assert!(engine.ttl_ms(b"session") > 0);
/// ```
pub struct CacheEngine {
    /// Sharded keyspace
    shards: Vec<Shard>,

    /// LRU recency clock; every touch takes the next tick
    clock: AtomicU64,

    /// Capacity bound (minimum 1)
    max_items: AtomicUsize,

    /// Number of live keys (approximate under concurrent mutation)
    key_count: AtomicU64,

    /// Keyspace event FIFO fed by eviction and active expiry
    notifications: NotificationQueue,

    /// Append-only journal
    aof: Aof,

    /// Numeric secondary indexes over JSON-valued keys
    indexes: IndexRegistry,

    // Statistics
    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
    evicted_count: AtomicU64,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("shards", &self.shards.len())
            .field("keys", &self.key_count.load(Ordering::Relaxed))
            .field("max_items", &self.max_items.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for CacheEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheEngine {
    /// Creates an engine with the default capacity bound.
    pub fn new() -> Self {
        Self::with_max_items(DEFAULT_MAX_ITEMS)
    }

    /// Creates an engine bounded to at most `max_items` keys.
    pub fn with_max_items(max_items: usize) -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| Shard::default()).collect(),
            clock: AtomicU64::new(1),
            max_items: AtomicUsize::new(max_items.max(1)),
            key_count: AtomicU64::new(0),
            notifications: NotificationQueue::new(),
            aof: Aof::new(),
            indexes: IndexRegistry::new(),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
            evicted_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn next_stamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    // ========================================================================
    // BYTE VALUES
    // ========================================================================

    /// Sets `key` to a byte value, overwriting any prior variant and clearing
    /// any existing TTL.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.apply_set(key, value, None, true);
    }

    /// Sets `key` to a byte value that expires after `ttl`.
    pub fn set_with_ttl(&self, key: Bytes, value: Bytes, ttl: Duration) {
        self.apply_set(key, value, Some(ttl), true);
    }

    fn apply_set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>, journal: bool) {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        let stamp = self.next_stamp();

        let entry = match ttl {
            Some(ttl) => Entry::with_ttl(Value::Bytes(value.clone()), stamp, ttl),
            None => Entry::new(Value::Bytes(value.clone()), stamp),
        };

        let is_new = {
            let mut map = self.shard(&key).write();
            let prior = map.insert(key.clone(), entry);
            // Records must enter the journal in the order the shard lock
            // admitted the writes, so append before releasing it
            if journal {
                let record = match ttl {
                    Some(ttl) => Record::SetWithTtl {
                        key: key.clone(),
                        value: value.clone(),
                        ttl_ms: ttl.as_millis() as u64,
                    },
                    None => Record::Set {
                        key: key.clone(),
                        value: value.clone(),
                    },
                };
                self.aof.append(&record);
            }
            prior.is_none()
        };

        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }

        // Index maintenance runs before the write is acknowledged
        self.index_note_write(&key, &value);

        if is_new {
            self.enforce_capacity();
        }
    }

    /// Gets the byte value for a key.
    ///
    /// Returns `None` if the key is absent, expired, or holds a composite
    /// variant. A hit refreshes the key's LRU recency; an expired key is
    /// reaped inline.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.with_live_value(key, |value| match value {
            Value::Bytes(b) => Some(b.clone()),
            _ => None,
        })
    }

    /// Copies the byte value for a key into a caller-supplied buffer.
    ///
    /// Never allocates on a hit.
    pub fn get_into(&self, key: &[u8], dst: &mut [u8]) -> ReadOutcome {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        {
            let map = self.shard(key).read();
            match map.get(key) {
                Some(entry) if !entry.is_expired() => {
                    if let Value::Bytes(b) = &entry.value {
                        if b.len() > dst.len() {
                            return ReadOutcome::TooSmall(b.len());
                        }
                        entry.touch(self.next_stamp());
                        dst[..b.len()].copy_from_slice(b);
                        return ReadOutcome::Copied(b.len());
                    }
                    return ReadOutcome::Missing;
                }
                Some(_) => {}
                None => return ReadOutcome::Missing,
            }
        }
        self.reap_expired(key);
        ReadOutcome::Missing
    }

    /// Takes a zero-copy read lease on a key's byte value.
    pub fn get_lease(&self, key: &[u8]) -> Option<BytesLease> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.with_live_value(key, |value| match value {
            Value::Bytes(b) => Some(BytesLease { bytes: b.clone() }),
            _ => None,
        })
    }

    /// Removes a key of any variant. Returns `true` if the key existed.
    pub fn remove(&self, key: &[u8]) -> bool {
        self.apply_remove(key, true)
    }

    fn apply_remove(&self, key: &[u8], journal: bool) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        let removed = {
            let mut map = self.shard(key).write();
            let removed = map.remove(key).is_some();
            if removed && journal {
                self.aof.append(&Record::Remove {
                    key: Bytes::copy_from_slice(key),
                });
            }
            removed
        };
        if removed {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            self.index_forget(key);
        }
        removed
    }

    /// Removes every key. Pending notifications and index definitions
    /// survive; indexed entries are wiped.
    pub fn clear_all(&self) {
        self.apply_clear_all();
        self.aof.append(&Record::ClearAll);
    }

    fn apply_clear_all(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
        self.key_count.store(0, Ordering::Relaxed);
        self.indexes.clear_entries();
    }

    /// Number of live keys (approximate under concurrent mutation).
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
            evicted: self.evicted_count.load(Ordering::Relaxed),
        }
    }

    // ========================================================================
    // TTL
    // ========================================================================

    /// Sets or overwrites the TTL on an existing key.
    ///
    /// Returns `false` if the key does not exist (or has already expired).
    pub fn expire(&self, key: &[u8], ttl: Duration) -> bool {
        self.apply_expire(key, ttl, true)
    }

    fn apply_expire(&self, key: &[u8], ttl: Duration, journal: bool) -> bool {
        let stamp = self.next_stamp();
        let mut reaped = false;
        let applied = {
            let mut map = self.shard(key).write();
            match map.get_mut(key) {
                Some(entry) if entry.is_expired() => {
                    map.remove(key);
                    reaped = true;
                    false
                }
                Some(entry) => {
                    entry.expires_at = Some(Instant::now() + ttl);
                    entry.touch(stamp);
                    if journal {
                        self.aof.append(&Record::Expire {
                            key: Bytes::copy_from_slice(key),
                            ttl_ms: ttl.as_millis() as u64,
                        });
                    }
                    true
                }
                None => false,
            }
        };
        if reaped {
            self.note_reaped(key);
        }
        applied
    }

    /// Remaining TTL in milliseconds: `-2` absent, `-1` no TTL, else `>= 0`.
    pub fn ttl_ms(&self, key: &[u8]) -> i64 {
        {
            let map = self.shard(key).read();
            match map.get(key) {
                Some(entry) if !entry.is_expired() => {
                    entry.touch(self.next_stamp());
                    return entry.ttl_ms().map(|ms| ms as i64).unwrap_or(-1);
                }
                Some(_) => {}
                None => return -2,
            }
        }
        self.reap_expired(key);
        -2
    }

    // ========================================================================
    // CAPACITY / LRU
    // ========================================================================

    /// Sets the capacity bound (clamped to at least 1) and evicts down to it.
    pub fn set_max_items(&self, max_items: usize) {
        self.max_items.store(max_items.max(1), Ordering::Relaxed);
        self.enforce_capacity();
    }

    pub fn max_items(&self) -> usize {
        self.max_items.load(Ordering::Relaxed)
    }

    fn enforce_capacity(&self) {
        let max = self.max_items.load(Ordering::Relaxed);
        while self.len() as usize > max {
            let Some(victim) = self.find_lru_key() else {
                break;
            };
            self.evict(victim);
        }
    }

    /// Finds the globally least-recently-touched key.
    fn find_lru_key(&self) -> Option<Bytes> {
        let mut oldest: Option<(u64, Bytes)> = None;
        for shard in &self.shards {
            let map = shard.read();
            for (key, entry) in map.iter() {
                let stamp = entry.touched();
                if oldest.as_ref().map(|(s, _)| stamp < *s).unwrap_or(true) {
                    oldest = Some((stamp, key.clone()));
                }
            }
        }
        oldest.map(|(_, key)| key)
    }

    fn evict(&self, key: Bytes) {
        let removed = {
            let mut map = self.shard(&key).write();
            map.remove(&key[..]).is_some()
        };
        if removed {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            self.evicted_count.fetch_add(1, Ordering::Relaxed);
            self.index_forget(&key);
            debug!(key = ?key, "Evicted least-recently-used key");
            self.notifications.push(Notification::evicted(key));
        }
    }

    // ========================================================================
    // EXPIRY SUPPORT
    // ========================================================================

    /// Reaps a key that a read path found expired. No notification: passive
    /// expiry surfaces as a plain miss.
    fn reap_expired(&self, key: &[u8]) {
        let removed = {
            let mut map = self.shard(key).write();
            match map.get(key) {
                Some(entry) if entry.is_expired() => {
                    map.remove(key);
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.note_reaped(key);
        }
    }

    fn note_reaped(&self, key: &[u8]) {
        self.key_count.fetch_sub(1, Ordering::Relaxed);
        self.expired_count.fetch_add(1, Ordering::Relaxed);
        self.index_forget(key);
    }

    /// Removes every expired key and enqueues an `Expired` notification per
    /// key. Called by the background sweeper.
    ///
    /// Returns the number of keys reaped.
    pub fn sweep_expired(&self) -> u64 {
        let mut reaped = 0u64;

        for shard in &self.shards {
            let candidates: Vec<Bytes> = {
                let map = shard.read();
                map.iter()
                    .filter(|(_, entry)| entry.is_expired())
                    .map(|(key, _)| key.clone())
                    .collect()
            };
            if candidates.is_empty() {
                continue;
            }

            let mut map = shard.write();
            for key in candidates {
                // Re-check under the write lock: a writer may have replaced
                // the entry since the scan
                let still_expired = map.get(&key[..]).map(|e| e.is_expired()).unwrap_or(false);
                if still_expired {
                    map.remove(&key[..]);
                    reaped += 1;
                    self.index_forget(&key);
                    self.notifications.push(Notification::expired(key));
                }
            }
        }

        if reaped > 0 {
            self.key_count.fetch_sub(reaped, Ordering::Relaxed);
            self.expired_count.fetch_add(reaped, Ordering::Relaxed);
            debug!(reaped, remaining = self.len(), "Active expiry sweep");
        }
        reaped
    }

    // ========================================================================
    // NOTIFICATIONS
    // ========================================================================

    /// Dequeues the oldest pending keyspace notification, non-blocking.
    pub fn try_poll_notification(&self) -> Option<Notification> {
        self.notifications.try_poll()
    }

    /// Drops all pending keyspace notifications.
    pub fn clear_notifications(&self) {
        self.notifications.clear();
    }

    // ========================================================================
    // SHARED ACCESS HELPERS
    // ========================================================================

    /// Runs `f` against a live (present, unexpired) value, refreshing LRU
    /// recency. Reaps the key inline when it turns out to be expired.
    fn with_live_value<T>(&self, key: &[u8], f: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        {
            let map = self.shard(key).read();
            match map.get(key) {
                Some(entry) if !entry.is_expired() => {
                    entry.touch(self.next_stamp());
                    return f(&entry.value);
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.reap_expired(key);
        None
    }

    /// Runs `f` against a mutable value of the variant `fresh` constructs,
    /// creating the entry when the key is absent (or expired).
    ///
    /// Returns `None` without side effects when the key holds a different
    /// variant: composite operations reject rather than silently
    /// reinterpret. A rejected operation neither refreshes the key's LRU
    /// recency nor journals `record`; an accepted one does both, with the
    /// record appended under the shard lock so journal order matches
    /// application order.
    fn with_value_mut<T>(
        &self,
        key: &Bytes,
        fresh: impl FnOnce() -> Value,
        f: impl FnOnce(&mut Value) -> Option<T>,
        record: Option<Record>,
    ) -> Option<T> {
        let stamp = self.next_stamp();
        let mut created = false;
        let mut reaped = false;

        let result = {
            let mut map = self.shard(key).write();

            if map.get(&key[..]).map(|e| e.is_expired()).unwrap_or(false) {
                map.remove(&key[..]);
                reaped = true;
            }

            let entry = map.entry(key.clone()).or_insert_with(|| {
                created = true;
                Entry::new(fresh(), stamp)
            });
            let result = f(&mut entry.value);
            if result.is_some() {
                entry.touch(stamp);
                if let Some(record) = record {
                    self.aof.append(&record);
                }
            }
            result
        };

        if reaped {
            self.note_reaped(key);
        }
        if created {
            self.key_count.fetch_add(1, Ordering::Relaxed);
            self.enforce_capacity();
        }
        result
    }

    // ========================================================================
    // HASH OPERATIONS
    // ========================================================================

    /// Upserts a field in the hash at `key`, creating the hash if needed.
    ///
    /// Returns `false` when the key holds a non-hash variant.
    pub fn hset(&self, key: Bytes, field: Bytes, value: Bytes) -> bool {
        let record = Record::HSet {
            key: key.clone(),
            field: field.clone(),
            value: value.clone(),
        };
        self.with_value_mut(
            &key,
            || Value::Hash(HashMap::new()),
            |v| match v {
                Value::Hash(h) => {
                    h.insert(field.clone(), value.clone());
                    Some(())
                }
                _ => None,
            },
            Some(record),
        )
        .is_some()
    }

    /// Gets one field of a hash.
    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        self.with_live_value(key, |v| match v {
            Value::Hash(h) => h.get(field).cloned(),
            _ => None,
        })
    }

    /// Returns all field/value pairs of a hash, order unspecified.
    pub fn hgetall(&self, key: &[u8]) -> Vec<(Bytes, Bytes)> {
        self.with_live_value(key, |v| match v {
            Value::Hash(h) => Some(h.iter().map(|(f, val)| (f.clone(), val.clone())).collect()),
            _ => None,
        })
        .unwrap_or_default()
    }

    // ========================================================================
    // LIST OPERATIONS
    // ========================================================================

    /// Prepends a value to the list at `key`, creating the list if needed.
    ///
    /// Returns the new length, or `None` when the key holds another variant.
    pub fn lpush(&self, key: Bytes, value: Bytes) -> Option<usize> {
        let record = Record::LPush {
            key: key.clone(),
            value: value.clone(),
        };
        self.with_value_mut(
            &key,
            || Value::List(VecDeque::new()),
            |v| match v {
                Value::List(list) => {
                    list.push_front(value.clone());
                    Some(list.len())
                }
                _ => None,
            },
            Some(record),
        )
    }

    /// Removes and returns the tail element of the list at `key`.
    ///
    /// An emptied list's key leaves the keyspace.
    pub fn rpop(&self, key: &[u8]) -> Option<Bytes> {
        let stamp = self.next_stamp();
        let mut reaped = false;
        let mut emptied = false;

        let popped = {
            let mut map = self.shard(key).write();
            let mut popped = None;
            match map.get_mut(key) {
                Some(entry) if entry.is_expired() => reaped = true,
                Some(entry) => {
                    if let Value::List(list) = &mut entry.value {
                        popped = list.pop_back();
                        emptied = list.is_empty();
                    }
                    if popped.is_some() {
                        entry.touch(stamp);
                        self.aof.append(&Record::RPop {
                            key: Bytes::copy_from_slice(key),
                        });
                    }
                }
                None => {}
            }
            if reaped || (emptied && popped.is_some()) {
                map.remove(key);
            }
            popped
        };

        if reaped {
            self.note_reaped(key);
        } else if emptied && popped.is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            self.index_forget(key);
        }
        popped
    }

    /// Returns the inclusive `[start, end]` range of the list at `key`,
    /// with negative indices counting from the end.
    pub fn lrange(&self, key: &[u8], start: i64, end: i64) -> Vec<Bytes> {
        self.with_live_value(key, |v| match v {
            Value::List(list) => {
                let (lo, hi) = resolve_range(list.len(), start, end)?;
                Some(list.iter().skip(lo).take(hi - lo + 1).cloned().collect())
            }
            _ => None,
        })
        .unwrap_or_default()
    }

    // ========================================================================
    // SET OPERATIONS
    // ========================================================================

    /// Adds a member to the set at `key`.
    ///
    /// Returns `true` only when the member was newly added.
    pub fn sadd(&self, key: Bytes, member: Bytes) -> bool {
        let record = Record::SAdd {
            key: key.clone(),
            member: member.clone(),
        };
        self.with_value_mut(
            &key,
            || Value::Set(HashSet::new()),
            |v| match v {
                Value::Set(s) => Some(s.insert(member.clone())),
                _ => None,
            },
            Some(record),
        )
        .unwrap_or(false)
    }

    /// Pure membership test against the set at `key`.
    pub fn sismember(&self, key: &[u8], member: &[u8]) -> bool {
        self.with_live_value(key, |v| match v {
            Value::Set(s) => Some(s.contains(member)),
            _ => None,
        })
        .unwrap_or(false)
    }

    // ========================================================================
    // SORTED SET OPERATIONS
    // ========================================================================

    /// Upserts a member's score in the sorted set at `key`.
    ///
    /// Returns `false` when the key holds another variant.
    pub fn zadd(&self, key: Bytes, score: f64, member: &str) -> bool {
        let record = Record::ZAdd {
            key: key.clone(),
            score,
            member: Bytes::copy_from_slice(member.as_bytes()),
        };
        self.with_value_mut(
            &key,
            || Value::SortedSet(SortedSet::new()),
            |v| match v {
                Value::SortedSet(z) => {
                    z.insert(member.to_string(), score);
                    Some(())
                }
                _ => None,
            },
            Some(record),
        )
        .is_some()
    }

    /// Returns members of the sorted set at `key` in the inclusive
    /// `[start, end]` rank range, ascending by `(score, member)`.
    pub fn zrange(&self, key: &[u8], start: i64, end: i64) -> Vec<String> {
        self.with_live_value(key, |v| match v {
            Value::SortedSet(z) => {
                let ranked = z.members_by_score();
                let (lo, hi) = resolve_range(ranked.len(), start, end)?;
                Some(ranked[lo..=hi].to_vec())
            }
            _ => None,
        })
        .unwrap_or_default()
    }

    // ========================================================================
    // STREAM OPERATIONS
    // ========================================================================

    /// Appends a payload to the stream at `key` and returns its id.
    ///
    /// Ids are strictly increasing per stream, starting at 1.
    pub fn xadd(&self, key: Bytes, payload: Bytes) -> Option<u64> {
        let record = Record::XAdd {
            key: key.clone(),
            payload: payload.clone(),
        };
        self.with_value_mut(
            &key,
            || Value::Stream(Stream::new()),
            |v| match v {
                Value::Stream(s) => Some(s.append(payload.clone())),
                _ => None,
            },
            Some(record),
        )
    }

    /// Returns stream items with `start_id <= id <= end_id`, ascending.
    pub fn xrange(&self, key: &[u8], start_id: u64, end_id: u64) -> Vec<(u64, Bytes)> {
        self.with_live_value(key, |v| match v {
            Value::Stream(s) => Some(s.range(start_id, end_id)),
            _ => None,
        })
        .unwrap_or_default()
    }

    // ========================================================================
    // JSON PATH
    // ========================================================================

    /// Evaluates `path` against the key's byte value parsed as JSON.
    ///
    /// Returns the serialized node, or `None` when the key is absent, not
    /// valid JSON, or the path does not resolve.
    pub fn json_get(&self, key: &[u8], path: &str) -> Option<String> {
        let segments = jsonpath::parse_path(path).ok()?;
        let bytes = self.get(key)?;
        let doc: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        jsonpath::resolve(&doc, &segments).map(|node| node.to_string())
    }

    /// Parses `json` and stores it at `path` inside the key's document,
    /// re-serializing the whole document back into the key.
    ///
    /// An absent key starts from an empty object. Returns `false` on parse
    /// failure or an unresolvable path, with no side effect.
    pub fn json_set(&self, key: &[u8], path: &str, json: &[u8]) -> bool {
        let Ok(segments) = jsonpath::parse_path(path) else {
            return false;
        };
        let Ok(new_node) = serde_json::from_slice::<serde_json::Value>(json) else {
            return false;
        };

        let mut doc = match self.get(key) {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(doc) => doc,
                Err(_) => return false,
            },
            None => serde_json::Value::Object(serde_json::Map::new()),
        };

        if !jsonpath::assign(&mut doc, &segments, new_node) {
            return false;
        }

        self.set(Bytes::copy_from_slice(key), Bytes::from(doc.to_string()));
        true
    }

    // ========================================================================
    // SECONDARY INDEX
    // ========================================================================

    /// Builds (or rebuilds) a numeric index over the top-level `field` of
    /// every JSON-valued key, then keeps it consistent with future writes.
    pub fn create_numeric_index(&self, field: &str) -> bool {
        let mut snapshot = Vec::new();
        for shard in &self.shards {
            let map = shard.read();
            for (key, entry) in map.iter() {
                if entry.is_expired() {
                    continue;
                }
                if let Value::Bytes(bytes) = &entry.value {
                    if let Ok(doc) = serde_json::from_slice::<serde_json::Value>(bytes) {
                        snapshot.push((key.clone(), doc));
                    }
                }
            }
        }
        self.indexes.create(field, snapshot);
        true
    }

    /// Evaluates a `field <op> literal` query against the matching index.
    ///
    /// Malformed queries and missing indexes yield an empty result.
    pub fn find_keys(&self, query: &str) -> Vec<Bytes> {
        self.indexes.find(query).unwrap_or_default()
    }

    fn index_note_write(&self, key: &Bytes, value: &Bytes) {
        if self.indexes.is_empty() {
            return;
        }
        let doc = serde_json::from_slice::<serde_json::Value>(value).ok();
        self.indexes.update(key, doc.as_ref());
    }

    fn index_forget(&self, key: &[u8]) {
        if self.indexes.is_empty() {
            return;
        }
        self.indexes.remove_key(key);
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Starts journaling every accepted mutation to `path`.
    ///
    /// Fails closed on an unwritable path.
    pub fn enable_aof(&self, path: impl AsRef<Path>) -> bool {
        self.aof.enable(path.as_ref())
    }

    /// Stops journaling.
    pub fn disable_aof(&self) {
        self.aof.disable();
    }

    pub fn aof_enabled(&self) -> bool {
        self.aof.is_enabled()
    }

    /// Replays a journal file, strictly in record order, through the same
    /// code paths live traffic uses (journaling suppressed during replay).
    ///
    /// The keyspace is cleared first, so a load always reproduces exactly
    /// the journaled state and loading the same file twice equals loading
    /// it once. A failed read leaves the keyspace untouched.
    ///
    /// A truncated trailing record ends replay successfully; interior
    /// corruption fails the load.
    pub fn load_aof(&self, path: impl AsRef<Path>) -> bool {
        let records = match read_records(path.as_ref()) {
            Ok(records) => records,
            Err(err) => {
                warn!(path = %path.as_ref().display(), error = %err, "AOF load failed");
                return false;
            }
        };

        self.apply_clear_all();
        for record in records {
            self.replay(record);
        }
        true
    }

    fn replay(&self, record: Record) {
        match record {
            Record::Set { key, value } => self.apply_set(key, value, None, false),
            Record::SetWithTtl { key, value, ttl_ms } => {
                self.apply_set(key, value, Some(Duration::from_millis(ttl_ms)), false)
            }
            Record::Remove { key } => {
                self.apply_remove(&key, false);
            }
            Record::ClearAll => self.apply_clear_all(),
            Record::Expire { key, ttl_ms } => {
                self.apply_expire(&key, Duration::from_millis(ttl_ms), false);
            }
            Record::HSet { key, field, value } => {
                self.with_value_mut(
                    &key,
                    || Value::Hash(HashMap::new()),
                    |v| match v {
                        Value::Hash(h) => {
                            h.insert(field.clone(), value.clone());
                            Some(())
                        }
                        _ => None,
                    },
                    None,
                );
            }
            Record::LPush { key, value } => {
                self.with_value_mut(
                    &key,
                    || Value::List(VecDeque::new()),
                    |v| match v {
                        Value::List(list) => {
                            list.push_front(value.clone());
                            Some(())
                        }
                        _ => None,
                    },
                    None,
                );
            }
            Record::RPop { key } => self.replay_rpop(&key),
            Record::SAdd { key, member } => {
                self.with_value_mut(
                    &key,
                    || Value::Set(HashSet::new()),
                    |v| match v {
                        Value::Set(s) => Some(s.insert(member.clone())),
                        _ => None,
                    },
                    None,
                );
            }
            Record::ZAdd { key, score, member } => {
                self.with_value_mut(
                    &key,
                    || Value::SortedSet(SortedSet::new()),
                    |v| match v {
                        Value::SortedSet(z) => {
                            let member = String::from_utf8_lossy(&member).into_owned();
                            z.insert(member, score);
                            Some(())
                        }
                        _ => None,
                    },
                    None,
                );
            }
            Record::XAdd { key, payload } => {
                self.with_value_mut(
                    &key,
                    || Value::Stream(Stream::new()),
                    |v| match v {
                        Value::Stream(s) => Some(s.append(payload.clone())),
                        _ => None,
                    },
                    None,
                );
            }
        }
    }

    fn replay_rpop(&self, key: &[u8]) {
        let mut emptied = false;
        {
            let mut map = self.shard(key).write();
            if let Some(entry) = map.get_mut(key) {
                if let Value::List(list) = &mut entry.value {
                    list.pop_back();
                    emptied = list.is_empty();
                }
            }
            if emptied {
                map.remove(key);
            }
        }
        if emptied {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::notify::NotificationKind;
    use std::sync::Arc;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn set_get_remove_roundtrip() {
        let engine = CacheEngine::new();
        engine.set(b("k"), b("v"));
        assert_eq!(engine.get(b"k"), Some(b("v")));

        assert!(engine.remove(b"k"));
        assert_eq!(engine.get(b"k"), None);
        assert!(!engine.remove(b"k"));
    }

    #[test]
    fn binary_keys_share_the_namespace_with_text_keys() {
        let engine = CacheEngine::new();
        let raw = Bytes::from_static(&[0x00, 0xFF, 0x7F]);
        engine.set(raw.clone(), b("binary"));
        engine.set(b("text"), b("utf8"));

        assert_eq!(engine.get(&raw), Some(b("binary")));
        assert_eq!(engine.get(b"text"), Some(b("utf8")));
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn get_into_reports_copy_miss_and_too_small() {
        let engine = CacheEngine::new();
        engine.set(b("k"), b("hello"));

        let mut dst = [0u8; 16];
        assert_eq!(engine.get_into(b"k", &mut dst), ReadOutcome::Copied(5));
        assert_eq!(&dst[..5], b"hello");

        let mut tiny = [0u8; 2];
        assert_eq!(engine.get_into(b"k", &mut tiny), ReadOutcome::TooSmall(5));

        assert_eq!(engine.get_into(b"missing", &mut dst), ReadOutcome::Missing);
    }

    #[test]
    fn lease_survives_overwrite_and_remove() {
        let engine = CacheEngine::new();
        engine.set(b("k"), b("version-1"));

        let lease = engine.get_lease(b"k").unwrap();
        engine.set(b("k"), b("version-2"));
        engine.remove(b"k");

        // The lease still observes the version it was taken on
        assert_eq!(lease.as_slice(), b"version-1");
        assert_eq!(engine.get(b"k"), None);
    }

    #[test]
    fn lru_evicts_least_recently_touched_key() {
        let engine = CacheEngine::with_max_items(2);
        engine.set(b("k1"), b("1"));
        engine.set(b("k2"), b("2"));
        assert!(engine.get(b"k1").is_some()); // k2 is now the LRU
        engine.set(b("k3"), b("3"));

        assert_eq!(engine.get(b"k2"), None);
        assert!(engine.get(b"k1").is_some());
        assert!(engine.get(b"k3").is_some());
        assert_eq!(engine.len(), 2);

        let n = engine.try_poll_notification().unwrap();
        assert_eq!(n.kind, NotificationKind::Evicted);
        assert_eq!(n.key, b("k2"));
    }

    #[test]
    fn shrinking_max_items_evicts_down_to_bound() {
        let engine = CacheEngine::with_max_items(10);
        for i in 0..5 {
            engine.set(b(&format!("k{}", i)), b("v"));
        }
        engine.set_max_items(2);
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.max_items(), 2);
    }

    #[test]
    fn max_items_is_clamped_to_one() {
        let engine = CacheEngine::with_max_items(0);
        assert_eq!(engine.max_items(), 1);
        engine.set(b("a"), b("1"));
        engine.set(b("b"), b("2"));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn ttl_codes_follow_redis_semantics() {
        let engine = CacheEngine::new();
        assert_eq!(engine.ttl_ms(b"absent"), -2);

        engine.set(b("forever"), b("v"));
        assert_eq!(engine.ttl_ms(b"forever"), -1);

        engine.set_with_ttl(b("mortal"), b("v"), Duration::from_millis(200));
        let ttl = engine.ttl_ms(b"mortal");
        assert!((0..=200).contains(&ttl), "ttl out of range: {}", ttl);
    }

    #[test]
    fn passive_expiry_treats_reads_as_misses() {
        let engine = CacheEngine::new();
        engine.set_with_ttl(b("k"), b("x"), Duration::from_millis(30));
        assert_eq!(engine.get(b"k"), Some(b("x")));

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(engine.get(b"k"), None);
        assert_eq!(engine.ttl_ms(b"k"), -2);
        assert_eq!(engine.len(), 0);
    }

    #[test]
    fn expire_on_existing_key_only() {
        let engine = CacheEngine::new();
        assert!(!engine.expire(b"missing", Duration::from_secs(1)));

        engine.set(b("k"), b("v"));
        assert!(engine.expire(b"k", Duration::from_millis(500)));
        assert!(engine.ttl_ms(b"k") >= 0);

        // set() clears the TTL again
        engine.set(b("k"), b("v2"));
        assert_eq!(engine.ttl_ms(b"k"), -1);
    }

    #[test]
    fn sweep_reaps_and_notifies_without_reads() {
        let engine = CacheEngine::new();
        engine.set_with_ttl(b("doomed"), b("v"), Duration::from_millis(20));
        engine.set(b("kept"), b("v"));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.sweep_expired(), 1);
        assert_eq!(engine.len(), 1);

        let n = engine.try_poll_notification().unwrap();
        assert_eq!(n.kind, NotificationKind::Expired);
        assert_eq!(n.key, b("doomed"));
    }

    #[test]
    fn hash_operations() {
        let engine = CacheEngine::new();
        assert!(engine.hset(b("h"), b("name"), b("alice")));
        assert!(engine.hset(b("h"), b("age"), b("30")));
        assert!(engine.hset(b("h"), b("name"), b("bob"))); // upsert

        assert_eq!(engine.hget(b"h", b"name"), Some(b("bob")));
        assert_eq!(engine.hget(b"h", b"missing"), None);

        let mut all = engine.hgetall(b"h");
        all.sort();
        assert_eq!(all, vec![(b("age"), b("30")), (b("name"), b("bob"))]);
        assert_eq!(engine.hgetall(b"nope"), vec![]);
    }

    #[test]
    fn list_operations() {
        let engine = CacheEngine::new();
        assert_eq!(engine.lpush(b("l"), b("a")), Some(1));
        assert_eq!(engine.lpush(b("l"), b("b")), Some(2));
        assert_eq!(engine.lpush(b("l"), b("c")), Some(3));

        // List is [c, b, a]; negative indices count from the end
        assert_eq!(engine.lrange(b"l", 0, -1), vec![b("c"), b("b"), b("a")]);
        assert_eq!(engine.lrange(b"l", 1, 1), vec![b("b")]);
        assert_eq!(engine.lrange(b"l", -2, -1), vec![b("b"), b("a")]);

        assert_eq!(engine.rpop(b"l"), Some(b("a")));
        assert_eq!(engine.rpop(b"l"), Some(b("b")));
        assert_eq!(engine.rpop(b"l"), Some(b("c")));
        // An emptied list's key leaves the keyspace
        assert_eq!(engine.rpop(b"l"), None);
        assert_eq!(engine.len(), 0);
    }

    #[test]
    fn set_operations() {
        let engine = CacheEngine::new();
        assert!(engine.sadd(b("s"), b("x")));
        assert!(!engine.sadd(b("s"), b("x")));
        assert!(engine.sadd(b("s"), b("y")));

        assert!(engine.sismember(b"s", b"x"));
        assert!(!engine.sismember(b"s", b"z"));
        assert!(!engine.sismember(b"nope", b"x"));
    }

    #[test]
    fn sorted_set_orders_ascending_with_ties_on_member() {
        let engine = CacheEngine::new();
        assert!(engine.zadd(b("z"), 10.0, "bob"));
        assert!(engine.zadd(b("z"), 5.0, "alice"));
        assert!(engine.zadd(b("z"), 7.0, "carl"));
        assert_eq!(engine.zrange(b"z", 0, -1), vec!["alice", "carl", "bob"]);

        // Re-adding updates the score in place
        assert!(engine.zadd(b("z"), 1.0, "bob"));
        assert_eq!(engine.zrange(b"z", 0, -1), vec!["bob", "alice", "carl"]);
        assert_eq!(engine.zrange(b"z", 0, 0), vec!["bob"]);
    }

    #[test]
    fn stream_ids_and_ranges() {
        let engine = CacheEngine::new();
        let id1 = engine.xadd(b("st"), b("a")).unwrap();
        let id2 = engine.xadd(b("st"), b("b")).unwrap();
        assert!(id2 > id1);

        let items = engine.xrange(b"st", id1, id2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], (id1, b("a")));
        assert_eq!(items[1], (id2, b("b")));

        let only_second = engine.xrange(b"st", id2, u64::MAX);
        assert_eq!(only_second, vec![(id2, b("b"))]);
    }

    #[test]
    fn composite_ops_reject_cross_type_use() {
        let engine = CacheEngine::new();
        engine.set(b("k"), b("bytes"));

        assert!(!engine.hset(b("k"), b("f"), b("v")));
        assert_eq!(engine.lpush(b("k"), b("x")), None);
        assert!(!engine.sadd(b("k"), b("m")));
        assert!(!engine.zadd(b("k"), 1.0, "m"));
        assert_eq!(engine.xadd(b("k"), b("p")), None);

        // The byte value is untouched
        assert_eq!(engine.get(b"k"), Some(b("bytes")));

        // ...but a plain set overwrites a composite
        assert!(engine.hset(b("h"), b("f"), b("v")));
        engine.set(b("h"), b("now-bytes"));
        assert_eq!(engine.get(b"h"), Some(b("now-bytes")));
        assert_eq!(engine.hget(b"h", b"f"), None);
    }

    #[test]
    fn byte_reads_miss_on_composite_keys() {
        let engine = CacheEngine::new();
        engine.hset(b("h"), b("f"), b("v"));
        assert_eq!(engine.get(b"h"), None);
        let mut dst = [0u8; 8];
        assert_eq!(engine.get_into(b"h", &mut dst), ReadOutcome::Missing);
        // TTL is variant-agnostic
        assert_eq!(engine.ttl_ms(b"h"), -1);
    }

    #[test]
    fn composite_keys_participate_in_lru() {
        let engine = CacheEngine::with_max_items(2);
        engine.hset(b("h"), b("f"), b("v"));
        engine.lpush(b("l"), b("x"));
        assert!(!engine.hgetall(b"h").is_empty()); // l is now the LRU
        engine.set(b("s"), b("v"));

        assert_eq!(engine.len(), 2);
        assert_eq!(engine.lrange(b"l", 0, -1), Vec::<Bytes>::new());
        let n = engine.try_poll_notification().unwrap();
        assert_eq!(n.key, b("l"));
    }

    #[test]
    fn rejected_cross_type_op_does_not_refresh_recency() {
        let engine = CacheEngine::with_max_items(2);
        engine.set(b("k1"), b("bytes"));
        engine.set(b("k2"), b("bytes"));

        // k1 is the LRU; a rejected hset against it must leave it so
        assert!(!engine.hset(b("k1"), b("f"), b("v")));
        engine.set(b("k3"), b("bytes"));

        assert_eq!(engine.get(b"k1"), None);
        assert!(engine.get(b"k2").is_some());
        let n = engine.try_poll_notification().unwrap();
        assert_eq!(n.key, b("k1"));
    }

    #[test]
    fn clear_all_empties_the_keyspace() {
        let engine = CacheEngine::new();
        engine.set(b("a"), b("1"));
        engine.hset(b("h"), b("f"), b("v"));
        engine.clear_all();
        assert_eq!(engine.len(), 0);
        assert_eq!(engine.get(b"a"), None);
        assert_eq!(engine.hget(b"h", b"f"), None);
    }

    #[test]
    fn aof_roundtrip_reproduces_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.aof");

        let engine = CacheEngine::new();
        assert!(engine.enable_aof(&path));
        engine.set(b("s"), b("v"));
        engine.hset(b("h"), b("f"), b("fv"));
        engine.lpush(b("l"), b("a"));
        engine.lpush(b("l"), b("b"));
        engine.sadd(b("set"), b("m"));
        engine.zadd(b("z"), 2.5, "alice");
        engine.xadd(b("st"), b("payload"));
        engine.set(b("gone"), b("x"));
        engine.remove(b"gone");
        engine.disable_aof();

        let replica = CacheEngine::new();
        assert!(replica.load_aof(&path));

        assert_eq!(replica.get(b"s"), Some(b("v")));
        assert_eq!(replica.hget(b"h", b"f"), Some(b("fv")));
        assert_eq!(replica.lrange(b"l", 0, -1), vec![b("b"), b("a")]);
        assert!(replica.sismember(b"set", b"m"));
        assert_eq!(replica.zrange(b"z", 0, -1), vec!["alice"]);
        assert_eq!(replica.xrange(b"st", 0, u64::MAX).len(), 1);
        assert_eq!(replica.get(b"gone"), None);
    }

    #[test]
    fn aof_replay_is_not_journaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.aof");

        let engine = CacheEngine::new();
        assert!(engine.enable_aof(&path));
        engine.set(b("k"), b("v"));
        engine.disable_aof();
        let len_before = std::fs::metadata(&path).unwrap().len();

        // Replaying with the journal still attached must not grow the file
        let replica = CacheEngine::new();
        let other = dir.path().join("replica.aof");
        assert!(replica.enable_aof(&other));
        assert!(replica.load_aof(&path));
        replica.disable_aof();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), len_before);
        assert_eq!(std::fs::metadata(&other).unwrap().len(), 0);
    }

    #[test]
    fn aof_load_replaces_state_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.aof");

        let engine = CacheEngine::new();
        assert!(engine.enable_aof(&path));
        engine.lpush(b("l"), b("a"));
        engine.lpush(b("l"), b("b"));
        engine.sadd(b("s"), b("m"));
        engine.xadd(b("st"), b("p"));
        engine.set(b("k"), b("v"));
        engine.disable_aof();

        let replica = CacheEngine::new();
        // Pre-existing state is replaced, not merged into
        replica.set(b("stale"), b("x"));
        assert!(replica.load_aof(&path));
        assert!(replica.load_aof(&path));

        assert_eq!(replica.get(b"stale"), None);
        assert_eq!(replica.lrange(b"l", 0, -1), vec![b("b"), b("a")]);
        assert_eq!(replica.xrange(b"st", 0, u64::MAX), vec![(1, b("p"))]);
        assert!(replica.sismember(b"s", b"m"));
        assert_eq!(replica.get(b"k"), Some(b("v")));
        assert_eq!(replica.len(), 4);
    }

    #[test]
    fn aof_failed_load_leaves_state_untouched() {
        let engine = CacheEngine::new();
        engine.set(b("kept"), b("v"));
        assert!(!engine.load_aof("/no/such/file.aof"));
        assert_eq!(engine.get(b"kept"), Some(b("v")));
    }

    #[test]
    fn journal_order_matches_application_order_under_contention() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contended.aof");

        let engine = Arc::new(CacheEngine::new());
        assert!(engine.enable_aof(&path));

        let mut handles = Vec::new();
        for t in 0..4u64 {
            let engine = Arc::clone(&engine);
            handles.push(std::thread::spawn(move || {
                for i in 0..100u64 {
                    engine.set(b("hot"), Bytes::from(format!("{}:{}", t, i)));
                    engine.lpush(b("log"), Bytes::from(format!("{}:{}", t, i)));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        engine.disable_aof();

        // Replay must land on exactly the state the interleaving produced
        let replica = CacheEngine::new();
        assert!(replica.load_aof(&path));
        assert_eq!(replica.get(b"hot"), engine.get(b"hot"));
        assert_eq!(replica.lrange(b"log", 0, -1), engine.lrange(b"log", 0, -1));
    }

    #[test]
    fn aof_enable_fails_closed() {
        let engine = CacheEngine::new();
        assert!(!engine.enable_aof("/no/such/dir/journal.aof"));
        assert!(!engine.aof_enabled());
    }

    #[test]
    fn json_get_and_set() {
        let engine = CacheEngine::new();
        engine.set(b("j"), b(r#"{"name":"a","age":10,"tags":["x"]}"#));

        assert_eq!(engine.json_get(b"j", "$.age"), Some("10".to_string()));
        assert_eq!(engine.json_get(b"j", "$.name"), Some(r#""a""#.to_string()));
        assert_eq!(engine.json_get(b"j", "$.missing"), None);
        assert_eq!(engine.json_get(b"missing", "$.age"), None);

        assert!(engine.json_set(b"j", "$.age", b"11"));
        assert_eq!(engine.json_get(b"j", "$.age"), Some("11".to_string()));

        assert!(engine.json_set(b"j", "$.tags[1]", br#""y""#));
        assert_eq!(
            engine.json_get(b"j", "$.tags[1]"),
            Some(r#""y""#.to_string())
        );

        // Absent key starts from an empty object
        assert!(engine.json_set(b"fresh", "$.a", b"1"));
        assert_eq!(engine.json_get(b"fresh", "$.a"), Some("1".to_string()));

        // Malformed input has no side effect
        assert!(!engine.json_set(b"j", "$.age", b"not json"));
        assert!(!engine.json_set(b"j", "bad path", b"1"));
        assert_eq!(engine.json_get(b"j", "$.age"), Some("11".to_string()));
    }

    #[test]
    fn numeric_index_tracks_writes_and_removals() {
        let engine = CacheEngine::new();
        engine.set(b("p:1"), b(r#"{"age":5}"#));
        engine.set(b("p:2"), b(r#"{"age":15}"#));
        engine.set(b("p:3"), b(r#"{"age":20}"#));

        assert!(engine.create_numeric_index("age"));

        let mut keys = engine.find_keys("age >= 15");
        keys.sort();
        assert_eq!(keys, vec![b("p:2"), b("p:3")]);
        assert_eq!(engine.find_keys("age == 5"), vec![b("p:1")]);

        // Updates through json_set re-index before returning
        assert!(engine.json_set(b"p:1", "$.age", b"50"));
        assert_eq!(engine.find_keys("age == 5"), Vec::<Bytes>::new());
        assert_eq!(engine.find_keys("age == 50"), vec![b("p:1")]);

        engine.remove(b"p:2");
        assert_eq!(engine.find_keys("age >= 15"), vec![b("p:3")]);

        // Malformed queries are an empty result, not an error
        assert_eq!(engine.find_keys("age ~= 5"), Vec::<Bytes>::new());
        assert_eq!(engine.find_keys(""), Vec::<Bytes>::new());
    }

    #[test]
    fn concurrent_readers_and_writers_stay_consistent() {
        let engine = Arc::new(CacheEngine::new());
        let keys: Vec<Bytes> = (0..8).map(|i| b(&format!("shared:{}", i))).collect();

        for key in &keys {
            engine.set(
                key.clone(),
                b(&format!("{}:0", String::from_utf8_lossy(key))),
            );
        }

        let mut handles = Vec::new();
        for t in 0..4u64 {
            let engine = Arc::clone(&engine);
            let keys = keys.clone();
            handles.push(std::thread::spawn(move || {
                for version in 1..200u64 {
                    for key in &keys {
                        let value =
                            format!("{}:{}", String::from_utf8_lossy(key), version * 4 + t);
                        engine.set(key.clone(), Bytes::from(value));
                    }
                }
            }));
        }
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            let keys = keys.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..500 {
                    for key in &keys {
                        if let Some(value) = engine.get(key) {
                            let text = String::from_utf8(value.to_vec()).unwrap();
                            let (prefix, version) = text.rsplit_once(':').unwrap();
                            assert_eq!(prefix.as_bytes(), &key[..]);
                            version.parse::<u64>().unwrap();
                        }
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Final state: every key holds some complete write
        for key in &keys {
            let value = engine.get(key).unwrap();
            assert!(value.starts_with(&key[..]));
        }
    }
}
