//! C-Callable Boundary
//!
//! This module exposes the engine to host processes over a flat `extern "C"`
//! surface. One process-wide engine instance (plus its pub/sub bus and
//! background sweeper) is created lazily on first use; every entry point
//! operates on it.
//!
//! ## Conventions
//!
//! - Keys and values cross as `(ptr, len)` byte slices; paths, channels,
//!   queries and scripts cross as NUL-terminated C strings. A `_b` suffix
//!   marks the byte-slice variants of the string-keyed calls.
//! - Variable-size results are engine-allocated buffers returned as a
//!   pointer with the length written through `out_len`. Every such buffer
//!   must be released with [`cache_free`] - with the exact length that was
//!   reported.
//! - Multi-item results use the blob layouts in [`wire`].
//! - Null pointers in, null out-parameters, and invalid UTF-8 in string
//!   arguments are answered with the failure value of the call. Nothing
//!   here panics across the boundary.

pub mod wire;

use crate::pubsub::PubSubBus;
use crate::storage::{
    start_expiry_sweeper, BytesLease, CacheEngine, ExpirySweeper, ReadOutcome,
};
use bytes::Bytes;
use once_cell::sync::Lazy;
use std::ffi::{c_char, CStr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FfiState {
    engine: Arc<CacheEngine>,
    bus: PubSubBus,
    // Held so the sweeper lives as long as the process; joined on unload
    _sweeper: Mutex<ExpirySweeper>,
}

static STATE: Lazy<FfiState> = Lazy::new(|| {
    let engine = Arc::new(CacheEngine::new());
    let sweeper = start_expiry_sweeper(Arc::clone(&engine));
    FfiState {
        engine,
        bus: PubSubBus::new(),
        _sweeper: Mutex::new(sweeper),
    }
});

fn engine() -> &'static CacheEngine {
    &STATE.engine
}

fn bus() -> &'static PubSubBus {
    &STATE.bus
}

/// Reads a NUL-terminated UTF-8 string argument.
unsafe fn cstr<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Reads a `(ptr, len)` byte-slice argument. A zero-length slice may pass a
/// null pointer.
unsafe fn slice<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() {
        if len == 0 {
            return Some(&[]);
        }
        return None;
    }
    Some(std::slice::from_raw_parts(ptr, len))
}

/// Hands a buffer to the host. The host returns it via [`cache_free`] with
/// the same length.
unsafe fn alloc_out(data: Vec<u8>, out_len: *mut usize) -> *mut u8 {
    if out_len.is_null() {
        return std::ptr::null_mut();
    }
    let boxed = data.into_boxed_slice();
    *out_len = boxed.len();
    Box::into_raw(boxed) as *mut u8
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Initializes the process-wide engine (idempotent). Any other entry point
/// also initializes lazily; this exists for hosts that want the sweeper
/// running before traffic starts.
#[no_mangle]
pub extern "C" fn cache_init() -> bool {
    Lazy::force(&STATE);
    true
}

/// Releases a buffer previously returned by this library.
///
/// # Safety
///
/// `ptr` and `len` must be exactly the pointer and length handed out by one
/// earlier call, and must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn cache_free(ptr: *mut u8, len: usize) {
    if ptr.is_null() {
        return;
    }
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)));
}

/// Removes every key.
#[no_mangle]
pub extern "C" fn cache_clear_all() {
    engine().clear_all();
}

/// Number of live keys.
#[no_mangle]
pub extern "C" fn cache_len() -> u64 {
    engine().len()
}

/// Sets the capacity bound (clamped to at least 1), evicting down to it.
#[no_mangle]
pub extern "C" fn cache_set_max_items(max_items: usize) {
    engine().set_max_items(max_items);
}

/// Current capacity bound.
#[no_mangle]
pub extern "C" fn cache_get_max_items() -> usize {
    engine().max_items()
}

// ============================================================================
// STRING-KEYED BYTE VALUES
// ============================================================================

/// Sets a key to a value, both NUL-terminated strings.
///
/// # Safety
///
/// `key` and `value` must be valid NUL-terminated strings or null.
#[no_mangle]
pub unsafe extern "C" fn cache_set(key: *const c_char, value: *const c_char) -> bool {
    let (Some(key), Some(value)) = (cstr(key), cstr(value)) else {
        return false;
    };
    engine().set(
        Bytes::copy_from_slice(key.as_bytes()),
        Bytes::copy_from_slice(value.as_bytes()),
    );
    true
}

/// Sets a key with a TTL in milliseconds.
///
/// # Safety
///
/// `key` and `value` must be valid NUL-terminated strings or null.
#[no_mangle]
pub unsafe extern "C" fn cache_set_with_ttl(
    key: *const c_char,
    value: *const c_char,
    ttl_ms: u64,
) -> bool {
    let (Some(key), Some(value)) = (cstr(key), cstr(value)) else {
        return false;
    };
    engine().set_with_ttl(
        Bytes::copy_from_slice(key.as_bytes()),
        Bytes::copy_from_slice(value.as_bytes()),
        Duration::from_millis(ttl_ms),
    );
    true
}

/// Gets a key's byte value. Null on miss.
///
/// # Safety
///
/// `key` must be a valid NUL-terminated string or null; `out_len` must be a
/// valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_get(key: *const c_char, out_len: *mut usize) -> *mut u8 {
    let Some(key) = cstr(key) else {
        return std::ptr::null_mut();
    };
    match engine().get(key.as_bytes()) {
        Some(value) => alloc_out(value.to_vec(), out_len),
        None => std::ptr::null_mut(),
    }
}

/// Removes a key. Returns whether it existed.
///
/// # Safety
///
/// `key` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_remove(key: *const c_char) -> bool {
    let Some(key) = cstr(key) else {
        return false;
    };
    engine().remove(key.as_bytes())
}

/// Sets or overwrites the TTL on an existing key.
///
/// # Safety
///
/// `key` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_expire(key: *const c_char, ttl_ms: u64) -> bool {
    let Some(key) = cstr(key) else {
        return false;
    };
    engine().expire(key.as_bytes(), Duration::from_millis(ttl_ms))
}

/// Remaining TTL in ms: `-2` absent, `-1` no TTL, else `>= 0`.
///
/// # Safety
///
/// `key` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_ttl(key: *const c_char) -> i64 {
    let Some(key) = cstr(key) else {
        return -2;
    };
    engine().ttl_ms(key.as_bytes())
}

// ============================================================================
// BYTE-SLICE VARIANTS
// ============================================================================

/// Sets a binary key to a binary value.
///
/// # Safety
///
/// Both `(ptr, len)` pairs must describe valid readable slices.
#[no_mangle]
pub unsafe extern "C" fn cache_set_b(
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> bool {
    let (Some(key), Some(value)) = (slice(key, key_len), slice(value, value_len)) else {
        return false;
    };
    engine().set(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
    true
}

/// Gets a binary key's value into a fresh buffer. Null on miss.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `out_len` must be
/// a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_get_b(
    key: *const u8,
    key_len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    let Some(key) = slice(key, key_len) else {
        return std::ptr::null_mut();
    };
    match engine().get(key) {
        Some(value) => alloc_out(value.to_vec(), out_len),
        None => std::ptr::null_mut(),
    }
}

/// Copies a binary key's value into a caller-owned buffer.
///
/// Returns the copied length, `-1` on miss, or the negated required length
/// when `dst` is too small (nothing is written in that case).
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice and
/// `(dst, dst_len)` a valid writable one.
#[no_mangle]
pub unsafe extern "C" fn cache_get_into_b(
    key: *const u8,
    key_len: usize,
    dst: *mut u8,
    dst_len: usize,
) -> i64 {
    let Some(key) = slice(key, key_len) else {
        return -1;
    };
    let dst: &mut [u8] = if dst.is_null() {
        if dst_len != 0 {
            return -1;
        }
        &mut []
    } else {
        std::slice::from_raw_parts_mut(dst, dst_len)
    };
    match engine().get_into(key, dst) {
        ReadOutcome::Copied(n) => n as i64,
        ReadOutcome::Missing => -1,
        ReadOutcome::TooSmall(required) => -(required as i64),
    }
}

/// Takes a zero-copy lease on a binary key's value.
///
/// On a hit, writes the leased data's pointer and length and returns an
/// opaque lease handle; the data stays valid until the handle is passed to
/// [`cache_bytes_lease_free`]. Null on miss.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `out_ptr` and
/// `out_len` must be valid writable pointers.
#[no_mangle]
pub unsafe extern "C" fn cache_get_lease_b(
    key: *const u8,
    key_len: usize,
    out_ptr: *mut *const u8,
    out_len: *mut usize,
) -> *mut BytesLease {
    let Some(key) = slice(key, key_len) else {
        return std::ptr::null_mut();
    };
    if out_ptr.is_null() || out_len.is_null() {
        return std::ptr::null_mut();
    }
    match engine().get_lease(key) {
        Some(lease) => {
            let lease = Box::new(lease);
            *out_ptr = lease.as_slice().as_ptr();
            *out_len = lease.len();
            Box::into_raw(lease)
        }
        None => std::ptr::null_mut(),
    }
}

/// Releases a lease taken by [`cache_get_lease_b`].
///
/// # Safety
///
/// `lease` must be a handle returned by `cache_get_lease_b`, freed at most
/// once. The data pointer obtained with it must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn cache_bytes_lease_free(lease: *mut BytesLease) {
    if lease.is_null() {
        return;
    }
    drop(Box::from_raw(lease));
}

/// Removes a binary key. Returns whether it existed.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice.
#[no_mangle]
pub unsafe extern "C" fn cache_remove_b(key: *const u8, key_len: usize) -> bool {
    let Some(key) = slice(key, key_len) else {
        return false;
    };
    engine().remove(key)
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// Starts journaling mutations to `path`. Fails closed on an unwritable
/// path.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_aof_enable(path: *const c_char) -> bool {
    let Some(path) = cstr(path) else {
        return false;
    };
    engine().enable_aof(path)
}

/// Stops journaling.
#[no_mangle]
pub extern "C" fn cache_aof_disable() {
    engine().disable_aof();
}

/// Replays a journal file, replacing the current keyspace with the
/// journaled state.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_aof_load(path: *const c_char) -> bool {
    let Some(path) = cstr(path) else {
        return false;
    };
    engine().load_aof(path)
}

// ============================================================================
// HASHES
// ============================================================================

/// Upserts a hash field. False on a cross-type key.
///
/// # Safety
///
/// All three `(ptr, len)` pairs must describe valid readable slices.
#[no_mangle]
pub unsafe extern "C" fn cache_hset(
    key: *const u8,
    key_len: usize,
    field: *const u8,
    field_len: usize,
    value: *const u8,
    value_len: usize,
) -> bool {
    let (Some(key), Some(field), Some(value)) = (
        slice(key, key_len),
        slice(field, field_len),
        slice(value, value_len),
    ) else {
        return false;
    };
    engine().hset(
        Bytes::copy_from_slice(key),
        Bytes::copy_from_slice(field),
        Bytes::copy_from_slice(value),
    )
}

/// Gets one hash field. Null on miss.
///
/// # Safety
///
/// Both `(ptr, len)` pairs must describe valid readable slices; `out_len`
/// must be a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_hget(
    key: *const u8,
    key_len: usize,
    field: *const u8,
    field_len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    let (Some(key), Some(field)) = (slice(key, key_len), slice(field, field_len)) else {
        return std::ptr::null_mut();
    };
    match engine().hget(key, field) {
        Some(value) => alloc_out(value.to_vec(), out_len),
        None => std::ptr::null_mut(),
    }
}

/// Dumps a whole hash as a pair-list blob (empty blob for a missing key).
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `out_len` must be
/// a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_hgetall(
    key: *const u8,
    key_len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    let Some(key) = slice(key, key_len) else {
        return std::ptr::null_mut();
    };
    alloc_out(wire::encode_pairs(&engine().hgetall(key)), out_len)
}

// ============================================================================
// LISTS
// ============================================================================

/// Prepends to a list. Returns the new length, or `-1` on a cross-type key.
///
/// # Safety
///
/// Both `(ptr, len)` pairs must describe valid readable slices.
#[no_mangle]
pub unsafe extern "C" fn cache_lpush(
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> i64 {
    let (Some(key), Some(value)) = (slice(key, key_len), slice(value, value_len)) else {
        return -1;
    };
    match engine().lpush(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value)) {
        Some(len) => len as i64,
        None => -1,
    }
}

/// Pops the list tail. Null when the list is empty or the key is not a
/// list.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `out_len` must be
/// a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_rpop(
    key: *const u8,
    key_len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    let Some(key) = slice(key, key_len) else {
        return std::ptr::null_mut();
    };
    match engine().rpop(key) {
        Some(value) => alloc_out(value.to_vec(), out_len),
        None => std::ptr::null_mut(),
    }
}

/// Returns an inclusive list range as an item-list blob.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `out_len` must be
/// a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_lrange(
    key: *const u8,
    key_len: usize,
    start: i64,
    end: i64,
    out_len: *mut usize,
) -> *mut u8 {
    let Some(key) = slice(key, key_len) else {
        return std::ptr::null_mut();
    };
    let items = engine().lrange(key, start, end);
    alloc_out(wire::encode_items(items.iter().map(|b| &b[..])), out_len)
}

// ============================================================================
// SETS
// ============================================================================

/// Adds a set member. True only when newly added.
///
/// # Safety
///
/// Both `(ptr, len)` pairs must describe valid readable slices.
#[no_mangle]
pub unsafe extern "C" fn cache_sadd(
    key: *const u8,
    key_len: usize,
    member: *const u8,
    member_len: usize,
) -> bool {
    let (Some(key), Some(member)) = (slice(key, key_len), slice(member, member_len)) else {
        return false;
    };
    engine().sadd(Bytes::copy_from_slice(key), Bytes::copy_from_slice(member))
}

/// Set membership test.
///
/// # Safety
///
/// Both `(ptr, len)` pairs must describe valid readable slices.
#[no_mangle]
pub unsafe extern "C" fn cache_sismember(
    key: *const u8,
    key_len: usize,
    member: *const u8,
    member_len: usize,
) -> bool {
    let (Some(key), Some(member)) = (slice(key, key_len), slice(member, member_len)) else {
        return false;
    };
    engine().sismember(key, member)
}

// ============================================================================
// SORTED SETS
// ============================================================================

/// Upserts a sorted-set member's score.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `member` must be a
/// valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_zadd(
    key: *const u8,
    key_len: usize,
    score: f64,
    member: *const c_char,
) -> bool {
    let (Some(key), Some(member)) = (slice(key, key_len), cstr(member)) else {
        return false;
    };
    engine().zadd(Bytes::copy_from_slice(key), score, member)
}

/// Returns a rank range of a sorted set as an item-list blob of members.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `out_len` must be
/// a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_zrange(
    key: *const u8,
    key_len: usize,
    start: i64,
    end: i64,
    out_len: *mut usize,
) -> *mut u8 {
    let Some(key) = slice(key, key_len) else {
        return std::ptr::null_mut();
    };
    let members = engine().zrange(key, start, end);
    alloc_out(
        wire::encode_items(members.iter().map(|m| m.as_bytes())),
        out_len,
    )
}

// ============================================================================
// STREAMS
// ============================================================================

/// Appends to a stream. Returns the new item's id, or `0` on a cross-type
/// key (valid ids start at 1).
///
/// # Safety
///
/// Both `(ptr, len)` pairs must describe valid readable slices.
#[no_mangle]
pub unsafe extern "C" fn cache_xadd(
    key: *const u8,
    key_len: usize,
    payload: *const u8,
    payload_len: usize,
) -> u64 {
    let (Some(key), Some(payload)) = (slice(key, key_len), slice(payload, payload_len)) else {
        return 0;
    };
    engine()
        .xadd(Bytes::copy_from_slice(key), Bytes::copy_from_slice(payload))
        .unwrap_or(0)
}

/// Returns the inclusive id range of a stream as a stream-slice blob.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `out_len` must be
/// a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_xrange(
    key: *const u8,
    key_len: usize,
    start_id: u64,
    end_id: u64,
    out_len: *mut usize,
) -> *mut u8 {
    let Some(key) = slice(key, key_len) else {
        return std::ptr::null_mut();
    };
    alloc_out(
        wire::encode_stream(&engine().xrange(key, start_id, end_id)),
        out_len,
    )
}

// ============================================================================
// PUB/SUB
// ============================================================================

/// Subscribes to a channel. Returns the subscription id, or `0` on a bad
/// argument (valid ids start at 1).
///
/// # Safety
///
/// `channel` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_pubsub_subscribe(channel: *const c_char) -> u64 {
    let Some(channel) = cstr(channel) else {
        return 0;
    };
    bus().subscribe(channel)
}

/// Publishes a payload on a channel. Returns the number of subscriber
/// queues reached.
///
/// # Safety
///
/// `channel` must be a valid NUL-terminated string or null;
/// `(payload, payload_len)` must describe a valid readable slice.
#[no_mangle]
pub unsafe extern "C" fn cache_pubsub_publish(
    channel: *const c_char,
    payload: *const u8,
    payload_len: usize,
) -> u64 {
    let (Some(channel), Some(payload)) = (cstr(channel), slice(payload, payload_len)) else {
        return 0;
    };
    bus().publish(channel, Bytes::copy_from_slice(payload))
}

/// Polls a subscription for its oldest pending message, encoded as a
/// message blob. Null when the queue is empty.
///
/// # Safety
///
/// `out_len` must be a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_pubsub_poll(id: u64, out_len: *mut usize) -> *mut u8 {
    match bus().try_poll(id) {
        Some(message) => alloc_out(wire::encode_message(&message), out_len),
        None => std::ptr::null_mut(),
    }
}

/// Destroys a subscription and its pending messages.
#[no_mangle]
pub extern "C" fn cache_pubsub_unsubscribe(id: u64) -> bool {
    bus().unsubscribe(id)
}

// ============================================================================
// KEYSPACE NOTIFICATIONS
// ============================================================================

/// Polls the oldest pending keyspace notification, encoded as a
/// notification blob. Null when none are pending.
///
/// # Safety
///
/// `out_len` must be a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_notifications_poll(out_len: *mut usize) -> *mut u8 {
    match engine().try_poll_notification() {
        Some(notification) => alloc_out(wire::encode_notification(&notification), out_len),
        None => std::ptr::null_mut(),
    }
}

/// Drops all pending keyspace notifications.
#[no_mangle]
pub extern "C" fn cache_notifications_clear() {
    engine().clear_notifications();
}

// ============================================================================
// JSON / INDEX / EVAL
// ============================================================================

/// Evaluates a path against a key's JSON document. Returns the serialized
/// node, or null when the key, document, or path does not resolve.
///
/// # Safety
///
/// `(key, key_len)` must describe a valid readable slice; `path` must be a
/// valid NUL-terminated string or null; `out_len` must be writable.
#[no_mangle]
pub unsafe extern "C" fn cache_json_get(
    key: *const u8,
    key_len: usize,
    path: *const c_char,
    out_len: *mut usize,
) -> *mut u8 {
    let (Some(key), Some(path)) = (slice(key, key_len), cstr(path)) else {
        return std::ptr::null_mut();
    };
    match engine().json_get(key, path) {
        Some(node) => alloc_out(node.into_bytes(), out_len),
        None => std::ptr::null_mut(),
    }
}

/// Stores a JSON value at a path inside a key's document.
///
/// # Safety
///
/// `(key, key_len)` and `(json, json_len)` must describe valid readable
/// slices; `path` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_json_set(
    key: *const u8,
    key_len: usize,
    path: *const c_char,
    json: *const u8,
    json_len: usize,
) -> bool {
    let (Some(key), Some(path), Some(json)) =
        (slice(key, key_len), cstr(path), slice(json, json_len))
    else {
        return false;
    };
    engine().json_set(key, path, json)
}

/// Builds a numeric index over a top-level JSON field.
///
/// # Safety
///
/// `field` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn cache_index_create_numeric(field: *const c_char) -> bool {
    let Some(field) = cstr(field) else {
        return false;
    };
    engine().create_numeric_index(field)
}

/// Evaluates a `field <op> literal` query. Returns the matching keys as a
/// key-list blob (empty blob when nothing matches or the query is bad).
///
/// # Safety
///
/// `query` must be a valid NUL-terminated string or null; `out_len` must be
/// a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_find(query: *const c_char, out_len: *mut usize) -> *mut u8 {
    let Some(query) = cstr(query) else {
        return std::ptr::null_mut();
    };
    let keys = engine().find_keys(query);
    alloc_out(wire::encode_items(keys.iter().map(|k| &k[..])), out_len)
}

/// Evaluates one inline command. Returns the reply string, or null for a
/// null reply.
///
/// # Safety
///
/// `script` must be a valid NUL-terminated string or null; `out_len` must
/// be a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn cache_eval(script: *const c_char, out_len: *mut usize) -> *mut u8 {
    let Some(script) = cstr(script) else {
        return std::ptr::null_mut();
    };
    match crate::commands::eval(engine(), script) {
        Some(reply) => alloc_out(reply.into_bytes(), out_len),
        None => std::ptr::null_mut(),
    }
}
