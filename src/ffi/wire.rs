//! Out-Parameter Wire Formats
//!
//! Multi-item results cross the C boundary as a single length-prefixed blob
//! the host decodes. All integers are little-endian.
//!
//! ```text
//! key list:      [count:u32] ([len:u32][bytes])*
//! pair list:     [count:u32] ([klen:u32][k][vlen:u32][v])*
//! item list:     [count:u32] ([len:u32][bytes])*
//! stream slice:  [count:u32] ([id:u64][plen:u32][payload])*
//! message:       [chlen:u32][channel][plen:u32][payload]
//! notification:  [kind:u8][klen:u32][key][at_ms:u64]
//! ```
//!
//! One encoder per shape; the host side mirrors these readers exactly.

use crate::pubsub::Message;
use crate::storage::Notification;
use bytes::Bytes;

fn put_u32(out: &mut Vec<u8>, n: u32) {
    out.extend_from_slice(&n.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, n: u64) {
    out.extend_from_slice(&n.to_le_bytes());
}

fn put_chunk(out: &mut Vec<u8>, chunk: &[u8]) {
    put_u32(out, chunk.len() as u32);
    out.extend_from_slice(chunk);
}

/// Encodes a flat list of byte items (keys, list elements, zset members).
pub fn encode_items<I, B>(items: I) -> Vec<u8>
where
    I: ExactSizeIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut out = Vec::new();
    put_u32(&mut out, items.len() as u32);
    for item in items {
        put_chunk(&mut out, item.as_ref());
    }
    out
}

/// Encodes field/value pairs (hash dumps).
pub fn encode_pairs(pairs: &[(Bytes, Bytes)]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, pairs.len() as u32);
    for (field, value) in pairs {
        put_chunk(&mut out, field);
        put_chunk(&mut out, value);
    }
    out
}

/// Encodes a stream slice of `(id, payload)` items.
pub fn encode_stream(items: &[(u64, Bytes)]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, items.len() as u32);
    for (id, payload) in items {
        put_u64(&mut out, *id);
        put_chunk(&mut out, payload);
    }
    out
}

/// Encodes one pub/sub message.
pub fn encode_message(message: &Message) -> Vec<u8> {
    let mut out = Vec::new();
    put_chunk(&mut out, message.channel.as_bytes());
    put_chunk(&mut out, &message.payload);
    out
}

/// Encodes one keyspace notification.
pub fn encode_notification(notification: &Notification) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(notification.kind as u8);
    put_chunk(&mut out, &notification.key);
    put_u64(&mut out, notification.at_ms);
    out
}
