//! AOF Record Format and Writer
//!
//! ## On-Disk Format
//!
//! The log is a flat sequence of self-describing records. Each record starts
//! with a one-byte tag followed by its fields. Byte fields are `u32`
//! little-endian length-prefixed; integers are little-endian; scores are the
//! `f64` bit pattern, little-endian.
//!
//! ```text
//! [tag:u8] [field...]
//!
//! Set        = 1   [klen][key][vlen][val]
//! SetWithTtl = 2   [klen][key][vlen][val][ttl_ms:u64]
//! Remove     = 3   [klen][key]
//! ClearAll   = 4
//! Expire     = 5   [klen][key][ttl_ms:u64]
//! HSet       = 6   [klen][key][flen][field][vlen][val]
//! LPush      = 7   [klen][key][vlen][val]
//! RPop       = 8   [klen][key]
//! SAdd       = 9   [klen][key][mlen][member]
//! ZAdd       = 10  [klen][key][score:f64][mlen][member]
//! XAdd       = 11  [klen][key][plen][payload]
//! ```
//!
//! ## Failure Policy
//!
//! A record cut short by a crash is a *truncated tail*: replay stops at the
//! last complete record and reports success. An unknown tag is *interior
//! corruption* and fails the whole load.

use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while writing or decoding the log.
#[derive(Debug, Error)]
pub enum AofError {
    /// Underlying file I/O failed
    #[error("aof io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file ends in the middle of a record
    #[error("truncated trailing record at offset {0}")]
    TruncatedRecord(usize),

    /// A record carries a tag this build does not know
    #[error("corrupt record: unknown tag {tag:#04x} at offset {offset}")]
    CorruptRecord { tag: u8, offset: usize },
}

/// One journaled mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Set { key: Bytes, value: Bytes },
    SetWithTtl { key: Bytes, value: Bytes, ttl_ms: u64 },
    Remove { key: Bytes },
    ClearAll,
    Expire { key: Bytes, ttl_ms: u64 },
    HSet { key: Bytes, field: Bytes, value: Bytes },
    LPush { key: Bytes, value: Bytes },
    RPop { key: Bytes },
    SAdd { key: Bytes, member: Bytes },
    ZAdd { key: Bytes, score: f64, member: Bytes },
    XAdd { key: Bytes, payload: Bytes },
}

mod tag {
    pub const SET: u8 = 1;
    pub const SET_WITH_TTL: u8 = 2;
    pub const REMOVE: u8 = 3;
    pub const CLEAR_ALL: u8 = 4;
    pub const EXPIRE: u8 = 5;
    pub const HSET: u8 = 6;
    pub const LPUSH: u8 = 7;
    pub const RPOP: u8 = 8;
    pub const SADD: u8 = 9;
    pub const ZADD: u8 = 10;
    pub const XADD: u8 = 11;
}

fn put_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    buf.extend_from_slice(&(b.len() as u32).to_le_bytes());
    buf.extend_from_slice(b);
}

impl Record {
    /// Serializes this record onto the end of `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Record::Set { key, value } => {
                buf.push(tag::SET);
                put_bytes(buf, key);
                put_bytes(buf, value);
            }
            Record::SetWithTtl { key, value, ttl_ms } => {
                buf.push(tag::SET_WITH_TTL);
                put_bytes(buf, key);
                put_bytes(buf, value);
                buf.extend_from_slice(&ttl_ms.to_le_bytes());
            }
            Record::Remove { key } => {
                buf.push(tag::REMOVE);
                put_bytes(buf, key);
            }
            Record::ClearAll => buf.push(tag::CLEAR_ALL),
            Record::Expire { key, ttl_ms } => {
                buf.push(tag::EXPIRE);
                put_bytes(buf, key);
                buf.extend_from_slice(&ttl_ms.to_le_bytes());
            }
            Record::HSet { key, field, value } => {
                buf.push(tag::HSET);
                put_bytes(buf, key);
                put_bytes(buf, field);
                put_bytes(buf, value);
            }
            Record::LPush { key, value } => {
                buf.push(tag::LPUSH);
                put_bytes(buf, key);
                put_bytes(buf, value);
            }
            Record::RPop { key } => {
                buf.push(tag::RPOP);
                put_bytes(buf, key);
            }
            Record::SAdd { key, member } => {
                buf.push(tag::SADD);
                put_bytes(buf, key);
                put_bytes(buf, member);
            }
            Record::ZAdd { key, score, member } => {
                buf.push(tag::ZADD);
                put_bytes(buf, key);
                buf.extend_from_slice(&score.to_le_bytes());
                put_bytes(buf, member);
            }
            Record::XAdd { key, payload } => {
                buf.push(tag::XADD);
                put_bytes(buf, key);
                put_bytes(buf, payload);
            }
        }
    }

    /// Decodes the record starting at `*pos`, advancing `*pos` past it.
    ///
    /// Returns `Ok(None)` on a clean end of input.
    pub fn decode(data: &[u8], pos: &mut usize) -> Result<Option<Record>, AofError> {
        if *pos >= data.len() {
            return Ok(None);
        }
        let start = *pos;
        let t = data[*pos];
        *pos += 1;

        let mut take_bytes = |pos: &mut usize| -> Result<Bytes, AofError> {
            if *pos + 4 > data.len() {
                return Err(AofError::TruncatedRecord(start));
            }
            let len =
                u32::from_le_bytes(data[*pos..*pos + 4].try_into().unwrap()) as usize;
            *pos += 4;
            if *pos + len > data.len() {
                return Err(AofError::TruncatedRecord(start));
            }
            let b = Bytes::copy_from_slice(&data[*pos..*pos + len]);
            *pos += len;
            Ok(b)
        };
        let take_u64 = |data: &[u8], pos: &mut usize| -> Result<u64, AofError> {
            if *pos + 8 > data.len() {
                return Err(AofError::TruncatedRecord(start));
            }
            let v = u64::from_le_bytes(data[*pos..*pos + 8].try_into().unwrap());
            *pos += 8;
            Ok(v)
        };

        let record = match t {
            tag::SET => {
                let key = take_bytes(pos)?;
                let value = take_bytes(pos)?;
                Record::Set { key, value }
            }
            tag::SET_WITH_TTL => {
                let key = take_bytes(pos)?;
                let value = take_bytes(pos)?;
                let ttl_ms = take_u64(data, pos)?;
                Record::SetWithTtl { key, value, ttl_ms }
            }
            tag::REMOVE => Record::Remove { key: take_bytes(pos)? },
            tag::CLEAR_ALL => Record::ClearAll,
            tag::EXPIRE => {
                let key = take_bytes(pos)?;
                let ttl_ms = take_u64(data, pos)?;
                Record::Expire { key, ttl_ms }
            }
            tag::HSET => {
                let key = take_bytes(pos)?;
                let field = take_bytes(pos)?;
                let value = take_bytes(pos)?;
                Record::HSet { key, field, value }
            }
            tag::LPUSH => {
                let key = take_bytes(pos)?;
                let value = take_bytes(pos)?;
                Record::LPush { key, value }
            }
            tag::RPOP => Record::RPop { key: take_bytes(pos)? },
            tag::SADD => {
                let key = take_bytes(pos)?;
                let member = take_bytes(pos)?;
                Record::SAdd { key, member }
            }
            tag::ZADD => {
                let key = take_bytes(pos)?;
                if *pos + 8 > data.len() {
                    return Err(AofError::TruncatedRecord(start));
                }
                let score =
                    f64::from_le_bytes(data[*pos..*pos + 8].try_into().unwrap());
                *pos += 8;
                let member = take_bytes(pos)?;
                Record::ZAdd { key, score, member }
            }
            tag::XADD => {
                let key = take_bytes(pos)?;
                let payload = take_bytes(pos)?;
                Record::XAdd { key, payload }
            }
            other => {
                return Err(AofError::CorruptRecord {
                    tag: other,
                    offset: start,
                })
            }
        };

        Ok(Some(record))
    }
}

/// The append side of the log.
///
/// While enabled, `append` serializes each record and flushes it through a
/// `BufWriter` so the data survives process exit (no fsync per record). A
/// write failure disables logging rather than failing the mutation that
/// triggered it.
#[derive(Debug, Default)]
pub struct Aof {
    writer: std::sync::Mutex<Option<BufWriter<File>>>,
}

impl Aof {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `path` for append and starts journaling.
    ///
    /// Fails closed: an unwritable path leaves the previous state untouched
    /// and returns `false`.
    pub fn enable(&self, path: &Path) -> bool {
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to enable AOF");
                return false;
            }
        };

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        *writer = Some(BufWriter::new(file));
        debug!(path = %path.display(), "AOF enabled");
        true
    }

    /// Stops journaling and flushes what is buffered.
    pub fn disable(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut w) = writer.take() {
            let _ = w.flush();
            debug!("AOF disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.is_some()
    }

    /// Appends one record if journaling is enabled.
    pub fn append(&self, record: &Record) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let Some(w) = writer.as_mut() else {
            return;
        };

        let mut buf = Vec::with_capacity(64);
        record.encode_into(&mut buf);

        if let Err(err) = w.write_all(&buf).and_then(|_| w.flush()) {
            warn!(error = %err, "AOF append failed, disabling journal");
            *writer = None;
        }
    }
}

/// Reads every complete record from `path`, in file order.
///
/// A truncated trailing record stops replay and is *not* an error; an
/// interior corrupt record (unknown tag) is fatal.
pub fn read_records(path: &Path) -> Result<Vec<Record>, AofError> {
    let data = std::fs::read(path)?;
    let mut records = Vec::new();
    let mut pos = 0usize;

    loop {
        match Record::decode(&data, &mut pos) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => break,
            Err(AofError::TruncatedRecord(offset)) => {
                warn!(
                    offset,
                    replayed = records.len(),
                    "AOF ends in a partial record, ignoring tail"
                );
                break;
            }
            Err(err) => return Err(err),
        }
    }

    debug!(path = %path.display(), records = records.len(), "AOF read");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(records: &[Record]) -> Vec<Record> {
        let mut buf = Vec::new();
        for r in records {
            r.encode_into(&mut buf);
        }
        let mut out = Vec::new();
        let mut pos = 0;
        while let Some(r) = Record::decode(&buf, &mut pos).unwrap() {
            out.push(r);
        }
        out
    }

    #[test]
    fn records_roundtrip_through_encoding() {
        let records = vec![
            Record::Set {
                key: Bytes::from("k"),
                value: Bytes::from("v"),
            },
            Record::SetWithTtl {
                key: Bytes::from("t"),
                value: Bytes::from("v"),
                ttl_ms: 1500,
            },
            Record::Remove { key: Bytes::from("k") },
            Record::ClearAll,
            Record::Expire {
                key: Bytes::from("t"),
                ttl_ms: 99,
            },
            Record::HSet {
                key: Bytes::from("h"),
                field: Bytes::from("f"),
                value: Bytes::from("v"),
            },
            Record::LPush {
                key: Bytes::from("l"),
                value: Bytes::from("x"),
            },
            Record::RPop { key: Bytes::from("l") },
            Record::SAdd {
                key: Bytes::from("s"),
                member: Bytes::from("m"),
            },
            Record::ZAdd {
                key: Bytes::from("z"),
                score: 4.25,
                member: Bytes::from("alice"),
            },
            Record::XAdd {
                key: Bytes::from("x"),
                payload: Bytes::from("payload"),
            },
        ];

        assert_eq!(roundtrip(&records), records);
    }

    #[test]
    fn empty_values_are_preserved() {
        let records = vec![Record::Set {
            key: Bytes::from("k"),
            value: Bytes::new(),
        }];
        assert_eq!(roundtrip(&records), records);
    }

    #[test]
    fn truncated_tail_is_detected() {
        let mut buf = Vec::new();
        Record::Set {
            key: Bytes::from("key"),
            value: Bytes::from("value"),
        }
        .encode_into(&mut buf);
        let full_len = buf.len();
        buf.truncate(full_len - 3);

        let mut pos = 0;
        match Record::decode(&buf, &mut pos) {
            Err(AofError::TruncatedRecord(0)) => {}
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_is_corrupt() {
        let buf = vec![0xEEu8, 0, 0, 0];
        let mut pos = 0;
        match Record::decode(&buf, &mut pos) {
            Err(AofError::CorruptRecord { tag: 0xEE, offset: 0 }) => {}
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn enable_fails_closed_on_unwritable_path() {
        let aof = Aof::new();
        assert!(!aof.enable(Path::new("/definitely/not/a/real/dir/journal.aof")));
        assert!(!aof.is_enabled());
    }

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.aof");

        let aof = Aof::new();
        assert!(aof.enable(&path));
        aof.append(&Record::Set {
            key: Bytes::from("a"),
            value: Bytes::from("1"),
        });
        aof.append(&Record::Remove { key: Bytes::from("a") });
        aof.disable();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            Record::Set {
                key: Bytes::from("a"),
                value: Bytes::from("1"),
            }
        );
    }

    #[test]
    fn read_ignores_partial_trailing_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.aof");

        let mut buf = Vec::new();
        Record::Set {
            key: Bytes::from("good"),
            value: Bytes::from("1"),
        }
        .encode_into(&mut buf);
        let complete = buf.len();
        Record::Set {
            key: Bytes::from("partial"),
            value: Bytes::from("2"),
        }
        .encode_into(&mut buf);
        buf.truncate(complete + 4);
        std::fs::write(&path, &buf).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn read_fails_on_interior_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.aof");

        let mut buf = vec![0xABu8];
        Record::ClearAll.encode_into(&mut buf);
        std::fs::write(&path, &buf).unwrap();

        assert!(read_records(&path).is_err());
    }
}
