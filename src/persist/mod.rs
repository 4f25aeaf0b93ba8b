//! Append-Only Persistence
//!
//! Every accepted mutation can be journaled to an append-only file (AOF) and
//! replayed later to reconstruct the keyspace. Replay goes through the same
//! engine entry points as live traffic, so a replayed file always produces the
//! state live execution would have produced.
//!
//! - [`aof::Record`] - the self-describing on-disk record format
//! - [`aof::Aof`] - the append side (enable / disable / append)
//! - [`aof::read_records`] - the replay side (tolerant of a truncated tail)

pub mod aof;

pub use aof::{read_records, Aof, AofError, Record};
