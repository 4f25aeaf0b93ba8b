//! # EmberCache - An Embedded, Multi-Model In-Memory Cache
//!
//! EmberCache is an in-process key-value engine with Redis-flavored data
//! types, built to be embedded in a host application either as a Rust crate
//! or through its stable C boundary (the crate builds as a `cdylib`).
//! There is no server and no wire protocol: every operation is a function
//! call against an engine instance living in the host's address space.
//!
//! ## Features
//!
//! - **Multi-Model Values**: byte strings, hashes, lists, sets, sorted sets
//!   and append-only streams under one keyspace
//! - **High Performance**: sharded storage with RwLock for concurrent access
//! - **TTL Support**: lazy expiry on access plus a background sweeper thread
//! - **LRU Eviction**: a configurable capacity bound with eviction
//!   notifications
//! - **Persistence**: an append-only journal that replays into an identical
//!   keyspace
//! - **Queries**: a JSON-path accessor, numeric secondary indexes, polling
//!   pub/sub and a one-line command interpreter
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             EmberCache                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ C Boundary  │───>│   eval()    │    │  PubSubBus  │                  │
//! │  │   (ffi)     │    │ (commands)  │    │  (pubsub)   │                  │
//! │  └──────┬──────┘    └──────┬──────┘    └─────────────┘                  │
//! │         │                  │                                            │
//! │         ▼                  ▼                                            │
//! │  ┌──────────────────────────────────────────────┐   ┌───────────────┐  │
//! │  │                CacheEngine                   │──>│  AOF journal  │  │
//! │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │   (persist)   │  │
//! │  │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...64   │ │   └───────────────┘  │
//! │  │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   ┌───────────────┐  │
//! │  │  └────────┘ └────────┘ └────────┘ └────────┘ │──>│ IndexRegistry │  │
//! │  └──────────────────────────────────────────────┘   │ + JSON paths  │  │
//! │                         ▲                           │    (query)    │  │
//! │                         │                           └───────────────┘  │
//! │           ┌─────────────┴─────────────┐                                │
//! │           │       ExpirySweeper       │                                │
//! │           │    (Background Thread)    │                                │
//! │           └───────────────────────────┘                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use embercache::storage::{start_expiry_sweeper, CacheEngine};
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = Arc::new(CacheEngine::new());
//!
//! // Reap expired keys in the background
//! let _sweeper = start_expiry_sweeper(Arc::clone(&engine));
//!
//! engine.set(Bytes::from("name"), Bytes::from("ember"));
//! engine.set_with_ttl(Bytes::from("session"), Bytes::from("tok"), Duration::from_secs(60));
//!
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("ember")));
//!
//! // Composite types live in the same keyspace
//! engine.lpush(Bytes::from("queue"), Bytes::from("job-1"));
//! assert_eq!(engine.rpop(b"queue"), Some(Bytes::from("job-1")));
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the sharded multi-model engine, TTL expiry, LRU eviction
//!   and keyspace notifications
//! - [`persist`]: the append-only journal format and writer
//! - [`query`]: the JSON-path accessor and numeric secondary indexes
//! - [`pubsub`]: the polling publish/subscribe bus
//! - [`commands`]: the one-line command interpreter
//! - [`ffi`]: the stable C-callable surface over all of the above
//!
//! ## Design Highlights
//!
//! ### Thread Safety
//!
//! The engine uses a sharded design with 64 independent RwLocks. Multiple
//! threads read and write different keys concurrently without blocking each
//! other; same-key operations are linearized by the key's shard lock.
//!
//! ### Zero-Copy Values
//!
//! Values are `bytes::Bytes`: reads and leases are refcount bumps, and a
//! write replaces the buffer wholesale, so an outstanding lease keeps its
//! version alive without blocking writers.
//!
//! ### Lazy + Active Expiry
//!
//! Keys with TTL are expired in two ways:
//! 1. **Lazy**: an access to an expired key reaps it and reads as a miss
//! 2. **Active**: a background thread periodically sweeps the keyspace and
//!    emits `Expired` notifications for what it reaps
//!
//! This ensures memory is reclaimed even for keys that are never accessed
//! again.

pub mod commands;
pub mod ffi;
pub mod persist;
pub mod pubsub;
pub mod query;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::eval;
pub use persist::{Aof, AofError, Record};
pub use pubsub::{Message, PubSubBus};
pub use query::IndexRegistry;
pub use storage::{
    start_expiry_sweeper, BytesLease, CacheEngine, ExpirySweeper, Notification, NotificationKind,
    ReadOutcome, SweepConfig,
};

/// Version of EmberCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
