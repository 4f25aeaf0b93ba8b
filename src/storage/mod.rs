//! Keyspace Storage Module
//!
//! This module provides the core storage functionality: a thread-safe,
//! sharded, multi-model keyspace with TTL support, LRU capacity enforcement,
//! keyspace notifications and a background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CacheEngine                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │      ExpirySweeper        │
//!              │   (Background Thread)     │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **Multi-Model Values**: bytes, hashes, lists, sets, sorted sets, streams
//! - **TTL Support**: lazy expiry on access plus an active background sweeper
//! - **LRU Eviction**: a capacity bound enforced by recency stamps
//! - **Notifications**: eviction and active expiry feed a pollable FIFO
//!
//! ## Example
//!
//! ```
//! use embercache::storage::{CacheEngine, ExpirySweeper, SweepConfig};
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = Arc::new(CacheEngine::new());
//!
//! // Basic operations
//! engine.set(Bytes::from("name"), Bytes::from("ember"));
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("ember")));
//!
//! // Set with TTL
//! engine.set_with_ttl(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Duration::from_secs(3600),
//! );
//! ```

pub mod engine;
pub mod expiry;
pub mod notify;
pub mod value;

// Re-export commonly used types
pub use engine::{BytesLease, CacheEngine, EngineStats, ReadOutcome, DEFAULT_MAX_ITEMS};
pub use expiry::{start_expiry_sweeper, ExpirySweeper, SweepConfig};
pub use notify::{Notification, NotificationKind};
pub use value::{Entry, Value};
