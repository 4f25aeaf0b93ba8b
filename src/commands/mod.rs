//! Command Processing Module
//!
//! This module implements the inline command layer: a one-line scripting
//! surface over the engine for hosts that want ad-hoc commands without
//! touching the typed API.
//!
//! ## Architecture
//!
//! ```text
//! Command String
//!       │
//!       ▼
//! ┌─────────────────┐
//! │     eval()      │  (this module)
//! │                 │
//! │  - Tokenize     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  CacheEngine    │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `SET`, `GET`, `DEL`
//! - `EXPIRE`, `TTL`
//! - `HSET`, `HGET`
//! - `LPUSH`, `RPOP`, `LRANGE`
//! - `SADD`, `SISMEMBER`
//! - `ZADD`, `ZRANGE`
//! - `JSON.SET`, `JSON.GET`

pub mod eval;

pub use eval::eval;
