//! Document Queries
//!
//! Both sublanguages here operate on a key's byte value interpreted as a JSON
//! document:
//!
//! - [`jsonpath`] - a restricted path grammar (`$`, `.field`, `[n]`) for
//!   structural get/set inside one document
//! - [`index`] - ordered numeric secondary indexes over document fields, plus
//!   the `field <op> literal` comparison-query evaluator

pub mod index;
pub mod jsonpath;

pub use index::{IndexRegistry, QueryError};
pub use jsonpath::{parse_path, PathError, PathSegment};
