//! Numeric Secondary Indexes
//!
//! An index maps one top-level document field to an ordered `score -> keys`
//! table. Indexes are built from a snapshot of the keyspace and then kept
//! incrementally consistent: the engine reports every write and removal of a
//! byte-valued key here *before* acknowledging it to the caller.
//!
//! Queries are single comparisons: `field <op> literal` with
//! `op` one of `==`, `>=`, `<=`, `>`, `<`.

use bytes::Bytes;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

/// Errors raised while parsing a comparison query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query is not of the form `field <op> literal`
    #[error("query must be 'field <op> literal'")]
    BadShape,

    /// The operator is not one of ==, >=, <=, >, <
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// The literal is not a number
    #[error("invalid numeric literal: {0}")]
    BadLiteral(String),

    /// No index exists for the queried field
    #[error("no index on field: {0}")]
    NoIndex(String),
}

/// An `f64` score with a total order, usable as a BTreeMap key.
///
/// NaN never enters an index (non-finite extractions are skipped), so the
/// total order here is only a formality for the type system.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score(f64);

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

/// A parsed `field <op> literal` comparison.
#[derive(Debug, Clone, PartialEq)]
struct Comparison {
    field: String,
    op: CmpOp,
    literal: f64,
}

fn parse_query(query: &str) -> Result<Comparison, QueryError> {
    let mut parts = query.split_whitespace();
    let (Some(field), Some(op), Some(literal), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(QueryError::BadShape);
    };

    let op = match op {
        "==" => CmpOp::Eq,
        ">=" => CmpOp::Ge,
        "<=" => CmpOp::Le,
        ">" => CmpOp::Gt,
        "<" => CmpOp::Lt,
        other => return Err(QueryError::UnknownOperator(other.to_string())),
    };

    let literal: f64 = literal
        .parse()
        .map_err(|_| QueryError::BadLiteral(literal.to_string()))?;

    Ok(Comparison {
        field: field.to_string(),
        op,
        literal,
    })
}

/// One field's index: ordered score table plus a reverse map for removal.
#[derive(Debug, Default)]
struct NumericIndex {
    by_score: BTreeMap<Score, BTreeSet<Bytes>>,
    by_key: HashMap<Bytes, Score>,
}

impl NumericIndex {
    fn insert(&mut self, key: Bytes, score: f64) {
        self.remove(&key);
        let score = Score(score);
        self.by_score.entry(score).or_default().insert(key.clone());
        self.by_key.insert(key, score);
    }

    fn remove(&mut self, key: &[u8]) {
        if let Some(score) = self.by_key.remove(key) {
            if let Some(keys) = self.by_score.get_mut(&score) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_score.remove(&score);
                }
            }
        }
    }

    fn select(&self, op: CmpOp, literal: f64) -> Vec<Bytes> {
        let literal = Score(literal);
        let range: Box<dyn Iterator<Item = (&Score, &BTreeSet<Bytes>)>> = match op {
            CmpOp::Eq => Box::new(
                self.by_score
                    .range((Bound::Included(literal), Bound::Included(literal))),
            ),
            CmpOp::Ge => Box::new(self.by_score.range(literal..)),
            CmpOp::Gt => Box::new(
                self.by_score
                    .range((Bound::Excluded(literal), Bound::Unbounded)),
            ),
            CmpOp::Le => Box::new(self.by_score.range(..=literal)),
            CmpOp::Lt => Box::new(self.by_score.range(..literal)),
        };

        range.flat_map(|(_, keys)| keys.iter().cloned()).collect()
    }
}

/// Extracts a finite numeric top-level `field` from a document.
fn extract_numeric(doc: &Value, field: &str) -> Option<f64> {
    let n = doc.as_object()?.get(field)?.as_f64()?;
    n.is_finite().then_some(n)
}

/// All registered indexes for one engine instance.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: RwLock<HashMap<String, NumericIndex>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no index is registered - the engine skips document parsing
    /// entirely in that case.
    pub fn is_empty(&self) -> bool {
        let indexes = self.indexes.read().unwrap_or_else(|e| e.into_inner());
        indexes.is_empty()
    }

    /// Registers an index on `field`, built from `snapshot`.
    ///
    /// Re-creating an existing index rebuilds it from the snapshot.
    pub fn create<I>(&self, field: &str, snapshot: I)
    where
        I: IntoIterator<Item = (Bytes, Value)>,
    {
        let mut index = NumericIndex::default();
        let mut scanned = 0usize;
        for (key, doc) in snapshot {
            scanned += 1;
            if let Some(n) = extract_numeric(&doc, field) {
                index.insert(key, n);
            }
        }
        debug!(field, scanned, indexed = index.by_key.len(), "Numeric index built");

        let mut indexes = self.indexes.write().unwrap_or_else(|e| e.into_inner());
        indexes.insert(field.to_string(), index);
    }

    /// Reports a write of a byte-valued key.
    ///
    /// `doc` is the parsed document, or `None` when the new value is not
    /// JSON - in which case the key leaves every index.
    pub fn update(&self, key: &Bytes, doc: Option<&Value>) {
        let mut indexes = self.indexes.write().unwrap_or_else(|e| e.into_inner());
        for (field, index) in indexes.iter_mut() {
            match doc.and_then(|d| extract_numeric(d, field)) {
                Some(n) => index.insert(key.clone(), n),
                None => index.remove(key),
            }
        }
    }

    /// Reports that a key left the keyspace (remove, eviction, expiry).
    pub fn remove_key(&self, key: &[u8]) {
        let mut indexes = self.indexes.write().unwrap_or_else(|e| e.into_inner());
        for index in indexes.values_mut() {
            index.remove(key);
        }
    }

    /// Drops all indexed entries but keeps the registered fields.
    pub fn clear_entries(&self) {
        let mut indexes = self.indexes.write().unwrap_or_else(|e| e.into_inner());
        for index in indexes.values_mut() {
            *index = NumericIndex::default();
        }
    }

    /// Evaluates a comparison query against the matching index.
    pub fn find(&self, query: &str) -> Result<Vec<Bytes>, QueryError> {
        let cmp = parse_query(query)?;
        let indexes = self.indexes.read().unwrap_or_else(|e| e.into_inner());
        let index = indexes
            .get(&cmp.field)
            .ok_or_else(|| QueryError::NoIndex(cmp.field.clone()))?;
        Ok(index.select(cmp.op, cmp.literal))
    }
}
