//! Restricted JSON Path Grammar
//!
//! Paths address a single node inside a JSON document:
//!
//! - `$` - the document root
//! - `.field` - object member access
//! - `[n]` - zero-based array index
//!
//! Segments compose: `$.user.tags[1]`. Anything else is a parse error. This
//! is deliberately not full JSONPath - no wildcards, slices, filters or
//! recursive descent.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while parsing a path expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path does not start with `$`
    #[error("path must start with '$'")]
    MissingRoot,

    /// An object member segment has no name, e.g. `$.`
    #[error("empty field name at offset {0}")]
    EmptyField(usize),

    /// An array index is missing, not a number, or unterminated
    #[error("invalid array index at offset {0}")]
    BadIndex(usize),

    /// A character that starts no valid segment
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
}

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// `.name` - object member
    Field(String),
    /// `[n]` - array element
    Index(usize),
}

/// Parses a path expression into its segments.
///
/// `$` alone parses to an empty segment list (the root itself).
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, PathError> {
    let bytes = path.as_bytes();
    if bytes.first() != Some(&b'$') {
        return Err(PathError::MissingRoot);
    }

    let mut segments = Vec::new();
    let mut pos = 1usize;

    while pos < bytes.len() {
        match bytes[pos] {
            b'.' => {
                pos += 1;
                let start = pos;
                while pos < bytes.len() && bytes[pos] != b'.' && bytes[pos] != b'[' {
                    pos += 1;
                }
                if pos == start {
                    return Err(PathError::EmptyField(start));
                }
                segments.push(PathSegment::Field(path[start..pos].to_string()));
            }
            b'[' => {
                pos += 1;
                let start = pos;
                while pos < bytes.len() && bytes[pos] != b']' {
                    pos += 1;
                }
                if pos >= bytes.len() || pos == start {
                    return Err(PathError::BadIndex(start));
                }
                let idx: usize = path[start..pos]
                    .parse()
                    .map_err(|_| PathError::BadIndex(start))?;
                segments.push(PathSegment::Index(idx));
                pos += 1; // consume ']'
            }
            other => {
                return Err(PathError::UnexpectedChar {
                    ch: other as char,
                    offset: pos,
                })
            }
        }
    }

    Ok(segments)
}

/// Walks `root` along `segments`, returning the addressed node if every step
/// resolves.
pub fn resolve<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = match segment {
            PathSegment::Field(name) => node.as_object()?.get(name)?,
            PathSegment::Index(idx) => node.as_array()?.get(*idx)?,
        };
    }
    Some(node)
}

/// Replaces the node at `segments` with `new_value`, creating intermediate
/// *objects* along `.field` steps as needed.
///
/// Arrays are never auto-extended: an `[n]` step must land inside the array's
/// current length. Returns `false` when the path cannot be resolved (and
/// leaves `root` in a partially-extended but structurally valid state only
/// when intermediate objects were created along an ultimately valid prefix -
/// callers treat a `false` as "no write happened" because they only persist
/// the document on `true`).
pub fn assign(root: &mut Value, segments: &[PathSegment], new_value: Value) -> bool {
    let Some((last, prefix)) = segments.split_last() else {
        // `$` - replace the whole document
        *root = new_value;
        return true;
    };

    let mut node = root;
    for segment in prefix {
        node = match segment {
            PathSegment::Field(name) => {
                if !node.is_object() {
                    return false;
                }
                let map = node.as_object_mut().expect("checked is_object");
                map.entry(name.clone())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()))
            }
            PathSegment::Index(idx) => {
                let Some(array) = node.as_array_mut() else {
                    return false;
                };
                match array.get_mut(*idx) {
                    Some(child) => child,
                    None => return false,
                }
            }
        };
    }

    match last {
        PathSegment::Field(name) => {
            let Some(map) = node.as_object_mut() else {
                return false;
            };
            map.insert(name.clone(), new_value);
            true
        }
        PathSegment::Index(idx) => {
            let Some(array) = node.as_array_mut() else {
                return false;
            };
            match array.get_mut(*idx) {
                Some(slot) => {
                    *slot = new_value;
                    true
                }
                None => {
                    // One-past-the-end is the only permitted growth: it is how
                    // the accessor appends (`tags[1]` on a one-element array)
                    if *idx == array.len() {
                        array.push(new_value);
                        true
                    } else {
                        false
                    }
                }
            }
        }
    }
}
