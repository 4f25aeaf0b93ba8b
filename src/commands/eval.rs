//! Inline Command Interpreter
//!
//! This module evaluates single command strings against an engine instance.
//! It exists for hosts that want a quick scripting surface without taking on
//! the whole typed API: one line in, one string out.
//!
//! ## Supported Commands
//!
//! ### String Commands
//! - `SET key value` - Set a key, replies `OK`
//! - `GET key` - Get a key's value
//! - `DEL key` - Delete a key, replies `1` or `0`
//!
//! ### Key Commands
//! - `EXPIRE key ms` - Set expiry in milliseconds, replies `1` or `0`
//! - `TTL key` - Remaining TTL in ms (`-1` no expiry, `-2` no key)
//!
//! ### Composite Commands
//! - `HSET key field value` / `HGET key field`
//! - `LPUSH key value` (replies new length) / `RPOP key`
//! - `LRANGE key start end` - comma-separated elements
//! - `SADD key member` / `SISMEMBER key member` - reply `1` or `0`
//! - `ZADD key score member` / `ZRANGE key start end`
//!
//! ### Document Commands
//! - `JSON.SET key path json` - `json` is the remainder of the line
//! - `JSON.GET key path` - serialized node
//!
//! Errors come back as `ERR ...` reply strings; a null reply (`None`) means
//! "no value", which the C boundary surfaces as a null pointer.

use crate::storage::CacheEngine;
use bytes::Bytes;
use std::time::Duration;

/// Evaluates one command line against the engine.
///
/// Returns `None` for null replies (e.g. `GET` on a missing key) and
/// `Some("ERR ...")` for malformed input - evaluation itself never fails.
pub fn eval(engine: &CacheEngine, script: &str) -> Option<String> {
    let mut tokens = script.split_whitespace();
    let verb = tokens.next()?.to_uppercase();
    let args: Vec<&str> = tokens.collect();

    match verb.as_str() {
        "SET" => match args.as_slice() {
            [key, value] => {
                engine.set(bytes(key), bytes(value));
                Some("OK".to_string())
            }
            _ => wrong_args(&verb),
        },
        "GET" => match args.as_slice() {
            [key] => engine
                .get(key.as_bytes())
                .map(|v| String::from_utf8_lossy(&v).into_owned()),
            _ => wrong_args(&verb),
        },
        "DEL" => match args.as_slice() {
            [key] => Some(flag(engine.remove(key.as_bytes()))),
            _ => wrong_args(&verb),
        },
        "EXPIRE" => match args.as_slice() {
            [key, ms] => {
                let Ok(ms) = ms.parse::<u64>() else {
                    return Some(format!("ERR value is not an integer: '{}'", ms));
                };
                Some(flag(
                    engine.expire(key.as_bytes(), Duration::from_millis(ms)),
                ))
            }
            _ => wrong_args(&verb),
        },
        "TTL" => match args.as_slice() {
            [key] => Some(engine.ttl_ms(key.as_bytes()).to_string()),
            _ => wrong_args(&verb),
        },
        "HSET" => match args.as_slice() {
            [key, field, value] => Some(flag(engine.hset(bytes(key), bytes(field), bytes(value)))),
            _ => wrong_args(&verb),
        },
        "HGET" => match args.as_slice() {
            [key, field] => engine
                .hget(key.as_bytes(), field.as_bytes())
                .map(|v| String::from_utf8_lossy(&v).into_owned()),
            _ => wrong_args(&verb),
        },
        "LPUSH" => match args.as_slice() {
            [key, value] => match engine.lpush(bytes(key), bytes(value)) {
                Some(len) => Some(len.to_string()),
                None => Some(wrong_type()),
            },
            _ => wrong_args(&verb),
        },
        "RPOP" => match args.as_slice() {
            [key] => engine
                .rpop(key.as_bytes())
                .map(|v| String::from_utf8_lossy(&v).into_owned()),
            _ => wrong_args(&verb),
        },
        "LRANGE" => match args.as_slice() {
            [key, start, end] => {
                let (Ok(start), Ok(end)) = (start.parse::<i64>(), end.parse::<i64>()) else {
                    return Some("ERR value is not an integer".to_string());
                };
                let items: Vec<String> = engine
                    .lrange(key.as_bytes(), start, end)
                    .iter()
                    .map(|v| String::from_utf8_lossy(v).into_owned())
                    .collect();
                Some(items.join(","))
            }
            _ => wrong_args(&verb),
        },
        "SADD" => match args.as_slice() {
            [key, member] => Some(flag(engine.sadd(bytes(key), bytes(member)))),
            _ => wrong_args(&verb),
        },
        "SISMEMBER" => match args.as_slice() {
            [key, member] => Some(flag(engine.sismember(key.as_bytes(), member.as_bytes()))),
            _ => wrong_args(&verb),
        },
        "ZADD" => match args.as_slice() {
            [key, score, member] => {
                let Ok(score) = score.parse::<f64>() else {
                    return Some(format!("ERR value is not a valid float: '{}'", score));
                };
                Some(flag(engine.zadd(bytes(key), score, member)))
            }
            _ => wrong_args(&verb),
        },
        "ZRANGE" => match args.as_slice() {
            [key, start, end] => {
                let (Ok(start), Ok(end)) = (start.parse::<i64>(), end.parse::<i64>()) else {
                    return Some("ERR value is not an integer".to_string());
                };
                Some(engine.zrange(key.as_bytes(), start, end).join(","))
            }
            _ => wrong_args(&verb),
        },
        "JSON.SET" => {
            // The JSON literal may itself contain whitespace: take the
            // tail of the line past the verb, key and path tokens
            let [key, path, ..] = args.as_slice() else {
                return wrong_args(&verb);
            };
            if args.len() < 3 {
                return wrong_args(&verb);
            }
            let json = tail_after_tokens(script, 3)?;
            Some(flag(engine.json_set(key.as_bytes(), path, json.as_bytes())))
        }
        "JSON.GET" => match args.as_slice() {
            [key, path] => engine.json_get(key.as_bytes(), path),
            _ => wrong_args(&verb),
        },
        _ => Some(format!("ERR unknown command '{}'", verb)),
    }
}

fn bytes(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn flag(applied: bool) -> String {
    if applied { "1" } else { "0" }.to_string()
}

fn wrong_args(verb: &str) -> Option<String> {
    Some(format!(
        "ERR wrong number of arguments for '{}' command",
        verb
    ))
}

fn wrong_type() -> String {
    "ERR wrong value type for key".to_string()
}

/// Returns the trimmed text left after skipping the first `skip`
/// whitespace-separated tokens of `script`. Used to recover a
/// whitespace-bearing trailing argument by position, so the tail is found
/// even when an earlier token's text reappears inside it.
fn tail_after_tokens(script: &str, skip: usize) -> Option<&str> {
    let mut rest = script.trim_start();
    for _ in 0..skip {
        let cut = rest.find(char::is_whitespace)?;
        rest = rest[cut..].trim_start();
    }
    let rest = rest.trim_end();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}
