//! In-memory instance backed by one JSON item tree.
//!
//! # Responsibility
//! - Read the canonical config text into `self/config`.
//! - Serve `/`-separated path reads and writes.
//!
//! # Invariants
//! - The root of the item tree is always an object.
//! - Readiness flips to `true` exactly once, on the first `init()`.

use crate::error::ConstructionError;
use crate::instance::{InstanceCore, CONFIG_KEY};
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

const OPTION_SEPARATOR: char = ';';
const OPTION_ASSIGN: char = '=';
const OPTION_PATH_SEPARATOR: char = '.';

#[derive(Debug, Default)]
pub struct MemoryInstance {
    items: Mutex<Map<String, Value>>,
    ready: AtomicBool,
}

impl MemoryInstance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an instance whose `self/config` is read from canonical text.
    pub fn from_config(canonical: &str) -> Result<Self, ConstructionError> {
        let config = parse_config(canonical)?;
        let instance = Self::new();
        instance.set(CONFIG_KEY, config);
        Ok(instance)
    }
}

#[async_trait]
impl InstanceCore for MemoryInstance {
    fn get(&self, key: &str) -> Option<Value> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let mut segments = key_segments(key);
        let Some(first) = segments.next() else {
            return Some(Value::Object(items.clone()));
        };
        let mut current = items.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    /// Writes `value` at `key`. An empty key replaces the whole tree, which
    /// only accepts an object; any other root value is logged and left out.
    fn set(&self, key: &str, value: Value) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let segments: Vec<&str> = key_segments(key).collect();
        if segments.is_empty() {
            match value {
                Value::Object(map) => *items = map,
                other => warn!(
                    "event=item_set module=instance status=rejected reason=root_requires_object found={}",
                    crate::config::json_type_name(&other)
                ),
            }
            return;
        }
        insert_path(&mut items, &segments, value);
    }

    async fn init(&self, extensions: &[String]) -> Result<(), ConstructionError> {
        if !self.ready.swap(true, Ordering::SeqCst) {
            debug!(
                "event=instance_ready module=instance status=ok extensions={}",
                extensions.len()
            );
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

fn key_segments(key: &str) -> impl Iterator<Item = &str> {
    key.split('/').filter(|segment| !segment.is_empty())
}

/// Inserts `value` at `path`, replacing non-object parents with objects.
fn insert_path(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(inner) = child {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// Reads canonical config text.
///
/// Accepts a JSON object, or `path.to.key=value;other=value` options whose
/// values are JSON when they parse and plain strings otherwise. Blank text
/// yields an empty object.
pub fn parse_config(canonical: &str) -> Result<Value, ConstructionError> {
    let trimmed = canonical.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    if trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => Ok(value),
            Ok(_) => Err(ConstructionError::new("config text must be a JSON object")),
            Err(err) => Err(ConstructionError::new(format!(
                "config text is not valid JSON: {err}"
            ))),
        };
    }

    let mut config = Map::new();
    for option in trimmed.split(OPTION_SEPARATOR) {
        let option = option.trim();
        if option.is_empty() {
            continue;
        }
        let Some((path, raw_value)) = option.split_once(OPTION_ASSIGN) else {
            return Err(ConstructionError::new(format!(
                "failed to parse option `{option}`: expected path=value"
            )));
        };
        let path: Vec<&str> = path
            .trim()
            .split(OPTION_PATH_SEPARATOR)
            .map(str::trim)
            .collect();
        if path.iter().any(|segment| segment.is_empty()) {
            return Err(ConstructionError::new(format!(
                "failed to parse option `{option}`: path has an empty segment"
            )));
        }
        insert_path(&mut config, &path, parse_option_value(raw_value.trim()));
    }
    Ok(Value::Object(config))
}

fn parse_option_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
