//! Runtime configuration input and normalization.
//!
//! # Responsibility
//! - Turn raw caller input into a tagged config variant.
//! - Produce the canonical config string handed to the instance constructor.
//! - Resolve the module base location from structured config.
//!
//! # Invariants
//! - Only strings and objects become a `RuntimeConfig`; everything else fails
//!   with `ConfigTypeError` before any async work.
//! - Serialized input is passed through byte-for-byte.
//! - Module location is read from the structured value, never from the
//!   canonical string.

use crate::error::{ConfigError, ConfigTypeError};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Config key holding per-module base directories.
pub const MODULE_DIR_KEY: &str = "module_dir";
/// Sub-key of `module_dir` naming this runtime's own module.
pub const MODULE_NAME: &str = "mize";
/// Fixed file name of the compiled module under its base directory.
pub const MODULE_BINARY_NAME: &str = "mize_bg.wasm";
/// Base directory used by the CLI when nothing else names one.
pub const DEFAULT_MODULE_DIR: &str = "./pkg";

/// Caller-supplied runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeConfig {
    /// Pre-serialized config text, handed to the module as-is.
    Serialized(String),
    /// Structured config object.
    Structured(Map<String, Value>),
}

/// Output of [`RuntimeConfig::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedConfig {
    /// Sole argument for the instance constructor.
    pub canonical: String,
    /// Base directory from `module_dir.mize`; `None` defers to the loader default.
    pub module_dir: Option<PathBuf>,
}

impl NormalizedConfig {
    /// Full path of the compiled module binary, when a base is known.
    pub fn binary_path(&self) -> Option<PathBuf> {
        self.module_dir
            .as_ref()
            .map(|dir| dir.join(MODULE_BINARY_NAME))
    }
}

impl RuntimeConfig {
    /// Classifies raw dynamic input.
    pub fn from_value(value: Value) -> Result<Self, ConfigTypeError> {
        match value {
            Value::String(text) => Ok(Self::Serialized(text)),
            Value::Object(map) => Ok(Self::Structured(map)),
            other => Err(ConfigTypeError {
                found: json_type_name(&other),
            }),
        }
    }

    /// Canonicalizes this config and resolves the module location.
    ///
    /// # Errors
    /// - `InvalidModuleLocation` when `module_dir` is present but malformed.
    pub fn normalize(&self) -> Result<NormalizedConfig, ConfigError> {
        match self {
            Self::Serialized(text) => Ok(NormalizedConfig {
                canonical: text.clone(),
                module_dir: None,
            }),
            Self::Structured(map) => {
                let module_dir = resolve_module_dir(map)?;
                let canonical = serde_json::to_string(map)
                    .map_err(|err| ConfigError::Serialize(err.to_string()))?;
                Ok(NormalizedConfig {
                    canonical,
                    module_dir,
                })
            }
        }
    }

    /// Raw form written to `self/config` on the update path.
    ///
    /// Strings stay strings and objects stay objects; nothing is re-serialized.
    pub fn to_raw_value(&self) -> Value {
        match self {
            Self::Serialized(text) => Value::String(text.clone()),
            Self::Structured(map) => Value::Object(map.clone()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serialized(_) => "serialized",
            Self::Structured(_) => "structured",
        }
    }
}

impl TryFrom<Value> for RuntimeConfig {
    type Error = ConfigTypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<String> for RuntimeConfig {
    fn from(value: String) -> Self {
        Self::Serialized(value)
    }
}

impl From<&str> for RuntimeConfig {
    fn from(value: &str) -> Self {
        Self::Serialized(value.to_string())
    }
}

impl From<Map<String, Value>> for RuntimeConfig {
    fn from(value: Map<String, Value>) -> Self {
        Self::Structured(value)
    }
}

fn resolve_module_dir(map: &Map<String, Value>) -> Result<Option<PathBuf>, ConfigError> {
    let Some(dirs) = map.get(MODULE_DIR_KEY) else {
        return Ok(None);
    };
    let Value::Object(dirs) = dirs else {
        return Err(ConfigError::InvalidModuleLocation(format!(
            "`{MODULE_DIR_KEY}` must be an object, got {}",
            json_type_name(dirs)
        )));
    };
    match dirs.get(MODULE_NAME) {
        None => Ok(None),
        Some(Value::String(dir)) if !dir.trim().is_empty() => Ok(Some(PathBuf::from(dir))),
        Some(Value::String(_)) => Err(ConfigError::InvalidModuleLocation(format!(
            "`{MODULE_DIR_KEY}.{MODULE_NAME}` must not be empty"
        ))),
        Some(other) => Err(ConfigError::InvalidModuleLocation(format!(
            "`{MODULE_DIR_KEY}.{MODULE_NAME}` must be a string, got {}",
            json_type_name(other)
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
