//! Bootstrap error taxonomy.
//!
//! # Responsibility
//! - Classify every way a runtime bootstrap can fail.
//! - Keep module/constructor failure text intact when surfacing it.
//!
//! # Invariants
//! - `ConfigType` and `Config` errors are raised before any module load.
//! - No variant implies a published runtime; failed bootstraps publish nothing.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Raised when raw config input is neither a string nor an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTypeError {
    /// JSON type name of the rejected value (`null|bool|number|array`).
    pub found: &'static str,
}

impl Display for ConfigTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "config passed to init must be an object or a string (got {})",
            self.found
        )
    }
}

impl Error for ConfigTypeError {}

/// Config shape errors detected during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `module_dir` exists but does not resolve to a usable base path.
    InvalidModuleLocation(String),
    /// Structured config could not be serialized into canonical text.
    Serialize(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidModuleLocation(reason) => {
                write!(f, "config module location is invalid: {reason}")
            }
            Self::Serialize(reason) => write!(f, "config could not be serialized: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Compiled-module fetch/parse/compile failures.
#[derive(Debug)]
pub enum ModuleLoadError {
    Io { path: PathBuf, source: std::io::Error },
    InvalidBinary { path: PathBuf, reason: String },
    Other(String),
}

impl Display for ModuleLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read module `{}`: {source}", path.display())
            }
            Self::InvalidBinary { path, reason } => {
                write!(f, "module `{}` is not loadable: {reason}", path.display())
            }
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ModuleLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidBinary { .. } | Self::Other(_) => None,
        }
    }
}

/// Instance constructor or `init()` rejection, carried as the module reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionError {
    pub message: String,
}

impl ConstructionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ConstructionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ConstructionError {}

/// Umbrella error returned by the bootstrap entry points.
#[derive(Debug)]
pub enum BootstrapError {
    ConfigType(ConfigTypeError),
    Config(ConfigError),
    ModuleLoad(ModuleLoadError),
    Construction(ConstructionError),
}

impl BootstrapError {
    /// Stable error code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigType(_) => "config_type",
            Self::Config(_) => "config_invalid",
            Self::ModuleLoad(_) => "module_load_failed",
            Self::Construction(_) => "construction_failed",
        }
    }
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigType(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::ModuleLoad(err) => write!(f, "{err}"),
            Self::Construction(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConfigType(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::ModuleLoad(err) => Some(err),
            Self::Construction(err) => Some(err),
        }
    }
}

impl From<ConfigTypeError> for BootstrapError {
    fn from(value: ConfigTypeError) -> Self {
        Self::ConfigType(value)
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ModuleLoadError> for BootstrapError {
    fn from(value: ModuleLoadError) -> Self {
        Self::ModuleLoad(value)
    }
}

impl From<ConstructionError> for BootstrapError {
    fn from(value: ConstructionError) -> Self {
        Self::Construction(value)
    }
}
