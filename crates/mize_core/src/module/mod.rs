//! Compiled-module collaborator contracts.
//!
//! The bootstrap treats the compiled module as an opaque capability: load it
//! from a location, then construct instances from a canonical config string.

pub mod file;

use crate::error::{ConstructionError, ModuleLoadError};
use crate::instance::InstanceCore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use file::{FileModuleLoader, ModuleImage};

/// Loads a compiled module and readies it for instantiation.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// `binary` overrides the loader's own default binary location.
    async fn load(&self, binary: Option<&Path>)
        -> Result<Arc<dyn CompiledModule>, ModuleLoadError>;
}

/// A loaded module able to construct runtime instances.
#[async_trait]
pub trait CompiledModule: Send + Sync {
    /// Constructs a raw instance from the canonical config string.
    async fn construct(&self, config: &str) -> Result<Box<dyn InstanceCore>, ConstructionError>;
}
