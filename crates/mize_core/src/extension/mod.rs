//! Extension registration contracts.
//!
//! A runtime starts with an empty registry; extensions are added later by
//! code outside the bootstrap path.

pub mod registry;

use crate::instance::Runtime;

pub use registry::{ExtensionError, ExtensionRegistry};

/// Lifecycle hooks for one registered extension.
pub trait Extension: Send + Sync {
    /// Runs once before the extension becomes visible in the registry.
    fn init(&self, runtime: &Runtime) -> Result<(), String> {
        let _ = runtime;
        Ok(())
    }

    /// Runs once after the extension has been removed from the registry.
    fn exit(&self, runtime: &Runtime) -> Result<(), String> {
        let _ = runtime;
        Ok(())
    }
}
