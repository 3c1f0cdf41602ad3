//! Core runtime bootstrap for mize.
//! Owns the single process-wide runtime and the contract for creating it.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extension;
pub mod instance;
pub mod logging;
pub mod module;
pub mod slot;

pub use bootstrap::{ensure_singleton, init_runtime, init_runtime_value, load_and_construct};
pub use config::{
    NormalizedConfig, RuntimeConfig, DEFAULT_MODULE_DIR, MODULE_BINARY_NAME, MODULE_DIR_KEY,
    MODULE_NAME,
};
pub use error::{
    BootstrapError, BootstrapResult, ConfigError, ConfigTypeError, ConstructionError,
    ModuleLoadError,
};
pub use extension::{Extension, ExtensionError, ExtensionRegistry};
pub use instance::memory::parse_config;
pub use instance::{InstanceCore, MemoryInstance, Runtime, RuntimeStatus, CONFIG_KEY};
pub use logging::{default_log_level, init_logging, logging_status};
pub use module::{CompiledModule, FileModuleLoader, ModuleImage, ModuleLoader};
pub use slot::RuntimeSlot;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
