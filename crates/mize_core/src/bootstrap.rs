//! Singleton runtime bootstrap.
//!
//! # Responsibility
//! - Reuse the published runtime when one exists, updating its config.
//! - Otherwise normalize config, load the module, construct, initialize and
//!   publish a new runtime.
//!
//! # Invariants
//! - Steps run strictly in order: load, construct, attach extensions, init,
//!   publish.
//! - A failed bootstrap publishes nothing; the next call starts over.
//! - The update path writes the raw config variant to `self/config`; only the
//!   construct path serializes it.
//! - No single-flight: concurrent first calls may both construct, and the last
//!   one to publish wins. Await the first call to avoid that.

use crate::config::{NormalizedConfig, RuntimeConfig};
use crate::error::{BootstrapError, BootstrapResult};
use crate::instance::{Runtime, CONFIG_KEY};
use crate::module::ModuleLoader;
use crate::slot::RuntimeSlot;
use log::{error, info};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Returns the published runtime after writing `config` into it.
///
/// `None` means the slot is empty and a fresh bootstrap is required.
pub fn ensure_singleton(slot: &RuntimeSlot, config: &RuntimeConfig) -> Option<Arc<Runtime>> {
    let runtime = slot.get()?;
    runtime.set(CONFIG_KEY, config.to_raw_value());
    info!(
        "event=config_update module=bootstrap status=ok instance_id={} config_kind={}",
        runtime.id(),
        config.kind()
    );
    Some(runtime)
}

/// Loads the module, builds a runtime from `normalized`, and publishes it.
///
/// # Errors
/// - `ModuleLoad` when the module cannot be fetched or validated.
/// - `Construction` when the constructor or `init()` rejects.
pub async fn load_and_construct(
    slot: &RuntimeSlot,
    loader: &dyn ModuleLoader,
    normalized: &NormalizedConfig,
) -> BootstrapResult<Arc<Runtime>> {
    let binary = normalized.binary_path();

    let started_at = Instant::now();
    let module = loader.load(binary.as_deref()).await?;
    info!(
        "event=module_load module=bootstrap status=ok override={} duration_ms={}",
        binary.is_some(),
        started_at.elapsed().as_millis()
    );

    let started_at = Instant::now();
    let core = module.construct(&normalized.canonical).await?;
    let runtime = Arc::new(Runtime::new(core));
    info!(
        "event=instance_construct module=bootstrap status=ok instance_id={} duration_ms={}",
        runtime.id(),
        started_at.elapsed().as_millis()
    );

    runtime.init().await?;
    slot.publish(runtime.clone());
    Ok(runtime)
}

/// Returns the process runtime, creating it on first use.
///
/// Repeat calls do not reload anything: they store the raw `config` variant
/// at `self/config` on the existing runtime and return the same handle.
///
/// # Side effects
/// - Publishes a runtime into `slot` on first success.
/// - Emits `runtime_bootstrap` logging events with duration and status.
pub async fn init_runtime(
    slot: &RuntimeSlot,
    loader: &dyn ModuleLoader,
    config: RuntimeConfig,
) -> BootstrapResult<Arc<Runtime>> {
    if let Some(runtime) = ensure_singleton(slot, &config) {
        info!(
            "event=runtime_bootstrap module=bootstrap status=reuse instance_id={}",
            runtime.id()
        );
        return Ok(runtime);
    }

    let started_at = Instant::now();
    info!(
        "event=runtime_bootstrap module=bootstrap status=start config_kind={}",
        config.kind()
    );

    let result = match config.normalize() {
        Ok(normalized) => load_and_construct(slot, loader, &normalized).await,
        Err(err) => Err(BootstrapError::from(err)),
    };

    match &result {
        Ok(runtime) => info!(
            "event=runtime_bootstrap module=bootstrap status=ok instance_id={} duration_ms={}",
            runtime.id(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=runtime_bootstrap module=bootstrap status=error duration_ms={} error_code={} error={}",
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
    }
    result
}

/// Caller-facing entry for untyped input.
///
/// Input that is neither a string nor an object fails with
/// `BootstrapError::ConfigType` before the loader is touched.
pub async fn init_runtime_value(
    slot: &RuntimeSlot,
    loader: &dyn ModuleLoader,
    config: Value,
) -> BootstrapResult<Arc<Runtime>> {
    let config = RuntimeConfig::from_value(config)?;
    init_runtime(slot, loader, config).await
}
