//! Runtime instance handle.
//!
//! # Responsibility
//! - Wrap a module-constructed instance behind one shared handle type.
//! - Own the extension registry attached after construction.
//!
//! # Invariants
//! - A `Runtime` always starts with an empty extension registry.
//! - Handle identity is the `Arc` allocation; `id()` mirrors it for logs.

pub mod memory;

use crate::error::ConstructionError;
use crate::extension::{Extension, ExtensionError, ExtensionRegistry};
use async_trait::async_trait;
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use uuid::Uuid;

pub use memory::MemoryInstance;

/// Namespaced key holding the live configuration.
pub const CONFIG_KEY: &str = "self/config";

/// Instance surface produced by a compiled module's constructor.
#[async_trait]
pub trait InstanceCore: Send + Sync {
    /// Reads the value stored at a `/`-separated key.
    fn get(&self, key: &str) -> Option<Value>;

    /// Writes a value at a `/`-separated key.
    fn set(&self, key: &str, value: Value);

    /// Self-initialization step run after construction, once the handle's
    /// extension registry exists. `extensions` lists the registered names.
    async fn init(&self, extensions: &[String]) -> Result<(), ConstructionError>;

    fn is_ready(&self) -> bool;
}

/// Point-in-time view of a runtime, serializable for status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeStatus {
    pub instance_id: Uuid,
    pub ready: bool,
    pub extensions: Vec<String>,
    pub config: Option<Value>,
}

/// Process-shareable runtime handle.
pub struct Runtime {
    id: Uuid,
    core: Box<dyn InstanceCore>,
    extensions: Mutex<ExtensionRegistry>,
}

impl Runtime {
    /// Attaches a fresh, empty extension registry to a constructed instance.
    pub fn new(core: Box<dyn InstanceCore>) -> Self {
        Self {
            id: Uuid::new_v4(),
            core,
            extensions: Mutex::new(ExtensionRegistry::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.core.get(key)
    }

    pub fn set(&self, key: &str, value: Value) {
        self.core.set(key, value);
    }

    /// Current value of `self/config`.
    pub fn config(&self) -> Option<Value> {
        self.core.get(CONFIG_KEY)
    }

    /// Runs the instance's own initialization step.
    ///
    /// # Side effects
    /// - Emits `instance_init` logging events with duration and status.
    pub async fn init(&self) -> Result<(), ConstructionError> {
        let started_at = Instant::now();
        let extensions = self.extensions().names();
        match self.core.init(&extensions).await {
            Ok(()) => {
                info!(
                    "event=instance_init module=instance status=ok instance_id={} duration_ms={}",
                    self.id,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=instance_init module=instance status=error instance_id={} duration_ms={} error={}",
                    self.id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.core.is_ready()
    }

    pub fn status(&self) -> RuntimeStatus {
        RuntimeStatus {
            instance_id: self.id,
            ready: self.is_ready(),
            extensions: self.extensions().names(),
            config: self.config(),
        }
    }

    /// Locks the extension registry (`mod` container).
    pub fn extensions(&self) -> MutexGuard<'_, ExtensionRegistry> {
        self.extensions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an extension and runs its `init` hook before exposing it.
    ///
    /// The registry lock is not held while the hook runs, so hooks may read
    /// the registry.
    pub fn register_extension(
        &self,
        name: &str,
        extension: Arc<dyn Extension>,
    ) -> Result<(), ExtensionError> {
        let normalized = self.extensions().check_insertable(name)?;
        extension
            .init(self)
            .map_err(|message| ExtensionError::Hook {
                name: normalized.clone(),
                message,
            })?;
        self.extensions().insert(&normalized, extension)?;
        info!(
            "event=extension_register module=instance status=ok instance_id={} name={}",
            self.id, normalized
        );
        Ok(())
    }

    /// Removes an extension and runs its `exit` hook.
    pub fn unregister_extension(&self, name: &str) -> Result<(), ExtensionError> {
        let extension = self
            .extensions()
            .remove(name)
            .ok_or_else(|| ExtensionError::NotFound(name.trim().to_string()))?;
        extension.exit(self).map_err(|message| ExtensionError::Hook {
            name: name.trim().to_string(),
            message,
        })
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .field("extensions", &*self.extensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{InstanceCore, Runtime, CONFIG_KEY};
    use crate::error::ConstructionError;
    use crate::extension::{Extension, ExtensionError};
    use crate::instance::MemoryInstance;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingExtension {
        inits: AtomicUsize,
        exits: AtomicUsize,
    }

    impl Extension for CountingExtension {
        fn init(&self, runtime: &Runtime) -> Result<(), String> {
            assert!(!runtime.extensions().contains("counter"));
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn exit(&self, _runtime: &Runtime) -> Result<(), String> {
            self.exits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingExtension;

    impl Extension for FailingExtension {
        fn init(&self, _runtime: &Runtime) -> Result<(), String> {
            Err("no network".to_string())
        }
    }

    struct Marker;

    impl Extension for Marker {}

    /// Keeps the extension names each `init` call was handed.
    struct RecordingInstance {
        inner: MemoryInstance,
        seen: Arc<Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl InstanceCore for RecordingInstance {
        fn get(&self, key: &str) -> Option<Value> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: Value) {
            self.inner.set(key, value);
        }

        async fn init(&self, extensions: &[String]) -> Result<(), ConstructionError> {
            self.seen
                .lock()
                .expect("seen lock")
                .push(extensions.to_vec());
            self.inner.init(extensions).await
        }

        fn is_ready(&self) -> bool {
            self.inner.is_ready()
        }
    }

    fn runtime() -> Runtime {
        Runtime::new(Box::new(
            MemoryInstance::from_config("name=test").expect("config should parse"),
        ))
    }

    #[test]
    fn new_runtime_has_empty_registry_and_config() {
        let runtime = runtime();
        assert!(runtime.extensions().is_empty());
        assert_eq!(runtime.config(), Some(json!({"name": "test"})));
        assert_eq!(runtime.get(CONFIG_KEY), runtime.config());
    }

    #[tokio::test]
    async fn init_marks_runtime_ready() {
        let runtime = runtime();
        assert!(!runtime.is_ready());
        runtime.init().await.expect("init should succeed");
        assert!(runtime.is_ready());
    }

    #[tokio::test]
    async fn instance_init_sees_registered_extensions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let runtime = Runtime::new(Box::new(RecordingInstance {
            inner: MemoryInstance::new(),
            seen: seen.clone(),
        }));
        runtime
            .register_extension("marker", Arc::new(Marker))
            .expect("register marker");

        runtime.init().await.expect("init should succeed");
        assert_eq!(
            *seen.lock().expect("seen lock"),
            vec![vec!["marker".to_string()]]
        );
    }

    #[test]
    fn status_serializes_runtime_view() {
        let runtime = runtime();
        runtime
            .register_extension("marker", Arc::new(Marker))
            .expect("register marker");

        let status = runtime.status();
        assert_eq!(status.instance_id, runtime.id());
        let value = serde_json::to_value(&status).expect("status serializes");
        assert_eq!(
            value,
            json!({
                "instance_id": runtime.id().to_string(),
                "ready": false,
                "extensions": ["marker"],
                "config": {"name": "test"}
            })
        );
    }

    #[test]
    fn register_runs_init_hook_then_exposes_extension() {
        let runtime = runtime();
        let extension = Arc::new(CountingExtension::default());
        runtime
            .register_extension("counter", extension.clone())
            .expect("register should succeed");
        assert_eq!(extension.inits.load(Ordering::SeqCst), 1);
        assert!(runtime.extensions().contains("counter"));

        runtime
            .unregister_extension("counter")
            .expect("unregister should succeed");
        assert_eq!(extension.exits.load(Ordering::SeqCst), 1);
        assert!(runtime.extensions().is_empty());
    }

    #[test]
    fn failed_init_hook_leaves_registry_unchanged() {
        let runtime = runtime();
        let err = runtime
            .register_extension("net", Arc::new(FailingExtension))
            .expect_err("failing hook must reject registration");
        assert!(matches!(err, ExtensionError::Hook { .. }));
        assert!(runtime.extensions().is_empty());
    }

    #[test]
    fn unregister_unknown_extension_fails() {
        let runtime = runtime();
        let err = runtime
            .unregister_extension("missing")
            .expect_err("unknown extension");
        assert_eq!(err, ExtensionError::NotFound("missing".to_string()));
    }
}
