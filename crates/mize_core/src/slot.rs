//! Process-wide runtime slot.
//!
//! # Responsibility
//! - Hold at most one published runtime handle.
//! - Let tests create isolated slots instead of sharing process state.
//!
//! # Invariants
//! - Only fully initialized runtimes are published.
//! - `publish` is last-writer-wins; the displaced handle is returned.

use crate::instance::Runtime;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static GLOBAL_SLOT: Lazy<RuntimeSlot> = Lazy::new(RuntimeSlot::new);

/// Returns the well-known process-wide slot.
pub fn global() -> &'static RuntimeSlot {
    &GLOBAL_SLOT
}

/// Single-entry registry for the published runtime.
#[derive(Debug, Default)]
pub struct RuntimeSlot {
    current: Mutex<Option<Arc<Runtime>>>,
}

impl RuntimeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the published runtime, if any.
    pub fn get(&self) -> Option<Arc<Runtime>> {
        self.lock().clone()
    }

    /// Publishes `runtime`, returning whichever handle it displaced.
    pub fn publish(&self, runtime: Arc<Runtime>) -> Option<Arc<Runtime>> {
        let id = runtime.id();
        let previous = self.lock().replace(runtime);
        match &previous {
            Some(displaced) => warn!(
                "event=runtime_publish module=slot status=ok instance_id={} displaced_instance_id={}",
                id,
                displaced.id()
            ),
            None => info!(
                "event=runtime_publish module=slot status=ok instance_id={}",
                id
            ),
        }
        previous
    }

    /// Empties the slot, returning the runtime that was published.
    pub fn clear(&self) -> Option<Arc<Runtime>> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Runtime>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
