// src/services/diagnostics.rs
// DOCUMENTATION: Live process diagnostics
// PURPOSE: Named accessors evaluated on every poll, never cached

use crate::config::DbPool;
use crate::services::TaskTracker;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tokio::runtime::Handle;

type Accessor = Box<dyn Fn() -> Value + Send + Sync>;

/// Registry of read-only diagnostic accessors
/// DOCUMENTATION: Accessors are registered once at startup and must only
/// read atomics or other non-blocking counters.
#[derive(Default)]
pub struct Diagnostics {
    accessors: RwLock<BTreeMap<&'static str, Accessor>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accessor under `name`, replacing any previous one
    pub fn publish<F>(&self, name: &'static str, accessor: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        let mut accessors = self
            .accessors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if accessors.insert(name, Box::new(accessor)).is_some() {
            log::warn!("Diagnostic accessor '{}' re-registered", name);
        }
    }

    /// Evaluate a single accessor
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<Value> {
        let accessors = self
            .accessors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        accessors.get(name).map(|accessor| accessor())
    }

    /// Evaluate every accessor now
    pub fn snapshot(&self) -> Map<String, Value> {
        let accessors = self
            .accessors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        accessors
            .iter()
            .map(|(name, accessor)| (name.to_string(), accessor()))
            .collect()
    }

    /// Register the standard accessor set
    /// DOCUMENTATION: `runtime` is the handle background work runs on; its
    /// live task count is reported as `tasks`.
    pub fn publish_defaults(&self, pool: &DbPool, tracker: &TaskTracker, runtime: Handle) {
        self.publish("version", || json!(env!("CARGO_PKG_VERSION")));

        self.publish("tasks", move || json!(runtime.metrics().num_alive_tasks()));

        let pool = pool.clone();
        self.publish("database", move || json!(pool.stats()));

        let tracker = tracker.clone();
        self.publish("background", move || json!(tracker.outstanding()));

        self.publish("timestamp", || json!(chrono::Utc::now().timestamp()));

        log::info!("Published diagnostics accessors");
    }
}
