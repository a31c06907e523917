//! Compute-function registry.
//!
//! Maps string kinds (e.g. "fib") to executable compute functions so the
//! engine stays generic over the work it runs, and so the worker binary can
//! rebuild the identical mapping on its side of the process boundary.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::TaskError;
use crate::task::Task;

/// A registered compute function: pure, synchronous, CPU-bound.
///
/// Must not touch shared mutable process state — the same function may run
/// on a rayon thread or inside a worker process.
pub type ComputeFn =
    Arc<dyn Fn(&serde_json::Value) -> Result<serde_json::Value, TaskError> + Send + Sync>;

/// Registry holding the mapping between task kinds and their implementation.
///
/// Built once at startup, then frozen behind an `Arc` — registration after
/// startup is not supported, which keeps execution paths lock-free.
pub struct ComputeRegistry {
    handlers: HashMap<String, ComputeFn>,
}

impl ComputeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a compute function under a kind name.
    pub fn register<F>(&mut self, kind: &str, handler: F)
    where
        F: Fn(&serde_json::Value) -> Result<serde_json::Value, TaskError> + Send + Sync + 'static,
    {
        self.handlers.insert(kind.to_string(), Arc::new(handler));
        tracing::debug!(kind = %kind, "registered compute kind");
    }

    /// Look up a kind and run it against the task's payload.
    pub fn execute(&self, task: &Task) -> Result<serde_json::Value, TaskError> {
        match self.handlers.get(&task.kind) {
            Some(handler) => handler(&task.payload),
            None => Err(TaskError::unknown_kind(&task.kind)),
        }
    }

    /// Look up a kind by name.
    pub fn get(&self, kind: &str) -> Option<ComputeFn> {
        self.handlers.get(kind).cloned()
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// All registered kind names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// The standard registry: built-in CPU kinds plus diagnostics kinds.
    /// Both the server and the worker binary call this so the two sides of
    /// the process boundary agree on every kind.
    pub fn standard() -> Arc<Self> {
        let mut registry = Self::new();
        crate::kinds::register_builtin(&mut registry);
        crate::kinds::register_diagnostics(&mut registry);
        Arc::new(registry)
    }
}

impl Default for ComputeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn executes_registered_kind() {
        let mut registry = ComputeRegistry::new();
        registry.register("double", |payload| {
            let n = payload["n"].as_i64().unwrap_or(0);
            Ok(json!(n * 2))
        });

        let task = Task::new("double", json!({"n": 21}));
        assert_eq!(registry.execute(&task).unwrap(), json!(42));
    }

    #[test]
    fn unknown_kind_is_a_compute_failure() {
        let registry = ComputeRegistry::new();
        let task = Task::new("missing", json!(null));
        let err = registry.execute(&task).unwrap_err();
        assert!(matches!(err, TaskError::Compute { .. }));
    }

    #[test]
    fn standard_registry_has_builtin_kinds() {
        let registry = ComputeRegistry::standard();
        for kind in ["fib", "primes", "sleep_ms", "abort"] {
            assert!(registry.has_kind(kind), "missing kind {kind}");
        }
    }
}
