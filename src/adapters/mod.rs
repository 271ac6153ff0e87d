//! Speech-to-text application adapters
//!
//! Each supported application contributes one adapter: static metadata,
//! two best-effort probes, and two keystroke dispatch operations. The
//! registry is populated once at startup and read-only thereafter.

mod oto;
mod superwhisper;

pub use oto::OtoAdapter;
pub use superwhisper::SuperWhisperAdapter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::system::KeystrokeError;

/// Errors surfaced by adapter operations
///
/// Probe internals swallow their own failures into negative results; an
/// `Err` from an adapter means something genuinely unexpected and turns
/// into an `Error` state at the reconciler boundary.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("keystroke dispatch failed: {0}")]
    Keystroke(#[from] KeystrokeError),
}

/// Capability bundle for one target speech-to-text application
#[async_trait]
pub trait SttAdapter: Send + Sync {
    /// Human-readable application name
    fn name(&self) -> &'static str;

    /// Stable registry key
    fn key(&self) -> &'static str;

    /// Shortcut dispatched when the user configured none
    fn default_shortcut(&self) -> &'static str;

    /// Begin recording by sending the toggle shortcut
    async fn activate(&self, shortcut: &str) -> Result<(), AdapterError>;

    /// Stop recording by sending the toggle shortcut
    async fn deactivate(&self, shortcut: &str) -> Result<(), AdapterError>;

    /// Best-effort check whether the application is currently recording
    async fn is_recording(&self) -> Result<bool, AdapterError>;

    /// Best-effort check whether the application is running
    async fn is_available(&self) -> Result<bool, AdapterError>;
}

/// Registry entry metadata, as reported in daemon status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterInfo {
    pub key: String,
    pub name: String,
}

/// Process-wide lookup from application key to adapter
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SttAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register an adapter under its own key
    pub fn register(&mut self, adapter: Arc<dyn SttAdapter>) {
        self.adapters.insert(adapter.key().to_string(), adapter);
    }

    /// Look up an adapter; unknown keys return `None`, never panic
    pub fn get(&self, key: &str) -> Option<Arc<dyn SttAdapter>> {
        self.adapters.get(key).cloned()
    }

    /// List registered adapters for status reporting
    pub fn list(&self) -> Vec<AdapterInfo> {
        let mut infos: Vec<AdapterInfo> = self
            .adapters
            .values()
            .map(|a| AdapterInfo {
                key: a.key().to_string(),
                name: a.name().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the registry with all shipped adapters.
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(OtoAdapter::new()));
    registry.register(Arc::new(SuperWhisperAdapter::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockAdapter;

    #[async_trait]
    impl SttAdapter for MockAdapter {
        fn name(&self) -> &'static str {
            "Mock"
        }

        fn key(&self) -> &'static str {
            "mock"
        }

        fn default_shortcut(&self) -> &'static str {
            "f4"
        }

        async fn activate(&self, _shortcut: &str) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn deactivate(&self, _shortcut: &str) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn is_recording(&self) -> Result<bool, AdapterError> {
            Ok(false)
        }

        async fn is_available(&self) -> Result<bool, AdapterError> {
            Ok(true)
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter));

        assert!(registry.get("mock").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_list_reports_metadata() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter));

        let infos = registry.list();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].key, "mock");
        assert_eq!(infos[0].name, "Mock");
    }

    #[test]
    fn test_default_registry_has_shipped_adapters() {
        let registry = default_registry();
        assert!(registry.get("oto").is_some());
        assert!(registry.get("superwhisper").is_some());
    }
}
