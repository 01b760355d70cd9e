//! crates/lam_phuong_core/src/memory.rs
//!
//! In-memory implementations of the storage and navigation ports. Used for
//! request-scoped state in the service and as the default test doubles.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::RwLock;

use crate::ports::{KeyValueStore, Navigation, NavigationMode, Navigator, PortResult};

//=========================================================================================
// MemoryStore
//=========================================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> PortResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

//=========================================================================================
// RecordingNavigator
//=========================================================================================

/// Records navigation requests instead of performing them. The service turns
/// the last recorded navigation into a redirect response.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn history(&self) -> Vec<Navigation> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &str, mode: NavigationMode) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Navigation {
                target: target.to_string(),
                mode,
            });
    }
}
