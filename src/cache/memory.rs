// src/cache/memory.rs
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::CacheStore;

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full copy of the current contents.
    pub async fn snapshot(&self) -> Map<String, Value> {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let g = self.inner.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| g.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, items: Map<String, Value>) -> Result<()> {
        let mut g = self.inner.write().await;
        for (k, v) in items {
            g.insert(k, v);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut g = self.inner.write().await;
        for k in keys {
            g.remove(*k);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.inner.write().await.clear();
        Ok(())
    }
}
