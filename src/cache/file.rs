// src/cache/file.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};

use super::CacheStore;

/// JSON-file store. The whole map is kept in memory and rewritten through a
/// temp file + rename on every mutation. Memory only changes once the write
/// has landed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<Map<String, Value>>,
}

impl FileStore {
    /// Open (or start empty). A corrupt file is logged and replaced on the next write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map = match fs::read_to_string(&path).await {
            Ok(s) => match serde_json::from_str::<Map<String, Value>>(&s) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cache file unreadable, starting empty");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading cache file {}", path.display()))
            }
        };
        Ok(Self { path, inner: Mutex::new(map) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let g = self.inner.lock().await;
        Ok(keys
            .iter()
            .filter_map(|k| g.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, items: Map<String, Value>) -> Result<()> {
        let mut g = self.inner.lock().await;
        let mut next = g.clone();
        next.extend(items);
        self.persist(&next).await?;
        *g = next;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut g = self.inner.lock().await;
        let mut next = g.clone();
        for k in keys {
            next.remove(*k);
        }
        self.persist(&next).await?;
        *g = next;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut g = self.inner.lock().await;
        self.persist(&Map::new()).await?;
        g.clear();
        Ok(())
    }
}
