// src/cache/mod.rs
//! Key/value cache the refresh cycle writes into and the read surface reads.
//!
//! Keys are flat: `kyoboTop10`, `yes24Top100`, ... hold item lists and
//! `lastFetched.<itemsKey>` holds the epoch-ms timestamp of that list. Both
//! are written in a single `set`, so one source never touches another
//! source's keys.

pub mod file;
pub mod memory;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{BookItem, Bookstore, Tier};
use crate::settings::{RefreshInterval, Settings};

pub use file::FileStore;
pub use memory::MemoryStore;

pub const SETTINGS_KEY: &str = "settings";

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Present keys only; absent keys are simply missing from the map.
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;
    /// Shallow merge: every key in `items` is overwritten.
    async fn set(&self, items: Map<String, Value>) -> Result<()>;
    async fn remove(&self, keys: &[&str]) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Last good result of one source at one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub items: Vec<BookItem>,
    pub last_fetched_at: i64,
}

impl CacheRecord {
    pub fn is_stale(&self, now_ms: i64, interval: RefreshInterval) -> bool {
        now_ms.saturating_sub(self.last_fetched_at) >= interval.as_millis()
    }
}

pub fn items_key(source: Bookstore, tier: Tier) -> String {
    format!("{}{}", source.key(), tier)
}

pub fn fetched_key(source: Bookstore, tier: Tier) -> String {
    format!("lastFetched.{}", items_key(source, tier))
}

/// Persist a non-empty result. Returns `false` (and writes nothing) when empty.
pub async fn write_record(
    store: &dyn CacheStore,
    source: Bookstore,
    tier: Tier,
    items: &[BookItem],
    now_ms: i64,
) -> Result<bool> {
    if items.is_empty() {
        return Ok(false);
    }
    let mut m = Map::new();
    m.insert(items_key(source, tier), serde_json::to_value(items)?);
    m.insert(fetched_key(source, tier), Value::from(now_ms));
    store.set(m).await.with_context(|| format!("writing {}", items_key(source, tier)))?;
    Ok(true)
}

pub async fn read_record(
    store: &dyn CacheStore,
    source: Bookstore,
    tier: Tier,
) -> Result<Option<CacheRecord>> {
    let ik = items_key(source, tier);
    let fk = fetched_key(source, tier);
    let mut got = store.get(&[ik.as_str(), fk.as_str()]).await?;
    let Some(items) = got.remove(&ik) else {
        return Ok(None);
    };
    let items: Vec<BookItem> =
        serde_json::from_value(items).with_context(|| format!("decoding {ik}"))?;
    let last_fetched_at = got.get(&fk).and_then(Value::as_i64).unwrap_or(0);
    Ok(Some(CacheRecord { items, last_fetched_at }))
}

pub async fn load_settings(store: &dyn CacheStore) -> Result<Option<Settings>> {
    let got = store.get(&[SETTINGS_KEY]).await?;
    match got.get(SETTINGS_KEY) {
        Some(v) => Ok(Some(serde_json::from_value(v.clone()).context("decoding settings")?)),
        None => Ok(None),
    }
}

pub async fn save_settings(store: &dyn CacheStore, settings: &Settings) -> Result<()> {
    let mut m = Map::new();
    m.insert(SETTINGS_KEY.to_string(), serde_json::to_value(settings)?);
    store.set(m).await
}
