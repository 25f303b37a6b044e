// src/refresh.rs
//! Refresh orchestrator: fan out to every adapter, wait for all of them to
//! settle, and write each non-empty result under that source's own keys.

use anyhow::Result;
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{items_key, read_record, write_record, CacheRecord, CacheStore};
use crate::model::{now_ms, BookItem, Bookstore, Tier};
use crate::settings::RefreshInterval;
use crate::source::{Registry, SourceAdapter};

/// Source whose top-10 backs the lightweight default view.
pub const PRIMARY: Bookstore = Bookstore::Kyobo;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("source_fetch_total", "Adapter fetch attempts.");
        describe_counter!("source_fetch_errors_total", "Adapter failures by phase.");
        describe_counter!("source_items_total", "Items returned by adapters.");
        describe_histogram!("source_parse_ms", "HTML extraction time in milliseconds.");
        describe_gauge!("source_healthy", "1 if the last fetch of a source returned items.");
        describe_counter!("refresh_runs_total", "Refresh cycles started.");
        describe_gauge!("refresh_last_run_ts", "Unix ts when a refresh cycle last finished.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome {
    /// Cache updated with `count` items.
    Success { count: usize },
    /// Empty or failed fetch; cache left untouched.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: Bookstore,
    pub tier: Tier,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl RefreshReport {
    pub fn outcome(&self, source: Bookstore, tier: Tier) -> Option<Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.source == source && o.tier == tier)
            .map(|o| o.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Success { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Cheap to clone; adapters and store are shared.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<Registry>,
    store: Arc<dyn CacheStore>,
}

impl Orchestrator {
    pub fn new(registry: Registry, store: Arc<dyn CacheStore>) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    async fn run_one(&self, adapter: &Arc<dyn SourceAdapter>, tier: Tier) -> SourceOutcome {
        let source = adapter.bookstore();
        let items = adapter.fetch(tier).await;
        let outcome = match write_record(self.store.as_ref(), source, tier, &items, now_ms()).await {
            Ok(true) => Outcome::Success { count: items.len() },
            Ok(false) => Outcome::Failed,
            Err(e) => {
                tracing::warn!(source = %source, %tier, error = %format!("{e:#}"), "cache write failed");
                Outcome::Failed
            }
        };
        SourceOutcome { source, tier, outcome }
    }

    async fn run_many(&self, jobs: Vec<(&Arc<dyn SourceAdapter>, Tier)>) -> RefreshReport {
        ensure_metrics_described();
        counter!("refresh_runs_total").increment(1);

        let outcomes = join_all(jobs.into_iter().map(|(a, tier)| self.run_one(a, tier))).await;
        let report = RefreshReport { outcomes };

        gauge!("refresh_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "refresh cycle settled"
        );
        report
    }

    /// Top-100 of every source, concurrently. Never fails; see the report.
    pub async fn refresh_all(&self) -> RefreshReport {
        let jobs = self.registry.values().map(|a| (a, Tier::Top100)).collect();
        self.run_many(jobs).await
    }

    /// Primary source's top-10 only. Returns what was fetched (possibly empty).
    pub async fn refresh_tier10(&self) -> Vec<BookItem> {
        let Some(adapter) = self.registry.get(&PRIMARY) else {
            tracing::warn!(source = %PRIMARY, "primary source not registered");
            return Vec::new();
        };
        let items = adapter.fetch(Tier::Top10).await;
        if let Err(e) = write_record(self.store.as_ref(), PRIMARY, Tier::Top10, &items, now_ms()).await {
            tracing::warn!(source = %PRIMARY, error = %format!("{e:#}"), "cache write failed");
        }
        items
    }

    /// Refresh only the (source, tier) pairs that are missing or older than `interval`.
    pub async fn refresh_stale(&self, interval: RefreshInterval) -> RefreshReport {
        let now = now_ms();
        let mut jobs = Vec::new();
        for adapter in self.registry.values() {
            for &tier in adapter.tiers() {
                let stale = match read_record(self.store.as_ref(), adapter.bookstore(), tier).await {
                    Ok(Some(rec)) => rec.is_stale(now, interval),
                    Ok(None) => true,
                    Err(e) => {
                        tracing::warn!(source = %adapter.bookstore(), %tier, error = %format!("{e:#}"), "unreadable cache entry");
                        true
                    }
                };
                if stale {
                    jobs.push((adapter, tier));
                }
            }
        }
        if jobs.is_empty() {
            tracing::debug!("nothing stale");
            return RefreshReport::default();
        }
        self.run_many(jobs).await
    }

    /// Every cached record, keyed by its items key.
    pub async fn cached(&self) -> Result<BTreeMap<String, CacheRecord>> {
        let mut out = BTreeMap::new();
        for adapter in self.registry.values() {
            for &tier in adapter.tiers() {
                let source = adapter.bookstore();
                if let Some(rec) = read_record(self.store.as_ref(), source, tier).await? {
                    out.insert(items_key(source, tier), rec);
                }
            }
        }
        Ok(out)
    }
}
