// tests/refresh_orchestrator.rs
//
// All-settled refresh: one broken source must not disturb the others or its
// own last good cache entry.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use librovibe::cache::{fetched_key, items_key, read_record, write_record, CacheStore, MemoryStore};
use librovibe::error::SourceError;
use librovibe::model::now_ms;
use librovibe::refresh::Outcome;
use librovibe::settings::RefreshInterval;
use librovibe::source::{KyoboAdapter, Registry, SourceAdapter, Yes24Adapter};
use librovibe::{BookItem, Bookstore, Orchestrator, Tier};

const KYOBO: &str = include_str!("fixtures/kyobo_top10.json");
const YES24: &str = include_str!("fixtures/yes24_bestseller.html");

/// Always fails at the network step and counts attempts.
struct Broken {
    store: Bookstore,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceAdapter for Broken {
    fn bookstore(&self) -> Bookstore {
        self.store
    }

    async fn fetch_raw(&self, _tier: Tier) -> Result<String, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Network("connection reset".into()))
    }

    fn parse(&self, _raw: &str) -> Result<Vec<BookItem>, SourceError> {
        unreachable!("fetch_raw never succeeds")
    }
}

fn registry(broken_calls: Arc<AtomicUsize>) -> Registry {
    let mut reg: Registry = BTreeMap::new();
    reg.insert(Bookstore::Kyobo, Arc::new(KyoboAdapter::from_fixture_str(KYOBO)));
    reg.insert(Bookstore::Yes24, Arc::new(Yes24Adapter::from_fixture_str(YES24)));
    reg.insert(
        Bookstore::Aladin,
        Arc::new(Broken { store: Bookstore::Aladin, calls: broken_calls }),
    );
    reg
}

async fn raw_entry(store: &MemoryStore, key: &str) -> Option<Value> {
    store.get(&[key]).await.unwrap().remove(key)
}

#[tokio::test]
async fn failing_source_keeps_previous_entry_untouched() {
    let store = Arc::new(MemoryStore::new());
    let old = vec![BookItem::new(1, "지난주 도서", "https://www.aladin.co.kr/shop/wproduct.aspx?ItemId=1")];
    write_record(store.as_ref(), Bookstore::Aladin, Tier::Top100, &old, 1_000).await.unwrap();

    let ik = items_key(Bookstore::Aladin, Tier::Top100);
    let fk = fetched_key(Bookstore::Aladin, Tier::Top100);
    let before = (raw_entry(&store, &ik).await, raw_entry(&store, &fk).await);

    let calls = Arc::new(AtomicUsize::new(0));
    let orch = Orchestrator::new(registry(calls.clone()), store.clone());
    let report = orch.refresh_all().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.outcome(Bookstore::Aladin, Tier::Top100), Some(Outcome::Failed));
    assert_eq!(report.outcome(Bookstore::Yes24, Tier::Top100), Some(Outcome::Success { count: 8 }));
    assert_eq!(report.outcome(Bookstore::Kyobo, Tier::Top100), Some(Outcome::Success { count: 10 }));
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);

    let after = (raw_entry(&store, &ik).await, raw_entry(&store, &fk).await);
    assert_eq!(before, after, "failed source must not touch its keys");
}

#[tokio::test]
async fn successful_fetch_replaces_entry_and_timestamp() {
    let store = Arc::new(MemoryStore::new());
    let stale = vec![BookItem::new(1, "지난주 도서", "https://www.yes24.com/Product/Goods/1")];
    write_record(store.as_ref(), Bookstore::Yes24, Tier::Top100, &stale, 1_000).await.unwrap();

    let orch = Orchestrator::new(registry(Arc::new(AtomicUsize::new(0))), store.clone());
    let t0 = now_ms();
    orch.refresh_all().await;

    let rec = read_record(store.as_ref(), Bookstore::Yes24, Tier::Top100).await.unwrap().unwrap();
    assert_eq!(rec.items.len(), 8);
    assert_eq!(rec.items[0].title, "소년이 온다");
    assert!(rec.last_fetched_at >= t0);

    // refresh_all never writes the top-10 tier
    assert!(read_record(store.as_ref(), Bookstore::Kyobo, Tier::Top10).await.unwrap().is_none());
}

#[tokio::test]
async fn tier10_writes_only_primary_top10() {
    let store = Arc::new(MemoryStore::new());
    let orch = Orchestrator::new(registry(Arc::new(AtomicUsize::new(0))), store.clone());

    let items = orch.refresh_tier10().await;
    assert_eq!(items.len(), 10);

    let snap = store.snapshot().await;
    let mut keys: Vec<&str> = snap.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["kyoboTop10", "lastFetched.kyoboTop10"]);
}

#[tokio::test]
async fn stale_refresh_skips_fresh_entries() {
    let store = Arc::new(MemoryStore::new());
    let now = now_ms();
    let one = vec![BookItem::new(1, "신선한 도서", "https://example.com/1")];
    for (s, t) in [
        (Bookstore::Kyobo, Tier::Top10),
        (Bookstore::Kyobo, Tier::Top100),
        (Bookstore::Yes24, Tier::Top100),
    ] {
        write_record(store.as_ref(), s, t, &one, now).await.unwrap();
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let orch = Orchestrator::new(registry(calls.clone()), store.clone());
    let report = orch.refresh_stale(RefreshInterval::default()).await;

    // only the never-fetched aladin tier is attempted
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcome(Bookstore::Aladin, Tier::Top100), Some(Outcome::Failed));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let kept = read_record(store.as_ref(), Bookstore::Yes24, Tier::Top100).await.unwrap().unwrap();
    assert_eq!(kept.items, one);
}

#[tokio::test]
async fn aged_entries_are_refreshed() {
    let store = Arc::new(MemoryStore::new());
    let interval = RefreshInterval::try_from(3).unwrap();
    let old = now_ms() - interval.as_millis() - 1;
    let one = vec![BookItem::new(1, "오래된 도서", "https://example.com/1")];
    write_record(store.as_ref(), Bookstore::Yes24, Tier::Top100, &one, old).await.unwrap();

    let orch = Orchestrator::new(registry(Arc::new(AtomicUsize::new(0))), store.clone());
    let report = orch.refresh_stale(interval).await;

    assert_eq!(report.outcome(Bookstore::Yes24, Tier::Top100), Some(Outcome::Success { count: 8 }));
    assert_eq!(report.outcome(Bookstore::Kyobo, Tier::Top10), Some(Outcome::Success { count: 10 }));

    let cached = orch.cached().await.unwrap();
    assert!(cached.contains_key("yes24Top100"));
    assert!(cached.contains_key("kyoboTop10"));
    assert!(!cached.contains_key("aladinTop100"));
}
