// tests/live_sources.rs
//
// Hits the real sites. Run with `--features live`; results depend on the
// sites being reachable and on their current markup.

#![cfg(feature = "live")]

use librovibe::config::HttpConfig;
use librovibe::source::{http::Fetcher, http_registry, SourceAdapter};
use librovibe::Tier;

#[tokio::test]
async fn every_source_returns_a_ranked_list() {
    let fetcher = Fetcher::new(&HttpConfig::default()).expect("http client");
    for (store, adapter) in http_registry(&fetcher) {
        let items = adapter.fetch(Tier::Top100).await;
        assert!(!items.is_empty(), "{store} returned nothing");
        assert!(items.len() <= 100);
        assert!(items.windows(2).all(|w| w[0].rank < w[1].rank), "{store} ranks not ascending");
        assert!(items.iter().all(|i| i.link.starts_with("http")));
    }
}

#[tokio::test]
async fn kyobo_top10_is_ten_items() {
    let fetcher = Fetcher::new(&HttpConfig::default()).expect("http client");
    let reg = http_registry(&fetcher);
    let kyobo = &reg[&librovibe::Bookstore::Kyobo];
    assert_eq!(kyobo.fetch(Tier::Top10).await.len(), 10);
}
