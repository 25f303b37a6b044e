// tests/providers_kyobo.rs
//
// Kyobo adapter against a captured API response.

use librovibe::source::kyobo::{parse_api, KyoboAdapter, DETAIL_URL};
use librovibe::source::SourceAdapter;
use librovibe::{Bookstore, Tier};

const TOP10: &str = include_str!("fixtures/kyobo_top10.json");

#[tokio::test]
async fn top10_maps_every_record_in_array_order() {
    let adapter = KyoboAdapter::from_fixture_str(TOP10);
    let items = adapter.fetch_top10().await;

    assert_eq!(items.len(), 10);
    let ranks: Vec<u32> = items.iter().map(|i| i.rank).collect();
    assert_eq!(ranks, (1..=10).collect::<Vec<_>>());
    // one-character titles are valid on the API path
    assert_eq!(items[3].title, "흰");
    assert_eq!(items[3].rank, 4);

    let first = &items[0];
    assert_eq!(first.title, "소년이 온다");
    assert_eq!(first.author.as_deref(), Some("한강"));
    assert_eq!(first.publisher.as_deref(), Some("창비"));
    assert_eq!(first.link, format!("{DETAIL_URL}S000200000"));
    assert_eq!(first.price.as_deref(), Some("15,000원"));
    assert_eq!(first.previous_rank, Some(2));
    assert!(first.cover.as_deref().is_some_and(|c| c.contains("S000200000")));
}

#[tokio::test]
async fn string_prices_are_normalized_too() {
    let items = KyoboAdapter::from_fixture_str(TOP10).fetch(Tier::Top10).await;
    // second record carries salePrc as a string
    assert_eq!(items[1].price.as_deref(), Some("13,500원"));
    assert_eq!(items[9].previous_rank, None);
}

#[tokio::test]
async fn top10_tier_caps_a_larger_payload() {
    let records: Vec<String> = (0..25)
        .map(|i| format!(r#"{{"cmdtName":"도서 {i}","cmdtCode":"S{i:04}"}}"#))
        .collect();
    let raw = format!(r#"{{"data":{{"bestSeller":[{}]}}}}"#, records.join(","));
    let adapter = KyoboAdapter::from_fixture_str(&raw);

    assert_eq!(adapter.fetch(Tier::Top10).await.len(), 10);
    assert_eq!(adapter.fetch(Tier::Top100).await.len(), 25);
}

#[tokio::test]
async fn malformed_envelope_yields_empty_list() {
    for raw in [r#"{"data":{}}"#, r#"{"error":"blocked"}"#, "not json", ""] {
        let items = KyoboAdapter::from_fixture_str(raw).fetch_top10().await;
        assert!(items.is_empty(), "expected empty for {raw:?}");
    }
    assert!(parse_api(r#"{"data":null}"#).is_err());
}

#[tokio::test]
async fn markup_without_listing_shape_yields_empty_list() {
    let drifted = include_str!("fixtures/drifted.html");
    let adapter = KyoboAdapter::from_fixture_str(drifted);
    assert_eq!(adapter.bookstore(), Bookstore::Kyobo);
    assert!(adapter.fetch_top100().await.is_empty());
}

#[test]
fn unusable_records_keep_array_position() {
    let raw = r#"{"data":{"bestSeller":[
        {"cmdtName":"첫 번째 책","cmdtCode":"S1"},
        {"cmdtName":"","cmdtCode":"S2"},
        {"cmdtName":"세 번째 책"},
        {"cmdtName":"네 번째 책","cmdtCode":4}
    ]}}"#;
    let items = parse_api(raw).unwrap();
    let got: Vec<(u32, &str)> = items.iter().map(|i| (i.rank, i.link.as_str())).collect();
    assert_eq!(
        got,
        vec![
            (1, "https://product.kyobobook.co.kr/detail/S1"),
            (4, "https://product.kyobobook.co.kr/detail/4"),
        ]
    );
}
