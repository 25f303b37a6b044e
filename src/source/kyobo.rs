// src/source/kyobo.rs
//! Kyobo bestseller JSON API, with a listing-HTML fallback for when the API
//! answers with a page instead of JSON.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ElementError, SourceError};
use crate::model::{BookItem, Bookstore, Tier};
use crate::source::http::{ACCEPT_HTML, ACCEPT_JSON};
use crate::source::shape::{any_match, cover_of, first_text, selector_list, title_and_link, LinkPattern, Shape, SiteProfile};
use crate::source::text::{extract_price, group_thousands, normalize_text, parse_rank, split_author_publisher};
use crate::source::{parse_markup, Parser, SourceAdapter, Transport};

pub const TOP10_URL: &str = "https://product.kyobobook.co.kr/api/gw/pub/pdt/best-seller/total?page=1&per=10&period=002&dsplDvsnCode=000&dsplTrgtDvsnCode=001";
pub const TOP100_URL: &str = "https://product.kyobobook.co.kr/api/gw/pub/pdt/best-seller/total?page=1&per=100&period=002&dsplDvsnCode=000&dsplTrgtDvsnCode=001";
const REFERER: &str = "https://product.kyobobook.co.kr/bestseller/online?period=002";

pub const DETAIL_URL: &str = "https://product.kyobobook.co.kr/detail/";
const COVER_URL: &str = "https://contents.kyobobook.co.kr/sih/fit-in/458x0/pdt/";

// --- JSON API ---

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    best_seller: Option<Vec<Record>>,
}

// Field types drift between number and string; keep them loose.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    cmdt_name: Option<String>,
    chrc_name: Option<String>,
    pbcm_name: Option<String>,
    sale_prc: Option<Value>,
    cmdt_code: Option<Value>,
    cmdt_img_url: Option<String>,
    prev_rank: Option<Value>,
}

fn value_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn value_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| normalize_text(&s)).filter(|s| !s.is_empty())
}

fn map_record(rec: Record, rank: u32) -> Result<BookItem, ElementError> {
    // No length floor on this path; "흰" is a real title.
    let title = non_empty(rec.cmdt_name).ok_or(ElementError::MissingTitle)?;
    let code = rec.cmdt_code.as_ref().and_then(value_string).ok_or(ElementError::MissingLink)?;

    let mut item = BookItem::new(rank, title, format!("{DETAIL_URL}{code}"));
    item.author = non_empty(rec.chrc_name);
    item.publisher = non_empty(rec.pbcm_name);
    item.price = rec
        .sale_prc
        .as_ref()
        .and_then(value_u64)
        .filter(|p| *p > 0)
        .map(|p| format!("{}원", group_thousands(p)));
    item.cover = non_empty(rec.cmdt_img_url).or_else(|| Some(format!("{COVER_URL}{code}.jpg")));
    item.previous_rank = rec
        .prev_rank
        .as_ref()
        .and_then(value_u64)
        .and_then(|r| u32::try_from(r).ok())
        .filter(|r| *r > 0);
    Ok(item)
}

/// Map `data.bestSeller[]` in array order; rank is the 1-based array index.
pub fn parse_api(raw: &str) -> Result<Vec<BookItem>, SourceError> {
    let env: Envelope = serde_json::from_str(raw)
        .map_err(|e| SourceError::MalformedResponse(format!("kyobo json: {e}")))?;
    let records = env
        .data
        .and_then(|d| d.best_seller)
        .ok_or_else(|| SourceError::MalformedResponse("missing data.bestSeller".into()))?;

    let total = records.len();
    let mut out = Vec::with_capacity(total);
    for (i, rec) in records.into_iter().enumerate() {
        let rank = i as u32 + 1;
        match map_record(rec, rank) {
            Ok(item) => out.push(item),
            Err(e) => tracing::debug!(source = "kyobo", rank, reason = %e, "record skipped"),
        }
    }
    tracing::info!(source = "kyobo", records = total, accepted = out.len(), "mapped api records");
    Ok(out)
}

// --- listing HTML fallback ---

static DETAIL_LINK: Lazy<Vec<Selector>> =
    Lazy::new(|| selector_list(&[".prod_name a", "a.prod_info", "a[href*='/detail/']"]));
static RANK: Lazy<Vec<Selector>> = Lazy::new(|| selector_list(&[".badge_flag .num", ".prod_rank", ".rank"]));
static AUTHOR: Lazy<Vec<Selector>> = Lazy::new(|| selector_list(&[".prod_author"]));
static PRICE: Lazy<Vec<Selector>> = Lazy::new(|| selector_list(&[".price .val", ".prod_price .price"]));
static COVER: Lazy<Vec<Selector>> =
    Lazy::new(|| selector_list(&[".prod_img img", ".prod_thumb_box img", "img"]));

static DETAIL_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<a\b[^>]*?href\s*=\s*["']((?:https?://product\.kyobobook\.co\.kr)?/detail/[A-Z0-9]+[^"']*)["'][^>]*>(.*?)</a>"#,
    )
    .unwrap()
});

fn detail_anchor() -> &'static Regex {
    &DETAIL_ANCHOR
}

fn is_detail_href(href: &str) -> bool {
    href.contains("/detail/")
}

fn has_detail_link(el: ElementRef<'_>) -> bool {
    any_match(el, &DETAIL_LINK, |a| a.value().attr("href").is_some_and(is_detail_href))
}

pub static PROFILE: SiteProfile = SiteProfile {
    bookstore: Bookstore::Kyobo,
    shapes: &[
        Shape { name: "prod_item", items: ".prod_item", accepts: has_detail_link },
        Shape { name: "prod_list-li", items: ".prod_list > li, .list_result_wrap li", accepts: has_detail_link },
    ],
    links: LinkPattern { name: "detail-anchor", regex: detail_anchor },
};

fn parse_element(el: ElementRef<'_>, position: u32) -> Result<BookItem, ElementError> {
    let origin = Bookstore::Kyobo.origin();
    let (title, link) = title_and_link(el, &DETAIL_LINK, origin, is_detail_href)?;
    let rank = first_text(el, &RANK).and_then(|t| parse_rank(&t)).unwrap_or(position);

    // "저자 : 한강 · 창비 · 2024.01.01"
    let (author, publisher) = first_text(el, &AUTHOR)
        .map(|t| {
            let t = t.trim_start_matches("저자 :").trim_start_matches("저자:").replace('·', "|");
            let (a, p) = split_author_publisher(&t);
            (a.or_else(|| Some(normalize_text(&t)).filter(|s| !s.is_empty())), p)
        })
        .unwrap_or((None, None));

    let price = first_text(el, &PRICE).and_then(|t| {
        if t.contains('원') {
            extract_price(&t)
        } else {
            extract_price(&format!("{t}원"))
        }
    });

    let mut item = BookItem::new(rank, title, link);
    item.author = author;
    item.publisher = publisher;
    item.price = price;
    item.cover = cover_of(el, &COVER, origin);
    Ok(item)
}

pub struct KyoboListingParser;

impl Parser for KyoboListingParser {
    fn validate_structure(&self, raw: &str) -> bool {
        PROFILE.validate(raw)
    }

    fn extract(&self, raw: &str) -> Vec<BookItem> {
        PROFILE.extract(raw, parse_element)
    }
}

// --- adapter ---

pub struct KyoboAdapter {
    transport: Transport,
}

impl KyoboAdapter {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn from_fixture_str(s: &str) -> Self {
        Self::new(Transport::Fixture(s.to_string()))
    }

    fn url(tier: Tier) -> &'static str {
        match tier {
            Tier::Top10 => TOP10_URL,
            Tier::Top100 => TOP100_URL,
        }
    }

    pub async fn fetch_top10(&self) -> Vec<BookItem> {
        self.fetch(Tier::Top10).await
    }

    pub async fn fetch_top100(&self) -> Vec<BookItem> {
        self.fetch(Tier::Top100).await
    }
}

#[async_trait]
impl SourceAdapter for KyoboAdapter {
    fn bookstore(&self) -> Bookstore {
        Bookstore::Kyobo
    }

    fn tiers(&self) -> &'static [Tier] {
        &[Tier::Top10, Tier::Top100]
    }

    async fn fetch_raw(&self, tier: Tier) -> Result<String, SourceError> {
        let accept = format!("{ACCEPT_JSON}, {ACCEPT_HTML}");
        self.transport.get(Self::url(tier), &accept, Some(REFERER)).await
    }

    fn parse(&self, raw: &str) -> Result<Vec<BookItem>, SourceError> {
        if raw.trim_start().starts_with('<') {
            tracing::warn!(source = "kyobo", "api answered with markup, using listing fallback");
            return parse_markup(&KyoboListingParser, raw);
        }
        parse_api(raw)
    }
}
