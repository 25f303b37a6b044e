// src/source/aladin.rs
//! Aladin weekly bestseller listing (HTML).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::error::{ElementError, SourceError};
use crate::model::{BookItem, Bookstore, Tier};
use crate::source::http::ACCEPT_HTML;
use crate::source::shape::{
    any_match, cover_of, element_text, first_text, selector_list, title_and_link, LinkPattern, Shape, SiteProfile,
};
use crate::source::text::{extract_price, parse_rank, split_author_publisher};
use crate::source::{parse_markup, Parser, SourceAdapter, Transport};

// Without Year/Month/Week the site serves the current week.
pub const TOP100_URL: &str = "https://www.aladin.co.kr/shop/common/wbest.aspx?BranchType=1&CID=0&BestType=Bestseller&MaxPageIndex=10&page=1&cnt=1000&SortOrder=1";

static PRODUCT_LINK: Lazy<Vec<Selector>> =
    Lazy::new(|| selector_list(&["a.bo3", "a[href*='wproduct.aspx']"]));
static RANK: Lazy<Vec<Selector>> = Lazy::new(|| selector_list(&[".ss_ht1", ".rank", ".num"]));
static LIST_LINES: Lazy<Selector> = Lazy::new(|| Selector::parse(".ss_book_list li, li").unwrap());
static PRICE: Lazy<Vec<Selector>> = Lazy::new(|| selector_list(&[".ss_p2"]));
static COVER: Lazy<Vec<Selector>> =
    Lazy::new(|| selector_list(&["img.front_cover", ".flipcover_in img", "img.i_cover", "img"]));
static NESTED_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("table, tr").unwrap());

static PRODUCT_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<a\b[^>]*?href\s*=\s*["']((?:https?://www\.aladin\.co\.kr)?/shop/wproduct\.aspx\?ItemId=\d+[^"']*)["'][^>]*>(.*?)</a>"#,
    )
    .unwrap()
});

fn product_anchor() -> &'static Regex {
    &PRODUCT_ANCHOR
}

fn is_product_href(href: &str) -> bool {
    href.contains("wproduct.aspx") && href.contains("ItemId=")
}

fn has_product_link(el: ElementRef<'_>) -> bool {
    any_match(el, &PRODUCT_LINK, |a| a.value().attr("href").is_some_and(is_product_href))
}

fn is_leaf_row(el: ElementRef<'_>) -> bool {
    el.select(&NESTED_ROW).next().is_none() && has_product_link(el)
}

pub static PROFILE: SiteProfile = SiteProfile {
    bookstore: Bookstore::Aladin,
    shapes: &[
        Shape { name: "ss_book_box", items: "div.ss_book_box", accepts: has_product_link },
        Shape { name: "book_box-like", items: "[class*='book_box'], [itemtype*='Book']", accepts: has_product_link },
        Shape { name: "generic-row", items: "tr, li", accepts: is_leaf_row },
    ],
    links: LinkPattern { name: "wproduct-anchor", regex: product_anchor },
};

/// The "author (지은이) | publisher | date" line: the first line with a pipe
/// that is not the title line.
fn author_line(el: ElementRef<'_>) -> Option<String> {
    el.select(&LIST_LINES)
        .filter(|li| !any_match(*li, &PRODUCT_LINK, |_| true))
        .map(element_text)
        .find(|t| t.contains('|'))
}

fn parse_element(el: ElementRef<'_>, position: u32) -> Result<BookItem, ElementError> {
    let origin = Bookstore::Aladin.origin();
    let (title, link) = title_and_link(el, &PRODUCT_LINK, origin, is_product_href)?;

    let rank = first_text(el, &RANK).and_then(|t| parse_rank(&t)).unwrap_or(position);

    let (author, publisher) = author_line(el)
        .map(|blob| split_author_publisher(&blob))
        .unwrap_or((None, None));

    let price = first_text(el, &PRICE)
        .and_then(|t| extract_price(&t))
        .or_else(|| extract_price(&element_text(el)));

    let mut item = BookItem::new(rank, title, link);
    item.author = author;
    item.publisher = publisher;
    item.price = price;
    item.cover = cover_of(el, &COVER, origin);
    Ok(item)
}

pub struct AladinParser;

impl Parser for AladinParser {
    fn validate_structure(&self, raw: &str) -> bool {
        PROFILE.validate(raw)
    }

    fn extract(&self, raw: &str) -> Vec<BookItem> {
        PROFILE.extract(raw, parse_element)
    }
}

pub struct AladinAdapter {
    transport: Transport,
}

impl AladinAdapter {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn from_fixture_str(s: &str) -> Self {
        Self::new(Transport::Fixture(s.to_string()))
    }
}

#[async_trait]
impl SourceAdapter for AladinAdapter {
    fn bookstore(&self) -> Bookstore {
        Bookstore::Aladin
    }

    async fn fetch_raw(&self, _tier: Tier) -> Result<String, SourceError> {
        self.transport.get(TOP100_URL, ACCEPT_HTML, None).await
    }

    fn parse(&self, raw: &str) -> Result<Vec<BookItem>, SourceError> {
        parse_markup(&AladinParser, raw)
    }
}
