// src/source/yes24.rs
//! YES24 bestseller listing (HTML).

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

pub const TOP100_URL: &str =
    "https://www.yes24.com/Product/Category/BestSeller?categoryNumber=001&pageNumber=1&pageSize=120";

static GOODS_LINK: Lazy<Vec<Selector>> =
    Lazy::new(|| selector_list(&["a.gd_name", ".info_name a", "a[href*='/Product/Goods/']"]));
static RANK: Lazy<Vec<Selector>> = Lazy::new(|| selector_list(&["em.ico.rank", ".num", ".rank"]));
static AUTH_PUB: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".info_auth, .info_pub, .authPub, .goods_auth, .goods_pub, .aupu").unwrap());
static PRICE: Lazy<Vec<Selector>> =
    Lazy::new(|| selector_list(&[".yes_b", ".yes_m strong", ".info_price strong", ".goods_price em"]));
static COVER: Lazy<Vec<Selector>> = Lazy::new(|| selector_list(&["img.lazy", ".img_bdr img", "img"]));
static LI: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());

static GOODS_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<a\b[^>]*?href\s*=\s*["']((?:https?://www\.yes24\.com)?/Product/Goods/\d+[^"']*)["'][^>]*>(.*?)</a>"#,
    )
    .unwrap()
});

fn goods_anchor() -> &'static Regex {
    &GOODS_ANCHOR
}

fn is_goods_href(href: &str) -> bool {
    href.contains("/Product/Goods/")
}

fn has_goods_link(el: ElementRef<'_>) -> bool {
    any_match(el, &GOODS_LINK, |a| a.value().attr("href").is_some_and(is_goods_href))
}

fn is_leaf_entry(el: ElementRef<'_>) -> bool {
    el.select(&LI).next().is_none() && has_goods_link(el)
}

pub static PROFILE: SiteProfile = SiteProfile {
    bookstore: Bookstore::Yes24,
    shapes: &[
        Shape { name: "yesBestList", items: "#yesBestList > li", accepts: has_goods_link },
        Shape { name: "bestList-ol", items: "#bestList > ol > li", accepts: has_goods_link },
        Shape { name: "itemUnit", items: "div.itemUnit, .goods_list > li", accepts: has_goods_link },
        Shape { name: "generic-li", items: "li", accepts: is_leaf_entry },
    ],
    links: LinkPattern { name: "goods-anchor", regex: goods_anchor },
};

fn parse_element(el: ElementRef<'_>, position: u32) -> Result<BookItem, ElementError> {
    let origin = Bookstore::Yes24.origin();
    let (title, link) = title_and_link(el, &GOODS_LINK, origin, is_goods_href)?;

    let rank = first_text(el, &RANK).and_then(|t| parse_rank(&t)).unwrap_or(position);

    let blob = el
        .select(&AUTH_PUB)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    let (author, publisher) = split_author_publisher(&blob);

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

pub struct Yes24Parser;

impl Parser for Yes24Parser {
    fn validate_structure(&self, raw: &str) -> bool {
        PROFILE.validate(raw)
    }

    fn extract(&self, raw: &str) -> Vec<BookItem> {
        PROFILE.extract(raw, parse_element)
    }
}

pub struct Yes24Adapter {
    transport: Transport,
}

impl Yes24Adapter {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn from_fixture_str(s: &str) -> Self {
        Self::new(Transport::Fixture(s.to_string()))
    }
}

#[async_trait]
impl SourceAdapter for Yes24Adapter {
    fn bookstore(&self) -> Bookstore {
        Bookstore::Yes24
    }

    async fn fetch_raw(&self, _tier: Tier) -> Result<String, SourceError> {
        self.transport.get(TOP100_URL, ACCEPT_HTML, None).await
    }

    fn parse(&self, raw: &str) -> Result<Vec<BookItem>, SourceError> {
        parse_markup(&Yes24Parser, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r##"
<div id="bestList"><ol>
  <li>
    <p class="num">1</p>
    <a href="/Product/Goods/100" class="bgYUI ico_nWin">새창보기</a>
    <a href="/Product/Goods/100" class="gd_name">채식주의자</a>
    <span class="authPub info_auth"><a href="#">한강</a> 저</span>
    <span class="authPub info_pub"><a href="#">창비</a></span>
    <span class="yes_m"><strong>13,500원</strong></span>
    <img class="lazy" src="data:image/gif;base64,R0l" data-original="https://image.yes24.com/goods/100/M">
  </li>
  <li>
    <p class="num">2</p>
    <a href="/Product/Goods/200" class="gd_name">X</a>
  </li>
</ol></div>"##;

    #[test]
    fn fallback_selectors_are_tried_in_priority_order() {
        let raw = r##"<ul id="yesBestList"><li>
            <span class="num">12</span>
            <img class="ico_new" src="https://image.yes24.com/sysimage/icon_new.gif">
            <em class="ico rank">3</em>
            <a href="/Product/Goods/300" class="gd_name">작별하지 않는다</a>
            <img class="lazy" src="data:image/gif;base64,R0l" data-original="https://image.yes24.com/goods/300/M">
        </li></ul>"##;
        let items = Yes24Parser.extract(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].rank, 3, "review count must not stand in for the rank badge");
        assert_eq!(items[0].cover.as_deref(), Some("https://image.yes24.com/goods/300/M"));
    }

    #[test]
    fn legacy_ordered_list_shape() {
        let items = Yes24Parser.extract(LEGACY);
        assert_eq!(items.len(), 1, "one-char title is rejected");
        let it = &items[0];
        assert_eq!(it.rank, 1);
        assert_eq!(it.title, "채식주의자");
        assert_eq!(it.link, "https://www.yes24.com/Product/Goods/100");
        assert_eq!(it.author.as_deref(), Some("한강"));
        assert_eq!(it.publisher.as_deref(), Some("창비"));
        assert_eq!(it.price.as_deref(), Some("13,500원"));
        assert_eq!(it.cover.as_deref(), Some("https://image.yes24.com/goods/100/M"));
    }

    #[test]
    fn text_fallback_when_no_selector_shape_matches() {
        let raw = r#"<div><p><a href="/Product/Goods/7">작별하지 않는다</a>
            <a href="/Product/Goods/7">미리보기</a>
            <a href="/Product/Goods/8">흰</a><a href="/Product/Goods/9">희랍어 시간</a></p></div>"#;
        assert!(Yes24Parser.validate_structure(raw));
        let items = Yes24Parser.extract(raw);
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["작별하지 않는다", "희랍어 시간"]);
        assert_eq!(items[1].rank, 2);
    }
}
