// src/source/text.rs
//! Free-text heuristics shared by the HTML adapters.
//!
//! The author/publisher and price patterns mirror what the listing pages
//! print today. They are tried in a fixed order; keep that order when
//! adding patterns.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::model::MIN_TITLE_CHARS;

/// Decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = RE_TAGS.replace_all(&out, " ").to_string();

    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
    out = RE_WS.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

pub fn is_title_ok(title: &str) -> bool {
    title.chars().count() >= MIN_TITLE_CHARS
}

/// Anchor labels that are navigation chrome, never a book title.
const BOILERPLATE: &[&str] = &[
    "미리보기",
    "새창보기",
    "새창이동",
    "새창으로 보기",
    "새창",
    "자세히 보기",
    "자세히보기",
    "더보기",
    "장바구니",
    "바로구매",
    "카트에 넣기",
    "preview",
    "open in new window",
    "more info",
];

pub fn is_boilerplate(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    BOILERPLATE.iter().any(|b| t == *b || t.starts_with(&format!("{b} ")))
}

/// Leading number in a rank marker: "1", "1.", "1위", " 12 ".
pub fn parse_rank(text: &str) -> Option<u32> {
    static RE_RANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{1,3})\s*(?:[.위]|$|\s)").unwrap());
    let caps = RE_RANK.captures(text)?;
    caps.get(1)?.as_str().parse().ok().filter(|r: &u32| *r >= 1)
}

// "한강 저 | 창비 | 2014년 05월" / "한강 (지은이), 홍길동 (옮긴이) | 창비 | 2014년 5월"
static RE_AUTH_PUB_PRECISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<author>[^|]+?)(?:\s+|\s*\()(?:지은이|저|지음|글|엮음|편저|편)\)?(?:\s*,[^|]*)?\s*\|\s*(?P<publisher>[^|]+?)\s*(?:\||$)",
    )
    .unwrap()
});

// "한강 | 창비"
static RE_AUTH_PUB_LOOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<author>[^|]+?)\s*\|\s*(?P<publisher>[^|]+?)\s*(?:\||$)").unwrap()
});

/// Split a combined "author | publisher | date" blob. Precise pattern first,
/// then the loose two-field split. Either side may come back empty.
pub fn split_author_publisher(blob: &str) -> (Option<String>, Option<String>) {
    let blob = normalize_text(blob);
    if blob.is_empty() {
        return (None, None);
    }
    let caps = RE_AUTH_PUB_PRECISE
        .captures(&blob)
        .or_else(|| RE_AUTH_PUB_LOOSE.captures(&blob));
    match caps {
        Some(c) => (
            c.name("author").map(|m| m.as_str().trim().to_string()).filter(|s| !s.is_empty()),
            c.name("publisher").map(|m| m.as_str().trim().to_string()).filter(|s| !s.is_empty()),
        ),
        None => (None, None),
    }
}

/// First "12,345원" (or "12345원") in the blob, normalized to "12,345원".
pub fn extract_price(blob: &str) -> Option<String> {
    static RE_PRICE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d{1,3}(?:,\d{3})+|\d+)\s*원").unwrap());
    let caps = RE_PRICE.captures(blob)?;
    let digits: String = caps.get(1)?.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
    let n: u64 = digits.parse().ok()?;
    (n > 0).then(|| format!("{}원", group_thousands(n)))
}

pub fn group_thousands(n: u64) -> String {
    let raw = n.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Resolve `href` against `origin`; only http(s) results are accepted.
pub fn resolve_link(origin: &str, href: &str) -> Option<String> {
    let href = html_escape::decode_html_entities(href.trim()).to_string();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    let base = Url::parse(origin).ok()?;
    let url = base.join(&href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Short sample of element text for rejection diagnostics.
pub fn sample(text: &str) -> String {
    const MAX: usize = 80;
    let t = normalize_text(text);
    if t.chars().count() > MAX {
        let mut s: String = t.chars().take(MAX).collect();
        s.push('…');
        s
    } else {
        t
    }
}
