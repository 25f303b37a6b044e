// src/source/shape.rs
//! Layered structure matching for listing pages.
//!
//! A [`SiteProfile`] lists the structural shapes a site has been seen with,
//! most specific first. Validation and extraction walk the list top-down and
//! commit to the first shape whose elements carry a detail link. When no
//! selector shape matches, a regex over the raw markup looking for detail
//! anchors is the last resort.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Instant;

use metrics::histogram;

use crate::error::ElementError;
use crate::model::{finalize, BookItem, Bookstore, MAX_ITEMS};
use crate::source::text::{is_boilerplate, is_title_ok, normalize_text, resolve_link, sample};

/// One candidate structure: a selector for list items plus a predicate that
/// confirms an element is a real entry (and not an incidental container).
pub struct Shape {
    pub name: &'static str,
    pub items: &'static str,
    pub accepts: fn(ElementRef<'_>) -> bool,
}

/// Regex over raw markup. Group 1 is the href, group 2 the anchor's inner HTML.
pub struct LinkPattern {
    pub name: &'static str,
    pub regex: fn() -> &'static Regex,
}

pub struct SiteProfile {
    pub bookstore: Bookstore,
    pub shapes: &'static [Shape],
    pub links: LinkPattern,
}

pub struct Matched<'a> {
    pub shape: &'static Shape,
    pub elements: Vec<ElementRef<'a>>,
}

impl SiteProfile {
    /// First shape (in priority order) with at least one accepted element.
    pub fn match_first<'a>(&self, doc: &'a Html) -> Option<Matched<'a>> {
        for shape in self.shapes {
            let selector = match Selector::parse(shape.items) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(source = %self.bookstore, shape = shape.name, error = ?e, "bad shape selector");
                    continue;
                }
            };
            let candidates: Vec<ElementRef<'a>> = doc.select(&selector).collect();
            if candidates.is_empty() {
                tracing::debug!(source = %self.bookstore, shape = shape.name, "shape: no elements");
                continue;
            }
            let total = candidates.len();
            let elements: Vec<ElementRef<'a>> =
                candidates.into_iter().filter(|el| (shape.accepts)(*el)).collect();
            if elements.is_empty() {
                tracing::debug!(
                    source = %self.bookstore,
                    shape = shape.name,
                    matched = total,
                    "shape: elements present but none carry a detail link"
                );
                continue;
            }
            tracing::debug!(
                source = %self.bookstore,
                shape = shape.name,
                matched = total,
                accepted = elements.len(),
                "shape matched"
            );
            return Some(Matched { shape, elements });
        }
        None
    }

    /// Detail anchors found by the text fallback, as (absolute link, title),
    /// de-duplicated by link, boilerplate and short titles removed.
    pub fn scan_links(&self, raw: &str) -> Vec<(String, String)> {
        let origin = self.bookstore.origin();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for caps in (self.links.regex)().captures_iter(raw) {
            let (Some(href), Some(inner)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let title = normalize_text(inner.as_str());
            if !is_title_ok(&title) || is_boilerplate(&title) {
                continue;
            }
            let Some(link) = resolve_link(origin, href.as_str()) else {
                continue;
            };
            if seen.insert(link.clone()) {
                out.push((link, title));
            }
        }
        out
    }

    pub fn validate(&self, raw: &str) -> bool {
        if raw.trim().is_empty() {
            tracing::warn!(source = %self.bookstore, "validate: empty document");
            return false;
        }
        let doc = Html::parse_document(raw);
        if let Some(m) = self.match_first(&doc) {
            tracing::debug!(source = %self.bookstore, shape = m.shape.name, "validate: ok");
            return true;
        }
        let links = self.scan_links(raw);
        if !links.is_empty() {
            tracing::info!(
                source = %self.bookstore,
                pattern = self.links.name,
                links = links.len(),
                "validate: only the text fallback matched"
            );
            return true;
        }
        tracing::warn!(
            source = %self.bookstore,
            shapes = self.shapes.len(),
            "validate: no known shape matched, site structure may have changed"
        );
        false
    }

    /// Walk the shapes, parse each committed element with `parse_element`
    /// (which receives the 1-based position among accepted items), fall back
    /// to the link pattern, then sort/dedup/cap.
    pub fn extract<F>(&self, raw: &str, mut parse_element: F) -> Vec<BookItem>
    where
        F: FnMut(ElementRef<'_>, u32) -> Result<BookItem, ElementError>,
    {
        let t0 = Instant::now();
        let doc = Html::parse_document(raw);
        let mut items = Vec::new();

        if let Some(m) = self.match_first(&doc) {
            let mut rejected = 0usize;
            for el in &m.elements {
                let position = items.len() as u32 + 1;
                match parse_element(*el, position) {
                    Ok(item) => items.push(item),
                    Err(e) => {
                        rejected += 1;
                        tracing::debug!(
                            source = %self.bookstore,
                            shape = m.shape.name,
                            reason = %e,
                            sample = %sample(&el.text().collect::<Vec<_>>().join(" ")),
                            "element rejected"
                        );
                    }
                }
            }
            tracing::info!(
                source = %self.bookstore,
                shape = m.shape.name,
                matched = m.elements.len(),
                accepted = items.len(),
                rejected,
                "extracted"
            );
        } else {
            for (i, (link, title)) in self.scan_links(raw).into_iter().enumerate() {
                items.push(BookItem::new(i as u32 + 1, title, link));
            }
            if items.is_empty() {
                tracing::warn!(source = %self.bookstore, "extract: nothing matched");
            } else {
                tracing::info!(
                    source = %self.bookstore,
                    pattern = self.links.name,
                    accepted = items.len(),
                    "extracted with text fallback"
                );
            }
        }

        histogram!("source_parse_ms", "source" => self.bookstore.key())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        finalize(items, MAX_ITEMS)
    }
}

/// Joined, normalized text of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// First (title, link) among `anchors` inside `el`, skipping navigation chrome.
pub fn title_and_link(
    el: ElementRef<'_>,
    anchors: &[Selector],
    origin: &str,
    is_detail: fn(&str) -> bool,
) -> Result<(String, String), ElementError> {
    let mut saw_anchor = false;
    let mut saw_boilerplate = false;
    let mut short = None;
    for a in anchors.iter().flat_map(|sel| el.select(sel)) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !is_detail(href) {
            continue;
        }
        saw_anchor = true;
        let text = element_text(a);
        if text.is_empty() {
            continue;
        }
        if is_boilerplate(&text) {
            saw_boilerplate = true;
            continue;
        }
        if !is_title_ok(&text) {
            short = Some(text);
            continue;
        }
        let link = resolve_link(origin, href).ok_or(ElementError::MissingLink)?;
        return Ok((text, link));
    }
    Err(match (saw_anchor, short, saw_boilerplate) {
        (false, _, _) => ElementError::MissingLink,
        (true, Some(s), _) => ElementError::TitleTooShort(s),
        (true, None, true) => ElementError::BoilerplateOnly,
        (true, None, false) => ElementError::MissingTitle,
    })
}

/// First non-placeholder image source. Selectors are tried in order; per
/// image, lazy-load attributes win over `src`.
pub fn cover_of(el: ElementRef<'_>, images: &[Selector], origin: &str) -> Option<String> {
    const ATTRS: [&str; 4] = ["data-original", "data-src", "data-lazy", "src"];
    images.iter().flat_map(|sel| el.select(sel)).find_map(|img| {
        ATTRS.iter().find_map(|attr| {
            let v = img.value().attr(attr)?.trim();
            if v.is_empty() || v.starts_with("data:") {
                return None;
            }
            Some(resolve_link(origin, v).unwrap_or_else(|| v.to_string()))
        })
    })
}

/// Text of the first non-empty match, trying `sels` in order.
pub fn first_text(el: ElementRef<'_>, sels: &[Selector]) -> Option<String> {
    sels.iter()
        .flat_map(|sel| el.select(sel))
        .map(element_text)
        .find(|t| !t.is_empty())
}

/// True when any element under `el` matching `sels` satisfies `pred`.
pub fn any_match(el: ElementRef<'_>, sels: &[Selector], pred: impl Fn(ElementRef<'_>) -> bool) -> bool {
    sels.iter().flat_map(|sel| el.select(sel)).any(pred)
}

/// Parse a fallback list of selector literals, most specific first.
///
/// A scraper selector list (`"a, b"`) yields matches in document order, so
/// fallbacks that must be tried in priority order are kept as separate
/// selectors instead.
pub fn selector_list(items: &[&str]) -> Vec<Selector> {
    items
        .iter()
        .map(|s| Selector::parse(s).unwrap_or_else(|e| panic!("invalid selector {s:?}: {e:?}")))
        .collect()
}
