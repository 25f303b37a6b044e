// src/source/mod.rs
//! Bookstore adapters.
//!
//! Every adapter implements [`SourceAdapter`]: fetch raw content, turn it
//! into [`BookItem`]s, and swallow every failure at [`SourceAdapter::fetch`]
//! so one broken site never blocks the others. Adapters for HTML listing
//! pages also implement [`Parser`] (structure check + layered extraction).

pub mod aladin;
pub mod http;
pub mod kyobo;
pub mod shape;
pub mod text;
pub mod yes24;

use async_trait::async_trait;
use metrics::{counter, gauge};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::SourceError;
use crate::model::{finalize, now_ms, BookItem, Bookstore, Tier};
use crate::source::http::Fetcher;

pub use aladin::AladinAdapter;
pub use kyobo::KyoboAdapter;
pub use yes24::Yes24Adapter;

/// Structure check + extraction over one source's markup.
pub trait Parser: Send + Sync {
    /// Cheap check that a known shape is present before trusting the document.
    fn validate_structure(&self, raw: &str) -> bool;
    /// Items in ascending rank, at most 100. Empty when nothing matched.
    fn extract(&self, raw: &str) -> Vec<BookItem>;
}

/// Validate, then extract. Drift is reported as an error so the boundary logs it.
pub fn parse_markup<P: Parser + ?Sized>(parser: &P, raw: &str) -> Result<Vec<BookItem>, SourceError> {
    if !parser.validate_structure(raw) {
        return Err(SourceError::StructureValidation);
    }
    Ok(parser.extract(raw))
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn bookstore(&self) -> Bookstore;

    /// Tiers this source is fetched and cached at.
    fn tiers(&self) -> &'static [Tier] {
        &[Tier::Top100]
    }

    async fn fetch_raw(&self, tier: Tier) -> Result<String, SourceError>;

    fn parse(&self, raw: &str) -> Result<Vec<BookItem>, SourceError>;

    async fn try_fetch(&self, tier: Tier) -> Result<Vec<BookItem>, SourceError> {
        counter!("source_fetch_total", "source" => self.bookstore().key()).increment(1);
        let raw = self.fetch_raw(tier).await?;
        let items = self.parse(&raw)?;
        Ok(finalize(items, tier.limit()))
    }

    /// Adapter boundary: always a list, possibly empty.
    async fn fetch(&self, tier: Tier) -> Vec<BookItem> {
        let source = self.bookstore();
        match self.try_fetch(tier).await {
            Ok(items) => {
                if items.is_empty() {
                    tracing::warn!(source = %source, %tier, ts_ms = now_ms(), "source returned no items");
                } else {
                    counter!("source_items_total", "source" => source.key())
                        .increment(items.len() as u64);
                    tracing::info!(source = %source, %tier, items = items.len(), "source fetched");
                }
                gauge!("source_healthy", "source" => source.key())
                    .set(if items.is_empty() { 0.0 } else { 1.0 });
                items
            }
            Err(e) => {
                report_failure(source, tier, &e);
                Vec::new()
            }
        }
    }
}

fn report_failure(source: Bookstore, tier: Tier, err: &SourceError) {
    counter!(
        "source_fetch_errors_total",
        "source" => source.key(),
        "phase" => err.phase().to_string()
    )
    .increment(1);
    gauge!("source_healthy", "source" => source.key()).set(0.0);
    tracing::warn!(
        source = %source,
        %tier,
        ts_ms = now_ms(),
        phase = %err.phase(),
        error = %err,
        "source fetch failed"
    );
}

/// Where an adapter's raw content comes from.
#[derive(Debug, Clone)]
pub enum Transport {
    Http(Fetcher),
    /// Canned body returned for every tier (tests, offline runs).
    Fixture(String),
}

impl Transport {
    pub(crate) async fn get(
        &self,
        url: &str,
        accept: &str,
        referer: Option<&str>,
    ) -> Result<String, SourceError> {
        match self {
            Transport::Http(f) => f.get_text(url, accept, referer).await,
            Transport::Fixture(body) => Ok(body.clone()),
        }
    }
}

/// Source name → adapter instance. Built once at startup and handed to the
/// orchestrator.
pub type Registry = BTreeMap<Bookstore, Arc<dyn SourceAdapter>>;

pub fn http_registry(fetcher: &Fetcher) -> Registry {
    let mut reg: Registry = BTreeMap::new();
    reg.insert(Bookstore::Kyobo, Arc::new(KyoboAdapter::new(Transport::Http(fetcher.clone()))));
    reg.insert(Bookstore::Yes24, Arc::new(Yes24Adapter::new(Transport::Http(fetcher.clone()))));
    reg.insert(Bookstore::Aladin, Arc::new(AladinAdapter::new(Transport::Http(fetcher.clone()))));
    reg
}
