// src/model.rs
//! The normalized record every bookstore adapter produces.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Hard cap on one fetch result.
pub const MAX_ITEMS: usize = 100;

/// Titles shorter than this (in chars) are rejected during extraction.
pub const MIN_TITLE_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bookstore {
    Kyobo,
    Yes24,
    Aladin,
}

impl Bookstore {
    pub const ALL: [Bookstore; 3] = [Bookstore::Kyobo, Bookstore::Yes24, Bookstore::Aladin];

    /// Short key used in cache keys and metric labels.
    pub fn key(self) -> &'static str {
        match self {
            Bookstore::Kyobo => "kyobo",
            Bookstore::Yes24 => "yes24",
            Bookstore::Aladin => "aladin",
        }
    }

    /// Origin that relative links from this source are resolved against.
    pub fn origin(self) -> &'static str {
        match self {
            Bookstore::Kyobo => "https://product.kyobobook.co.kr",
            Bookstore::Yes24 => "https://www.yes24.com",
            Bookstore::Aladin => "https://www.aladin.co.kr",
        }
    }
}

impl fmt::Display for Bookstore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Top10,
    Top100,
}

impl Tier {
    pub fn limit(self) -> usize {
        match self {
            Tier::Top10 => 10,
            Tier::Top100 => MAX_ITEMS,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Top10 => f.write_str("Top10"),
            Tier::Top100 => f.write_str("Top100"),
        }
    }
}

/// One ranked entry, normalized across sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookItem {
    pub rank: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Display string with currency suffix, e.g. "16,200원".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Always absolute.
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_rank: Option<u32>,
}

impl BookItem {
    pub fn new(rank: u32, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            rank,
            title: title.into(),
            author: None,
            publisher: None,
            price: None,
            link: link.into(),
            cover: None,
            previous_rank: None,
        }
    }
}

/// Wall clock in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Sort by rank (stable), keep the first item claiming each rank, cap to `limit`.
pub fn finalize(mut items: Vec<BookItem>, limit: usize) -> Vec<BookItem> {
    items.sort_by_key(|it| it.rank);
    let mut seen = HashSet::with_capacity(items.len());
    let before = items.len();
    items.retain(|it| it.rank >= 1 && seen.insert(it.rank));
    if items.len() < before {
        tracing::debug!(dropped = before - items.len(), "dropped items with duplicate rank");
    }
    items.truncate(limit.min(MAX_ITEMS));
    items
}
