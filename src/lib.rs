// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod refresh;
pub mod settings;
pub mod source;
pub mod trigger;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::model::{BookItem, Bookstore, Tier};
pub use crate::refresh::{Orchestrator, RefreshReport};
pub use crate::trigger::TriggerSurface;
