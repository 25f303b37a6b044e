// src/error.rs
use std::fmt;

/// Where in a refresh cycle a source gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Fetching,
    Validating,
    Extracting,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchPhase::Fetching => "fetching",
            FetchPhase::Validating => "validating",
            FetchPhase::Extracting => "extracting",
        };
        f.write_str(s)
    }
}

/// Failures that end one adapter invocation. Never leave the adapter boundary.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("site structure may have changed: no known shape matched")]
    StructureValidation,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl SourceError {
    pub fn phase(&self) -> FetchPhase {
        match self {
            SourceError::Network(_) => FetchPhase::Fetching,
            SourceError::StructureValidation => FetchPhase::Validating,
            SourceError::MalformedResponse(_) => FetchPhase::Extracting,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Network(format!("timed out: {e}"))
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// A single list element that could not be turned into an item; it is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElementError {
    #[error("no title")]
    MissingTitle,
    #[error("title too short: {0:?}")]
    TitleTooShort(String),
    #[error("no resolvable detail link")]
    MissingLink,
    #[error("only navigation anchors")]
    BoilerplateOnly,
}
