//! Error types for the per-source pipeline.
//!
//! None of these ever reach the aggregator's caller: they are logged and
//! recorded in the source's report, and the source contributes no items.

use thiserror::Error;

/// Why a single HTTP attempt was not usable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchCause {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("unexpected content type: {0}")]
    ContentType(String),
}

/// Both the direct and the relay attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to fetch {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: FetchCause,
}

/// The feed text stayed malformed after every recovery attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to parse feed from {url}: {reason}")]
pub struct ParseError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
