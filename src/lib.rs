//! Feed Digest - An RSS/Atom Feed Aggregator
//!
//! Fetches feeds concurrently, retrying through a relay when a source fails,
//! and merges their entries into one newest-first list.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod normalizer;
pub mod parser;
pub mod routes;
pub mod xml;

pub use aggregator::{AggregateReport, Aggregator, SourceReport};
pub use config::{Config, FeedSource};
pub use error::{FeedError, FetchCause, FetchError, ParseError};
pub use normalizer::NewsItem;
