use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::FeedSource;
use crate::error::FeedError;
use crate::fetcher::Fetcher;
use crate::normalizer::{normalize_document, NewsItem};
use crate::parser::parse_feed;

/// How one source fared in an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source: String,
    pub url: String,
    pub item_count: usize,
    pub via_relay: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub items: Vec<NewsItem>,
    pub sources: Vec<SourceReport>,
}

#[derive(Debug)]
pub struct SourceOutcome {
    pub items: Vec<NewsItem>,
    pub report: SourceReport,
}

pub struct Aggregator {
    fetcher: Fetcher,
    max_items: usize,
}

impl Aggregator {
    pub fn new(fetcher: Fetcher, max_items: usize) -> Self {
        Self { fetcher, max_items }
    }

    pub async fn aggregate(&self, sources: &[FeedSource]) -> Vec<NewsItem> {
        self.aggregate_with_report(sources).await.items
    }

    /// Run every source concurrently and wait for all of them before merging.
    pub async fn aggregate_with_report(&self, sources: &[FeedSource]) -> AggregateReport {
        info!("Aggregating {} feeds", sources.len());

        let outcomes = join_all(sources.iter().map(|source| self.run_source(source))).await;

        let mut per_source = Vec::with_capacity(outcomes.len());
        let mut reports = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            per_source.push(outcome.items);
            reports.push(outcome.report);
        }

        let items = merge_items(per_source, self.max_items);
        info!("Aggregation complete: {} items to display", items.len());

        AggregateReport {
            items,
            sources: reports,
        }
    }

    /// Fetch, parse and normalize one source. Failures become an empty item
    /// list with the error recorded in the report.
    pub async fn run_source(&self, source: &FeedSource) -> SourceOutcome {
        match self.pipeline(source).await {
            Ok((items, via_relay)) => {
                info!("Got {} items from '{}'", items.len(), source.name);
                SourceOutcome {
                    report: SourceReport {
                        source: source.name.clone(),
                        url: source.url.clone(),
                        item_count: items.len(),
                        via_relay,
                        error: None,
                    },
                    items,
                }
            }
            Err(e) => {
                warn!("Failed to load feed '{}': {}", source.name, e);
                SourceOutcome {
                    items: Vec::new(),
                    report: SourceReport {
                        source: source.name.clone(),
                        url: source.url.clone(),
                        item_count: 0,
                        // every failing path has already tried the relay
                        via_relay: true,
                        error: Some(e.to_string()),
                    },
                }
            }
        }
    }

    async fn pipeline(&self, source: &FeedSource) -> Result<(Vec<NewsItem>, bool), FeedError> {
        let fetched = self.fetcher.fetch(&source.url).await?;
        let parsed = parse_feed(&self.fetcher, &source.url, fetched).await?;
        Ok((
            normalize_document(&parsed.document, &source.name),
            parsed.via_relay,
        ))
    }
}

/// Concatenate per-source lists in order, sort newest first (stable, so ties
/// keep merge order) and keep at most `limit` items.
pub fn merge_items(per_source: Vec<Vec<NewsItem>>, limit: usize) -> Vec<NewsItem> {
    let mut items: Vec<NewsItem> = per_source.into_iter().flatten().collect();
    items.sort_by(|a, b| b.publication_date.cmp(&a.publication_date));
    items.truncate(limit);
    items
}
