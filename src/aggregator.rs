//! Aggregator
//!
//! Fans one canonical filter out to the selected adapters concurrently,
//! waits for every branch to settle, then merges:
//! - articles concatenated in adapter order, stable-sorted newest first
//! - totals summed across adapters
//!
//! Adapter errors are already absorbed by `Source::fetch_isolated`. A panic
//! inside an adapter is caught here and treated as that source failing;
//! only when every selected adapter panics does the call itself fail.

use futures::future::join_all;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::config::Config;
use crate::error::{NewsError, Result};
use crate::http_client::{HttpTransport, ResilientHttpClient, SourceGuard, Transport};
use crate::schemas::{Filter, Page, QueryResult, SourceKind};
use crate::sources::{ArchiveSource, GeneralNewsSource, MagazineSource, Source};

pub struct Aggregator {
    sources: BTreeMap<SourceKind, Arc<dyn Source>>,
}

impl Aggregator {
    /// Creates an aggregator over an explicit set of adapters
    pub fn new(sources: impl IntoIterator<Item = Arc<dyn Source>>) -> Self {
        let sources = sources.into_iter().map(|s| (s.kind(), s)).collect();
        Self { sources }
    }

    /// Wires the three production adapters over a shared HTTP transport
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = ResilientHttpClient::new(&config.http_client_config())?;
        let breaker_config: CircuitBreakerConfig = config.circuit_breaker_config();

        let transport = SourceKind::ALL.iter().fold(HttpTransport::new(client), |transport, kind| {
            transport.with_guard(
                *kind,
                SourceGuard::new(*kind, config.rate_limit_rpm(*kind), breaker_config.clone()),
            )
        });
        let transport: Arc<dyn Transport> = Arc::new(transport);

        let sources: Vec<Arc<dyn Source>> = vec![
            Arc::new(GeneralNewsSource::new(
                transport.clone(),
                config.base_url(SourceKind::General),
                config.api_key(SourceKind::General),
            )),
            Arc::new(ArchiveSource::new(
                transport.clone(),
                config.base_url(SourceKind::Archive),
                config.api_key(SourceKind::Archive),
            )),
            Arc::new(MagazineSource::new(
                transport,
                config.base_url(SourceKind::Magazine),
                config.api_key(SourceKind::Magazine),
            )),
        ];

        info!(sources = sources.len(), "Aggregator initialized");
        Ok(Self::new(sources))
    }

    /// Registered adapters, in invocation order
    pub fn sources(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.values()
    }

    /// Queries every source selected by `filter` for `page` and merges the results.
    ///
    /// `page` is the page requested from every source; `filter.page` is not
    /// consulted. `Session::refresh` passes `filter.page` here.
    #[instrument(skip(self, filter), fields(page = %page, sources = filter.sources.len()))]
    pub async fn aggregate(&self, filter: &Filter, page: Page) -> Result<QueryResult> {
        let active: Vec<&Arc<dyn Source>> = filter
            .sources
            .iter()
            .filter_map(|kind| {
                let source = self.sources.get(kind);
                if source.is_none() {
                    warn!(source = %kind, "Selected source is not registered, skipping");
                }
                source
            })
            .collect();

        if active.is_empty() {
            debug!("No active sources, returning empty result");
            return Ok(QueryResult::empty());
        }

        let calls = active.iter().map(|source| async move {
            let outcome = AssertUnwindSafe(source.fetch_isolated(filter, page))
                .catch_unwind()
                .await;
            (source.kind(), outcome)
        });
        let outcomes = join_all(calls).await;

        let selected = outcomes.len();
        let mut partials = Vec::with_capacity(selected);
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(result) => partials.push(result),
                Err(_) => error!(source = %kind, "Source panicked, contributing no articles"),
            }
        }

        if partials.is_empty() {
            return Err(NewsError::AllSourcesFailed);
        }

        let merged = merge(partials);
        info!(
            selected,
            articles = merged.articles.len(),
            total = merged.total_results,
            "Aggregate query completed"
        );
        Ok(merged)
    }
}

/// Concatenates partial results, newest first, summing the totals.
///
/// The sort is stable: equal timestamps keep concatenation order.
pub fn merge(partials: impl IntoIterator<Item = QueryResult>) -> QueryResult {
    let mut merged = QueryResult::empty();
    for partial in partials {
        merged.total_results += partial.total_results;
        merged.articles.extend(partial.articles);
    }
    merged
        .articles
        .sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged
}
