//! Source adapters
//!
//! Each adapter translates a canonical `Filter` + `Page` into one upstream
//! request and maps that upstream's response into a `QueryResult`.
//! Adapter failures never cross `fetch_isolated`.

pub mod general;
pub mod archive;
pub mod magazine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::http_client::Transport;
use crate::query::SourceRequest;
use crate::schemas::{Filter, Page, QueryResult, SourceInfo, SourceKind};

/// Static provenance and description of an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub kind: SourceKind,
    /// Human-readable name
    pub name: String,
    /// Public home page of the publisher
    pub home_url: String,
    pub description: String,
}

impl SourceMetadata {
    /// Provenance stamped onto every article from this adapter
    pub fn provenance(&self) -> SourceInfo {
        SourceInfo {
            id: self.kind.tag().to_string(),
            name: self.name.clone(),
            url: self.home_url.clone(),
        }
    }
}

/// Raw upstream payloads, one variant per known schema
#[derive(Debug, Clone)]
pub enum RawResponse {
    General(general::GeneralResponse),
    Archive(archive::ArchiveResponse),
    Magazine(magazine::MagazineResponse),
}

impl RawResponse {
    /// Decodes `body` with the schema belonging to `kind`
    pub fn parse(kind: SourceKind, body: serde_json::Value) -> Result<Self> {
        Ok(match kind {
            SourceKind::General => RawResponse::General(serde_json::from_value(body)?),
            SourceKind::Archive => RawResponse::Archive(serde_json::from_value(body)?),
            SourceKind::Magazine => RawResponse::Magazine(serde_json::from_value(body)?),
        })
    }

    /// Maps the payload into canonical articles and a total
    pub fn normalize(self, provenance: &SourceInfo) -> Result<QueryResult> {
        match self {
            RawResponse::General(response) => general::normalize(response, provenance),
            RawResponse::Archive(response) => archive::normalize(response, provenance),
            RawResponse::Magazine(response) => magazine::normalize(response, provenance),
        }
    }
}

/// Trait for all news sources
#[async_trait]
pub trait Source: Send + Sync {
    /// Gets metadata about this source
    fn metadata(&self) -> &SourceMetadata;

    /// Builds the outbound request; performs no I/O
    fn build_request(&self, filter: &Filter, page: Page) -> SourceRequest;

    /// Transport used to execute requests
    fn transport(&self) -> &dyn Transport;

    fn kind(&self) -> SourceKind {
        self.metadata().kind
    }

    /// Executes the request and normalizes the response
    async fn fetch(&self, filter: &Filter, page: Page) -> Result<QueryResult> {
        let request = self.build_request(filter, page);
        debug!(source = %self.kind(), page = %page, "Fetching articles");

        let body = self.transport().get_json(&request).await?;
        let result = RawResponse::parse(self.kind(), body)?.normalize(&self.metadata().provenance())?;

        debug!(
            source = %self.kind(),
            articles = result.articles.len(),
            total = result.total_results,
            "Fetched articles"
        );
        Ok(result)
    }

    /// Like `fetch`, but any failure becomes an empty result for this source
    async fn fetch_isolated(&self, filter: &Filter, page: Page) -> QueryResult {
        match self.fetch(filter, page).await {
            Ok(result) => result,
            Err(e) => {
                warn!(source = %self.kind(), error = %e, "Source failed, contributing no articles");
                QueryResult::empty()
            }
        }
    }
}

pub use archive::ArchiveSource;
pub use general::GeneralNewsSource;
pub use magazine::MagazineSource;
