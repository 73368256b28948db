//! Newsdesk
//! Multi-source news search with a single canonical article model
//!
//! Features:
//! - One filter fanned out to NewsAPI, NYT Article Search and The Guardian
//! - Declarative query clauses rendered per upstream grammar
//! - Concurrent fan-out with per-source failure isolation
//! - Newest-first merge with summed totals for pagination
//! - Circuit breaker and rate limiting per source
//! - Semaphore-based concurrency limiting
//! - Stale-response guard for superseded searches

pub mod aggregator;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod http_client;
pub mod query;
pub mod schemas;
pub mod session;
pub mod sources;

pub use aggregator::{merge, Aggregator};
pub use config::Config;
pub use error::{NewsError, Result};
pub use schemas::{Article, DateRange, Filter, Page, QueryResult, SourceInfo, SourceKind};
pub use session::{FeedState, Session};
