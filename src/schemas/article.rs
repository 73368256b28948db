//! Article Schema
//!
//! The canonical article every adapter emits, and the paired result shape
//! returned by adapters and by the aggregator alike.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::page_count;

/// Static provenance of an adapter, not per-article upstream payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// `<source tag>-<native key>`, stable across fetches
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: SourceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Articles for one page plus the grand total the source(s) reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub articles: Vec<Article>,
    pub total_results: u64,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(articles: Vec<Article>, total_results: u64) -> Self {
        Self {
            articles,
            total_results,
        }
    }

    pub fn page_count(&self) -> u64 {
        page_count(self.total_results)
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Builds a canonical id from a source tag and the source's native key
pub fn article_id(tag: &str, native_key: &str) -> String {
    format!("{}-{}", tag, native_key)
}

/// Cuts `text` to at most `max_chars` characters on a char boundary
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Returns the first non-blank candidate
pub fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
}
