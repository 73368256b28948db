//! Common Schema Primitives
//!
//! Shared types used across all schemas

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::NewsError;

// ============================================
// SOURCES
// ============================================

/// The three upstream sources the dashboard can query.
///
/// Declaration order is invocation order; merged results with equal
/// timestamps keep this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// General news API (NewsAPI)
    #[serde(alias = "newsapi")]
    General,
    /// Newspaper archive API (NYT Article Search)
    #[serde(alias = "nyt")]
    Archive,
    /// Magazine / long-form API (Guardian Content)
    #[serde(alias = "guardian")]
    Magazine,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::General, SourceKind::Archive, SourceKind::Magazine];

    /// Tag used to prefix canonical article ids
    pub fn tag(&self) -> &'static str {
        match self {
            SourceKind::General => "general",
            SourceKind::Archive => "archive",
            SourceKind::Magazine => "magazine",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SourceKind {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" | "newsapi" => Ok(SourceKind::General),
            "archive" | "nyt" => Ok(SourceKind::Archive),
            "magazine" | "guardian" => Ok(SourceKind::Magazine),
            other => Err(NewsError::InvalidFilter(format!("unknown source: {}", other))),
        }
    }
}

// ============================================
// PAGINATION
// ============================================

/// Canonical 1-based page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page(NonZeroU32);

impl Page {
    pub const FIRST: Page = Page(NonZeroU32::MIN);

    /// Returns `None` for page 0
    pub fn new(page: u32) -> Option<Self> {
        NonZeroU32::new(page).map(Page)
    }

    pub fn one_based(&self) -> u32 {
        self.0.get()
    }

    pub fn zero_based(&self) -> u32 {
        self.0.get() - 1
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::FIRST
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of pages needed to show `total_results` items
pub fn page_count(total_results: u64) -> u64 {
    total_results.div_ceil(super::PAGE_SIZE)
}

// ============================================
// TIMESTAMPS
// ============================================

/// Parses the timestamp shapes the upstream sources emit.
///
/// Accepts RFC 3339, offsets without a colon (`+0000`) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}
