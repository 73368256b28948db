//! Filter Schema
//!
//! The canonical, source-agnostic description of which articles the user
//! wants. A fresh `Filter` is built on every interaction and is the only
//! input to the outbound requests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::common::{Page, SourceKind};
use crate::query::QueryClause;

/// Category identifier meaning "no restriction"
pub const ALL_CATEGORIES: &str = "all";

/// Inclusive date bounds, either side optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub sources: BTreeSet<SourceKind>,
    #[serde(default)]
    pub page: Page,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.search_query = query.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn from_date(mut self, from: NaiveDate) -> Self {
        self.date_range.from = Some(from);
        self
    }

    pub fn to_date(mut self, to: NaiveDate) -> Self {
        self.date_range.to = Some(to);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn source(mut self, source: SourceKind) -> Self {
        self.sources.insert(source);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    /// Category identifiers after applying the resolution policy.
    ///
    /// Identifiers are trimmed and lower-cased, blanks and duplicates are
    /// dropped. Any `all` entry makes the set unrestricted (empty).
    pub fn resolved_categories(&self) -> Vec<String> {
        let mut resolved: Vec<String> = Vec::new();
        for raw in &self.categories {
            let category = raw.trim().to_lowercase();
            if category == ALL_CATEGORIES {
                return Vec::new();
            }
            if !category.is_empty() && !resolved.contains(&category) {
                resolved.push(category);
            }
        }
        resolved
    }

    /// Lowers the filter into typed clauses.
    ///
    /// Absent criteria contribute no clause. Order is text, categories,
    /// author, dates.
    pub fn clauses(&self) -> Vec<QueryClause> {
        let mut clauses = Vec::new();

        let text = self.search_query.trim();
        if !text.is_empty() {
            clauses.push(QueryClause::Text(text.to_string()));
        }

        let categories = self.resolved_categories();
        if !categories.is_empty() {
            clauses.push(QueryClause::Categories(categories));
        }

        let author = self.author.trim();
        if !author.is_empty() {
            clauses.push(QueryClause::Author(author.to_string()));
        }

        if !self.date_range.is_unbounded() {
            clauses.push(QueryClause::DateRange(self.date_range));
        }

        clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_sentinel_is_unrestricted() {
        let filter = Filter::new().category("science").category("All");
        assert!(filter.resolved_categories().is_empty());
    }

    #[test]
    fn test_blank_and_duplicate_categories_dropped() {
        let filter = Filter::new()
            .category("")
            .category(" Science ")
            .category("science")
            .category("politics");
        assert_eq!(filter.resolved_categories(), vec!["science", "politics"]);
    }

    #[test]
    fn test_empty_filter_has_no_clauses() {
        let filter = Filter::new().query("   ").category("");
        assert!(filter.clauses().is_empty());
    }

    #[test]
    fn test_clause_order() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let filter = Filter::new()
            .query("climate")
            .author("Jane Doe")
            .category("science")
            .from_date(from);

        assert_eq!(
            filter.clauses(),
            vec![
                QueryClause::Text("climate".to_string()),
                QueryClause::Categories(vec!["science".to_string()]),
                QueryClause::Author("Jane Doe".to_string()),
                QueryClause::DateRange(DateRange { from: Some(from), to: None }),
            ]
        );
    }

    #[test]
    fn test_filter_deserializes_from_dashboard_json() {
        let json = r#"{
            "searchQuery": "climate",
            "categories": ["science"],
            "sources": ["general", "archive"],
            "dateRange": {"from": "2024-01-01", "to": null},
            "page": 2
        }"#;

        let filter: Filter = serde_json::from_str(json).unwrap();
        assert_eq!(filter.search_query, "climate");
        assert!(filter.author.is_empty());
        assert_eq!(filter.sources.len(), 2);
        assert_eq!(filter.page.one_based(), 2);
        assert_eq!(filter.date_range.from, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_filter_accepts_upstream_source_names() {
        let json = r#"{"searchQuery": "budget", "sources": ["newsapi", "nyt", "guardian"]}"#;

        let filter: Filter = serde_json::from_str(json).unwrap();
        assert_eq!(filter.sources, SourceKind::ALL.into_iter().collect::<BTreeSet<_>>());
        assert_eq!(filter.page, Page::FIRST);
    }
}
