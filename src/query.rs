//! Declarative query building
//!
//! A `Filter` is lowered into typed `QueryClause`s once; every adapter then
//! renders those clauses with its own `ClauseRenderer` into a
//! `SourceRequest`. Nothing here touches the network.

use std::fmt;

use crate::schemas::{DateRange, Filter, Page, SourceKind};

/// One criterion of a canonical filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryClause {
    /// Free text
    Text(String),
    /// Resolved, non-empty category identifiers
    Categories(Vec<String>),
    /// Author display name
    Author(String),
    /// At least one bound present
    DateRange(DateRange),
}

/// Where a source expects its API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlacement {
    Header(&'static str),
    Query(&'static str),
}

/// An API key together with where it goes
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub placement: AuthPlacement,
    pub value: String,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("placement", &self.placement)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Fully-formed outbound request for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub source: SourceKind,
    pub base_url: String,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub auth: Option<ApiKey>,
}

impl SourceRequest {
    pub fn new(source: SourceKind, base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            path: path.into(),
            params: Vec::new(),
            auth: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Adds the parameter only when a value is present
    pub fn param_opt(self, key: impl Into<String>, value: Option<String>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn auth(mut self, auth: Option<ApiKey>) -> Self {
        self.auth = auth;
        self
    }

    /// Looks up the first value of a query parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Base URL and path joined with exactly one slash
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// Renders canonical clauses into one source's request grammar
pub trait ClauseRenderer {
    /// Per-request accumulator the clauses are folded into
    type Draft: Default;

    fn render(&self, clause: &QueryClause, draft: &mut Self::Draft);

    fn finish(&self, draft: Self::Draft, page: Page) -> SourceRequest;
}

/// Lowers `filter` and folds every clause through `renderer`
pub fn build_request<R: ClauseRenderer + ?Sized>(renderer: &R, filter: &Filter, page: Page) -> SourceRequest {
    let mut draft = R::Draft::default();
    for clause in filter.clauses() {
        renderer.render(&clause, &mut draft);
    }
    renderer.finish(draft, page)
}

/// `(a) AND (b) AND (c)`; `None` when there are no parts
pub fn and_group<I, S>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts
        .into_iter()
        .map(|p| format!("({})", p.as_ref()))
        .collect::<Vec<_>>()
        .join(" AND ");
    (!joined.is_empty()).then_some(joined)
}

/// `field:("a" OR "b")` with embedded quotes removed
pub fn field_phrase_group(field: &str, values: &[String]) -> String {
    let quoted = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{}:({})", field, quoted)
}
