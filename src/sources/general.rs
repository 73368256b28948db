//! General-news adapter (NewsAPI)
//!
//! https://newsapi.org/docs/endpoints/everything
//!
//! NewsAPI has no author or category parameter on `/everything`, so text,
//! category and author are folded into a single boolean `q`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::{Source, SourceMetadata};
use crate::error::{NewsError, Result};
use crate::http_client::Transport;
use crate::query::{and_group, build_request, ApiKey, AuthPlacement, ClauseRenderer, QueryClause, SourceRequest};
use crate::schemas::{
    article_id, excerpt, first_present, parse_timestamp, Article, Filter, Page, QueryResult, SourceInfo,
    SourceKind, PAGE_SIZE,
};

pub const NEWSAPI_BASE_URL: &str = "https://newsapi.org/v2";

const API_KEY_HEADER: &str = "X-Api-Key";
const UNTITLED: &str = "Untitled";
const DESCRIPTION_CHARS: usize = 200;

/// NewsAPI response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralResponse {
    pub status: String,
    #[serde(rename = "totalResults")]
    pub total_results: Option<u64>,
    pub articles: Option<Vec<GeneralArticle>>,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralArticle {
    pub source: Option<ArticleSource>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "urlToImage")]
    pub url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Accumulates clauses before the request is assembled
#[derive(Debug, Default)]
pub struct GeneralDraft {
    /// Text, category and author terms, in that order
    terms: Vec<String>,
    from: Option<String>,
    to: Option<String>,
}

/// General-news data source
pub struct GeneralNewsSource {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
    metadata: SourceMetadata,
}

impl GeneralNewsSource {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let metadata = SourceMetadata {
            kind: SourceKind::General,
            name: "NewsAPI".to_string(),
            home_url: "https://newsapi.org".to_string(),
            description: "Worldwide headlines from thousands of outlets".to_string(),
        };

        Self {
            transport,
            base_url: base_url.into(),
            api_key,
            metadata,
        }
    }
}

fn start_of_day(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

fn end_of_day(date: NaiveDate) -> String {
    format!("{}T23:59:59Z", date.format("%Y-%m-%d"))
}

impl ClauseRenderer for GeneralNewsSource {
    type Draft = GeneralDraft;

    fn render(&self, clause: &QueryClause, draft: &mut GeneralDraft) {
        match clause {
            QueryClause::Text(text) => draft.terms.push(text.clone()),
            // Single-valued: only the first resolved category is used
            QueryClause::Categories(categories) => {
                if let Some(first) = categories.first() {
                    draft.terms.push(first.clone());
                }
            }
            QueryClause::Author(author) => draft.terms.push(author.clone()),
            QueryClause::DateRange(range) => {
                draft.from = range.from.map(start_of_day);
                draft.to = range.to.map(end_of_day);
            }
        }
    }

    fn finish(&self, draft: GeneralDraft, page: Page) -> SourceRequest {
        SourceRequest::new(SourceKind::General, &self.base_url, "everything")
            .param_opt("q", and_group(&draft.terms))
            .param_opt("from", draft.from)
            .param_opt("to", draft.to)
            .param("language", "en")
            .param("sortBy", "publishedAt")
            .param("pageSize", PAGE_SIZE.to_string())
            .param("page", page.one_based().to_string())
            .auth(self.api_key.clone().map(|value| ApiKey {
                placement: AuthPlacement::Header(API_KEY_HEADER),
                value,
            }))
    }
}

/// Drops NewsAPI's trailing `[+1234 chars]` marker
fn strip_truncation_marker(content: &str) -> &str {
    match content.rfind(" [+") {
        Some(idx) if content.ends_with("chars]") => &content[..idx],
        _ => content,
    }
}

fn to_article(raw: GeneralArticle, provenance: &SourceInfo) -> Option<Article> {
    let Some(url) = first_present([raw.url.as_deref()]).map(str::to_string) else {
        warn!(source = "general", "Dropping article without url");
        return None;
    };
    let Some(published_at) = raw.published_at.as_deref().and_then(parse_timestamp) else {
        warn!(source = "general", url = %url, "Dropping article with unparseable publishedAt");
        return None;
    };

    let title = first_present([raw.title.as_deref()]).unwrap_or(UNTITLED).to_string();
    let content_excerpt = raw
        .content
        .as_deref()
        .map(|c| excerpt(strip_truncation_marker(c), DESCRIPTION_CHARS));
    let description = first_present([raw.description.as_deref(), content_excerpt.as_deref()])
        .map(str::to_string)
        .unwrap_or_else(|| title.clone());

    Some(Article {
        id: article_id(SourceKind::General.tag(), &url),
        title,
        description,
        image_url: first_present([raw.url_to_image.as_deref()]).map(str::to_string),
        url,
        published_at,
        source: provenance.clone(),
        category: None,
        author: first_present([raw.author.as_deref()]).map(str::to_string),
    })
}

/// Maps a NewsAPI envelope into canonical articles
pub fn normalize(response: GeneralResponse, provenance: &SourceInfo) -> Result<QueryResult> {
    if response.status != "ok" {
        return Err(NewsError::ApiError {
            code: response.code.unwrap_or_else(|| "unknown".to_string()),
            message: response.message.unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    let articles = response
        .articles
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| to_article(raw, provenance))
        .collect();

    Ok(QueryResult::new(articles, response.total_results.unwrap_or(0)))
}

#[async_trait]
impl Source for GeneralNewsSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn build_request(&self, filter: &Filter, page: Page) -> SourceRequest {
        build_request(self, filter, page)
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}
