//! Magazine / long-form adapter (Guardian Content API)
//!
//! https://open-platform.theguardian.com/documentation/search

use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::{Source, SourceMetadata};
use crate::error::{NewsError, Result};
use crate::http_client::Transport;
use crate::query::{build_request, ApiKey, AuthPlacement, ClauseRenderer, QueryClause, SourceRequest};
use crate::schemas::{
    article_id, excerpt, first_present, parse_timestamp, Article, Filter, Page, QueryResult, SourceInfo,
    SourceKind, PAGE_SIZE,
};

pub const GUARDIAN_BASE_URL: &str = "https://content.guardianapis.com";

const API_KEY_PARAM: &str = "api-key";
const SHOW_FIELDS: &str = "headline,trailText,bodyText,thumbnail";
const CONTRIBUTOR_TAG: &str = "contributor";
const DESCRIPTION_CHARS: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct MagazineResponse {
    pub response: MagazineBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MagazineBody {
    pub status: String,
    pub message: Option<String>,
    pub total: Option<u64>,
    #[serde(default)]
    pub results: Vec<MagazineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagazineItem {
    pub id: Option<String>,
    pub section_name: Option<String>,
    pub web_publication_date: Option<String>,
    pub web_title: Option<String>,
    pub web_url: Option<String>,
    pub fields: Option<MagazineFields>,
    #[serde(default)]
    pub tags: Vec<MagazineTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagazineFields {
    pub headline: Option<String>,
    pub trail_text: Option<String>,
    pub body_text: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagazineTag {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub tag_type: Option<String>,
    pub web_title: Option<String>,
}

#[derive(Debug, Default)]
pub struct MagazineDraft {
    q: Option<String>,
    section: Option<String>,
    tag: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
}

/// Magazine data source
pub struct MagazineSource {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
    metadata: SourceMetadata,
}

impl MagazineSource {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let metadata = SourceMetadata {
            kind: SourceKind::Magazine,
            name: "The Guardian".to_string(),
            home_url: "https://www.theguardian.com".to_string(),
            description: "Long-form journalism and features".to_string(),
        };

        Self {
            transport,
            base_url: base_url.into(),
            api_key,
            metadata,
        }
    }
}

/// `Jane  Doe` -> `jane-doe`
pub fn author_slug(author: &str) -> String {
    author
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

fn calendar_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl ClauseRenderer for MagazineSource {
    type Draft = MagazineDraft;

    fn render(&self, clause: &QueryClause, draft: &mut MagazineDraft) {
        match clause {
            QueryClause::Text(text) => draft.q = Some(text.clone()),
            QueryClause::Categories(categories) => draft.section = Some(categories.join(",")),
            QueryClause::Author(author) => draft.tag = Some(format!("profile/{}", author_slug(author))),
            QueryClause::DateRange(range) => {
                draft.from_date = range.from.map(calendar_date);
                draft.to_date = range.to.map(calendar_date);
            }
        }
    }

    fn finish(&self, draft: MagazineDraft, page: Page) -> SourceRequest {
        SourceRequest::new(SourceKind::Magazine, &self.base_url, "search")
            .param_opt("q", draft.q)
            .param_opt("section", draft.section)
            .param_opt("tag", draft.tag)
            .param_opt("from-date", draft.from_date)
            .param_opt("to-date", draft.to_date)
            .param("order-by", "newest")
            .param("show-fields", SHOW_FIELDS)
            .param("show-tags", CONTRIBUTOR_TAG)
            .param("page-size", PAGE_SIZE.to_string())
            .param("page", page.one_based().to_string())
            .auth(self.api_key.clone().map(|value| ApiKey {
                placement: AuthPlacement::Query(API_KEY_PARAM),
                value,
            }))
    }
}

/// Text content of a trail-text fragment, tags removed and entities decoded
fn strip_markup(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

fn to_article(item: MagazineItem, provenance: &SourceInfo) -> Option<Article> {
    let Some(id) = first_present([item.id.as_deref()]).map(str::to_string) else {
        warn!(source = "magazine", url = ?item.web_url, "Dropping item without id");
        return None;
    };
    let Some(url) = first_present([item.web_url.as_deref()]).map(str::to_string) else {
        warn!(source = "magazine", id = %id, "Dropping item without webUrl");
        return None;
    };
    let Some(published_at) = item.web_publication_date.as_deref().and_then(parse_timestamp) else {
        warn!(source = "magazine", id = %id, "Dropping item with unparseable webPublicationDate");
        return None;
    };

    let fields = item.fields.as_ref();
    let title = first_present([
        fields.and_then(|f| f.headline.as_deref()),
        item.web_title.as_deref(),
    ])
    .unwrap_or(id.as_str())
    .to_string();

    let trail = fields.and_then(|f| f.trail_text.as_deref()).map(strip_markup);
    let body = fields
        .and_then(|f| f.body_text.as_deref())
        .map(|b| excerpt(b, DESCRIPTION_CHARS));
    let description = first_present([trail.as_deref(), body.as_deref()])
        .map(str::to_string)
        .unwrap_or_else(|| title.clone());

    let author = item
        .tags
        .iter()
        .find(|t| t.tag_type.as_deref() == Some(CONTRIBUTOR_TAG))
        .and_then(|t| first_present([t.web_title.as_deref()]))
        .map(str::to_string);

    Some(Article {
        id: article_id(SourceKind::Magazine.tag(), &id),
        title,
        description,
        url,
        image_url: fields
            .and_then(|f| first_present([f.thumbnail.as_deref()]))
            .map(str::to_string),
        published_at,
        source: provenance.clone(),
        category: first_present([item.section_name.as_deref()]).map(str::to_string),
        author,
    })
}

/// Maps a Content API envelope into canonical articles
pub fn normalize(response: MagazineResponse, provenance: &SourceInfo) -> Result<QueryResult> {
    let body = response.response;
    if body.status != "ok" {
        return Err(NewsError::ApiError {
            code: body.status,
            message: body.message.unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    let articles = body
        .results
        .into_iter()
        .filter_map(|item| to_article(item, provenance))
        .collect();

    Ok(QueryResult::new(articles, body.total.unwrap_or(0)))
}

#[async_trait]
impl Source for MagazineSource {
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
