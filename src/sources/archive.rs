//! Newspaper-archive adapter (NYT Article Search)
//!
//! https://developer.nytimes.com/docs/articlesearch-product/1/overview
//!
//! The richest grammar of the three: free text goes to `q`, categories and
//! author become Lucene-style field fragments in `fq`, dates are compact
//! `YYYYMMDD` and pages are 0-based.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::{Source, SourceMetadata};
use crate::error::{NewsError, Result};
use crate::http_client::Transport;
use crate::query::{build_request, field_phrase_group, ApiKey, AuthPlacement, ClauseRenderer, QueryClause, SourceRequest};
use crate::schemas::{
    article_id, first_present, parse_timestamp, Article, Filter, Page, QueryResult, SourceInfo, SourceKind,
};

pub const NYT_BASE_URL: &str = "https://api.nytimes.com/svc/search/v2";

/// Host that relative multimedia paths hang off
pub const NYT_ASSET_HOST: &str = "https://www.nytimes.com/";

const API_KEY_PARAM: &str = "api-key";
const FIELD_LIST: &str = "_id,headline,abstract,snippet,lead_paragraph,web_url,multimedia,pub_date,news_desk,byline";
const UNTITLED: &str = "Untitled";

/// Multimedia subtypes, largest first
const IMAGE_PRIORITY: [&str; 4] = ["superJumbo", "xlarge", "large", "mediumThreeByTwo210"];

/// Article Search response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveResponse {
    pub status: Option<String>,
    pub response: ArchiveBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveBody {
    #[serde(default)]
    pub docs: Vec<ArchiveDoc>,
    pub meta: Option<ArchiveMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveMeta {
    pub hits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDoc {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    pub snippet: Option<String>,
    pub lead_paragraph: Option<String>,
    pub web_url: Option<String>,
    pub headline: Option<ArchiveHeadline>,
    #[serde(default)]
    pub multimedia: MultimediaField,
    pub pub_date: Option<String>,
    pub news_desk: Option<String>,
    pub byline: Option<ArchiveByline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveHeadline {
    pub main: Option<String>,
    pub print_headline: Option<String>,
}

/// The list form is the only one carrying named size variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultimediaField {
    List(Vec<ArchiveMedia>),
    Other(serde_json::Value),
}

impl Default for MultimediaField {
    fn default() -> Self {
        MultimediaField::List(Vec::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveMedia {
    pub subtype: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveByline {
    pub original: Option<String>,
    #[serde(default)]
    pub person: Vec<ArchivePerson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivePerson {
    pub firstname: Option<String>,
    pub middlename: Option<String>,
    pub lastname: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default)]
pub struct ArchiveDraft {
    q: Option<String>,
    /// Field-scoped fragments ANDed into `fq`
    fq: Vec<String>,
    begin_date: Option<String>,
    end_date: Option<String>,
}

/// Newspaper-archive data source
pub struct ArchiveSource {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
    metadata: SourceMetadata,
}

impl ArchiveSource {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let metadata = SourceMetadata {
            kind: SourceKind::Archive,
            name: "The New York Times".to_string(),
            home_url: "https://www.nytimes.com".to_string(),
            description: "Article Search over the newspaper archive".to_string(),
        };

        Self {
            transport,
            base_url: base_url.into(),
            api_key,
            metadata,
        }
    }
}

fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

impl ClauseRenderer for ArchiveSource {
    type Draft = ArchiveDraft;

    fn render(&self, clause: &QueryClause, draft: &mut ArchiveDraft) {
        match clause {
            QueryClause::Text(text) => draft.q = Some(text.clone()),
            QueryClause::Categories(categories) => draft.fq.push(field_phrase_group("news_desk", categories)),
            QueryClause::Author(author) => draft.fq.push(field_phrase_group("byline", std::slice::from_ref(author))),
            QueryClause::DateRange(range) => {
                draft.begin_date = range.from.map(compact_date);
                draft.end_date = range.to.map(compact_date);
            }
        }
    }

    fn finish(&self, draft: ArchiveDraft, page: Page) -> SourceRequest {
        let fq = (!draft.fq.is_empty()).then(|| draft.fq.join(" AND "));

        SourceRequest::new(SourceKind::Archive, &self.base_url, "articlesearch.json")
            .param_opt("q", draft.q)
            .param_opt("fq", fq)
            .param_opt("begin_date", draft.begin_date)
            .param_opt("end_date", draft.end_date)
            .param("sort", "newest")
            .param("fl", FIELD_LIST)
            .param("page", page.zero_based().to_string())
            .auth(self.api_key.clone().map(|value| ApiKey {
                placement: AuthPlacement::Query(API_KEY_PARAM),
                value,
            }))
    }
}

/// Makes an upstream media path absolute
fn absolute_image_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("{}{}", NYT_ASSET_HOST, raw.trim_start_matches('/'))
    }
}

/// Picks the largest named variant available
fn select_image(multimedia: &MultimediaField) -> Option<String> {
    let MultimediaField::List(media) = multimedia else {
        return None;
    };

    IMAGE_PRIORITY.iter().find_map(|wanted| {
        media
            .iter()
            .filter(|m| m.subtype.as_deref() == Some(*wanted))
            .find_map(|m| first_present([m.url.as_deref()]))
            .map(absolute_image_url)
    })
}

fn resolve_author(byline: Option<&ArchiveByline>) -> Option<String> {
    let byline = byline?;

    let reporter = byline
        .person
        .iter()
        .find(|p| p.role.as_deref().is_some_and(|r| r.eq_ignore_ascii_case("reported")))
        .map(|p| {
            [p.firstname.as_deref(), p.middlename.as_deref(), p.lastname.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|name| !name.is_empty());

    reporter.or_else(|| {
        first_present([byline.original.as_deref()]).map(|original| {
            original
                .strip_prefix("By ")
                .unwrap_or(original)
                .trim()
                .to_string()
        })
    })
}

fn to_article(doc: ArchiveDoc, provenance: &SourceInfo) -> Option<Article> {
    let Some(id) = first_present([doc.id.as_deref()]).map(str::to_string) else {
        warn!(source = "archive", url = ?doc.web_url, "Dropping doc without _id");
        return None;
    };
    let Some(url) = first_present([doc.web_url.as_deref()]).map(str::to_string) else {
        warn!(source = "archive", id = %id, "Dropping doc without web_url");
        return None;
    };
    let Some(published_at) = doc.pub_date.as_deref().and_then(parse_timestamp) else {
        warn!(source = "archive", id = %id, "Dropping doc with unparseable pub_date");
        return None;
    };

    let headline = doc.headline.as_ref();
    let title = first_present([
        headline.and_then(|h| h.main.as_deref()),
        headline.and_then(|h| h.print_headline.as_deref()),
    ])
    .unwrap_or(UNTITLED)
    .to_string();

    let description = first_present([
        doc.summary.as_deref(),
        doc.snippet.as_deref(),
        doc.lead_paragraph.as_deref(),
    ])
    .map(str::to_string)
    .unwrap_or_else(|| title.clone());

    let category = first_present([doc.news_desk.as_deref()])
        .filter(|desk| *desk != "None")
        .map(str::to_string);

    Some(Article {
        id: article_id(SourceKind::Archive.tag(), &id),
        title,
        description,
        url,
        image_url: select_image(&doc.multimedia),
        published_at,
        source: provenance.clone(),
        category,
        author: resolve_author(doc.byline.as_ref()),
    })
}

/// Maps an Article Search envelope into canonical articles
pub fn normalize(response: ArchiveResponse, provenance: &SourceInfo) -> Result<QueryResult> {
    if let Some(status) = response.status.as_deref() {
        if !status.eq_ignore_ascii_case("ok") {
            return Err(NewsError::ApiError {
                code: status.to_string(),
                message: "Article Search returned a non-OK status".to_string(),
            });
        }
    }

    let total = response.response.meta.map(|m| m.hits).unwrap_or(0);
    let articles = response
        .response
        .docs
        .into_iter()
        .filter_map(|doc| to_article(doc, provenance))
        .collect();

    Ok(QueryResult::new(articles, total))
}

#[async_trait]
impl Source for ArchiveSource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpTransport, ResilientHttpClient};
    use crate::sources::RawResponse;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(base_url: &str) -> ArchiveSource {
        let transport = Arc::new(HttpTransport::new(ResilientHttpClient::with_defaults().unwrap()));
        ArchiveSource::new(transport, base_url, Some("nyt-key".to_string()))
    }

    fn provenance() -> SourceInfo {
        source(NYT_BASE_URL).metadata().provenance()
    }

    fn doc_json() -> serde_json::Value {
        serde_json::json!({
            "_id": "nyt://article/0001",
            "abstract": "Glaciers are retreating faster than forecast.",
            "web_url": "https://www.nytimes.com/2024/01/15/science/glaciers.html",
            "headline": {"main": "Glaciers in Retreat", "print_headline": "Ice Loss"},
            "multimedia": [
                {"subtype": "thumbnail", "url": "images/thumb.jpg"},
                {"subtype": "mediumThreeByTwo210", "url": "images/medium.jpg"},
                {"subtype": "xlarge", "url": "images/xlarge.jpg"}
            ],
            "pub_date": "2024-01-15T10:00:00+0000",
            "news_desk": "Science",
            "byline": {
                "original": "By Jane Doe and John Roe",
                "person": [
                    {"firstname": "Pat", "lastname": "Photo", "role": "photographed"},
                    {"firstname": "Jane", "lastname": "Doe", "role": "reported"}
                ]
            }
        })
    }

    #[test]
    fn test_field_scoped_filter_query() {
        let filter = Filter::new()
            .query("climate")
            .category("science")
            .category("foreign")
            .author("Jane Doe")
            .from_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .to_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

        let request = source(NYT_BASE_URL).build_request(&filter, Page::FIRST);

        assert_eq!(request.endpoint(), "https://api.nytimes.com/svc/search/v2/articlesearch.json");
        assert_eq!(request.get("q"), Some("climate"));
        assert_eq!(
            request.get("fq"),
            Some(r#"news_desk:("science" OR "foreign") AND byline:("Jane Doe")"#)
        );
        assert_eq!(request.get("begin_date"), Some("20240101"));
        assert_eq!(request.get("end_date"), Some("20240131"));
        assert_eq!(request.get("sort"), Some("newest"));
    }

    #[test]
    fn test_page_is_zero_based() {
        let request = source(NYT_BASE_URL).build_request(&Filter::new(), Page::FIRST);
        assert_eq!(request.get("page"), Some("0"));

        let request = source(NYT_BASE_URL).build_request(&Filter::new(), Page::new(3).unwrap());
        assert_eq!(request.get("page"), Some("2"));
    }

    #[test]
    fn test_absent_criteria_send_no_params() {
        let request = source(NYT_BASE_URL).build_request(&Filter::new().category(""), Page::FIRST);
        assert!(request.get("q").is_none());
        assert!(request.get("fq").is_none());
        assert!(request.get("begin_date").is_none());
        assert!(request.get("end_date").is_none());
        assert_eq!(request.auth.as_ref().map(|k| k.placement), Some(AuthPlacement::Query("api-key")));
    }

    #[test]
    fn test_normalize_doc() {
        let json = serde_json::json!({
            "status": "OK",
            "response": {"docs": [doc_json()], "meta": {"hits": 95, "offset": 0}}
        });
        let response: ArchiveResponse = serde_json::from_value(json).unwrap();
        let result = normalize(response, &provenance()).unwrap();

        assert_eq!(result.total_results, 95);
        let article = &result.articles[0];
        assert_eq!(article.id, "archive-nyt://article/0001");
        assert_eq!(article.title, "Glaciers in Retreat");
        assert_eq!(article.image_url.as_deref(), Some("https://www.nytimes.com/images/xlarge.jpg"));
        assert_eq!(article.published_at, Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
        assert_eq!(article.category.as_deref(), Some("Science"));
        assert_eq!(article.author.as_deref(), Some("Jane Doe"));
        assert_eq!(article.source.name, "The New York Times");
    }

    #[test]
    fn test_doc_without_id_is_dropped_alone() {
        let json = serde_json::json!({
            "status": "OK",
            "response": {
                "docs": [
                    doc_json(),
                    {
                        "web_url": "https://www.nytimes.com/2024/01/14/science/orphan.html",
                        "pub_date": "2024-01-14T08:00:00+0000"
                    }
                ],
                "meta": {"hits": 2}
            }
        });

        let raw = RawResponse::parse(SourceKind::Archive, json).unwrap();
        let result = raw.normalize(&provenance()).unwrap();

        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.articles[0].id, "archive-nyt://article/0001");
        assert_eq!(result.total_results, 2);
    }

    #[test]
    fn test_image_falls_back_to_next_variant() {
        let media = MultimediaField::List(vec![
            ArchiveMedia {
                subtype: Some("thumbnail".to_string()),
                url: Some("images/thumb.jpg".to_string()),
            },
            ArchiveMedia {
                subtype: Some("mediumThreeByTwo210".to_string()),
                url: Some("/images/medium.jpg".to_string()),
            },
        ]);
        assert_eq!(
            select_image(&media).as_deref(),
            Some("https://www.nytimes.com/images/medium.jpg")
        );

        let only_thumb = MultimediaField::List(vec![ArchiveMedia {
            subtype: Some("thumbnail".to_string()),
            url: Some("images/thumb.jpg".to_string()),
        }]);
        assert_eq!(select_image(&only_thumb), None);
        assert_eq!(select_image(&MultimediaField::Other(serde_json::json!({}))), None);
    }

    #[test]
    fn test_absolute_image_urls_untouched() {
        assert_eq!(absolute_image_url("https://static01.nyt.com/a.jpg"), "https://static01.nyt.com/a.jpg");
        assert_eq!(absolute_image_url("//static01.nyt.com/a.jpg"), "https://static01.nyt.com/a.jpg");
    }

    #[test]
    fn test_description_and_author_fallbacks() {
        let mut doc: ArchiveDoc = serde_json::from_value(doc_json()).unwrap();
        doc.summary = None;
        doc.snippet = Some("  ".to_string());
        doc.lead_paragraph = Some("The lead paragraph.".to_string());
        doc.byline = Some(ArchiveByline {
            original: Some("By Jane Doe".to_string()),
            person: vec![],
        });
        doc.news_desk = Some(String::new());

        let article = to_article(doc, &provenance()).unwrap();
        assert_eq!(article.description, "The lead paragraph.");
        assert_eq!(article.author.as_deref(), Some("Jane Doe"));
        assert!(article.category.is_none());
    }

    #[test]
    fn test_object_shaped_multimedia_still_parses() {
        let mut json = doc_json();
        json["multimedia"] = serde_json::json!({"default": {"url": "https://static01.nyt.com/x.jpg"}, "caption": ""});
        let doc: ArchiveDoc = serde_json::from_value(json).unwrap();
        let article = to_article(doc, &provenance()).unwrap();
        assert!(article.image_url.is_none());
    }

    #[tokio::test]
    async fn test_fetch_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/articlesearch.json"))
            .and(query_param("api-key", "nyt-key"))
            .and(query_param("page", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "response": {"docs": [doc_json()], "meta": {"hits": 1}}
            })))
            .mount(&server)
            .await;

        let result = source(&server.uri()).fetch(&Filter::new(), Page::FIRST).await.unwrap();
        assert_eq!(result.total_results, 1);
        assert_eq!(result.articles.len(), 1);
    }
}
