//! Integration tests for the aggregate query path
//!
//! Uses wiremock to stand in for every upstream news API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newsdesk::{Aggregator, Config, Filter, Page, Session, SourceKind};

fn config_for(server: &MockServer, overrides: &[(&str, &str)]) -> Config {
    let uri = server.uri();
    let builder = config::Config::builder()
        .set_override("newsapi_base_url", format!("{}/newsapi", uri))
        .unwrap()
        .set_override("nyt_base_url", format!("{}/nyt", uri))
        .unwrap()
        .set_override("guardian_base_url", format!("{}/guardian", uri))
        .unwrap()
        .set_override("news_api_key", "news-key")
        .unwrap()
        .set_override("nyt_api_key", "nyt-key")
        .unwrap()
        .set_override("guardian_api_key", "guardian-key")
        .unwrap();

    overrides
        .iter()
        .fold(builder, |b, (k, v)| b.set_override(*k, *v).unwrap())
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

fn general_article(slug: &str, published_at: &str) -> serde_json::Value {
    json!({
        "source": {"id": null, "name": "Example Wire"},
        "author": "Wire Staff",
        "title": format!("General {}", slug),
        "description": "A general news story",
        "url": format!("https://wire.example.com/{}", slug),
        "urlToImage": null,
        "publishedAt": published_at,
        "content": "Story body [+120 chars]"
    })
}

fn archive_doc(slug: &str, pub_date: &str) -> serde_json::Value {
    json!({
        "_id": format!("nyt://article/{}", slug),
        "abstract": "An archive story",
        "web_url": format!("https://www.nytimes.com/2024/01/15/science/{}.html", slug),
        "headline": {"main": format!("Archive {}", slug)},
        "multimedia": [],
        "pub_date": pub_date,
        "news_desk": "Science",
        "byline": {"original": "By Jane Doe", "person": []}
    })
}

fn general_body(articles: Vec<serde_json::Value>, total: u64) -> serde_json::Value {
    json!({"status": "ok", "totalResults": total, "articles": articles})
}

fn archive_body(docs: Vec<serde_json::Value>, hits: u64) -> serde_json::Value {
    json!({"status": "OK", "response": {"docs": docs, "meta": {"hits": hits}}})
}

/// Two sources answer; the page is merged newest first with summed totals
#[tokio::test]
async fn test_climate_science_search_merges_two_sources() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/newsapi/everything"))
        .and(header("X-Api-Key", "news-key"))
        .and(query_param("q", "(climate) AND (science)"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(general_body(
            vec![
                general_article("g1", "2024-01-15T10:00:00Z"),
                general_article("g2", "2024-01-15T08:00:00Z"),
                general_article("g3", "2024-01-15T06:00:00Z"),
            ],
            30,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/nyt/articlesearch.json"))
        .and(query_param("api-key", "nyt-key"))
        .and(query_param("q", "climate"))
        .and(query_param("fq", r#"news_desk:("science")"#))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(archive_body(
            vec![
                archive_doc("a1", "2024-01-15T09:00:00+0000"),
                archive_doc("a2", "2024-01-15T07:00:00+0000"),
                archive_doc("a3", "2024-01-15T05:00:00+0000"),
            ],
            25,
        )))
        .expect(1)
        .mount(&server)
        .await;

    // Not selected, must not be called
    Mock::given(path("/guardian/search"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let aggregator = Aggregator::from_config(&config_for(&server, &[])).unwrap();
    let filter = Filter::new()
        .query("climate")
        .category("science")
        .source(SourceKind::General)
        .source(SourceKind::Archive);

    let result = aggregator.aggregate(&filter, Page::FIRST).await.unwrap();

    let titles: Vec<&str> = result.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["General g1", "Archive a1", "General g2", "Archive a2", "General g3", "Archive a3"]
    );
    assert_eq!(result.total_results, 55);
    assert_eq!(result.page_count(), 6);
    assert!(result.articles.iter().all(|a| a.id.starts_with("general-") || a.id.starts_with("archive-")));
}

/// A failing upstream contributes nothing; the other sources still fill the page
#[tokio::test]
async fn test_one_source_server_error_is_isolated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/newsapi/everything"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/nyt/articlesearch.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(archive_body(
            vec![archive_doc("a1", "2024-01-15T09:00:00+0000")],
            1,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/guardian/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"status": "ok", "total": 4, "results": [{
                "id": "science/2024/jan/15/comet",
                "webPublicationDate": "2024-01-15T11:00:00Z",
                "webTitle": "Comet sighted",
                "webUrl": "https://www.theguardian.com/science/2024/jan/15/comet",
                "tags": []
            }]}
        })))
        .mount(&server)
        .await;

    let aggregator = Aggregator::from_config(&config_for(&server, &[])).unwrap();
    let filter = SourceKind::ALL.iter().fold(Filter::new(), |f, k| f.source(*k));

    let result = aggregator.aggregate(&filter, Page::FIRST).await.unwrap();

    assert_eq!(result.articles.len(), 2);
    assert_eq!(result.total_results, 5);
    assert_eq!(result.articles[0].source.id, "magazine");
    assert_eq!(result.articles[1].source.id, "archive");
}

/// After enough failures the breaker stops calling the upstream
#[tokio::test]
async fn test_circuit_breaker_stops_calling_failing_source() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nyt/articlesearch.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        &[
            ("circuit_breaker_failure_threshold", "2"),
            ("circuit_breaker_open_duration_secs", "60"),
        ],
    );
    let aggregator = Aggregator::from_config(&config).unwrap();
    let filter = Filter::new().source(SourceKind::Archive);

    for _ in 0..3 {
        let result = aggregator.aggregate(&filter, Page::FIRST).await.unwrap();
        assert!(result.is_empty());
    }
}

/// The later of two overlapping searches wins even when it resolves first
#[tokio::test]
async fn test_session_discards_superseded_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/newsapi/everything"))
        .and(query_param("q", "(elections)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(general_body(vec![general_article("old", "2024-01-15T10:00:00Z")], 1))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/newsapi/everything"))
        .and(query_param("q", "(budget)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(general_body(vec![general_article("new", "2024-01-15T09:00:00Z")], 1)),
        )
        .mount(&server)
        .await;

    let aggregator = Aggregator::from_config(&config_for(&server, &[])).unwrap();
    let session = Session::new();
    let older = Filter::new().query("elections").source(SourceKind::General);
    let newer = Filter::new().query("budget").source(SourceKind::General);

    let (older_committed, newer_committed) = tokio::join!(
        session.refresh(&aggregator, &older),
        session.refresh(&aggregator, &newer),
    );

    assert!(!older_committed);
    assert!(newer_committed);
    let titles: Vec<String> = session.articles().into_iter().map(|a| a.title).collect();
    assert_eq!(titles, vec!["General new"]);
}

/// An older search answering first is discarded; the newer one commits later
#[tokio::test]
async fn test_session_discards_superseded_search_that_resolves_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/newsapi/everything"))
        .and(query_param("q", "(elections)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(general_body(vec![general_article("old", "2024-01-15T10:00:00Z")], 1))
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/newsapi/everything"))
        .and(query_param("q", "(budget)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(general_body(vec![general_article("new", "2024-01-15T09:00:00Z")], 1))
                .set_delay(Duration::from_millis(250)),
        )
        .mount(&server)
        .await;

    let aggregator = Aggregator::from_config(&config_for(&server, &[])).unwrap();
    let session = Session::new();
    let older = Filter::new().query("elections").source(SourceKind::General);
    let newer = Filter::new().query("budget").source(SourceKind::General);

    let (older_committed, newer_committed) = tokio::join!(
        session.refresh(&aggregator, &older),
        session.refresh(&aggregator, &newer),
    );

    assert!(!older_committed);
    assert!(newer_committed);
    let titles: Vec<String> = session.articles().into_iter().map(|a| a.title).collect();
    assert_eq!(titles, vec!["General new"]);
}

/// No selected sources means no network traffic at all
#[tokio::test]
async fn test_empty_source_selection_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let aggregator = Aggregator::from_config(&config_for(&server, &[])).unwrap();
    let result = aggregator
        .aggregate(&Filter::new().query("anything"), Page::FIRST)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.total_results, 0);
}
