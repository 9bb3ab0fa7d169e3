#![allow(clippy::unwrap_used)]
// Integration tests for `RestCollectionClient` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrine_api::{CollectionService, Error, OrderBy, Query, RestCollectionClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestCollectionClient) {
    let server = MockServer::start().await;
    let client = RestCollectionClient::with_client(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Queries ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_query_default_order() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/projects"))
        .and(query_param("select", "*"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 2, "title": "Storefront", "created_at": "2024-05-01T00:00:00Z" },
            { "id": 1, "title": "Brand kit", "created_at": "2024-04-01T00:00:00Z" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client.query(&Query::new("projects")).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_query_filter_order_and_limit() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("order", "sort_order.asc"))
        .and(query_param("category", "eq.Video"))
        .and(query_param("limit", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let query = Query::new("services")
        .filter_eq("category", "Video")
        .order_by(OrderBy::asc("sort_order"))
        .limit(Some(4));
    let rows = client.query(&query).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_api_key_headers() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        api_key: Some(SecretString::from("anon-key".to_string())),
        timeout: Duration::from_secs(5),
        ..TransportConfig::default()
    };
    let client = RestCollectionClient::new(&server.uri(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/testimonials"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client.query(&Query::new("testimonials")).await.unwrap();
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_becomes_query_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/projects"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "connection pool exhausted",
            "hint": "retry later"
        })))
        .mount(&server)
        .await;

    let err = client.query(&Query::new("projects")).await.unwrap_err();
    match err {
        Error::Query {
            ref collection,
            status,
            ref message,
        } => {
            assert_eq!(collection, "projects");
            assert_eq!(status, 500);
            assert_eq!(message, "connection pool exhausted (retry later)");
        }
        other => panic!("expected Query error, got: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_missing_collection_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.query(&Query::new("nope")).await.unwrap_err();
    assert!(
        matches!(err, Error::UnknownCollection(ref c) if c == "nope"),
        "expected UnknownCollection, got: {err:?}"
    );
}

#[tokio::test]
async fn test_undecodable_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client.query(&Query::new("projects")).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>maintenance</html>"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_watch_without_feed_fails() {
    let (_server, client) = setup().await;
    let err = client.watch("projects").await.unwrap_err();
    assert!(matches!(err, Error::FeedConnect(_)));
}
