#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end: ingest text into a temporary store, then answer over HTTP with
// mocked embedding and inference services

use axum::body::Body;
use axum::http::{Request, StatusCode};
use guide_rag::commands::build_service;
use guide_rag::config::Config;
use guide_rag::database::lancedb::VectorStore;
use guide_rag::embeddings::ollama::OllamaClient;
use guide_rag::ingest::ingest_files;
use guide_rag::server::router;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIM: usize = 4;

async fn mock_ollama() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.1, 0.2, 0.3, 0.4] })),
        )
        .mount(&server)
        .await;
    server
}

fn test_config(temp_dir: &TempDir, ollama: &MockServer, inference: &MockServer) -> Config {
    let mut config = Config::default();
    config.store.path = temp_dir.path().join("store");
    config.store.collection = "Sikkim".to_string();
    config.ollama.base_url = ollama.uri();
    config.inference.base_url = format!("{}/v1", inference.uri());
    config.inference.api_token = Some("hf_test".to_string());
    config
}

async fn ingest_guide(temp_dir: &TempDir, config: &Config) {
    let guide = temp_dir.path().join("sikkim.txt");
    std::fs::write(
        &guide,
        "Rumtek Monastery is 24 km from Gangtok.\x0cTsomgo Lake sits at 3753 m.",
    )
    .expect("should write guide");

    let embedder = OllamaClient::new(config).expect("should create client");
    let store = VectorStore::open(&config.store.path)
        .await
        .expect("should open store");
    let report = ingest_files(&[guide], &embedder, &store, &config.store.collection)
        .await
        .expect("ingest should succeed");
    assert_eq!(report.pages, 2);

    let collection = store
        .open_collection(&config.store.collection)
        .await
        .expect("lookup should succeed")
        .expect("collection should exist");
    assert_eq!(collection.dimension(), DIM);
}

async fn post_chat(config: &Config, body: &Value) -> (StatusCode, Value) {
    let service = Arc::new(build_service(config).expect("should build service"));
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request");

    let response = router(service)
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 100_000)
        .await
        .expect("readable body");
    (status, serde_json::from_slice(&bytes).expect("JSON body"))
}

#[tokio::test]
async fn answers_from_ingested_pages() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ollama = mock_ollama().await;
    let inference = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer hf_test"))
        .and(body_string_contains("Rumtek Monastery is 24 km from Gangtok."))
        .and(body_string_contains("source:sikkim.txt page:1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "About 24 km." } }]
        })))
        .expect(1)
        .mount(&inference)
        .await;

    let config = test_config(&temp_dir, &ollama, &inference);
    ingest_guide(&temp_dir, &config).await;

    let (status, json) = post_chat(
        &config,
        &json!({ "messages": [{ "role": "user", "content": "How far is Rumtek?" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reply"], "About 24 km.");
    assert_eq!(json["meta"]["source"], "llm");
    assert_eq!(json["meta"]["retrieved_count"], 2);
}

#[tokio::test]
async fn embedding_outage_answers_without_context() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&ollama)
        .await;
    let inference = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("(no relevant context found)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "I am not sure." } }]
        })))
        .expect(1)
        .mount(&inference)
        .await;

    let config = test_config(&temp_dir, &ollama, &inference);
    let (status, json) = post_chat(&config, &json!({ "message": "Where is Yuksom?" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reply"], "I am not sure.");
    assert_eq!(json["meta"]["retrieved_count"], 0);
}

#[tokio::test]
async fn inference_failure_is_a_bad_gateway() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ollama = mock_ollama().await;
    let inference = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
        .mount(&inference)
        .await;

    let config = test_config(&temp_dir, &ollama, &inference);
    let (status, json) = post_chat(
        &config,
        &json!({ "messages": [{ "role": "user", "content": "Where is Yuksom?" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let detail = json["detail"].as_str().expect("string detail");
    assert!(detail.contains("Invalid credentials"));
}

#[tokio::test]
async fn greeting_skips_both_services() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    let inference = MockServer::start().await;

    let config = test_config(&temp_dir, &ollama, &inference);
    let (status, json) = post_chat(
        &config,
        &json!({ "messages": [{ "role": "user", "content": "Good morning!" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["source"], "smalltalk");
    assert!(
        ollama
            .received_requests()
            .await
            .is_none_or(|requests| requests.is_empty())
    );
    assert!(
        inference
            .received_requests()
            .await
            .is_none_or(|requests| requests.is_empty())
    );
}
