use std::sync::Arc;

use async_trait::async_trait;
use ragpipe_core::{
    Embedding, EmbeddingProvider, FixedSizeChunker, Generator, InMemoryVectorStore, RagConfig,
    RagError, RagService,
};
use ragpipe_server::{AppState, app_router};
use serde_json::{Value, json};

/// One dimension per letter a-z, counted.
struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> ragpipe_core::Result<Embedding> {
        let mut v = vec![0.0; 26];
        for c in text.chars().filter(char::is_ascii_lowercase) {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        26
    }
}

/// Echoes the last line of the prompt, which is the retrieved context.
struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> ragpipe_core::Result<String> {
        Ok(format!("echo: {}", prompt.lines().last().unwrap_or_default()))
    }
}

struct DownGenerator;

#[async_trait]
impl Generator for DownGenerator {
    async fn generate(&self, _prompt: &str) -> ragpipe_core::Result<String> {
        Err(RagError::Generation { provider: "down".into(), message: "unreachable".into() })
    }
}

async fn spawn_server(generator: Arc<dyn Generator>) -> (String, tokio::task::JoinHandle<()>) {
    let config = RagConfig::builder().top_k(1).build().expect("config");
    let service = RagService::new(
        config,
        Arc::new(FixedSizeChunker::new(500, 100).expect("chunker")),
        Arc::new(LetterEmbedder),
        Arc::new(InMemoryVectorStore::new(26)),
        generator,
    )
    .expect("service");
    let app = app_router(AppState::new(Arc::new(service)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn health_reports_healthy() {
    let (base, handle) = spawn_server(Arc::new(EchoGenerator)).await;

    let response = reqwest::get(format!("{}/health", base)).await.expect("health response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("health json");
    assert_eq!(body, json!({"status": "healthy", "service": "ragpipe"}));

    handle.abort();
}

#[tokio::test]
async fn index_serves_the_question_page() {
    let (base, handle) = spawn_server(Arc::new(EchoGenerator)).await;

    let response = reqwest::get(base.clone()).await.expect("index response");
    assert!(response.status().is_success());
    let page = response.text().await.expect("index body");
    assert!(page.contains("/ask"));

    handle.abort();
}

#[tokio::test]
async fn ingest_then_ask_uses_the_stored_text() {
    let (base, handle) = spawn_server(Arc::new(EchoGenerator)).await;
    let client = reqwest::Client::new();

    let ingest = client
        .post(format!("{}/ingest", base))
        .json(&json!({"id": "france", "text": "paris is the capital of france"}))
        .send()
        .await
        .expect("ingest response");
    assert!(ingest.status().is_success());
    let report: Value = ingest.json().await.expect("report json");
    assert_eq!(report["document_id"], "france");
    assert_eq!(report["chunks_stored"], 1);

    let ask = client
        .post(format!("{}/ask", base))
        .json(&json!({"query": "what is the capital of france"}))
        .send()
        .await
        .expect("ask response");
    assert!(ask.status().is_success());
    let body: Value = ask.json().await.expect("answer json");
    assert_eq!(body["answer"], "echo: paris is the capital of france");

    handle.abort();
}

#[tokio::test]
async fn empty_or_missing_query_is_bad_request() {
    let (base, handle) = spawn_server(Arc::new(EchoGenerator)).await;
    let client = reqwest::Client::new();

    for payload in [json!({"query": ""}), json!({"query": "   "}), json!({})] {
        let response = client
            .post(format!("{}/ask", base))
            .json(&payload)
            .send()
            .await
            .expect("ask response");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.expect("error json");
        assert_eq!(body, json!({"error": "Missing query parameter"}));
    }

    handle.abort();
}

#[tokio::test]
async fn ask_requires_post() {
    let (base, handle) = spawn_server(Arc::new(EchoGenerator)).await;

    let response = reqwest::get(format!("{}/ask", base)).await.expect("ask response");
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    handle.abort();
}

#[tokio::test]
async fn backend_failure_is_reported_in_the_answer() {
    let (base, handle) = spawn_server(Arc::new(DownGenerator)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&json!({"query": "anything"}))
        .send()
        .await
        .expect("ask response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("answer json");
    let answer = body["answer"].as_str().expect("answer string");
    assert!(answer.starts_with("Error processing query:"));

    handle.abort();
}
