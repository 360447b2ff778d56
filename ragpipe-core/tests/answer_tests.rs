//! End-to-end answering against deterministic backends.

mod common;

use std::sync::Arc;

use common::{DIM, DownEmbedder, DownGenerator, HashEmbedder, RecordingGenerator};
use ragpipe_core::{
    Answerer, Chunk, Document, ERROR_MARKER, FixedSizeChunker, InMemoryVectorStore, RagConfig, RagError,
    RagService, VectorStore,
};

fn service(
    embedder: Arc<HashEmbedder>,
    generator: Arc<RecordingGenerator>,
    top_k: usize,
) -> RagService {
    let config = RagConfig::builder().top_k(top_k).build().unwrap();
    RagService::new(
        config,
        Arc::new(FixedSizeChunker::new(500, 100).unwrap()),
        embedder,
        Arc::new(InMemoryVectorStore::new(DIM)),
        generator,
    )
    .unwrap()
}

#[tokio::test]
async fn retrieved_context_reaches_the_generator() {
    let generator = Arc::new(RecordingGenerator::new("Paris."));
    let service = service(Arc::new(HashEmbedder::default()), generator.clone(), 1);
    service.ingest(&Document::new("france", "Paris is the capital of France.")).await.unwrap();
    service.ingest(&Document::new("fruit", "Bananas are yellow and rich in potassium.")).await.unwrap();

    let answer = service.answer("What is the capital of France?").await;

    assert_eq!(answer, "Paris.");
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(
        prompts[0],
        "Based on the following context, answer the question: What is the capital of France?\n\n\
         Context:\nParis is the capital of France."
    );
}

#[tokio::test]
async fn try_answer_returns_matches_in_score_order() {
    let generator = Arc::new(RecordingGenerator::new("ok"));
    let service = service(Arc::new(HashEmbedder::default()), generator.clone(), 2);
    service.ingest(&Document::new("a", "capital city")).await.unwrap();
    service.ingest(&Document::new("b", "capital city of France")).await.unwrap();
    service.ingest(&Document::new("c", "bananas")).await.unwrap();

    let answer = service.try_answer("capital of France").await.unwrap();

    assert_eq!(answer.matches.len(), 2);
    assert_eq!(answer.matches[0].chunk.document_id, "b");
    assert_eq!(answer.matches[1].chunk.document_id, "a");
    assert!(generator.prompts()[0].ends_with("capital city of France\n\ncapital city"));
}

#[tokio::test]
async fn empty_query_touches_no_backend() {
    let embedder = Arc::new(HashEmbedder::default());
    let generator = Arc::new(RecordingGenerator::new("unused"));
    let service = service(embedder.clone(), generator.clone(), 3);

    let err = service.try_answer("   ").await.unwrap_err();
    assert!(matches!(err, RagError::EmptyQuery));

    let answer = service.answer("").await;
    assert!(answer.starts_with(ERROR_MARKER));
    assert_eq!(embedder.calls(), 0);
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn empty_store_still_prompts_with_blank_context() {
    let generator = Arc::new(RecordingGenerator::new("I don't know."));
    let service = service(Arc::new(HashEmbedder::default()), generator.clone(), 3);

    assert_eq!(service.answer("Anything?").await, "I don't know.");
    assert_eq!(
        generator.prompts()[0],
        "Based on the following context, answer the question: Anything?\n\nContext:\n"
    );
}

#[tokio::test]
async fn embedding_failure_becomes_error_text() {
    let generator = Arc::new(RecordingGenerator::new("unused"));
    let answerer = Answerer::builder()
        .embedding_provider(Arc::new(DownEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new(DIM)))
        .generator(generator.clone())
        .build()
        .unwrap();

    let answer = answerer.answer("What is the capital of France?").await;
    assert!(answer.starts_with("Error processing query: "));
    assert!(answer.contains("connection refused"));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn generation_failure_becomes_error_text() {
    let store = Arc::new(InMemoryVectorStore::new(DIM));
    let chunk = Chunk::from_document(&Document::new("d", "Paris"), 0, 0, "Paris".to_string());
    store.add(common::bag_of_words("Paris"), chunk).await.unwrap();
    let answerer = Answerer::builder()
        .embedding_provider(Arc::new(HashEmbedder::default()))
        .vector_store(store)
        .generator(Arc::new(DownGenerator))
        .build()
        .unwrap();

    let answer = answerer.answer("Paris?").await;
    assert!(answer.starts_with(ERROR_MARKER));
    assert!(answer.contains("model not loaded"));
}

#[tokio::test]
async fn query_dimension_mismatch_is_reported() {
    let answerer = Answerer::builder()
        .embedding_provider(Arc::new(HashEmbedder::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new(DIM * 2)))
        .generator(Arc::new(RecordingGenerator::new("unused")))
        .build()
        .unwrap();

    let err = answerer.try_answer("hello").await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn check_reports_each_backend() {
    let service = service(Arc::new(HashEmbedder::default()), Arc::new(RecordingGenerator::new("Hi")), 3);
    let report = service.check().await;
    assert!(report.is_healthy());
    assert_eq!(report.embedding.detail, format!("{DIM} dimensions"));
    assert_eq!(report.store.detail, "0 entries");

    let broken = RagService::new(
        RagConfig::default(),
        Arc::new(FixedSizeChunker::new(500, 100).unwrap()),
        Arc::new(DownEmbedder),
        Arc::new(InMemoryVectorStore::new(DIM)),
        Arc::new(DownGenerator),
    )
    .unwrap();
    let report = broken.check().await;
    assert!(!report.is_healthy());
    assert!(!report.embedding.ok);
    assert!(report.store.ok);
    assert!(!report.generation.ok);
}

#[tokio::test]
async fn reset_empties_the_store() {
    let service = service(Arc::new(HashEmbedder::default()), Arc::new(RecordingGenerator::new("x")), 3);
    service.ingest(&Document::new("d", "some text")).await.unwrap();
    assert_eq!(service.vector_store().len().await.unwrap(), 1);
    service.reset().await.unwrap();
    assert!(service.vector_store().is_empty().await.unwrap());
}
