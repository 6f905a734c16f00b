mod common;

use common::{ExtractiveModel, FailingStore, MemoryStore};
use docs_rag::chunking::ChunkOptions;
use docs_rag::document::Document;
use docs_rag::ingest::add_documents;
use docs_rag::loader;
use docs_rag::rag::{generate, retrieve, RagEngine};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

#[tokio::test]
async fn test_add_empty_documents_does_not_write() {
    let store = MemoryStore::new(4);

    assert!(!add_documents(&store, &[]).await);
    assert!(store.add_calls().is_empty());
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn test_add_documents_assigns_distinct_ids() {
    let store = MemoryStore::new(4);
    let docs: Vec<Document> = (0..5)
        .map(|i| Document::new(format!("document number {}", i)))
        .collect();

    assert!(add_documents(&store, &docs).await);

    let calls = store.add_calls();
    assert_eq!(calls.len(), 1);
    let ids: HashSet<&String> = calls[0].iter().collect();
    assert_eq!(calls[0].len(), docs.len());
    assert_eq!(ids.len(), docs.len());
    assert!(calls[0].iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
}

#[tokio::test]
async fn test_failed_write_returns_false() {
    let docs = vec![Document::new("The sky is blue.")];
    assert!(!add_documents(&FailingStore, &docs).await);
}

#[tokio::test]
async fn test_retrieve_then_generate_answers_from_ingested_file() {
    let dir = tempfile::tempdir().unwrap();
    let sky = dir.path().join("sky.txt");
    fs::write(&sky, "The sky is blue.").unwrap();
    let grass = dir.path().join("grass.txt");
    fs::write(&grass, "Grass grows in a meadow near a river.").unwrap();

    let options = ChunkOptions::new(800, 100).unwrap();
    let store = Arc::new(MemoryStore::new(1));
    let model = Arc::new(ExtractiveModel::default());
    let engine = RagEngine::new(store.clone(), model.clone());

    for path in [&sky, &grass] {
        let chunks = loader::load(path, &options).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(engine.ingest(&chunks).await);
    }
    assert_eq!(store.len(), 2);

    let question = "What color is the sky?";
    let context = retrieve(&*store, question).await.unwrap();
    assert_eq!(context.documents.len(), 1);
    assert_eq!(context.documents[0].content, "The sky is blue.");
    assert_eq!(
        context.documents[0].source(),
        Some(sky.display().to_string().as_str())
    );
    assert_eq!(context.documents[0].start_index(), Some(0));

    let answer = generate(&*model, question, &context).await.unwrap();
    assert!(answer.contains("blue"));

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Question: What color is the sky?"));
}

#[tokio::test]
async fn test_engine_ask_composes_both_stages() {
    let store = Arc::new(MemoryStore::new(2));
    let model = Arc::new(ExtractiveModel::default());
    let engine = RagEngine::new(store.clone(), model.clone());

    let docs = vec![
        Document::new("The sky is blue."),
        Document::new("The sky turns red at sunset."),
        Document::new("Rust has no garbage collector."),
    ];
    assert!(engine.ingest(&docs).await);

    let answer = engine.ask("What color is the sky?").await.unwrap();
    assert!(answer.contains("blue"));
    assert!(answer.contains("\n\n"));
    assert!(!answer.contains("garbage"));
}
