#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use docs_rag::database::VectorStore;
use docs_rag::document::Document;
use docs_rag::embeddings::{Embedder, Embedding};
use docs_rag::rag::ChatModel;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

const DIMENSIONS: usize = 1024;

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn embed(text: &str) -> Embedding {
        let mut values = vec![0.0_f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            values[(hasher.finish() as usize) % DIMENSIONS] += 1.0;
        }
        Embedding { values }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| HashEmbedder::embed(t)).collect())
    }
}

fn cosine(a: &Embedding, b: &Embedding) -> f32 {
    let dot: f32 = a.values.iter().zip(&b.values).map(|(x, y)| x * y).sum();
    let norm = |e: &Embedding| e.values.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// In-process vector store ranking by cosine similarity
pub struct MemoryStore {
    top_k: usize,
    records: Mutex<Vec<(String, Embedding, Document)>>,
    add_calls: Mutex<Vec<Vec<String>>>,
}

impl MemoryStore {
    pub fn new(top_k: usize) -> Self {
        MemoryStore {
            top_k,
            records: Mutex::new(Vec::new()),
            add_calls: Mutex::new(Vec::new()),
        }
    }

    /// Ids passed to each `add` call
    pub fn add_calls(&self) -> Vec<Vec<String>> {
        self.add_calls.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn add(&self, documents: &[Document], ids: &[String]) -> Result<()> {
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = HashEmbedder.embed_documents(&texts).await?;

        self.add_calls.lock().unwrap().push(ids.to_vec());
        let mut records = self.records.lock().unwrap();
        for ((id, embedding), document) in ids.iter().zip(embeddings).zip(documents) {
            records.push((id.clone(), embedding, document.clone()));
        }
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<Document>> {
        let query = HashEmbedder.embed_query(query).await?;
        let records = self.records.lock().unwrap();

        let mut scored: Vec<(f32, &Document)> = records
            .iter()
            .map(|(_, embedding, doc)| (cosine(&query, embedding), doc))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

/// Store whose writes always fail
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn add(&self, _documents: &[Document], _ids: &[String]) -> Result<()> {
        Err(anyhow::anyhow!("connection reset by peer"))
    }

    async fn search(&self, _query: &str) -> Result<Vec<Document>> {
        Ok(Vec::new())
    }
}

/// Model that answers with the context block of its prompt
#[derive(Default)]
pub struct ExtractiveModel {
    prompts: Mutex<Vec<String>>,
}

impl ExtractiveModel {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ExtractiveModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let answer = prompt
            .split_once("Context: ")
            .and_then(|(_, rest)| rest.split_once("\n\nQuestion:"))
            .map(|(context, _)| context.trim().to_string())
            .unwrap_or_else(|| "I don't know.".to_string());
        Ok(answer)
    }
}
