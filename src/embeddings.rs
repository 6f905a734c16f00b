use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Something that turns text into vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts, one embedding per input, in order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a search query
    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned for query"))
    }
}
