use crate::document::Document;
use crate::embeddings::Embedder;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::{
    with_payload_selector, CollectionStatus, CreateCollectionBuilder, Distance, PointStruct,
    SearchPoints, UpsertPointsBuilder, Value, VectorParams, WithPayloadSelector,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Dimension of `text-embedding-3-large` vectors
pub const COLLECTION_VECTOR_SIZE: u64 = 3072;
pub const DEFAULT_COLLECTION: &str = "rag-documents";
pub const DEFAULT_TOP_K: u64 = 4;

const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Write and read access to the vector index
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store documents, keyed by the matching entry of `ids`
    async fn add(&self, documents: &[Document], ids: &[String]) -> Result<()>;

    /// Return the documents most similar to `query`, best match first
    async fn search(&self, query: &str) -> Result<Vec<Document>>;
}

/// Configuration for Qdrant
#[derive(Debug)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub top_k: u64,
}

impl QdrantConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let url = env::var("QDRANT_URL").context("QDRANT_URL is not set")?;
        let api_key = env::var("QDRANT_API_KEY").ok();
        let collection =
            env::var("QDRANT_COLLECTION").unwrap_or_else(|_| DEFAULT_COLLECTION.to_string());
        let top_k = match env::var("RAG_TOP_K") {
            Ok(value) => value.parse().context("RAG_TOP_K must be a positive integer")?,
            Err(_) => DEFAULT_TOP_K,
        };

        Ok(QdrantConfig {
            url,
            api_key,
            collection,
            top_k,
        })
    }
}

/// Vector store backed by one Qdrant collection
pub struct QdrantStore {
    client: Qdrant,
    embedder: Arc<dyn Embedder>,
    collection: String,
    top_k: u64,
}

impl QdrantStore {
    /// Connect to Qdrant and make sure the collection exists and is ready.
    ///
    /// Blocks until a freshly created collection reports green status.
    pub async fn connect(config: QdrantConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let config_builder = Qdrant::from_url(&config.url);
        let config_builder = if let Some(api_key) = config.api_key {
            config_builder.api_key(api_key)
        } else {
            config_builder
        };

        let client = config_builder.build()?;

        let store = QdrantStore {
            client,
            embedder,
            collection: config.collection,
            top_k: config.top_k,
        };

        if store.collection_exists().await? {
            debug!("Using existing collection: {}", store.collection);
        } else {
            store.create_collection().await?;
            store.wait_until_ready().await?;
        }

        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Check if the collection exists
    pub async fn collection_exists(&self) -> Result<bool> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => Ok(true),
            Err(qdrant_client::QdrantError::ResponseError { status })
                if status.code() == tonic::Code::NotFound =>
            {
                Ok(false)
            }
            Err(e) => Err(anyhow::anyhow!(
                "Failed to check collection existence: {}",
                e
            )),
        }
    }

    async fn create_collection(&self) -> Result<()> {
        info!(
            "Creating collection {} ({} dims, cosine)",
            self.collection, COLLECTION_VECTOR_SIZE
        );

        let create_collection = CreateCollectionBuilder::new(self.collection.clone())
            .vectors_config(VectorParams {
                size: COLLECTION_VECTOR_SIZE,
                distance: Distance::Cosine.into(),
                ..Default::default()
            });

        self.client
            .create_collection(create_collection)
            .await
            .with_context(|| format!("Failed to create collection {}", self.collection))?;

        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<()> {
        loop {
            let info = self
                .client
                .collection_info(&self.collection)
                .await
                .with_context(|| format!("Failed to poll collection {}", self.collection))?;

            let ready = info
                .result
                .map(|info| info.status == CollectionStatus::Green as i32)
                .unwrap_or(false);
            if ready {
                info!("Collection {} is ready", self.collection);
                return Ok(());
            }

            debug!("Waiting for collection {} to become ready", self.collection);
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add(&self, documents: &[Document], ids: &[String]) -> Result<()> {
        if documents.len() != ids.len() {
            return Err(anyhow::anyhow!(
                "Got {} documents but {} ids",
                documents.len(),
                ids.len()
            ));
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;

        if embeddings.len() != documents.len() {
            return Err(anyhow::anyhow!(
                "Expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            ));
        }
        if let Some(position) = embeddings.iter().position(|e| e.is_empty()) {
            return Err(anyhow::anyhow!(
                "Empty embedding for document {}",
                ids[position]
            ));
        }

        let points = documents
            .iter()
            .zip(ids)
            .zip(embeddings)
            .map(|((document, id), embedding)| {
                Ok(PointStruct::new(
                    id.clone(),
                    embedding.values,
                    document_payload(document)?,
                ))
            })
            .collect::<Result<Vec<PointStruct>>>()?;

        let upsert_request = UpsertPointsBuilder::new(self.collection.clone(), points).wait(true);

        // Upsert points in batch
        self.client
            .upsert_points(upsert_request)
            .await
            .with_context(|| {
                format!("Failed to upsert points in collection {}", self.collection)
            })?;

        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<Document>> {
        let query_embedding = self.embedder.embed_query(query).await?;

        let search_request = SearchPoints {
            collection_name: self.collection.clone(),
            vector: query_embedding.values,
            limit: self.top_k,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let search_response = self
            .client
            .search_points(search_request)
            .await
            .with_context(|| format!("Failed to search collection {}", self.collection))?;

        Ok(search_response
            .result
            .into_iter()
            .filter_map(|scored_point| payload_document(scored_point.payload))
            .collect())
    }
}

/// Payload stored next to each vector
fn document_payload(document: &Document) -> Result<Payload> {
    Payload::try_from(json!({
        "page_content": document.content,
        "metadata": document.metadata,
    }))
    .context("Failed to build point payload")
}

/// Rebuild a document from a stored payload; points without text are skipped
fn payload_document(mut payload: HashMap<String, Value>) -> Option<Document> {
    let content = payload.get("page_content")?.as_str()?.to_string();

    let metadata = match payload.remove("metadata").map(Value::into_json) {
        Some(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => HashMap::new(),
    };

    Some(Document { content, metadata })
}
