use crate::database::VectorStore;
use crate::document::Document;
use log::{error, info, warn};
use uuid::Uuid;

/// Store documents under freshly generated ids.
///
/// Returns `false` when there is nothing to add or the write fails; errors are
/// logged here and never propagated.
pub async fn add_documents(store: &dyn VectorStore, documents: &[Document]) -> bool {
    if documents.is_empty() {
        warn!("Empty documents list - nothing to add");
        return false;
    }

    let ids: Vec<String> = documents
        .iter()
        .map(|_| Uuid::new_v4().to_string())
        .collect();

    match store.add(documents, &ids).await {
        Ok(()) => {
            info!("Added {} documents to the vector store", documents.len());
            true
        }
        Err(e) => {
            error!("Error adding documents to vector store: {:#}", e);
            false
        }
    }
}
