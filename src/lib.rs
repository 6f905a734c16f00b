pub mod chunking;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod openai;
pub mod rag;
