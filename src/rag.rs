use crate::database::VectorStore;
use crate::document::Document;
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use std::io::{self, Write};
use std::sync::Arc;

/// Prompt used to answer a question from retrieved context
pub const PROMPT_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
Use three sentences maximum and keep the answer as concise as possible.

Context: {context}

Question: {question}

Helpful Answer:";

/// A language model that completes a single prompt
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Documents retrieved for one question, best match first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QaContext {
    pub documents: Vec<Document>,
}

impl QaContext {
    /// Join the document texts with blank lines, keeping retrieval order
    pub fn to_prompt_block(&self) -> String {
        self.documents
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<&str>>()
            .join("\n\n")
    }
}

/// Fill the prompt template with a context block and a question
pub fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Look up the documents relevant to a question
pub async fn retrieve(store: &dyn VectorStore, question: &str) -> Result<QaContext> {
    let documents = store.search(question).await?;
    debug!("Retrieved {} documents", documents.len());
    Ok(QaContext { documents })
}

/// Ask the model to answer `question` from the retrieved context
pub async fn generate(
    model: &dyn ChatModel,
    question: &str,
    context: &QaContext,
) -> Result<String> {
    let prompt = render_prompt(&context.to_prompt_block(), question);
    model.complete(&prompt).await
}

/// RAG (Retrieval-Augmented Generation) engine
#[derive(Clone)]
pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    model: Arc<dyn ChatModel>,
}

impl RagEngine {
    /// Create a new RAG engine
    pub fn new(store: Arc<dyn VectorStore>, model: Arc<dyn ChatModel>) -> Self {
        RagEngine { store, model }
    }

    /// Store chunked documents in the vector store
    pub async fn ingest(&self, documents: &[Document]) -> bool {
        crate::ingest::add_documents(self.store.as_ref(), documents).await
    }

    /// Retrieve context for a question and generate an answer from it
    pub async fn ask(&self, question: &str) -> Result<String> {
        let context = retrieve(self.store.as_ref(), question).await?;
        generate(self.model.as_ref(), question, &context).await
    }

    /// Answer questions read from stdin until `exit`
    pub async fn run_query_loop(&self) -> Result<()> {
        info!("Ready to answer questions. Type 'exit' to quit.");

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut buffer = String::new();

        loop {
            print!("\nYour question: ");
            stdout.flush()?;

            buffer.clear();
            if stdin.read_line(&mut buffer)? == 0 {
                break;
            }

            let question = buffer.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") {
                info!("Goodbye!");
                break;
            }

            let answer = self.ask(question).await?;
            println!("\n{}", answer);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt() {
        let prompt = render_prompt("The sky is blue.", "What color is the sky?");
        assert!(prompt.starts_with("Use the following pieces of context"));
        assert!(prompt.contains(
            "\n\nContext: The sky is blue.\n\nQuestion: What color is the sky?\n\nHelpful Answer:"
        ));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn test_prompt_block_keeps_order() {
        let context = QaContext {
            documents: vec![Document::new("first"), Document::new("second")],
        };
        assert_eq!(context.to_prompt_block(), "first\n\nsecond");
        assert_eq!(QaContext::default().to_prompt_block(), "");
    }
}
