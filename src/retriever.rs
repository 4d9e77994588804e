use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::error::{RagError, Result};
use crate::llm::{EmbeddingProvider, GenerationProvider};
use crate::store::CandidateStore;
use crate::vector_db::RetrievalIndex;

/// Whether a query is grounded in a retrieved chunk or sent as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Grounded,
    Raw,
}

pub fn augmented_prompt(information: &str, question: &str) -> String {
    format!(
        "Use the following information to answer the subsequent question.\n\
         Information:\n\
         {information}\n\
         \n\
         Question:\n\
         {question}"
    )
}

pub struct Retriever {
    store: Arc<dyn CandidateStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    timeout: Duration,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Retriever {
            store,
            embedder,
            generator,
            timeout: Duration::from_secs(60),
        }
    }

    /// Upper bound for each provider call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Finds the stored chunk closest to `query` and returns its text.
    pub async fn retrieve(&self, query: &str) -> Result<String> {
        let query_embedding = tokio::time::timeout(self.timeout, self.embedder.embed(query))
            .await
            .map_err(|_| anyhow!("timed out after {:?}", self.timeout))
            .and_then(|r| r)
            .map_err(RagError::EmbeddingProviderFailure)?;

        let candidates = self.store.load_all_candidates().await?;
        debug!(count = candidates.len(), "Loaded candidates");

        let index = RetrievalIndex::new(&candidates, query_embedding);
        let best = index.find_best()?;
        info!(label = %best.label, "Retrieved context");

        Ok(best.text.clone())
    }

    pub async fn answer(&self, query: &str, mode: Mode) -> Result<String> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let prompt = match mode {
            Mode::Grounded => {
                let information = self.retrieve(query).await?;
                augmented_prompt(&information, query)
            }
            Mode::Raw => query.to_string(),
        };

        tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| anyhow!("timed out after {:?}", self.timeout))
            .and_then(|r| r)
            .map_err(RagError::GenerationProviderFailure)
    }
}
