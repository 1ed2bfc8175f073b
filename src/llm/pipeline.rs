use log::{debug, error, info};
use std::sync::Arc;
use thiserror::Error;

use super::embeddings::{EmbeddingCodec, EmbeddingError};
use super::prompt::PromptBuilder;
use super::reconciler::{ParseError, QueryResult, ResponseReconciler};
use super::semantic_search::{RankedChunk, SimilarityIndex, DEFAULT_TOP_K};
use crate::database::{ChunkStore, DatabaseError};
use crate::providers::traits::{GenerativeModel, ProviderError};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Chunk store failed: {0}")]
    Store(#[from] DatabaseError),
    #[error("No documents have been ingested")]
    EmptyCorpus,
    #[error("Generative model failed: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl QueryError {
    /// Justification text shown to callers for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            QueryError::Embedding(_) => "Processing failed: could not embed the query",
            QueryError::Store(_) => "Processing failed: could not read stored documents",
            QueryError::EmptyCorpus => "No documents have been ingested",
            QueryError::Provider(_) => "Processing failed: the language model did not respond",
            QueryError::Parse(_) => "Failed to parse AI response",
        }
    }
}

/// Answers questions over the stored chunks.
///
/// Every collaborator is injected, so fakes can stand in for the remote
/// services in tests. Each call is independent and holds no shared mutable
/// state; identical concurrent queries each scan and call out on their own.
#[derive(Clone)]
pub struct QueryProcessor {
    embedder: EmbeddingCodec,
    model: Arc<dyn GenerativeModel>,
    store: Arc<dyn ChunkStore>,
    index: Arc<dyn SimilarityIndex>,
    prompts: PromptBuilder,
    reconciler: ResponseReconciler,
    top_k: usize,
}

impl QueryProcessor {
    pub fn new(
        embedder: EmbeddingCodec,
        model: Arc<dyn GenerativeModel>,
        store: Arc<dyn ChunkStore>,
        index: Arc<dyn SimilarityIndex>,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            embedder,
            model,
            store,
            index,
            prompts,
            reconciler: ResponseReconciler,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Never fails: every error becomes a `decision: "error"` result.
    pub async fn process_query(&self, query: &str, language: &str) -> QueryResult {
        match self.try_process(query, language).await {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to process query {:?}: {}", query, e);
                QueryResult::error(e.user_message())
            }
        }
    }

    pub async fn try_process(&self, query: &str, language: &str) -> Result<QueryResult, QueryError> {
        let ranked = self.retrieve(query).await?;
        let prompt = self.prompts.build(query, &ranked, language);

        let raw = self.model.generate(&prompt).await?;
        debug!("Model {} returned {} bytes", self.model.model_name(), raw.len());

        let result = self.reconciler.try_parse(&raw, &ranked)?;
        info!(
            "Answered query with decision {} citing {} clauses",
            result.decision,
            result.clauses.len()
        );
        Ok(result)
    }

    /// Embeds the query and ranks every stored chunk against it.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RankedChunk>, QueryError> {
        let query_vector = self.embedder.encode(query).await?;

        let candidates = self.store.list_all().await?;
        if candidates.is_empty() {
            return Err(QueryError::EmptyCorpus);
        }

        let ranked = self.index.top_k(&query_vector, &candidates, self.top_k);
        debug!(
            "Retrieved {} of {} chunks (best score {:.3})",
            ranked.len(),
            candidates.len(),
            ranked.first().map_or(0.0, |r| r.score)
        );
        Ok(ranked)
    }
}
