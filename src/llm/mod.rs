pub mod embeddings;
pub mod pipeline;
pub mod prompt;
pub mod reconciler;
pub mod semantic_search;

pub use embeddings::{EmbeddingCodec, ElementWidth, VectorCodec};
pub use pipeline::{QueryError, QueryProcessor};
pub use prompt::{PromptBuilder, PromptTemplates};
pub use reconciler::{ClauseReference, Decision, QueryResult, ResponseReconciler};
pub use semantic_search::{BruteForceIndex, RankedChunk, SimilarityIndex};
