use async_trait::async_trait;

use super::database::DatabaseError;
use crate::document::model::{Chunk, NewChunk};

/// Append-only chunk storage. `list_all` returns chunks in insertion order,
/// which is the candidate order similarity ties fall back to.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn append(&self, chunk: NewChunk) -> Result<i64, DatabaseError>;

    async fn list_all(&self) -> Result<Vec<Chunk>, DatabaseError>;
}
