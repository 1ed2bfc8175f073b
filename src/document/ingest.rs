use log::{error, info};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::chunker;
use super::extractor::{detect_media_type, ExtractError, TextExtractor};
use super::model::{Document, DocumentStatus, NewChunk};
use crate::database::{Database, DatabaseError};
use crate::llm::embeddings::{EmbeddingCodec, EmbeddingError};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Summary of one ingested document.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document: Document,
    pub chunk_count: usize,
}

/// Extract, chunk, embed and store documents.
pub struct DocumentIngestor {
    extractor: Arc<dyn TextExtractor>,
    embedder: EmbeddingCodec,
    db: Arc<Database>,
    chunk_size: usize,
}

impl DocumentIngestor {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: EmbeddingCodec,
        db: Arc<Database>,
        chunk_size: usize,
    ) -> Self {
        Self {
            extractor,
            embedder,
            db,
            chunk_size,
        }
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport, IngestError> {
        let media_type = detect_media_type(path);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let document = self
            .db
            .create_document(file_name, media_type.clone(), path.display().to_string())
            .await?;

        let outcome = match self.extractor.extract(path, &media_type).await {
            Ok(text) => self.store_chunks(&document, &text).await,
            Err(e) => Err(e.into()),
        };

        self.finish(document, outcome).await
    }

    /// Ingests text that has already been extracted.
    pub async fn ingest_text(&self, file_name: &str, text: &str) -> Result<IngestReport, IngestError> {
        let document = self
            .db
            .create_document(file_name.to_string(), "text/plain".to_string(), file_name.to_string())
            .await?;

        let outcome = self.store_chunks(&document, text).await;
        self.finish(document, outcome).await
    }

    // Every chunk is embedded before anything is written; the chunks and the
    // PROCESSED status are then stored together.
    async fn store_chunks(&self, document: &Document, text: &str) -> Result<usize, IngestError> {
        let pieces = chunker::split_with_pages(text, self.chunk_size);
        info!("Created {} chunks for {}", pieces.len(), document.file_name);

        let mut chunks = Vec::with_capacity(pieces.len());
        for (index, piece) in pieces.into_iter().enumerate() {
            let vector = self.embedder.encode(&piece.text).await?;
            chunks.push(NewChunk {
                document_id: document.id,
                chunk_index: index,
                start_page: piece.start_page,
                end_page: piece.end_page,
                text: piece.text,
                vector,
            });
        }

        Ok(self.db.store_document_chunks(document.id, chunks).await?)
    }

    async fn finish(
        &self,
        mut document: Document,
        outcome: Result<usize, IngestError>,
    ) -> Result<IngestReport, IngestError> {
        match outcome {
            Ok(chunk_count) => {
                document.status = DocumentStatus::Processed;
                info!("Processed {} ({} chunks)", document.file_name, chunk_count);
                Ok(IngestReport { document, chunk_count })
            }
            Err(e) => {
                error!("Failed to process {}: {}", document.file_name, e);
                if let Err(status_err) =
                    self.db.set_document_status(document.id, DocumentStatus::Failed).await
                {
                    error!("Failed to mark document {} as failed: {}", document.id, status_err);
                }
                Err(e)
            }
        }
    }
}
