pub mod chunker;
pub mod extractor;
pub mod ingest;
pub mod model;

pub use extractor::{FileTextExtractor, TextExtractor};
pub use ingest::{DocumentIngestor, IngestError, IngestReport};
pub use model::{Chunk, Document, DocumentStatus, NewChunk};
