use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_rusqlite::Connection;

use super::chunk_store::ChunkStore;
use crate::document::model::{Chunk, Document, DocumentStatus, NewChunk};
use crate::llm::embeddings::VectorCodec;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),
    #[error("Document not found: {0}")]
    NotFound(i64),
}

const SELECT_CHUNKS: &str =
    "SELECT c.id, c.document_id, d.file_name, c.chunk_index, c.start_page, c.end_page,
            c.text, c.embedding, c.embedding_width
     FROM document_chunks c
     JOIN documents d ON d.id = c.document_id";

const INSERT_CHUNK: &str =
    "INSERT INTO document_chunks
        (document_id, chunk_index, start_page, end_page, text, embedding, embedding_width)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const SELECT_DOCUMENTS: &str =
    "SELECT id, file_name, file_type, file_path, uploaded_at, status FROM documents";

struct ChunkRow {
    id: i64,
    document_id: i64,
    document_name: String,
    chunk_index: i64,
    start_page: i64,
    end_page: i64,
    text: String,
    embedding: Option<Vec<u8>>,
    embedding_width: Option<i64>,
}

struct DocumentRow {
    id: i64,
    file_name: String,
    file_type: String,
    file_path: String,
    uploaded_at: String,
    status: String,
}

/// SQLite persistence for documents and their embedded chunks.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
    codec: VectorCodec,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P, codec: VectorCodec) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::with_connection(conn, codec).await
    }

    pub async fn open_in_memory(codec: VectorCodec) -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::with_connection(conn, codec).await
    }

    async fn with_connection(conn: Connection, codec: VectorCodec) -> Result<Self, DatabaseError> {
        let db = Self {
            conn: Arc::new(conn),
            codec,
        };
        db.initialize().await?;
        Ok(db)
    }

    pub fn codec(&self) -> VectorCodec {
        self.codec
    }

    async fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                CREATE TABLE IF NOT EXISTS documents (
                    id INTEGER PRIMARY KEY,
                    file_name TEXT NOT NULL,
                    file_type TEXT NOT NULL,
                    file_path TEXT NOT NULL,
                    uploaded_at TEXT NOT NULL,
                    status TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS document_chunks (
                    id INTEGER PRIMARY KEY,
                    document_id INTEGER NOT NULL REFERENCES documents(id),
                    chunk_index INTEGER NOT NULL,
                    start_page INTEGER NOT NULL,
                    end_page INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    embedding BLOB,
                    embedding_width INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_document_chunks_document
                    ON document_chunks(document_id);"
            )?;
            Ok(())
        })
        .await?;

        info!("Database initialized successfully");
        Ok(())
    }

    pub async fn create_document(
        &self,
        file_name: String,
        file_type: String,
        file_path: String,
    ) -> Result<Document, DatabaseError> {
        let uploaded_at = Utc::now();
        let status = DocumentStatus::Uploaded;

        let document = Document {
            id: 0,
            file_name,
            file_type,
            file_path,
            uploaded_at,
            status,
        };

        let row = document.clone();
        let id = self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO documents (file_name, file_type, file_path, uploaded_at, status)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        row.file_name,
                        row.file_type,
                        row.file_path,
                        row.uploaded_at.to_rfc3339(),
                        row.status.as_str()
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        debug!("Registered document {} as id {}", document.file_name, id);
        Ok(Document { id, ..document })
    }

    pub async fn set_document_status(
        &self,
        id: i64,
        status: DocumentStatus,
    ) -> Result<(), DatabaseError> {
        let updated = self.conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE documents SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), id],
                )?;
                Ok(n)
            })
            .await?;

        if updated == 0 {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }

    pub async fn get_document(&self, id: i64) -> Result<Option<Document>, DatabaseError> {
        let row = self.conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!("{} WHERE id = ?1", SELECT_DOCUMENTS),
                        [id],
                        read_document_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(document_from_row).transpose()
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>, DatabaseError> {
        let rows = self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_DOCUMENTS))?;
                let rows = stmt.query_map([], read_document_row)?;

                let mut documents = Vec::new();
                for row in rows {
                    documents.push(row?);
                }
                Ok(documents)
            })
            .await?;

        rows.into_iter().map(document_from_row).collect()
    }

    /// Writes every chunk of a document and marks it PROCESSED in a single
    /// transaction, so a document's chunks become visible all at once or not at all.
    pub async fn store_document_chunks(
        &self,
        document_id: i64,
        chunks: Vec<NewChunk>,
    ) -> Result<usize, DatabaseError> {
        let width = self.codec.width().bytes() as i64;
        let rows: Vec<(NewChunk, Vec<u8>)> = chunks
            .into_iter()
            .map(|chunk| {
                let embedding = self.codec.serialize(&chunk.vector);
                (chunk, embedding)
            })
            .collect();

        let stored = self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(INSERT_CHUNK)?;
                    for (chunk, embedding) in &rows {
                        stmt.execute(params![
                            chunk.document_id,
                            chunk.chunk_index as i64,
                            chunk.start_page as i64,
                            chunk.end_page as i64,
                            chunk.text,
                            embedding,
                            width
                        ])?;
                    }
                }

                let updated = tx.execute(
                    "UPDATE documents SET status = ?1 WHERE id = ?2",
                    params![DocumentStatus::Processed.as_str(), document_id],
                )?;
                if updated == 0 {
                    // Dropping the transaction rolls the inserts back.
                    return Ok(None);
                }

                tx.commit()?;
                Ok(Some(rows.len()))
            })
            .await?;

        stored.ok_or(DatabaseError::NotFound(document_id))
    }

    pub async fn chunks_for_document(&self, document_id: i64) -> Result<Vec<Chunk>, DatabaseError> {
        let rows = self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE c.document_id = ?1 ORDER BY c.id",
                    SELECT_CHUNKS
                ))?;
                let rows = stmt.query_map([document_id], read_chunk_row)?;

                let mut chunks = Vec::new();
                for row in rows {
                    chunks.push(row?);
                }
                Ok(chunks)
            })
            .await?;

        Ok(rows.into_iter().map(chunk_from_row).collect())
    }
}

#[async_trait]
impl ChunkStore for Database {
    async fn append(&self, chunk: NewChunk) -> Result<i64, DatabaseError> {
        let embedding = self.codec.serialize(&chunk.vector);
        let width = self.codec.width().bytes() as i64;

        let id = self.conn
            .call(move |conn| {
                conn.execute(
                    INSERT_CHUNK,
                    params![
                        chunk.document_id,
                        chunk.chunk_index as i64,
                        chunk.start_page as i64,
                        chunk.end_page as i64,
                        chunk.text,
                        embedding,
                        width
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<Chunk>, DatabaseError> {
        let rows = self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{} ORDER BY c.id", SELECT_CHUNKS))?;
                let rows = stmt.query_map([], read_chunk_row)?;

                let mut chunks = Vec::new();
                for row in rows {
                    chunks.push(row?);
                }
                Ok(chunks)
            })
            .await?;

        Ok(rows.into_iter().map(chunk_from_row).collect())
    }
}

fn read_chunk_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRow> {
    Ok(ChunkRow {
        id: row.get(0)?,
        document_id: row.get(1)?,
        document_name: row.get(2)?,
        chunk_index: row.get(3)?,
        start_page: row.get(4)?,
        end_page: row.get(5)?,
        text: row.get(6)?,
        embedding: row.get(7)?,
        embedding_width: row.get(8)?,
    })
}

fn read_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        file_name: row.get(1)?,
        file_type: row.get(2)?,
        file_path: row.get(3)?,
        uploaded_at: row.get(4)?,
        status: row.get(5)?,
    })
}

// Each row is decoded with the width it was written with. A row that cannot
// be decoded is kept without a vector and scores zero.
fn chunk_from_row(row: ChunkRow) -> Chunk {
    let vector = match (row.embedding, row.embedding_width) {
        (Some(bytes), Some(width)) => {
            match VectorCodec::for_stored_width(width as usize).and_then(|codec| codec.deserialize(&bytes)) {
                Ok(vector) => Some(vector),
                Err(e) => {
                    warn!("Ignoring stored vector of chunk {}: {}", row.id, e);
                    None
                }
            }
        }
        (Some(_), None) => {
            warn!("Ignoring stored vector of chunk {}: no element width recorded", row.id);
            None
        }
        (None, _) => None,
    };

    Chunk {
        id: row.id,
        document_id: row.document_id,
        document_name: row.document_name,
        chunk_index: row.chunk_index as usize,
        start_page: row.start_page as u32,
        end_page: row.end_page as u32,
        text: row.text,
        vector,
    }
}

fn document_from_row(row: DocumentRow) -> Result<Document, DatabaseError> {
    let uploaded_at = DateTime::parse_from_rfc3339(&row.uploaded_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidRow(format!("document {}: {}", row.id, e)))?;
    let status = row
        .status
        .parse::<DocumentStatus>()
        .map_err(DatabaseError::InvalidRow)?;

    Ok(Document {
        id: row.id,
        file_name: row.file_name,
        file_type: row.file_type,
        file_path: row.file_path,
        uploaded_at,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::embeddings::ElementWidth;

    async fn test_db(width: ElementWidth) -> Database {
        Database::open_in_memory(VectorCodec::new(width)).await.unwrap()
    }

    fn new_chunk(document_id: i64, index: usize, text: &str, vector: Vec<f32>) -> NewChunk {
        NewChunk {
            document_id,
            chunk_index: index,
            start_page: 1,
            end_page: 2,
            text: text.to_string(),
            vector,
        }
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let db = test_db(ElementWidth::F32).await;
        let doc = db
            .create_document("policy.pdf".into(), "application/pdf".into(), "/tmp/policy.pdf".into())
            .await
            .unwrap();
        assert!(doc.id > 0);
        assert_eq!(doc.status, DocumentStatus::Uploaded);

        db.set_document_status(doc.id, DocumentStatus::Processed).await.unwrap();
        let stored = db.get_document(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Processed);
        assert_eq!(stored.file_name, "policy.pdf");

        assert_eq!(db.list_documents().await.unwrap().len(), 1);
        assert!(db.get_document(999).await.unwrap().is_none());
        assert!(matches!(
            db.set_document_status(999, DocumentStatus::Failed).await,
            Err(DatabaseError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_chunks_listed_in_insertion_order() {
        let db = test_db(ElementWidth::F32).await;
        let doc = db
            .create_document("a.txt".into(), "text/plain".into(), "a.txt".into())
            .await
            .unwrap();

        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            db.append(new_chunk(doc.id, i, text, vec![i as f32, 1.0])).await.unwrap();
        }

        let chunks = db.list_all().await.unwrap();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(chunks[2].vector, Some(vec![2.0, 1.0]));
        assert_eq!(chunks[0].document_name, "a.txt");
        assert_eq!(chunks[0].page_range(), "1-2");
        assert_eq!(db.chunks_for_document(doc.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rows_decode_with_their_stored_width() {
        let db = test_db(ElementWidth::F64).await;
        let doc = db
            .create_document("b.txt".into(), "text/plain".into(), "b.txt".into())
            .await
            .unwrap();
        db.append(new_chunk(doc.id, 0, "wide", vec![0.5, -0.25])).await.unwrap();

        // A reader configured for 4-byte vectors still decodes the 8-byte row.
        let narrow = Database {
            conn: db.conn.clone(),
            codec: VectorCodec::new(ElementWidth::F32),
        };
        let chunks = narrow.list_all().await.unwrap();
        assert_eq!(chunks[0].vector, Some(vec![0.5, -0.25]));
    }

    #[tokio::test]
    async fn test_store_document_chunks_marks_processed() {
        let db = test_db(ElementWidth::F32).await;
        let doc = db
            .create_document("c.txt".into(), "text/plain".into(), "c.txt".into())
            .await
            .unwrap();

        let chunks = vec![
            new_chunk(doc.id, 0, "one", vec![1.0, 0.0]),
            new_chunk(doc.id, 1, "two", vec![0.0, 1.0]),
        ];
        assert_eq!(db.store_document_chunks(doc.id, chunks).await.unwrap(), 2);

        let stored = db.get_document(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Processed);
        assert_eq!(db.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_document_chunks_for_unknown_document_rolls_back() {
        let db = test_db(ElementWidth::F32).await;
        let err = db
            .store_document_chunks(404, vec![new_chunk(404, 0, "orphan", vec![1.0])])
            .await
            .unwrap_err();

        assert!(matches!(err, DatabaseError::NotFound(404)));
        let count: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM document_chunks", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_undecodable_vector_is_listed_without_vector() {
        let db = test_db(ElementWidth::F32).await;
        let doc = db
            .create_document("d.txt".into(), "text/plain".into(), "d.txt".into())
            .await
            .unwrap();
        db.append(new_chunk(doc.id, 0, "good", vec![1.0, 2.0])).await.unwrap();

        let document_id = doc.id;
        db.conn
            .call(move |conn| {
                conn.execute(
                    INSERT_CHUNK,
                    params![document_id, 1i64, 1i64, 1i64, "torn", vec![0u8; 3], 4i64],
                )?;
                conn.execute(
                    INSERT_CHUNK,
                    params![document_id, 2i64, 1i64, 1i64, "odd width", vec![0u8; 4], 2i64],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let chunks = db.list_all().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].vector, Some(vec![1.0, 2.0]));
        assert_eq!(chunks[1].vector, None);
        assert_eq!(chunks[2].vector, None);
    }
}
