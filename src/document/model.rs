use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Uploaded,
    Processed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "UPLOADED",
            DocumentStatus::Processed => "PROCESSED",
            DocumentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOADED" => Ok(DocumentStatus::Uploaded),
            "PROCESSED" => Ok(DocumentStatus::Processed),
            "FAILED" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

/// A registered source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub file_name: String,
    pub file_type: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
}

/// Chunk data handed to the store at ingestion time.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub document_id: i64,
    pub chunk_index: usize,
    pub start_page: u32,
    pub end_page: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

/// A stored chunk. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: i64,
    pub document_id: i64,
    pub document_name: String,
    pub chunk_index: usize,
    pub start_page: u32,
    pub end_page: u32,
    pub text: String,
    pub vector: Option<Vec<f32>>,
}

impl Chunk {
    pub fn page_range(&self) -> String {
        format!("{}-{}", self.start_page, self.end_page)
    }
}
