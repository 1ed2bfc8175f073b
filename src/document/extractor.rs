use async_trait::async_trait;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

use super::chunker::PAGE_BREAK;

pub const MEDIA_PDF: &str = "application/pdf";
pub const MEDIA_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MEDIA_TEXT: &str = "text/plain";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to extract text: {0}")]
    Parse(String),
}

/// Turns a stored file into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path, media_type: &str) -> Result<String, ExtractError>;
}

/// Best-effort media type from the file extension.
pub fn detect_media_type(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => MEDIA_PDF.to_string(),
        "docx" => MEDIA_DOCX.to_string(),
        "txt" | "text" | "md" => MEDIA_TEXT.to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

/// Extracts PDF, Word (docx) and plain text files from disk.
#[derive(Debug, Default, Clone)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract(&self, path: &Path, media_type: &str) -> Result<String, ExtractError> {
        if media_type.contains("pdf") {
            let bytes = tokio::fs::read(path).await?;
            tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| ExtractError::Parse(e.to_string()))
            })
            .await
            .map_err(|e| ExtractError::Parse(e.to_string()))?
        } else if media_type.contains("wordprocessingml") {
            let bytes = tokio::fs::read(path).await?;
            tokio::task::spawn_blocking(move || extract_docx(&bytes))
                .await
                .map_err(|e| ExtractError::Parse(e.to_string()))?
        } else if media_type.contains("text") || media_type.contains("plain") {
            Ok(tokio::fs::read_to_string(path).await?)
        } else {
            Err(ExtractError::UnsupportedFormat(media_type.to_string()))
        }
    }
}

/// Reads the text runs of `word/document.xml`. Paragraphs end with a
/// newline and explicit page breaks become form feeds.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Parse(format!("Failed to read DOCX as ZIP: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Parse(format!("Missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)?;

    Ok(docx_xml_to_text(&xml))
}

fn docx_xml_to_text(xml: &str) -> String {
    let mut text = String::new();
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else { break };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let name = tag.split_whitespace().next().unwrap_or("");
        match name {
            "w:t" => {
                let end = rest.find("</w:t>").unwrap_or(rest.len());
                text.push_str(&decode_entities(&rest[..end]));
                rest = &rest[end..];
            }
            "w:tab/" | "w:tab" => text.push('\t'),
            "w:br/" | "w:br" if tag.contains("w:type=\"page\"") => text.push(PAGE_BREAK),
            "w:br/" | "w:br" => text.push('\n'),
            "/w:p" => text.push('\n'),
            _ => {}
        }
    }

    text
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
