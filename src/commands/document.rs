use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::database::Database;
use crate::document::{DocumentIngestor, DocumentStatus};

pub async fn handle_ingest(ingestor: &DocumentIngestor, paths: &[String]) -> Result<()> {
    let mut failures = 0;

    for path in paths {
        println!("📄 Ingesting document: {}", path.bright_yellow());
        match ingestor.ingest_file(Path::new(path)).await {
            Ok(report) => println!(
                "  {} document #{} stored as {} chunks",
                "✓".bright_green(),
                report.document.id,
                report.chunk_count
            ),
            Err(e) => {
                failures += 1;
                println!("  {} {}", "✗".red(), e.to_string().red());
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} documents failed to ingest", failures, paths.len());
    }
    Ok(())
}

pub async fn handle_documents(db: &Database) -> Result<()> {
    let documents = db.list_documents().await.context("failed to list documents")?;

    if documents.is_empty() {
        println!("No documents ingested yet.");
        return Ok(());
    }

    println!("📚 Documents:");
    for doc in documents {
        let status = match doc.status {
            DocumentStatus::Processed => doc.status.to_string().bright_green(),
            DocumentStatus::Uploaded => doc.status.to_string().bright_yellow(),
            DocumentStatus::Failed => doc.status.to_string().red(),
        };
        println!(
            "  #{:<4} {:<40} {:<10} {}",
            doc.id,
            doc.file_name,
            status,
            doc.uploaded_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
