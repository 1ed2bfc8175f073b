use anyhow::Result;
use colored::Colorize;

use crate::llm::{Decision, QueryProcessor};

pub async fn handle_query(processor: &QueryProcessor, query: &str, language: &str, json: bool) -> Result<()> {
    let result = processor.process_query(query, language).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let decision = match result.decision {
        Decision::Approved => result.decision.to_string().bright_green(),
        Decision::Rejected => result.decision.to_string().red(),
        Decision::NeedsReview => result.decision.to_string().bright_yellow(),
        Decision::Error => result.decision.to_string().red().bold(),
    };

    println!("\n📊 Decision: {}", decision);
    if !result.is_error() {
        println!("💰 Amount: {:.2}", result.amount);
    }
    println!("📝 {}", result.justification);

    if !result.clauses.is_empty() {
        println!("\n📑 Cited clauses:");
        for clause in &result.clauses {
            let source = match (clause.document_id, clause.page_range.as_deref()) {
                (Some(id), Some(pages)) => format!("document #{}, pages {}", id, pages),
                _ => "source not located".to_string(),
            };
            println!(
                "  • {} ({:.2}) [{}]\n    {}",
                clause.section.bright_yellow(),
                clause.relevance_score,
                source.dimmed(),
                clause.text
            );
        }
    }
    Ok(())
}
