use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::semantic_search::RankedChunk;

#[derive(Error, Debug)]
#[error("Failed to parse model response: {0}")]
pub struct ParseError(#[from] serde_json::Error);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    NeedsReview,
    Error,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
            Decision::NeedsReview => "needs_review",
            Decision::Error => "error",
        };
        f.write_str(label)
    }
}

/// A clause the model cited. `document_id` and `page_range` are only ever
/// filled in by reconciliation; values sent by the model are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseReference {
    pub section: String,
    pub text: String,
    pub relevance_score: f64,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<i64>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub decision: Decision,
    pub amount: f64,
    pub justification: String,
    pub clauses: Vec<ClauseReference>,
}

impl QueryResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            decision: Decision::Error,
            amount: 0.0,
            justification: message.into(),
            clauses: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.decision == Decision::Error
    }
}

/// Turns raw model output into a [`QueryResult`] tied back to its sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseReconciler;

impl ResponseReconciler {
    /// Strict parse followed by enrichment. Any parse failure yields the
    /// error-shaped result and the partial data is dropped.
    pub fn parse(&self, raw: &str, ranked: &[RankedChunk]) -> QueryResult {
        match self.try_parse(raw, ranked) {
            Ok(result) => result,
            Err(e) => {
                log::error!("{}; raw response: {}", e, raw);
                QueryResult::error("Failed to parse AI response")
            }
        }
    }

    pub fn try_parse(&self, raw: &str, ranked: &[RankedChunk]) -> Result<QueryResult, ParseError> {
        let mut result: QueryResult = serde_json::from_str(raw)?;
        self.enrich(&mut result, ranked);
        Ok(result)
    }

    /// For each clause, the first ranked chunk whose text contains the
    /// clause's `section` verbatim (case-sensitive) supplies the provenance.
    /// Unmatched clauses are left untouched.
    pub fn enrich(&self, result: &mut QueryResult, ranked: &[RankedChunk]) {
        for clause in &mut result.clauses {
            if let Some(source) = ranked.iter().find(|r| r.chunk.text.contains(&clause.section)) {
                clause.document_id = Some(source.chunk.document_id);
                clause.page_range = Some(source.chunk.page_range());
            }
        }
    }
}
