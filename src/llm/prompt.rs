use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::semantic_search::RankedChunk;

/// The answer shape every template asks the model for.
pub const ANSWER_SCHEMA: &str = r#"{
    "decision": "approved|rejected|needs_review",
    "amount": 0.0,
    "justification": "string",
    "clauses": [
        {
            "section": "string",
            "text": "string",
            "relevanceScore": 0.0
        }
    ]
}"#;

const DEFAULT_TEMPLATE: &str = "Analyze the following insurance policy context and answer the question.
Context: {context}
Question: {question}

Respond in exactly this JSON format:
{schema}
";

const HINDI_TEMPLATE: &str = "निम्नलिखित बीमा पॉलिसी संदर्भ का विश्लेषण करें और प्रश्न का उत्तर दें।
संदर्भ: {context}
प्रश्न: {question}

निम्नलिखित JSON प्रारूप में उत्तर दें:
{schema}
";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read template file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid template file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Language code to prompt template, with an explicit fallback.
///
/// Templates may use `{context}`, `{question}` and `{schema}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplates {
    default: String,
    #[serde(default)]
    languages: HashMap<String, String>,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        let mut languages = HashMap::new();
        languages.insert("en".to_string(), DEFAULT_TEMPLATE.to_string());
        languages.insert("hi".to_string(), HINDI_TEMPLATE.to_string());
        Self {
            default: DEFAULT_TEMPLATE.to_string(),
            languages,
        }
    }
}

impl PromptTemplates {
    pub fn new(default: String) -> Self {
        Self {
            default,
            languages: HashMap::new(),
        }
    }

    pub fn with_language(mut self, code: &str, template: String) -> Self {
        self.languages.insert(code.to_lowercase(), template);
        self
    }

    /// Loads `{"default": "...", "languages": {"hi": "..."}}` from disk.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: PromptTemplates = serde_json::from_str(&raw)?;
        Ok(Self {
            default: parsed.default,
            languages: parsed
                .languages
                .into_iter()
                .map(|(code, template)| (code.to_lowercase(), template))
                .collect(),
        })
    }

    pub fn template_for(&self, language: &str) -> &str {
        self.languages
            .get(&language.trim().to_lowercase())
            .unwrap_or(&self.default)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    templates: PromptTemplates,
}

impl PromptBuilder {
    pub fn new(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    pub fn build(&self, query: &str, ranked: &[RankedChunk], language: &str) -> String {
        let context = build_context(ranked);
        render(
            self.templates.template_for(language),
            &[("context", context.as_str()), ("question", query), ("schema", ANSWER_SCHEMA)],
        )
    }
}

/// One header + text block per chunk, in ranked order, blank-line separated.
pub fn build_context(ranked: &[RankedChunk]) -> String {
    ranked
        .iter()
        .map(|r| {
            format!(
                "[Document: {}, Section: {}]\n{}",
                r.chunk.document_name, r.chunk.chunk_index, r.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// Single pass over the template so placeholder-like text inside values is left alone.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });

        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
