use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::llm::embeddings::ElementWidth;
use crate::providers::traits::ProviderError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Missing API key: set {0}")]
    MissingApiKey(String),
    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Self {
        let prefix = provider.to_uppercase();

        let api_key = env::var(format!("{}_API_KEY", prefix)).ok();

        let chat_model = env::var(format!("{}_CHAT_MODEL", prefix))
            .or_else(|_| env::var(format!("{}_MODEL", prefix)))
            .unwrap_or_else(|_| match provider {
                "openai" => "gpt-4-turbo-preview".to_string(),
                "gemini" => "gemini-1.5-flash".to_string(),
                _ => String::new(),
            });

        let embedding_model = env::var(format!("{}_EMBEDDING_MODEL", prefix))
            .unwrap_or_else(|_| match provider {
                "openai" => "text-embedding-3-small".to_string(),
                "gemini" => "text-embedding-004".to_string(),
                _ => String::new(),
            });

        // Low temperature keeps the JSON answer shape stable
        let temperature = env::var(format!("{}_TEMPERATURE", prefix))
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.2);

        Self {
            api_key,
            chat_model,
            embedding_model,
            temperature,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub chunk_size: usize,
    pub top_k: usize,
    pub vector_width: ElementWidth,
    pub prompt_templates: Option<PathBuf>,
    pub provider: String,
    pub api_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("policy_rag.db"),
            chunk_size: 1000,
            top_k: 5,
            vector_width: ElementWidth::F32,
            prompt_templates: None,
            provider: "gemini".to_string(),
            api_port: 3000,
        }
    }
}

impl AppConfig {
    /// Reads `RAG_*` variables, falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_path = env::var("RAG_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let chunk_size = parse_count("RAG_CHUNK_SIZE", defaults.chunk_size)?;
        let top_k = parse_count("RAG_TOP_K", defaults.top_k)?;

        let vector_width = match env::var("RAG_VECTOR_WIDTH") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(ElementWidth::from_bytes)
                .ok_or(ConfigError::InvalidValue {
                    key: "RAG_VECTOR_WIDTH".to_string(),
                    value: raw,
                })?,
            Err(_) => defaults.vector_width,
        };

        let prompt_templates = env::var("RAG_PROMPT_TEMPLATES").ok().map(PathBuf::from);

        let provider = env::var("RAG_PROVIDER")
            .map(|p| p.trim().to_lowercase())
            .unwrap_or(defaults.provider);

        let api_port = parse_var("RAG_API_PORT", defaults.api_port)?;

        Ok(Self {
            database_path,
            chunk_size,
            top_k,
            vector_width,
            prompt_templates,
            provider,
            api_port,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

// Counts that must be at least one.
fn parse_count(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = parse_var(key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "0".to_string(),
        });
    }
    Ok(value)
}

/// Command-line parser for `--top-k` and `--chunk-size`.
pub fn parse_count_arg(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.vector_width, ElementWidth::F32);
        assert_eq!(config.provider, "gemini");
    }

    #[test]
    fn test_provider_defaults() {
        let config = ProviderConfig::from_env("unknown-provider-for-test");
        assert!(config.api_key.is_none());
        assert!(config.chat_model.is_empty());
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_var_falls_back_when_unset() {
        let value: usize = parse_var("RAG_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_zero_counts_rejected() {
        env::set_var("RAG_TEST_ZERO_COUNT", "0");
        assert!(matches!(
            parse_count("RAG_TEST_ZERO_COUNT", 5),
            Err(ConfigError::InvalidValue { key, .. }) if key == "RAG_TEST_ZERO_COUNT"
        ));

        env::set_var("RAG_TEST_THREE_COUNT", " 3 ");
        assert_eq!(parse_count("RAG_TEST_THREE_COUNT", 5).unwrap(), 3);
        assert_eq!(parse_count("RAG_TEST_UNSET_COUNT", 5).unwrap(), 5);
    }

    #[test]
    fn test_count_arg() {
        assert_eq!(parse_count_arg("7"), Ok(7));
        assert!(parse_count_arg("0").is_err());
        assert!(parse_count_arg("-1").is_err());
        assert!(parse_count_arg("many").is_err());
    }
}
