use std::str::FromStr;
use std::sync::Arc;

use crate::config::{ConfigError, ProviderConfig};
use crate::providers::gemini::GeminiProvider;
use crate::providers::openai::OpenAIProvider;
use crate::providers::traits::{EmbeddingProvider, GenerativeModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Gemini,
}

impl ProviderKind {
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(ConfigError::InvalidValue {
                key: "RAG_PROVIDER".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// The two remote capabilities the query pipeline depends on.
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub model: Arc<dyn GenerativeModel>,
}

pub fn build_providers(kind: ProviderKind) -> Result<Providers, ConfigError> {
    let config = ProviderConfig::from_env(kind.env_prefix());
    let api_key = config.api_key.clone().ok_or_else(|| {
        ConfigError::MissingApiKey(format!("{}_API_KEY", kind.env_prefix().to_uppercase()))
    })?;

    log::info!(
        "Using {} provider (chat model: {}, embedding model: {})",
        kind.env_prefix(),
        config.chat_model,
        config.embedding_model
    );

    match kind {
        ProviderKind::OpenAI => {
            let provider = Arc::new(OpenAIProvider::new(
                api_key,
                config.chat_model,
                config.embedding_model,
                config.temperature,
            ));
            Ok(Providers {
                embedder: provider.clone(),
                model: provider,
            })
        }
        ProviderKind::Gemini => {
            let provider = GeminiProvider::new(
                api_key,
                config.chat_model,
                config.embedding_model,
                config.temperature,
            )?;
            let provider = Arc::new(provider);
            Ok(Providers {
                embedder: provider.clone(),
                model: provider,
            })
        }
    }
}
