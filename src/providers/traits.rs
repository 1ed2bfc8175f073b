use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("API request failed: Status {status}, Body: {body}")]
    Status { status: u16, body: String },
    #[error("Provider returned an empty response")]
    EmptyResponse,
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Request(e.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for ProviderError {
    fn from(e: async_openai::error::OpenAIError) -> Self {
        ProviderError::Request(e.to_string())
    }
}

/// Turns text into a fixed-dimension embedding vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    fn model_name(&self) -> &str;
}

/// Produces free-form text for a prompt.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    fn model_name(&self) -> &str;
}
