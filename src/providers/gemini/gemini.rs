use async_trait::async_trait;
use crate::providers::traits::{EmbeddingProvider, GenerativeModel, ProviderError};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    model: String,
    embedding_model: String,
    temperature: f32,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, embedding_model: String, temperature: f32) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            api_key,
            client,
            model,
            embedding_model,
            temperature,
        })
    }

    async fn post(&self, model: &str, method: &str, body: Value) -> Result<Value, ProviderError> {
        let response = self.client
            .post(format!("{}/{}:{}", API_BASE, model, method))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::Status { status: status.as_u16(), body });
        }

        let response_json: Value = response.json().await?;

        if let Some(error) = response_json.get("error") {
            return Err(ProviderError::InvalidResponse(error.to_string()));
        }

        Ok(response_json)
    }
}

#[async_trait]
impl GenerativeModel for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let response_json = self.post(&self.model, "generateContent", json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "responseMimeType": "application/json"
            }
        })).await?;

        match response_json["candidates"][0]["content"]["parts"][0]["text"].as_str() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            Some(_) => Err(ProviderError::EmptyResponse),
            None => Err(ProviderError::InvalidResponse(
                "missing candidates[0].content.parts[0].text".to_string(),
            )),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let response_json = self.post(&self.embedding_model, "embedContent", json!({
            "model": format!("models/{}", self.embedding_model),
            "content": {
                "parts": [{ "text": text }]
            }
        })).await?;

        let values = response_json["embedding"]["values"]
            .as_array()
            .ok_or(ProviderError::EmptyResponse)?;

        let vector = values
            .iter()
            .map(|v| v.as_f64().map(|x| x as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| ProviderError::InvalidResponse("non-numeric embedding value".to_string()))?;

        if vector.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}
