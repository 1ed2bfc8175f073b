use async_trait::async_trait;
use crate::providers::traits::{EmbeddingProvider, GenerativeModel, ProviderError};
use async_openai::{
    types::{
        CreateEmbeddingRequestArgs,
        EmbeddingInput,
        CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
        ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent,
        ChatCompletionResponseFormat,
        ChatCompletionResponseFormatType,
        Role,
    },
    Client,
    config::OpenAIConfig,
};

const SYSTEM_MESSAGE: &str =
    "You are an insurance policy analyst. Answer only from the supplied context and reply with JSON only.";

#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    chat_model: String,
    embedding_model: String,
    temperature: f32,
}

impl OpenAIProvider {
    pub fn new(api_key: String, chat_model: String, embedding_model: String, temperature: f32) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(config);

        Self {
            client,
            chat_model,
            embedding_model,
            temperature,
        }
    }

    // JSON mode also requires the word "JSON" in the system message.
    fn chat_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest, ProviderError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .temperature(self.temperature)
            .response_format(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            })
            .messages(vec![
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage {
                        role: Role::System,
                        content: SYSTEM_MESSAGE.to_string(),
                        name: None,
                    }
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        role: Role::User,
                        content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                        name: None,
                    }
                ),
            ])
            .build()?;

        Ok(request)
    }
}

#[async_trait]
impl GenerativeModel for OpenAIProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self.chat_request(prompt)?;

        let response = self.client.chat().create(request).await?;

        response.choices.first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(ProviderError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.chat_model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        match response.data.into_iter().next() {
            Some(embedding) if !embedding.embedding.is_empty() => Ok(embedding.embedding),
            _ => Err(ProviderError::EmptyResponse),
        }
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_asks_for_json_object() {
        let provider = OpenAIProvider::new(
            "test-key".to_string(),
            "gpt-4-turbo-preview".to_string(),
            "text-embedding-3-small".to_string(),
            0.2,
        );
        let request = provider.chat_request("Is surgery covered?").unwrap();

        assert_eq!(
            request.response_format,
            Some(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            })
        );
        assert_eq!(request.messages.len(), 2);
        assert!(SYSTEM_MESSAGE.contains("JSON"));
    }
}
