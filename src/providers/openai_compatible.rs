use super::openai::{build_payload, ChatCompletionResponse};
use super::{CompletionClient, CompletionRequest, FragmentStream};
use crate::core::error::{AishError, ProviderErrorKind};
use crate::providers::base_client::BaseApiClient;
use std::collections::HashMap;

/// Client for any endpoint speaking the OpenAI chat-completions dialect
/// (OpenRouter, DeepSeek, local inference servers, ...).
pub struct OpenAICompatibleClient {
    client: BaseApiClient,
}

impl OpenAICompatibleClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            client: BaseApiClient::new(base_url, api_key.unwrap_or_default(), extra_headers),
        }
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAICompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AishError> {
        let payload = build_payload(request, false);

        let response = self
            .client
            .send_request("chat/completions", &payload)
            .await?;

        let response_body: String = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&response_body)?;

        parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AishError::provider(ProviderErrorKind::Fatal, "Empty response from API")
            })
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<FragmentStream, AishError> {
        let payload = build_payload(request, true);
        self.client
            .send_stream_request("chat/completions", &payload)
            .await
    }
}
