use super::{CompletionClient, CompletionRequest, FragmentStream, Message};
use crate::core::error::{AishError, ProviderErrorKind};
use crate::providers::base_client::BaseApiClient;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Serialize)]
struct ChatCompletionMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub(crate) struct Choice {
    pub message: MessageContent,
}

#[derive(Deserialize)]
pub(crate) struct MessageContent {
    pub content: String,
}

pub(crate) fn build_payload(request: &CompletionRequest, stream: bool) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: request.model.clone(),
        messages: request
            .messages
            .iter()
            .map(|m: &Message| ChatCompletionMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect(),
        temperature: request.temperature,
        top_p: request.top_p,
        stream: stream.then_some(true),
    }
}

pub struct OpenAIClient {
    client: BaseApiClient,
}

impl OpenAIClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint("https://api.openai.com/v1".to_string(), api_key)
    }

    pub fn with_endpoint(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: BaseApiClient::new(endpoint, api_key.unwrap_or_default(), None),
        }
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AishError> {
        let payload = build_payload(request, false);

        let response = self
            .client
            .send_request("chat/completions", &payload)
            .await?;

        let response_body: String = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&response_body)?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| {
                AishError::provider(ProviderErrorKind::Fatal, "No choices in API response")
            })?;

        if content.is_empty() {
            return Err(AishError::provider(
                ProviderErrorKind::Fatal,
                "Empty response received from API",
            ));
        }

        Ok(content)
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
