use crate::config::{Provider, ProviderConfig};
use crate::core::error::AishError;
use crate::providers::{
    openai::OpenAIClient, openai_compatible::OpenAICompatibleClient, CompletionClient,
};

/// Build the completion client for the selected provider. Everything but
/// plain OpenAI goes through the compatible client with the provider's
/// base URL.
pub fn create_client(
    provider: Provider,
    config: &ProviderConfig,
) -> Result<Box<dyn CompletionClient>, AishError> {
    let client: Box<dyn CompletionClient> = match provider {
        Provider::OpenAI => match &config.base_url {
            Some(base_url) => {
                Box::new(OpenAIClient::with_endpoint(
                    base_url.clone(),
                    config.api_key.clone(),
                ))
            }
            None => Box::new(OpenAIClient::new(config.api_key.clone())),
        },
        Provider::OpenRouter | Provider::DeepSeek => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_base_url().to_string());
            Box::new(OpenAICompatibleClient::new(
                base_url,
                config.api_key.clone(),
                None,
            ))
        }
        Provider::Compatible => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                AishError::Config(
                    "base_url is required for the openai-compatible provider".to_string(),
                )
            })?;
            Box::new(OpenAICompatibleClient::new(
                base_url,
                config.api_key.clone(),
                None,
            ))
        }
    };

    Ok(client)
}
