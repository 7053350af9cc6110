use crate::core::error::AishError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

fn default_cache_capacity() -> usize {
    200
}

fn default_temperature() -> f32 {
    0.0
}

fn default_top_p() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    OpenRouter,
    DeepSeek,
    /// Any endpoint speaking the OpenAI dialect; requires an explicit base_url.
    Compatible,
}

impl Provider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Provider::OpenAI),
            "openrouter" => Some(Provider::OpenRouter),
            "deepseek" => Some(Provider::DeepSeek),
            "compatible" | "openai-compatible" => Some(Provider::Compatible),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Compatible => "",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4.1-mini",
            Provider::OpenRouter => "google/gemini-2.0-flash-001",
            Provider::DeepSeek => "deepseek-chat",
            Provider::Compatible => "",
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Provider::OpenAI
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub active_provider: Option<Provider>,
    #[serde(default)]
    pub auto_confirm: bool,
    #[serde(default)]
    pub providers: HashMap<Provider, ProviderConfig>,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_provider: None,
            auto_confirm: false,
            providers: HashMap::new(),
            cache_capacity: default_cache_capacity(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aish")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    pub fn load() -> Result<Config, AishError> {
        let path = Self::config_path();

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config = serde_yml::from_str::<Config>(&contents)
                .map_err(|e| AishError::Config(format!("Parse {}: {}", path.display(), e)))?;
            return Ok(config);
        }

        let config = Config::default();
        let _ = config.save();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), AishError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(&path, yaml_content)?;
        Ok(())
    }

    pub fn provider_config(&self, provider: Provider) -> ProviderConfig {
        self.providers.get(&provider).cloned().unwrap_or_default()
    }

    pub fn sessions_dir() -> PathBuf {
        Self::config_dir().join("sessions")
    }

    pub fn cache_dir() -> PathBuf {
        Self::config_dir().join("cache")
    }

    pub fn roles_dir() -> PathBuf {
        Self::config_dir().join("roles")
    }

    pub fn history_path() -> PathBuf {
        Self::config_dir().join("history")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_known_names() {
        assert_eq!(Provider::from_str("OpenAI"), Some(Provider::OpenAI));
        assert_eq!(Provider::from_str("deepseek"), Some(Provider::DeepSeek));
        assert_eq!(
            Provider::from_str("openai-compatible"),
            Some(Provider::Compatible)
        );
        assert_eq!(Provider::from_str("mystery"), None);
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: Config = serde_yml::from_str("active_provider: openai\n").unwrap();
        assert_eq!(config.cache_capacity, 200);
        assert_eq!(config.top_p, 1.0);
        assert!(!config.auto_confirm);
    }
}
