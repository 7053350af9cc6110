use crate::core::error::AishError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub mod base_client;
pub mod factory;
pub mod openai;
pub mod openai_compatible;

/// Who produced a message in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    System,
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::System => "system",
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Speaker,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::Assistant,
            content: content.into(),
        }
    }
}

/// One fully assembled call to the completion provider.
/// Built fresh per invocation, never persisted.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub stream: bool,
}

pub type FragmentStream = BoxStream<'static, Result<String, AishError>>;

/// Boundary to the remote model provider. The only component allowed
/// network I/O; performs no retries of its own.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AishError>;

    /// Finite, non-restartable fragment stream. A second pass requires a
    /// new call.
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<FragmentStream, AishError>;
}

/// Extract a bare command or code from a model reply that may carry
/// fences, inline backticks or prose around it.
pub fn extract_command(content: &str) -> String {
    let content = content.trim();

    if content.is_empty() {
        return String::new();
    }

    if let Some(start_idx) = content.find("```") {
        let after_start = &content[start_idx + 3..];
        let end_idx = after_start.find("```").map(|i| i + start_idx + 3);

        let code_block = if let Some(end_idx) = end_idx {
            &content[start_idx + 3..end_idx]
        } else {
            &content[start_idx + 3..]
        };

        // Drop a language specifier line if present
        if let Some(first_newline) = code_block.find('\n') {
            return code_block[first_newline + 1..].trim().to_string();
        }
        return code_block.trim().to_string();
    }

    if let Some(start) = content.find('`') {
        if let Some(end) = content[start + 1..].find('`').map(|i| i + start + 1) {
            return content[start + 1..end].trim().to_string();
        }
    }

    // Fallback: first non-empty line
    content
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_command() {
        assert_eq!(extract_command("ls -la"), "ls -la");
    }

    #[test]
    fn extracts_fenced_command_with_language() {
        assert_eq!(extract_command("```bash\nls -la\n```"), "ls -la");
    }

    #[test]
    fn extracts_inline_backticks() {
        assert_eq!(extract_command("Run `df -h` to check."), "df -h");
    }

    #[test]
    fn falls_back_to_first_line() {
        assert_eq!(extract_command("du -sh *\nsecond line"), "du -sh *");
    }

    #[test]
    fn empty_reply_gives_empty_command() {
        assert_eq!(extract_command("   "), "");
    }

    #[test]
    fn speaker_serializes_lowercase() {
        let msg = Message::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
