use std::io;
use thiserror::Error;

/// Whether a provider failure is worth retrying by the caller.
///
/// The pipeline itself never retries; it only classifies so the caller
/// can decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Rate limits, timeouts, connection failures, 5xx responses.
    Transient,
    /// Authentication and request-validation failures. Retrying cannot help.
    Fatal,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderErrorKind::Transient => write!(f, "transient"),
            ProviderErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Unified error type for the aish application
#[derive(Error, Debug)]
pub enum AishError {
    /// Role lookup failed before any network or storage access
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Named session does not exist and creation was not requested
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A transcript no longer alternates user/assistant
    #[error("Invalid transcript state: {0}")]
    InvalidTranscript(String),

    /// Completion provider failure, classified transient or fatal
    #[error("Provider error ({kind}): {message}")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
    },

    /// Cache storage fault; the pipeline degrades these to cache misses
    #[error("Cache storage error: {0}")]
    CacheStorage(String),

    /// Session storage fault; fails the request, history must not be dropped
    #[error("Session storage error: {0}")]
    SessionStorage(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    /// Command execution errors
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AishError {
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        AishError::Provider {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AishError::Provider {
                kind: ProviderErrorKind::Transient,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for AishError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AishError::provider(
                ProviderErrorKind::Transient,
                format!("Request timed out: {}", err),
            )
        } else if err.is_connect() {
            AishError::provider(
                ProviderErrorKind::Transient,
                format!("Connection failed: {}", err),
            )
        } else if err.is_status() {
            let kind = match err.status() {
                Some(status) if status.as_u16() == 429 || status.is_server_error() => {
                    ProviderErrorKind::Transient
                }
                _ => ProviderErrorKind::Fatal,
            };
            AishError::provider(kind, format!("API returned error status: {}", err))
        } else {
            AishError::provider(
                ProviderErrorKind::Transient,
                format!("Request failed: {}", err),
            )
        }
    }
}

impl From<serde_json::Error> for AishError {
    fn from(err: serde_json::Error) -> Self {
        AishError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for AishError {
    fn from(err: serde_yml::Error) -> Self {
        AishError::Serialization(format!("YAML error: {}", err))
    }
}
