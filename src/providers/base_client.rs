use crate::core::error::{AishError, ProviderErrorKind};
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::collections::HashMap;

fn kind_for_status(status: StatusCode) -> ProviderErrorKind {
    if status.as_u16() == 429 || status.is_server_error() {
        ProviderErrorKind::Transient
    } else {
        ProviderErrorKind::Fatal
    }
}

/// Shared HTTP plumbing for OpenAI-shaped chat-completion endpoints.
pub struct BaseApiClient {
    endpoint: String,
    api_key: String,
    extra_headers: HashMap<String, String>,
}

impl BaseApiClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        extra_headers: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            endpoint,
            api_key,
            extra_headers: extra_headers.unwrap_or_default(),
        }
    }

    pub async fn send_request<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Response, AishError> {
        let client = Client::builder().build()?;
        let url = format!("{}/{}", self.endpoint, path);

        let mut request = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");

        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }

        let response = request.json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AishError::provider(
                kind_for_status(status),
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        Ok(response)
    }

    /// POST the payload and parse the SSE response into a stream of text
    /// fragments. Ends at the `[DONE]` marker.
    pub async fn send_stream_request<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<BoxStream<'static, Result<String, AishError>>, AishError> {
        let response = self.send_request(path, payload).await?;
        let stream = response.bytes_stream();

        let s = stream
            .map(|item| {
                item.map_err(AishError::from).and_then(|chunk| {
                    String::from_utf8(chunk.to_vec()).map_err(|e| {
                        AishError::Serialization(format!("Invalid UTF-8 in stream: {}", e))
                    })
                })
            })
            .filter_map(|res| async move {
                match res {
                    Ok(s) => match parse_sse_chunk(&s) {
                        Some(content) if !content.is_empty() => Some(Ok(content)),
                        _ => None,
                    },
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(s.boxed())
    }
}

/// Pull delta content out of one network chunk worth of `data:` lines.
fn parse_sse_chunk(chunk: &str) -> Option<String> {
    let mut content = String::new();
    for line in chunk.lines() {
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if data == "[DONE]" {
                break;
            }
            if let Ok(parsed) = serde_json::from_str::<StreamResponse>(data) {
                if let Some(choice) = parsed.choices.first() {
                    if let Some(c) = &choice.delta.content {
                        content.push_str(c);
                    }
                }
            }
        }
    }
    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

#[derive(serde::Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(serde::Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(serde::Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delta_lines() {
        let chunk = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n";
        assert_eq!(parse_sse_chunk(chunk).as_deref(), Some("Hello"));
    }

    #[test]
    fn stops_at_done_marker() {
        let chunk = "data: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n";
        assert_eq!(parse_sse_chunk(chunk), None);
    }

    #[test]
    fn rate_limit_is_transient_and_auth_fatal() {
        assert_eq!(
            kind_for_status(StatusCode::TOO_MANY_REQUESTS),
            ProviderErrorKind::Transient
        );
        assert_eq!(
            kind_for_status(StatusCode::UNAUTHORIZED),
            ProviderErrorKind::Fatal
        );
        assert_eq!(
            kind_for_status(StatusCode::BAD_GATEWAY),
            ProviderErrorKind::Transient
        );
    }
}
