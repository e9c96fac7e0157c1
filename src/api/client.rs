use std::fmt;
use std::time::Duration;

use crate::api::{
    ChatRequest, ChatResponseBody, HealthResponse, ModelEntry, ModelsResponse, UsageResponse,
};

/// Per-request deadline for health probes so a hung gateway reads as
/// disconnected instead of blocking the poll loop.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum ApiError {
    /// The request never produced a usable response (connect, I/O, decode).
    Transport(reqwest::Error),
    /// The gateway answered with a non-success status and no structured error.
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The gateway reported an error in the response body.
    Server(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(source) => write!(f, "request failed: {source}"),
            ApiError::Status { status, body } => {
                let body = body.trim();
                if body.is_empty() {
                    write!(f, "HTTP {status}")
                } else {
                    write!(f, "HTTP {status}: {body}")
                }
            }
            ApiError::Server(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Transport(source) => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(source: reqwest::Error) -> Self {
        ApiError::Transport(source)
    }
}

/// A successful `POST /api/chat` reply.
pub struct ChatReply {
    pub content: String,
    pub usage: Option<UsageResponse>,
    pub warning: Option<String>,
}

/// Stateless HTTP client for the gateway. Retries and connection-state
/// tracking are the caller's concern.
#[derive(Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Health is a yes/no question: any transport failure, timeout, non-ok
    /// status, or unexpected body reads as disconnected.
    pub async fn check_health(&self) -> bool {
        let response = self
            .client
            .get(self.endpoint("api/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                matches!(response.json::<HealthResponse>().await, Ok(health) if health.status == "ok")
            }
            _ => false,
        }
    }

    pub async fn list_models(&self) -> Result<Vec<ModelEntry>, ApiError> {
        let response = self.client.get(self.endpoint("api/models")).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response.json::<ModelsResponse>().await?.models)
    }

    pub async fn fetch_usage(&self) -> Result<UsageResponse, ApiError> {
        let response = self.client.get(self.endpoint("api/usage")).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response.json::<UsageResponse>().await?)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let response = self
            .client
            .post(self.endpoint("api/chat"))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // A server-reported error field takes precedence over the bare
        // HTTP status, mirroring the gateway contract.
        let body: ChatResponseBody = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(ApiError::Status { status, body: text }),
            Err(_) => return Err(ApiError::Server("malformed chat response".to_string())),
        };
        if let Some(error) = body.error {
            return Err(ApiError::Server(error));
        }
        if !status.is_success() {
            return Err(ApiError::Status { status, body: text });
        }

        Ok(ChatReply {
            content: body.response.unwrap_or_default(),
            usage: body.usage,
            warning: body.warning,
        })
    }

    /// Opens the chunked stream body. The returned response is handed to the
    /// ingestion engine; framing is newline-delimited JSON (see
    /// [`crate::core::chat_stream`]).
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .post(self.endpoint("api/stream"))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response)
    }
}

/// Trailing slashes on the configured base URL would otherwise produce
/// double slashes in every endpoint path.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatOptions;

    fn test_client(base_url: &str) -> GatewayClient {
        GatewayClient::new(reqwest::Client::new(), base_url)
    }

    #[test]
    fn endpoints_join_cleanly() {
        let client = test_client("http://localhost:8000/");
        assert_eq!(client.endpoint("api/health"), "http://localhost:8000/api/health");
        assert_eq!(client.endpoint("/api/models"), "http://localhost:8000/api/models");

        let client = test_client("http://localhost:8000///");
        assert_eq!(client.endpoint("api/usage"), "http://localhost:8000/api/usage");
    }

    #[test]
    fn api_error_display_is_compact() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP 500 Internal Server Error");

        let err = ApiError::Server("quota exhausted".to_string());
        assert_eq!(err.to_string(), "quota exhausted");
    }

    #[test]
    fn chat_request_round_trips_through_json_body() {
        let request = ChatRequest::new(
            "hello".to_string(),
            "models/gemini-1.5-pro".to_string(),
            ChatOptions {
                temperature: 0.2,
                max_tokens: 1024,
            },
        )
        .streaming();
        let body = serde_json::to_string(&request).unwrap();
        assert!(body.contains(r#""format":"json""#));
        assert!(body.contains(r#""model":"models/gemini-1.5-pro""#));
    }
}
