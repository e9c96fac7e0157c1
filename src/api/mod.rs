use serde::{Deserialize, Serialize};

pub mod client;

pub use client::{ApiError, ChatReply, GatewayClient};

/// Body of `GET /api/health`. Anything other than `status: "ok"` reads as
/// disconnected.
#[derive(Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of `GET /api/models`. A missing `models` array yields an empty
/// catalog rather than an error.
#[derive(Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

#[derive(Deserialize, Clone)]
pub struct ModelEntry {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "inputTokenLimit")]
    pub input_token_limit: Option<u64>,
}

/// Body of `GET /api/usage` and of the `usage` field on chat replies.
/// Absent fields default to zero/false.
#[derive(Deserialize, Default, Clone, Copy)]
pub struct UsageResponse {
    #[serde(default, rename = "totalTokensUsed")]
    pub total_tokens_used: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub remaining: u64,
    #[serde(default)]
    pub exceeded: bool,
}

#[derive(Serialize, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
}

impl ChatRequest {
    pub fn new(message: String, model: String, options: ChatOptions) -> Self {
        Self {
            message,
            model,
            options,
            format: None,
        }
    }

    /// The stream endpoint expects `format: "json"` to select
    /// newline-delimited JSON framing.
    pub fn streaming(mut self) -> Self {
        self.format = Some("json");
        self
    }
}

#[derive(Serialize, Clone, Copy)]
pub struct ChatOptions {
    pub temperature: f64,
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
}

/// Body of `POST /api/chat`.
#[derive(Deserialize)]
pub struct ChatResponseBody {
    pub response: Option<String>,
    pub usage: Option<UsageResponse>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

/// One newline-delimited record on the `POST /api/stream` body: either a
/// content delta (`chunk` with `done: false`) or the completion marker
/// (`done: true`, optionally carrying usage and a warning).
#[derive(Deserialize, Default)]
pub struct StreamRecord {
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub usage: Option<UsageResponse>,
    #[serde(default)]
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_response_tolerates_missing_array() {
        let parsed: ModelsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.models.is_empty());
    }

    #[test]
    fn usage_fields_default_to_zero() {
        let parsed: UsageResponse = serde_json::from_str(r#"{"limit": 10000}"#).unwrap();
        assert_eq!(parsed.total_tokens_used, 0);
        assert_eq!(parsed.limit, 10000);
        assert_eq!(parsed.remaining, 0);
        assert!(!parsed.exceeded);
    }

    #[test]
    fn chat_request_serializes_gateway_field_names() {
        let request = ChatRequest::new(
            "Hi".to_string(),
            "models/gemini-1.5-flash".to_string(),
            ChatOptions {
                temperature: 0.7,
                max_tokens: 4096,
            },
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["message"], "Hi");
        assert_eq!(value["options"]["maxTokens"], 4096);
        assert!(value.get("format").is_none());

        let value = serde_json::to_value(request.streaming()).unwrap();
        assert_eq!(value["format"], "json");
    }

    #[test]
    fn stream_record_parses_both_shapes() {
        let delta: StreamRecord = serde_json::from_str(r#"{"chunk":"Hel","done":false}"#).unwrap();
        assert_eq!(delta.chunk.as_deref(), Some("Hel"));
        assert!(!delta.done);

        let done: StreamRecord =
            serde_json::from_str(r#"{"done":true,"usage":{"totalTokensUsed":42},"warning":"w"}"#)
                .unwrap();
        assert!(done.done);
        assert_eq!(done.usage.unwrap().total_tokens_used, 42);
        assert_eq!(done.warning.as_deref(), Some("w"));
    }
}
