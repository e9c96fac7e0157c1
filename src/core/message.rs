use chrono::{DateTime, Local};

use crate::core::usage::UsageSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

/// One transcript entry. `content` mutates in place only while
/// `is_streaming` is set; finalization freezes it.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
    pub model_id: Option<String>,
    pub usage: Option<UsageSnapshot>,
    pub is_streaming: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Local::now(),
            model_id: None,
            usage: None,
            is_streaming: false,
        }
    }

    /// A finalized assistant message, e.g. a non-streamed reply or the
    /// fallback note appended after a failed generation.
    pub fn assistant(content: impl Into<String>, model_id: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Local::now(),
            model_id,
            usage: None,
            is_streaming: false,
        }
    }

    /// The in-flight assistant reply the ingestion engine appends into.
    pub fn streaming_reply(model_id: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            timestamp: Local::now(),
            model_id,
            usage: None,
            is_streaming: true,
        }
    }

    pub fn timestamp_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_streaming_state() {
        assert!(!Message::user("hi").is_streaming);
        assert!(!Message::assistant("hello", None).is_streaming);
        assert!(Message::streaming_reply(None).is_streaming);
    }

    #[test]
    fn streaming_reply_carries_model() {
        let msg = Message::streaming_reply(Some("models/gemini-1.5-pro".to_string()));
        assert_eq!(msg.model_id.as_deref(), Some("models/gemini-1.5-pro"));
        assert!(msg.content.is_empty());
    }
}
