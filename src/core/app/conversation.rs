use tracing::debug;

use crate::api::{ChatOptions, ChatRequest};
use crate::core::app::session::SessionContext;
use crate::core::app::ui_state::{ToastKind, UiState};
use crate::core::catalog::ModelCatalog;
use crate::core::config::Settings;
use crate::core::message::Message;
use crate::core::transcript::Transcript;
use crate::core::usage::UsageSnapshot;

/// Appended in place of (or after) a reply when a generation fails.
pub const GENERATION_FAILED_FALLBACK: &str = "Sorry, I encountered an error. Please try again.";

/// Borrow of everything a conversation event touches: the generation slot,
/// the transcript, and the UI projections. Pure state transitions — all
/// I/O stays in the event loop.
pub struct ConversationController<'a> {
    pub session: &'a mut SessionContext,
    pub transcript: &'a mut Transcript,
    pub ui: &'a mut UiState,
    pub catalog: &'a ModelCatalog,
    pub settings: &'a Settings,
}

impl ConversationController<'_> {
    fn request_options(&self) -> ChatOptions {
        ChatOptions {
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Appends the user turn plus the empty in-flight reply, and returns
    /// the request to issue along with the reply's transcript index.
    pub fn begin_user_turn(&mut self, content: String) -> Option<(ChatRequest, usize)> {
        let model = self.catalog.selected()?.id.clone();
        self.transcript.push(Message::user(content.clone()));
        let reply_index = self.transcript.begin_reply(Some(model.clone()));
        if self.settings.auto_scroll {
            self.ui.auto_scroll = true;
        }
        let request = ChatRequest::new(content, model, self.request_options());
        Some((request, reply_index))
    }

    /// Regeneration re-sends the user message preceding `assistant_index`:
    /// the transcript is truncated from the assistant reply to the end, and
    /// no duplicate user turn is appended. A reply with no preceding user
    /// message is a no-op.
    pub fn begin_regeneration(&mut self, assistant_index: usize) -> Option<(ChatRequest, usize)> {
        let source = self.transcript.regenerate_source(assistant_index)?;
        let content = self.transcript.get(source)?.content.clone();
        let model = self.catalog.selected()?.id.clone();

        self.transcript.truncate_from(assistant_index);
        let reply_index = self.transcript.begin_reply(Some(model.clone()));
        if self.settings.auto_scroll {
            self.ui.auto_scroll = true;
        }
        let request = ChatRequest::new(content, model, self.request_options());
        Some((request, reply_index))
    }

    pub fn apply_chunk(&mut self, delta: &str) {
        if let Some(index) = self.session.active_reply {
            self.transcript.append_delta(index, delta);
            if self.ui.auto_scroll {
                self.ui.scroll_to_bottom();
            }
        }
    }

    /// The gateway's completion record: usage feeds the meter and the
    /// reply's metadata, a warning surfaces as a toast.
    pub fn apply_completion(&mut self, usage: Option<UsageSnapshot>, warning: Option<String>) {
        if let Some(usage) = usage {
            self.ui.usage = Some(usage);
            if let Some(index) = self.session.active_reply {
                self.transcript.attach_usage(index, usage);
            }
        }
        if let Some(warning) = warning {
            self.ui.show_toast(ToastKind::Warning, warning);
        }
    }

    /// A failed generation surfaces a toast and leaves a fallback note in
    /// the transcript: in the reply itself when nothing streamed yet,
    /// appended after it when partial content already arrived.
    pub fn apply_error(&mut self, error: &str) {
        debug!(error, "generation failed");
        let reply_is_empty = self
            .session
            .active_reply
            .and_then(|index| self.transcript.get(index))
            .is_some_and(|m| m.content.is_empty());

        if reply_is_empty {
            if let Some(index) = self.session.active_reply {
                self.transcript.append_delta(index, GENERATION_FAILED_FALLBACK);
            }
        } else {
            self.transcript
                .push(Message::assistant(GENERATION_FAILED_FALLBACK, None));
        }
        self.ui.show_toast(ToastKind::Error, error.to_string());
    }

    /// End of stream, on every exit path: the reply freezes (copy and
    /// regenerate become available) and the generation slot frees.
    pub fn finalize_reply(&mut self) {
        if let Some(index) = self.session.active_reply {
            self.transcript.finalize(index, None);
        }
        self.session.end_generation();
        if self.ui.auto_scroll {
            self.ui.scroll_to_bottom();
        }
    }

    /// The new-chat reset. An in-flight generation is abandoned along with
    /// the transcript it was writing into.
    pub fn clear(&mut self) {
        if self.session.is_generating {
            self.session.abandon_generation();
        }
        self.transcript.clear();
        self.ui.scroll_offset = 0;
        self.ui.record_transcript_metrics(0, self.ui.transcript_view_height);
    }
}

#[cfg(test)]
mod tests {
    use crate::core::app::ui_state::ToastKind;
    use crate::core::chat_stream::StreamMessage;
    use crate::core::message::Role;
    use crate::utils::test_utils::{connected_app_without_selection, connected_test_app};

    fn send(app: &mut crate::core::app::App, text: &str) -> usize {
        let (request, reply_index) = app
            .conversation()
            .begin_user_turn(text.to_string())
            .expect("model selected");
        assert_eq!(request.message, text);
        let (_token, _id) = app.session.begin_generation(reply_index);
        reply_index
    }

    fn drive(app: &mut crate::core::app::App, messages: Vec<StreamMessage>) {
        for message in messages {
            let mut conversation = app.conversation();
            match message {
                StreamMessage::Chunk(chunk) => conversation.apply_chunk(&chunk),
                StreamMessage::Completed { usage, warning } => {
                    conversation.apply_completion(usage, warning)
                }
                StreamMessage::Error(error) => conversation.apply_error(&error),
                StreamMessage::End => conversation.finalize_reply(),
            }
        }
    }

    #[test]
    fn user_turn_appends_message_and_reply() {
        let mut app = connected_test_app();
        let reply_index = send(&mut app, "Hi");

        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.get(0).unwrap().role, Role::User);
        assert!(app.transcript.get(reply_index).unwrap().is_streaming);
        assert!(app.session.is_generating);
    }

    #[test]
    fn stream_deltas_assemble_and_finalize_once() {
        let mut app = connected_test_app();
        let reply_index = send(&mut app, "Hi");
        drive(
            &mut app,
            vec![
                StreamMessage::Chunk("Hel".to_string()),
                StreamMessage::Chunk("lo".to_string()),
                StreamMessage::Completed {
                    usage: None,
                    warning: None,
                },
                StreamMessage::End,
            ],
        );

        let reply = app.transcript.get(reply_index).unwrap();
        assert_eq!(reply.content, "Hello");
        assert!(!reply.is_streaming);
        assert!(!app.session.is_generating);
        assert_eq!(app.transcript.streaming_index(), None);
    }

    #[test]
    fn completion_usage_feeds_meter_and_reply() {
        let mut app = connected_test_app();
        let reply_index = send(&mut app, "Hi");
        let usage = crate::core::usage::UsageSnapshot {
            tokens_used: 120,
            limit: 10_000,
            ..Default::default()
        };
        drive(
            &mut app,
            vec![
                StreamMessage::Chunk("ok".to_string()),
                StreamMessage::Completed {
                    usage: Some(usage),
                    warning: Some("slow model".to_string()),
                },
                StreamMessage::End,
            ],
        );

        assert_eq!(app.ui.usage, Some(usage));
        assert_eq!(app.transcript.get(reply_index).unwrap().usage, Some(usage));
        let toast = app.ui.toast.as_ref().unwrap();
        assert_eq!(toast.kind, ToastKind::Warning);
        assert_eq!(toast.text, "slow model");
    }

    #[test]
    fn error_before_any_content_fills_the_reply_with_the_fallback() {
        let mut app = connected_test_app();
        let reply_index = send(&mut app, "Hi");
        drive(
            &mut app,
            vec![
                StreamMessage::Error("HTTP 500".to_string()),
                StreamMessage::End,
            ],
        );

        let reply = app.transcript.get(reply_index).unwrap();
        assert_eq!(reply.content, super::GENERATION_FAILED_FALLBACK);
        assert!(!reply.is_streaming);
        assert!(!app.session.is_generating);
        assert_eq!(app.ui.toast.as_ref().unwrap().kind, ToastKind::Error);
    }

    #[test]
    fn error_after_partial_content_appends_a_separate_fallback() {
        let mut app = connected_test_app();
        let reply_index = send(&mut app, "Hi");
        drive(
            &mut app,
            vec![
                StreamMessage::Chunk("partial".to_string()),
                StreamMessage::Error("connection reset".to_string()),
                StreamMessage::End,
            ],
        );

        assert_eq!(app.transcript.get(reply_index).unwrap().content, "partial");
        assert_eq!(
            app.transcript.get(reply_index + 1).unwrap().content,
            super::GENERATION_FAILED_FALLBACK
        );
        assert_eq!(app.transcript.streaming_index(), None);
    }

    #[test]
    fn regeneration_truncates_and_resends_the_user_message() {
        let mut app = connected_test_app();
        let reply_index = send(&mut app, "Hi");
        drive(
            &mut app,
            vec![StreamMessage::Chunk("Hello".to_string()), StreamMessage::End],
        );

        let (request, new_reply) = app
            .conversation()
            .begin_regeneration(reply_index)
            .expect("regeneration target");
        assert_eq!(request.message, "Hi");
        // One user turn, one fresh in-flight reply; no duplicate user turn.
        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.get(0).unwrap().role, Role::User);
        assert!(app.transcript.get(new_reply).unwrap().is_streaming);

        app.session.begin_generation(new_reply);
        drive(
            &mut app,
            vec![StreamMessage::Chunk("Howdy".to_string()), StreamMessage::End],
        );
        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.get(1).unwrap().content, "Howdy");
    }

    #[test]
    fn regeneration_without_preceding_user_message_is_a_no_op() {
        let mut app = connected_test_app();
        app.transcript
            .push(crate::core::message::Message::assistant("greeting", None));
        assert!(app.conversation().begin_regeneration(0).is_none());
        assert_eq!(app.transcript.len(), 1);
    }

    #[test]
    fn clear_abandons_an_in_flight_generation() {
        let mut app = connected_test_app();
        send(&mut app, "Hi");
        let stale_id = app.session.current_stream_id;

        app.conversation().clear();
        assert!(app.transcript.is_empty());
        assert!(!app.session.is_generating);
        assert!(!app.session.is_current_stream(stale_id));
    }

    #[test]
    fn send_gate_requires_model_connection_text_and_idle_slot() {
        let mut app = connected_test_app();
        app.ui.textarea.insert_str("hello");
        assert!(app.can_send());

        // No model selected: disabled even while connected with text.
        let mut no_model = connected_app_without_selection();
        no_model.ui.textarea.insert_str("hello");
        assert!(!no_model.can_send());
        no_model.catalog.select("models/gemini-1.5-flash");
        assert!(no_model.can_send());

        // Whitespace-only composer is as good as empty.
        let mut blank = connected_test_app();
        blank.ui.textarea.insert_str("   ");
        assert!(!blank.can_send());

        // A generation in flight blocks the next one.
        send(&mut app, "hello");
        app.ui.textarea.insert_str("next");
        assert!(!app.can_send());
    }
}
