//! The ordered conversation log.
//!
//! Append-only, with two sanctioned exceptions: the new-chat reset clears
//! it, and regeneration truncates from a chosen assistant message to the
//! end. The rendering layer only ever sees `&[Message]`.

use crate::core::message::{Message, Role};
use crate::core::usage::UsageSnapshot;

#[derive(Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Read-only projection for rendering.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Index of the in-flight reply, if any. At most one message streams at
    /// a time.
    pub fn streaming_index(&self) -> Option<usize> {
        self.messages.iter().position(|m| m.is_streaming)
    }

    /// Appends an empty assistant reply in streaming state and returns its
    /// index.
    pub fn begin_reply(&mut self, model_id: Option<String>) -> usize {
        debug_assert!(self.streaming_index().is_none());
        self.push(Message::streaming_reply(model_id))
    }

    /// Appends a content delta to the in-flight reply. Finalized messages
    /// are immutable, so a stale delta lands nowhere.
    pub fn append_delta(&mut self, index: usize, delta: &str) {
        if let Some(message) = self.messages.get_mut(index) {
            if message.is_streaming {
                message.content.push_str(delta);
            }
        }
    }

    /// Usage is metadata, not content; it may land while the reply is
    /// still streaming.
    pub fn attach_usage(&mut self, index: usize, usage: UsageSnapshot) {
        if let Some(message) = self.messages.get_mut(index) {
            message.usage = Some(usage);
        }
    }

    pub fn finalize(&mut self, index: usize, usage: Option<UsageSnapshot>) {
        if let Some(message) = self.messages.get_mut(index) {
            message.is_streaming = false;
            if usage.is_some() {
                message.usage = usage;
            }
        }
    }

    /// Nearest user message strictly before `assistant_index`; the message
    /// whose content a regeneration re-sends.
    pub fn regenerate_source(&self, assistant_index: usize) -> Option<usize> {
        if !self
            .messages
            .get(assistant_index)
            .is_some_and(|m| m.role.is_assistant())
        {
            return None;
        }
        self.messages[..assistant_index]
            .iter()
            .rposition(|m| m.role.is_user())
    }

    pub fn truncate_from(&mut self, index: usize) {
        self.messages.truncate(index);
    }

    /// Index of the most recent finalized assistant reply, the target for
    /// copy and regenerate shortcuts.
    pub fn last_assistant(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|m| m.role.is_assistant() && !m.is_streaming)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.messages.iter().map(|m| m.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_turn_transcript() -> Transcript {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("Hi"));
        transcript.push(Message::assistant("Hello", None));
        transcript
    }

    #[test]
    fn deltas_only_land_on_streaming_messages() {
        let mut transcript = Transcript::new();
        let index = transcript.begin_reply(None);
        transcript.append_delta(index, "Hel");
        transcript.append_delta(index, "lo");
        assert_eq!(transcript.get(index).unwrap().content, "Hello");

        transcript.finalize(index, None);
        transcript.append_delta(index, " more");
        assert_eq!(transcript.get(index).unwrap().content, "Hello");
    }

    #[test]
    fn finalize_clears_streaming_and_attaches_usage() {
        let mut transcript = Transcript::new();
        let index = transcript.begin_reply(None);
        assert_eq!(transcript.streaming_index(), Some(index));

        let usage = UsageSnapshot {
            tokens_used: 12,
            limit: 100,
            ..UsageSnapshot::default()
        };
        transcript.finalize(index, Some(usage));
        assert_eq!(transcript.streaming_index(), None);
        assert_eq!(transcript.get(index).unwrap().usage, Some(usage));
    }

    #[test]
    fn regenerate_source_finds_preceding_user_message() {
        let transcript = two_turn_transcript();
        assert_eq!(transcript.regenerate_source(1), Some(0));
    }

    #[test]
    fn regenerate_source_without_preceding_user_is_none() {
        let mut transcript = Transcript::new();
        transcript.push(Message::assistant("greeting", None));
        assert_eq!(transcript.regenerate_source(0), None);
        // Out of range and non-assistant targets are no-ops too.
        assert_eq!(transcript.regenerate_source(7), None);
        let transcript = two_turn_transcript();
        assert_eq!(transcript.regenerate_source(0), None);
    }

    #[test]
    fn truncate_drops_the_reply_and_everything_after() {
        let mut transcript = two_turn_transcript();
        transcript.push(Message::user("And again"));
        transcript.truncate_from(1);
        assert_eq!(transcript.len(), 1);
        assert!(transcript.get(0).unwrap().role.is_user());
    }

    #[test]
    fn last_assistant_skips_in_flight_replies() {
        let mut transcript = two_turn_transcript();
        assert_eq!(transcript.last_assistant(), Some(1));
        transcript.begin_reply(None);
        assert_eq!(transcript.last_assistant(), Some(1));
    }
}
