use tokio_util::sync::CancellationToken;

use crate::api::GatewayClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
        }
    }
}

/// Connection and generation state for one run of the client.
///
/// At most one generation is in flight at a time; `is_generating` is
/// checked before a send starts and cleared unconditionally when the
/// stream ends, on every exit path.
pub struct SessionContext {
    pub client: GatewayClient,
    pub connection: ConnectionStatus,
    pub is_generating: bool,
    pub current_stream_id: u64,
    pub stream_cancel_token: Option<CancellationToken>,
    /// Transcript index of the reply the current generation writes into.
    pub active_reply: Option<usize>,
}

impl SessionContext {
    pub fn new(client: GatewayClient) -> Self {
        Self {
            client,
            connection: ConnectionStatus::Connecting,
            is_generating: false,
            current_stream_id: 0,
            stream_cancel_token: None,
            active_reply: None,
        }
    }

    /// Claims the generation slot and mints a fresh stream id, so messages
    /// from any earlier stream are dropped on arrival.
    pub fn begin_generation(&mut self, reply_index: usize) -> (CancellationToken, u64) {
        self.current_stream_id += 1;
        let token = CancellationToken::new();
        self.stream_cancel_token = Some(token.clone());
        self.is_generating = true;
        self.active_reply = Some(reply_index);
        (token, self.current_stream_id)
    }

    pub fn end_generation(&mut self) {
        self.is_generating = false;
        self.stream_cancel_token = None;
        self.active_reply = None;
    }

    /// Discards an in-flight generation without finalizing its reply — the
    /// new-chat reset throws the whole transcript away, reply included. The
    /// id bump makes any straggling stream messages stale.
    pub fn abandon_generation(&mut self) {
        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
        self.current_stream_id += 1;
        self.is_generating = false;
        self.active_reply = None;
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> SessionContext {
        SessionContext::new(GatewayClient::new(
            reqwest::Client::new(),
            "http://localhost:8000",
        ))
    }

    #[test]
    fn generation_claims_and_releases_the_slot() {
        let mut session = test_session();
        let (_token, id) = session.begin_generation(0);
        assert!(session.is_generating);
        assert!(session.is_current_stream(id));
        assert_eq!(session.active_reply, Some(0));

        session.end_generation();
        assert!(!session.is_generating);
        assert!(session.active_reply.is_none());
        assert!(session.is_current_stream(id));
    }

    #[test]
    fn abandon_makes_in_flight_stream_stale() {
        let mut session = test_session();
        let (token, id) = session.begin_generation(3);
        session.abandon_generation();
        assert!(token.is_cancelled());
        assert!(!session.is_current_stream(id));
        assert!(!session.is_generating);
    }
}
