//! Streaming ingestion: turns the gateway's chunked response body into an
//! ordered sequence of messages applied to exactly one in-flight assistant
//! reply.
//!
//! Framing is newline-delimited JSON. Bytes are buffered across reads, so
//! a record — or a multi-byte UTF-8 sequence inside one — split at a chunk
//! boundary is reassembled before it is decoded. A line that fails to
//! parse is forwarded verbatim as literal content; one bad record never
//! aborts the stream. `End` is always the final message for a stream id,
//! on every exit path, so finalization runs exactly once.

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ChatRequest, GatewayClient, StreamRecord};
use crate::core::usage::UsageSnapshot;

#[derive(Clone, Debug)]
pub enum StreamMessage {
    /// A content delta to append to the in-flight reply.
    Chunk(String),
    /// The gateway's completion record, possibly carrying usage and a
    /// warning to surface.
    Completed {
        usage: Option<UsageSnapshot>,
        warning: Option<String>,
    },
    /// The request failed before or while the body was streaming.
    Error(String),
    /// No more data will arrive for this stream id.
    End,
}

pub struct StreamParams {
    pub client: GatewayClient,
    pub request: ChatRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

/// Spawns stream tasks and fans their messages into one channel the event
/// loop drains. Messages are tagged with a stream id so anything from a
/// superseded stream can be dropped on arrival.
#[derive(Clone)]
pub struct StreamDispatcher {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl StreamDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<(StreamMessage, u64)>) -> Self {
        Self { tx }
    }

    pub fn spawn(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = run_stream(&client, &request, &tx, stream_id) => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }
}

#[cfg(test)]
impl StreamDispatcher {
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_stream(
    client: &GatewayClient,
    request: &ChatRequest,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    let response = match client.stream_chat(request).await {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send((StreamMessage::Error(e.to_string()), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            return;
        }
    };

    let mut assembler = LineAssembler::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                assembler.feed(&bytes, |line| process_stream_line(line, tx, stream_id));
            }
            Err(e) => {
                let _ = tx.send((StreamMessage::Error(e.to_string()), stream_id));
                break;
            }
        }
    }

    let _ = tx.send((StreamMessage::End, stream_id));
}

/// Splits an incoming byte stream into complete lines. The residual
/// fragment after the last newline — possibly ending mid-way through a
/// multi-byte UTF-8 sequence — is carried to the next feed intact.
struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn feed(&mut self, bytes: &[u8], mut on_line: impl FnMut(&str)) {
        self.buffer.extend_from_slice(bytes);
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line = String::from_utf8_lossy(&self.buffer[..newline_pos]).into_owned();
            self.buffer.drain(..=newline_pos);
            on_line(&line);
        }
    }
}

/// One complete line. Blank lines are skipped. A well-formed record maps
/// to a delta or the completion marker; a line that is not JSON at all is
/// forwarded verbatim as literal content.
fn process_stream_line(
    line: &str,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    if line.trim().is_empty() {
        return;
    }

    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => {
            let Ok(record) = serde_json::from_value::<StreamRecord>(value) else {
                // Valid JSON that isn't a stream record carries nothing to
                // render; skip it like the gateway's own client does.
                debug!(stream_id, "skipping non-record stream line");
                return;
            };
            if record.done {
                let _ = tx.send((
                    StreamMessage::Completed {
                        usage: record.usage.map(Into::into),
                        warning: record.warning,
                    },
                    stream_id,
                ));
            } else if let Some(chunk) = record.chunk {
                if !chunk.is_empty() {
                    let _ = tx.send((StreamMessage::Chunk(chunk), stream_id));
                }
            }
        }
        Err(_) => {
            let _ = tx.send((StreamMessage::Chunk(line.to_string()), stream_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<(StreamMessage, u64)>,
        mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ) {
        mpsc::unbounded_channel()
    }

    fn collect_chunks(rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>) -> String {
        let mut assembled = String::new();
        while let Ok((message, _)) = rx.try_recv() {
            match message {
                StreamMessage::Chunk(chunk) => assembled.push_str(&chunk),
                other => panic!("expected only chunks, got {other:?}"),
            }
        }
        assembled
    }

    #[test]
    fn deltas_arrive_in_order() {
        let (tx, mut rx) = channel();
        process_stream_line(r#"{"chunk":"Hel","done":false}"#, &tx, 1);
        process_stream_line(r#"{"chunk":"lo","done":false}"#, &tx, 1);
        assert_eq!(collect_chunks(&mut rx), "Hello");
    }

    #[test]
    fn malformed_lines_become_literal_content_in_arrival_order() {
        let (tx, mut rx) = channel();
        process_stream_line(r#"{"chunk":"A","done":false}"#, &tx, 1);
        process_stream_line("not json at all", &tx, 1);
        process_stream_line(r#"{"chunk":"B","done":false}"#, &tx, 1);
        assert_eq!(collect_chunks(&mut rx), "Anot json at allB");
    }

    #[test]
    fn completion_record_carries_usage_and_warning() {
        let (tx, mut rx) = channel();
        process_stream_line(
            r#"{"done":true,"usage":{"totalTokensUsed":12000,"limit":10000},"warning":"nearly out"}"#,
            &tx,
            7,
        );

        let (message, stream_id) = rx.try_recv().unwrap();
        assert_eq!(stream_id, 7);
        match message {
            StreamMessage::Completed { usage, warning } => {
                let usage = usage.unwrap();
                assert_eq!(usage.tokens_used, 12000);
                assert_eq!(usage.limit, 10000);
                assert_eq!(warning.as_deref(), Some("nearly out"));
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn blank_and_non_record_lines_are_skipped() {
        let (tx, mut rx) = channel();
        process_stream_line("", &tx, 1);
        process_stream_line("   ", &tx, 1);
        process_stream_line("42", &tx, 1);
        process_stream_line(r#"{"chunk":"","done":false}"#, &tx, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn assembler_reunites_utf8_split_at_chunk_boundary() {
        let mut assembler = LineAssembler::new();
        let mut lines: Vec<String> = Vec::new();

        // "héllo\n" with the two-byte 'é' split across reads.
        let bytes = "h\u{e9}llo\n".as_bytes();
        let (left, right) = bytes.split_at(2);
        assembler.feed(left, |line| lines.push(line.to_string()));
        assert!(lines.is_empty());
        assembler.feed(right, |line| lines.push(line.to_string()));
        assert_eq!(lines, ["h\u{e9}llo"]);
    }

    #[test]
    fn assembler_carries_partial_lines_across_feeds() {
        let mut assembler = LineAssembler::new();
        let mut lines: Vec<String> = Vec::new();

        assembler.feed(b"alpha\nbet", |line| lines.push(line.to_string()));
        assembler.feed(b"a\ngamma", |line| lines.push(line.to_string()));
        assert_eq!(lines, ["alpha", "beta"]);

        // The trailing fragment stays buffered until its newline arrives.
        assembler.feed(b"\n", |line| lines.push(line.to_string()));
        assert_eq!(lines, ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn dispatcher_tags_messages_with_stream_id() {
        let (tx, mut rx) = channel();
        let dispatcher = StreamDispatcher::new(tx);
        dispatcher.send_for_test(StreamMessage::Chunk("x".to_string()), 3);
        dispatcher.send_for_test(StreamMessage::End, 3);

        assert!(matches!(rx.try_recv(), Ok((StreamMessage::Chunk(_), 3))));
        assert!(matches!(rx.try_recv(), Ok((StreamMessage::End, 3))));
    }
}
