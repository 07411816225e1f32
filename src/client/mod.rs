pub mod conversation;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;
use log::{error, info};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::llm::chat::BoxError;
use crate::models::ChatMessage;
pub use conversation::Conversation;

const GREETING: &str = "Hi! I'm the support agent, how can I assist you today?";

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay answered with a non-success status; the body is not read.
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Transport-level failure while reading the streamed body.
    #[error("stream failed: {0}")]
    Stream(#[source] BoxError),
}

/// Transport seam between the chat panel and the relay endpoint, so the
/// send cycle can be exercised against a scripted collaborator.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ByteStream, RelayError>;
}

/// `Relay` over HTTP: posts the conversation as JSON and hands back the raw
/// streaming response body.
pub struct HttpRelay {
    http: reqwest::Client,
    url: String,
}

impl HttpRelay {
    pub fn new(url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into() }
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ByteStream, RelayError> {
        let resp = self.http.post(&self.url).json(&messages).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }
        Ok(Box::pin(resp.bytes_stream().map(|r| r.map_err(|e| Box::new(e) as BoxError))))
    }
}

/// Incremental UTF-8 decoder: emits the longest valid prefix of the bytes
/// seen so far and carries an incomplete trailing sequence into the next
/// chunk, so reassembly is independent of transport fragmentation.
#[derive(Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Truly invalid bytes: substitute and keep going.
                        Some(len) => {
                            out.push('\u{FFFD}');
                            self.pending.drain(..valid + len);
                        }
                        // Incomplete trailing sequence: wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Clears the in-flight flag on every exit path of a send cycle.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The streaming client: owns the displayed conversation and conducts one
/// request/response cycle per send. Single-flight per panel instance.
pub struct ChatPanel {
    relay: Arc<dyn Relay>,
    conversation: Mutex<Conversation>,
    loading: AtomicBool,
}

impl ChatPanel {
    pub fn new(relay: Arc<dyn Relay>) -> Self {
        Self {
            relay,
            conversation: Mutex::new(Conversation::seeded(GREETING)),
            loading: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Conversation {
        self.conversation.lock().await.clone()
    }

    pub async fn send_message(&self, input: &str) {
        self.send_message_with(input, |_| ()).await;
    }

    /// One send cycle. `on_delta` fires for every piece of newly displayed
    /// assistant text, in arrival order, including a final error message
    /// when the cycle fails.
    pub async fn send_message_with<F>(&self, input: &str, mut on_delta: F)
    where
        F: FnMut(&str),
    {
        let text = input.trim();
        if text.is_empty() {
            return;
        }
        // Single-flight: a second send while one is in flight is a no-op.
        if self.loading.swap(true, Ordering::SeqCst) {
            info!("Send ignored: a request is already in flight");
            return;
        }
        let _loading = LoadingGuard(&self.loading);

        // Optimistic update; the user message is never rolled back.
        {
            let mut conv = self.conversation.lock().await;
            *conv = conv.append_message(ChatMessage::user(text));
        }
        let outbound = self.conversation.lock().await.messages().to_vec();

        if let Err(e) = self.run_exchange(&outbound, &mut on_delta).await {
            error!("Chat request failed: {}", e);
            let message = format!("Error: {}. Please try again.", e);
            on_delta(&message);
            let mut conv = self.conversation.lock().await;
            *conv = conv.append_message(ChatMessage::assistant(message));
        }
    }

    async fn run_exchange<F>(&self, outbound: &[ChatMessage], on_delta: &mut F) -> Result<(), RelayError>
    where
        F: FnMut(&str),
    {
        let mut stream = self.relay.send(outbound).await?;

        // Placeholder appended only once the response is open; its content
        // grows by concatenation for the rest of the cycle.
        {
            let mut conv = self.conversation.lock().await;
            *conv = conv.append_message(ChatMessage::assistant(String::new()));
        }

        let mut decoder = Utf8Carry::default();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(RelayError::Stream)?;
            let text = decoder.push(&chunk);
            if text.is_empty() {
                continue;
            }
            on_delta(&text);
            let mut conv = self.conversation.lock().await;
            *conv = conv.append_to_last(&text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    enum Script {
        Chunks(Vec<Vec<u8>>),
        SlowChunks(Vec<Vec<u8>>),
        Status(u16),
        MidStreamFailure(Vec<Vec<u8>>),
    }

    struct MockRelay {
        script: Script,
        calls: AtomicUsize,
        seen: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl MockRelay {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
                seen: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn chunks(parts: &[&str]) -> Arc<Self> {
            Self::new(Script::Chunks(parts.iter().map(|p| p.as_bytes().to_vec()).collect()))
        }
    }

    fn ok_stream(chunks: &[Vec<u8>]) -> ByteStream {
        let items: Vec<Result<Bytes, BoxError>> =
            chunks.iter().map(|c| Ok(Bytes::from(c.clone()))).collect();
        Box::pin(futures::stream::iter(items))
    }

    #[async_trait]
    impl Relay for MockRelay {
        async fn send(&self, messages: &[ChatMessage]) -> Result<ByteStream, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(messages.to_vec());

            match &self.script {
                Script::Chunks(chunks) => Ok(ok_stream(chunks)),
                Script::SlowChunks(chunks) => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(ok_stream(chunks))
                }
                Script::Status(code) => Err(RelayError::Status(*code)),
                Script::MidStreamFailure(chunks) => {
                    let mut items: Vec<Result<Bytes, BoxError>> =
                        chunks.iter().map(|c| Ok(Bytes::from(c.clone()))).collect();
                    items.push(Err("connection reset".to_string().into()));
                    Ok(Box::pin(futures::stream::iter(items)))
                }
            }
        }
    }

    #[tokio::test]
    async fn empty_or_whitespace_input_sends_nothing() {
        let relay = MockRelay::chunks(&["never"]);
        let panel = ChatPanel::new(relay.clone());

        panel.send_message("").await;
        panel.send_message("   \n\t").await;

        assert_eq!(relay.calls.load(Ordering::SeqCst), 0);
        assert_eq!(panel.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn streamed_reply_lands_on_the_last_message_in_order() {
        let relay = MockRelay::chunks(&["A binary ", "search tree..."]);
        let panel = ChatPanel::new(relay.clone());

        let mut deltas = Vec::new();
        panel
            .send_message_with("What is a binary search tree?", |d| deltas.push(d.to_string()))
            .await;

        assert_eq!(deltas, vec!["A binary ", "search tree..."]);

        let conv = panel.snapshot().await;
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[1], ChatMessage::user("What is a binary search tree?"));
        assert_eq!(conv.last().unwrap(), &ChatMessage::assistant("A binary search tree..."));

        // The request body is the displayed history plus the new user
        // message; the greeting is included, the system preamble is not.
        let seen = relay.seen.lock().unwrap();
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[0][0].role, Role::Assistant);
        assert_eq!(seen[0][1], ChatMessage::user("What is a binary search tree?"));
        assert!(!panel.is_loading());
    }

    #[tokio::test]
    async fn overlapping_sends_issue_exactly_one_request() {
        let relay = MockRelay::new(Script::SlowChunks(vec![b"reply".to_vec()]));
        let panel = ChatPanel::new(relay.clone());

        tokio::join!(panel.send_message("first"), panel.send_message("second"));

        assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
        let conv = panel.snapshot().await;
        assert_eq!(conv.messages()[1], ChatMessage::user("first"));
        assert_eq!(conv.last().unwrap(), &ChatMessage::assistant("reply"));
    }

    #[tokio::test]
    async fn http_failure_becomes_a_visible_error_message() {
        let relay = MockRelay::new(Script::Status(500));
        let panel = ChatPanel::new(relay.clone());

        panel.send_message("hello").await;

        let conv = panel.snapshot().await;
        // Greeting, intact optimistic user message, exactly one error reply.
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[1], ChatMessage::user("hello"));
        let last = conv.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("Error"));
        assert!(last.content.contains("500"));
        assert!(!panel.is_loading());
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_the_partial_reply() {
        let relay = MockRelay::new(Script::MidStreamFailure(vec![b"partial ".to_vec()]));
        let panel = ChatPanel::new(relay.clone());

        panel.send_message("hello").await;

        let conv = panel.snapshot().await;
        assert_eq!(conv.len(), 4);
        assert_eq!(conv.messages()[2], ChatMessage::assistant("partial "));
        assert!(conv.last().unwrap().content.contains("Error"));
    }

    #[tokio::test]
    async fn multibyte_text_split_across_chunks_is_reassembled() {
        let relay = MockRelay::new(Script::Chunks(vec![
            b"h\xC3".to_vec(),
            b"\xA9llo".to_vec(),
        ]));
        let panel = ChatPanel::new(relay);

        panel.send_message("hi").await;

        assert_eq!(panel.snapshot().await.last().unwrap().content, "héllo");
    }

    #[test]
    fn utf8_carry_substitutes_invalid_bytes() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.push(b"ok \xFF then"), "ok \u{FFFD} then");
        assert_eq!(carry.push(b""), "");
    }
}
