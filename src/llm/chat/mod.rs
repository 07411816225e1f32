pub mod groq;

use async_trait::async_trait;
use futures::Stream;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;

use crate::llm::LlmConfig;
use crate::models::ChatMessage;
pub use groq::GroqChatClient;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Pull-based sequence of text deltas from the provider. Each item is one
/// incremental fragment of the reply; an `Err` item is a mid-stream failure
/// and is always the last item produced.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, BoxError>> + Send>>;

/// A chat-completion provider consumed in incremental delivery mode.
///
/// `stream_completion` performs the request setup; an `Err` return means no
/// byte has been streamed yet and the caller can still answer with a
/// structured error.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn stream_completion(&self, messages: &[ChatMessage]) -> Result<DeltaStream, BoxError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, BoxError> {
    let client = GroqChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
