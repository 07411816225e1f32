use crate::models::ChatMessage;

/// Displayed conversation state. Each update produces a new snapshot so the
/// reducer functions stay pure and testable without any rendering layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// A fresh conversation seeded with one assistant greeting.
    pub fn seeded(greeting: impl Into<String>) -> Self {
        Self { messages: vec![ChatMessage::assistant(greeting)] }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append_message(&self, message: ChatMessage) -> Self {
        let mut messages = self.messages.clone();
        messages.push(message);
        Self { messages }
    }

    /// Extends the content of the current last message by concatenation.
    /// Always targets whatever message is last at the time of the call, so
    /// in-flight appends stay correct across intervening snapshots.
    pub fn append_to_last(&self, delta: &str) -> Self {
        let mut messages = self.messages.clone();
        if let Some(last) = messages.last_mut() {
            last.content.push_str(delta);
        }
        Self { messages }
    }
}
