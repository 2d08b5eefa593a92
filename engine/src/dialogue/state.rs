//! Conversation history for one chat session

use crate::llm::Message;

/// Ordered turns exchanged with the model.
///
/// Starts with a single system turn and only ever grows; nothing is trimmed or
/// rewritten for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct DialogueState {
    messages: Vec<Message>,
}

impl DialogueState {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
