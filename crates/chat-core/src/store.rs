//! Ordered message list for one session.
//!
//! Every transition is synchronous and total: unknown ids and repeated
//! calls are no-ops, never panics. Insertion order is conversation order.

use std::collections::HashSet;

use chat_types::message::{Message, MessageId, Role};

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    /// Assistant messages that ended with an error notice
    failed: HashSet<MessageId>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from persisted history. Loaded messages are never streaming.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let messages = messages
            .into_iter()
            .map(|mut message| {
                message.streaming = false;
                message
            })
            .collect();
        Self {
            messages,
            failed: HashSet::new(),
        }
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

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().rev().find(|m| &m.id == id)
    }

    fn get_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().rev().find(|m| &m.id == id)
    }

    pub fn has_user_messages(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    /// The message currently receiving chunks, if any
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.streaming)
    }

    pub fn append_user(&mut self, content: impl Into<String>) -> Message {
        self.push(Message::user(content))
    }

    pub fn begin_assistant(&mut self) -> Message {
        self.push(Message::assistant_placeholder())
    }

    pub fn append_system(&mut self, note: impl Into<String>) -> Message {
        self.push(Message::system(note))
    }

    fn push(&mut self, message: Message) -> Message {
        self.messages.push(message.clone());
        message
    }

    /// Append `delta` to a streaming message. Returns whether it was applied.
    pub fn apply_chunk(&mut self, id: &MessageId, delta: &str) -> bool {
        match self.get_mut(id) {
            Some(message) if message.streaming => {
                message.content.push_str(delta);
                true
            }
            _ => false,
        }
    }

    /// Stop streaming. Returns `false` if the message was unknown or already final.
    pub fn finalize(&mut self, id: &MessageId) -> bool {
        match self.get_mut(id) {
            Some(message) if message.streaming => {
                message.streaming = false;
                true
            }
            _ => false,
        }
    }

    /// Finalize after an explicit user stop and append a system note.
    pub fn mark_cancelled(&mut self, id: &MessageId, note: &str) -> Message {
        self.finalize(id);
        self.append_system(note)
    }

    /// Finalize a streaming message with an error notice after any partial text.
    pub fn fail(&mut self, id: &MessageId, notice: &str) -> bool {
        match self.get_mut(id) {
            Some(message) if message.streaming => {
                if !message.content.is_empty() {
                    message.content.push_str("\n\n");
                }
                message.content.push_str(notice);
                message.streaming = false;
            }
            _ => return false,
        }
        self.failed.insert(id.clone());
        true
    }

    pub fn is_failed(&self, id: &MessageId) -> bool {
        self.failed.contains(id)
    }

    /// Last `limit` finished user/assistant messages with content, oldest first.
    /// Failed replies hold an error notice, not model output, and are left out.
    pub fn history(&self, limit: usize) -> Vec<&Message> {
        let eligible: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| {
                m.role != Role::System
                    && !m.streaming
                    && !m.content.is_empty()
                    && !self.failed.contains(&m.id)
            })
            .collect();
        let skip = eligible.len().saturating_sub(limit);
        eligible.into_iter().skip(skip).collect()
    }
}
