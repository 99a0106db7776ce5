use std::fmt;

use serde::{Deserialize, Serialize};

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a message within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A single message in a conversation.
///
/// `content` may only change while `streaming` is true; a finalized
/// message is never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub streaming: bool,
}

impl Message {
    fn new(role: Role, content: String, streaming: bool) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content,
            created_at: chrono::Utc::now().to_rfc3339(),
            streaming,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into(), false)
    }

    /// Empty assistant message that is still receiving chunks
    pub fn assistant_placeholder() -> Self {
        Self::new(Role::Assistant, String::new(), true)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into(), false)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text.into(), false)
    }

    pub fn is_finalized(&self) -> bool {
        !self.streaming
    }
}
