use serde::{Deserialize, Serialize};

use crate::message::{Message, MessageId};

/// One decoded frame of the chat stream protocol.
///
/// On the wire each frame is a bare JSON object on a `data:` line:
/// `{"chunk": "..."}`, `{"done": true}` or `{"error": "...", "type": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Chunk {
        chunk: String,
    },
    Done {
        done: bool,
    },
    Error {
        error: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
}

impl StreamEvent {
    pub fn chunk(text: impl Into<String>) -> Self {
        StreamEvent::Chunk { chunk: text.into() }
    }

    pub fn done() -> Self {
        StreamEvent::Done { done: true }
    }

    /// Render as a single SSE line, terminated by a newline
    pub fn to_sse_line(&self) -> String {
        // Serializing these variants cannot fail: all fields are strings or bools.
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("data: {}\n", json)
    }
}

/// Coarse status for presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Idle,
    Processing,
    Streaming,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Idle => "idle",
            ChatStatus::Processing => "processing",
            ChatStatus::Streaming => "streaming",
        }
    }
}

/// Lifecycle phase of the session stream controller.
///
/// Terminal phases (`Completed`, `Cancelled`, `Failed`) are observed
/// transiently and fall straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    Idle,
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl StreamPhase {
    pub fn status(&self) -> ChatStatus {
        match self {
            StreamPhase::Sending => ChatStatus::Processing,
            StreamPhase::Streaming => ChatStatus::Streaming,
            StreamPhase::Idle
            | StreamPhase::Completed
            | StreamPhase::Cancelled
            | StreamPhase::Failed => ChatStatus::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, StreamPhase::Sending | StreamPhase::Streaming)
    }
}

/// Events emitted by the controller.
/// Presentation layers subscribe to these for reactive updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// The controller moved to a new phase
    PhaseChanged { phase: StreamPhase },

    /// A message was added to the conversation
    MessageAppended { message: Message },

    /// A chunk of assistant text was applied to a streaming message
    ChunkApplied { message_id: MessageId, delta: String },

    /// A message stopped streaming and is now immutable
    MessageFinalized { message: Message },

    /// The session title changed (automatic or manual)
    TitleChanged { title: String },

    /// Something failed that does not affect the conversation (e.g. a save)
    Warning { message: String },

    /// A turn failed; the assistant message carries the details
    Error { message: String },
}
