use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Upstream fault: {0}")]
    UpstreamFault(String),

    #[error("Backend error: {message}")]
    Backend {
        message: String,
        category: Option<String>,
    },

    #[error("Cancelled")]
    Cancelled,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Session {0} has been deleted")]
    SessionDeleted(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// User-initiated cancel or supersession; never rendered as a failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }

    /// Human-readable text placed into a failed assistant message.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Transport(detail) => format!(
                "Could not reach the chat service ({}). Check your connection and try again.",
                detail
            ),
            ChatError::Http { status, .. } if *status >= 500 => format!(
                "The chat service failed with HTTP {}. Please try again in a moment.",
                status
            ),
            ChatError::Http { status, body } => {
                if body.trim().is_empty() {
                    format!("The chat service rejected the request (HTTP {}).", status)
                } else {
                    format!(
                        "The chat service rejected the request (HTTP {}): {}",
                        status,
                        body.trim()
                    )
                }
            }
            ChatError::UpstreamFault(_) => "The chat service returned an error page instead of a \
                 response stream. Please try again shortly."
                .to_string(),
            ChatError::Backend { message, category: Some(category) } => {
                format!("Error ({}): {}", category, message)
            }
            ChatError::Backend { message, category: None } => format!("Error: {}", message),
            ChatError::Timeout(ms) => format!("The chat service did not answer within {}ms.", ms),
            ChatError::Cancelled => "Stopped.".to_string(),
            other => format!("Error: {}", other),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}
