//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `chat-core` (pure Rust).
//! Implementations live in `chat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use chat_types::{
    message::{Message, Role},
    session::ChatSession,
    Result,
};

use crate::cancellation::CancelSignal;

// ─── Chat Backend Port ───────────────────────────────────────

/// Raw response body, read incrementally
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>>>>;

/// One prior message sent along with a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body for the chat endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPayload {
    pub query: String,
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_ids: Vec<String>,
    pub stream: bool,
}

/// What the chat endpoint answered with
pub enum BackendResponse {
    /// `text/event-stream` body carrying `data:` frames
    Stream(ByteStream),
    /// Non-streaming `application/json` fallback
    Json(serde_json::Value),
}

impl fmt::Debug for BackendResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendResponse::Stream(_) => f.write_str("BackendResponse::Stream(..)"),
            BackendResponse::Json(value) => write!(f, "BackendResponse::Json({})", value),
        }
    }
}

#[async_trait(?Send)]
pub trait ChatBackendPort {
    /// Issue a query. Implementations should abort the underlying request
    /// when `signal` is cancelled.
    async fn send_query(&self, payload: QueryPayload, signal: CancelSignal)
        -> Result<BackendResponse>;
}

// ─── Persistence Port ────────────────────────────────────────

#[async_trait(?Send)]
pub trait PersistencePort {
    /// Store a session record that has never been saved before
    async fn create_session(&self, session: &ChatSession) -> Result<()>;

    /// Append one finished message to a session's durable history.
    /// The stored record keeps the message's id and timestamp.
    async fn save_message(&self, session_id: &str, message: &Message) -> Result<()>;

    async fn update_session_title(&self, session_id: &str, title: &str) -> Result<()>;

    /// Messages of a session in conversation order
    async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Soft-delete a session
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Storage Port ────────────────────────────────────────────

/// Key-value storage used by local persistence backends
#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys with a given prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Title Generator Port ────────────────────────────────────

#[async_trait(?Send)]
pub trait TitleGeneratorPort {
    /// Best-effort remote title synthesis. No timeout is applied here.
    async fn generate_title(&self, first_message: &str) -> Result<String>;
}

// ─── Timer Port ──────────────────────────────────────────────

pub trait TimerPort {
    fn sleep(&self, ms: u64) -> Pin<Box<dyn Future<Output = ()>>>;
}
