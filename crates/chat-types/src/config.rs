use serde::{Deserialize, Serialize};

/// Top-level chat configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub backend: BackendConfig,
    pub persistence: PersistenceConfig,
    pub title: TitleConfig,
    /// How many prior messages travel with each query
    pub history_turns: usize,
    pub placeholder_title: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            persistence: PersistenceConfig::default(),
            title: TitleConfig::default(),
            history_turns: 10,
            placeholder_title: DEFAULT_PLACEHOLDER_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Origin of the API routes; empty means same-origin
    pub base_url: String,
    pub chat_path: String,
    pub title_path: String,
    pub sessions_path: String,
    /// Applies to non-streaming (JSON) responses only
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            chat_path: "/api/chat".to_string(),
            title_path: "/api/generate-title".to_string(),
            sessions_path: "/api/chat-sessions".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl BackendConfig {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn chat_url(&self) -> String {
        self.url(&self.chat_path)
    }

    pub fn title_url(&self) -> String {
        self.url(&self.title_path)
    }

    pub fn sessions_url(&self) -> String {
        self.url(&self.sessions_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub timeout_ms: u64,
    pub max_attempts: u32,
    /// Length of the local fallback title, in characters
    pub fallback_chars: usize,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_attempts: 2,
            fallback_chars: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub backend: PersistenceBackendType,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackendType::Http,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistenceBackendType {
    /// The API routes under `sessions_path`
    Http,
    /// Auto-detect the best local key-value store
    Auto,
    Memory,
    IndexedDb,
}

impl PersistenceBackendType {
    pub fn label(&self) -> &str {
        match self {
            PersistenceBackendType::Http => "HTTP",
            PersistenceBackendType::Auto => "Auto",
            PersistenceBackendType::Memory => "Memory",
            PersistenceBackendType::IndexedDb => "IndexedDB",
        }
    }
}

pub const DEFAULT_PLACEHOLDER_TITLE: &str = "New Chat";
