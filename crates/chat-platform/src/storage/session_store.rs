//! Session persistence over any key-value `StoragePort`.
//!
//! Layout:
//! - `session:{id}` holds the JSON `ChatSession`
//! - `message:{id}:{micros:020}:{seq:06}` holds one JSON `Message`
//!
//! Message keys sort in insertion order, so a prefix listing is the
//! conversation order.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;

use chat_core::ports::{PersistencePort, StoragePort};
use chat_types::{
    message::Message,
    session::ChatSession,
    ChatError, Result,
};

const SESSION_PREFIX: &str = "session:";
const MESSAGE_PREFIX: &str = "message:";

pub struct KvPersistence {
    storage: Rc<dyn StoragePort>,
    seq: Cell<u32>,
}

impl KvPersistence {
    pub fn new(storage: Rc<dyn StoragePort>) -> Self {
        Self {
            storage,
            seq: Cell::new(0),
        }
    }

    pub fn storage_name(&self) -> &str {
        self.storage.backend_name()
    }

    pub async fn load_session(&self, session_id: &str) -> Result<Option<ChatSession>> {
        match self.storage.get(&session_key(session_id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Live sessions, most recently updated first
    pub async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let mut sessions = Vec::new();
        for key in self.storage.list_keys(SESSION_PREFIX).await? {
            let Some(bytes) = self.storage.get(&key).await? else {
                continue;
            };
            match serde_json::from_slice::<ChatSession>(&bytes) {
                Ok(session) if !session.is_deleted() => sessions.push(session),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping unreadable session record {}: {}", key, e),
            }
        }
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn write_session(&self, session: &ChatSession) -> Result<()> {
        let bytes = serde_json::to_vec(session)?;
        self.storage.set(&session_key(&session.id), &bytes).await
    }

    async fn require_session(&self, session_id: &str) -> Result<ChatSession> {
        self.load_session(session_id)
            .await?
            .ok_or_else(|| ChatError::Persistence(format!("Unknown session {}", session_id)))
    }

    fn next_message_key(&self, session_id: &str) -> String {
        let seq = self.seq.get();
        self.seq.set((seq + 1) % 1_000_000);
        let micros = chrono::Utc::now().timestamp_micros().max(0);
        format!("{}{}:{:020}:{:06}", MESSAGE_PREFIX, session_id, micros, seq)
    }
}

fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_id)
}

fn message_prefix(session_id: &str) -> String {
    format!("{}{}:", MESSAGE_PREFIX, session_id)
}

#[async_trait(?Send)]
impl PersistencePort for KvPersistence {
    async fn create_session(&self, session: &ChatSession) -> Result<()> {
        self.write_session(session).await
    }

    async fn save_message(&self, session_id: &str, message: &Message) -> Result<()> {
        let bytes = serde_json::to_vec(message)?;
        self.storage
            .set(&self.next_message_key(session_id), &bytes)
            .await?;

        if let Some(mut session) = self.load_session(session_id).await? {
            session.touch();
            self.write_session(&session).await?;
        }
        Ok(())
    }

    async fn update_session_title(&self, session_id: &str, title: &str) -> Result<()> {
        let mut session = self.require_session(session_id).await?;
        session.title = title.to_string();
        session.touch();
        self.write_session(&session).await
    }

    async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let mut keys = self.storage.list_keys(&message_prefix(session_id)).await?;
        keys.sort();

        let mut messages = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.storage.get(&key).await? {
                messages.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(messages)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut session = self.require_session(session_id).await?;
        session.mark_deleted();
        self.write_session(&session).await
    }

    fn backend_name(&self) -> &str {
        self.storage.backend_name()
    }
}
