//! Session persistence through the sessions API routes.
//!
//! | Operation       | Route                                   |
//! |-----------------|-----------------------------------------|
//! | create session  | `POST   {sessions}`                     |
//! | save message    | `POST   {sessions}/{id}/messages`       |
//! | load messages   | `GET    {sessions}/{id}/messages`       |
//! | rename          | `PATCH  {sessions}/{id}`                |
//! | delete          | `DELETE {sessions}/{id}`                |

use async_trait::async_trait;
use gloo_net::http::Request;
use serde::{Deserialize, Serialize};

use chat_core::ports::PersistencePort;
use chat_types::{
    config::BackendConfig,
    message::{Message, MessageId, Role},
    session::ChatSession,
    Result,
};

use super::{check_status, transport_error};

#[derive(Serialize)]
struct SaveMessageBody<'a> {
    id: &'a str,
    role: Role,
    content: &'a str,
    created_at: &'a str,
}

impl<'a> From<&'a Message> for SaveMessageBody<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            id: message.id.as_str(),
            role: message.role,
            content: &message.content,
            created_at: &message.created_at,
        }
    }
}

#[derive(Serialize)]
struct RenameBody<'a> {
    title: &'a str,
}

/// Server-side message rows may omit ids and timestamps
#[derive(Deserialize)]
pub struct StoredMessage {
    #[serde(default)]
    id: Option<String>,
    role: Role,
    content: String,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<StoredMessage> for Message {
    fn from(row: StoredMessage) -> Self {
        Message {
            id: row.id.map(MessageId).unwrap_or_else(MessageId::generate),
            role: row.role,
            content: row.content,
            created_at: row
                .created_at
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            streaming: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum MessagesResponse {
    List(Vec<StoredMessage>),
    Wrapped { messages: Vec<StoredMessage> },
}

impl MessagesResponse {
    pub fn into_messages(self) -> Vec<Message> {
        let rows = match self {
            MessagesResponse::List(rows) => rows,
            MessagesResponse::Wrapped { messages } => messages,
        };
        rows.into_iter().map(Message::from).collect()
    }
}

pub struct HttpPersistence {
    config: BackendConfig,
}

impl HttpPersistence {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/{}", self.config.sessions_url(), session_id)
    }

    fn messages_url(&self, session_id: &str) -> String {
        format!("{}/messages", self.session_url(session_id))
    }
}

#[async_trait(?Send)]
impl PersistencePort for HttpPersistence {
    async fn create_session(&self, session: &ChatSession) -> Result<()> {
        let response = Request::post(&self.config.sessions_url())
            .json(session)
            .map_err(transport_error)?
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn save_message(&self, session_id: &str, message: &Message) -> Result<()> {
        let response = Request::post(&self.messages_url(session_id))
            .json(&SaveMessageBody::from(message))
            .map_err(transport_error)?
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn update_session_title(&self, session_id: &str, title: &str) -> Result<()> {
        let response = Request::patch(&self.session_url(session_id))
            .json(&RenameBody { title })
            .map_err(transport_error)?
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let response = Request::get(&self.messages_url(session_id))
            .send()
            .await
            .map_err(transport_error)?;
        let body: MessagesResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(body.into_messages())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let response = Request::delete(&self.session_url(session_id))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}
