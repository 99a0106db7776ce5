//! Best-effort persistence on top of a `PersistencePort`.
//!
//! Failures are logged and surfaced as `ControllerEvent::Warning`; they
//! never roll back the in-memory conversation.

use std::rc::Rc;

use chat_types::{
    event::ControllerEvent,
    message::Message,
    session::ChatSession,
    ChatError, Result,
};

use crate::event_bus::EventBus;
use crate::ports::PersistencePort;

#[derive(Clone)]
pub struct PersistenceClient {
    port: Rc<dyn PersistencePort>,
    events: EventBus,
}

impl PersistenceClient {
    pub fn new(port: Rc<dyn PersistencePort>, events: EventBus) -> Self {
        Self { port, events }
    }

    pub fn backend_name(&self) -> &str {
        self.port.backend_name()
    }

    pub async fn ensure_session(&self, session: &ChatSession) -> bool {
        let result = self.port.create_session(session).await;
        self.check("create session", result)
    }

    /// Store one message. Returns whether the save succeeded.
    pub async fn save(&self, session_id: &str, message: &Message) -> bool {
        let result = self.port.save_message(session_id, message).await;
        self.check("save message", result)
    }

    pub async fn update_title(&self, session_id: &str, title: &str) -> bool {
        let result = self.port.update_session_title(session_id, title).await;
        self.check("update title", result)
    }

    pub async fn delete_session(&self, session_id: &str) -> bool {
        let result = self.port.delete_session(session_id).await;
        self.check("delete session", result)
    }

    /// Loading is not best-effort: without history there is nothing to resume.
    pub async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        self.port.load_messages(session_id).await
    }

    fn check(&self, action: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.report(action, e);
                false
            }
        }
    }

    fn report(&self, action: &str, error: ChatError) {
        log::warn!(
            "Could not {} via {} persistence: {}",
            action,
            self.port.backend_name(),
            error
        );
        self.events.emit(ControllerEvent::Warning {
            message: format!("Could not {}: {}", action, error),
        });
    }
}
