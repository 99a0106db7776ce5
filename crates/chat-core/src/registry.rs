//! Open sessions keyed by session id.
//!
//! Each session gets its own controller, so streams in different sessions
//! never cancel each other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chat_types::{config::ChatConfig, session::ChatSession, ChatError, Result};

use crate::controller::{ControllerPorts, SessionStreamController};

pub struct SessionRegistry {
    config: ChatConfig,
    ports: ControllerPorts,
    sessions: RefCell<HashMap<String, Rc<SessionStreamController>>>,
}

impl SessionRegistry {
    pub fn new(config: ChatConfig, ports: ControllerPorts) -> Self {
        Self {
            config,
            ports,
            sessions: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Start a fresh session. It is persisted on its first message.
    pub fn create(&self, workspace_id: Option<String>) -> Rc<SessionStreamController> {
        let controller = Rc::new(SessionStreamController::new(
            self.config.clone(),
            self.ports.clone(),
            workspace_id,
        ));
        log::info!("Created chat session {}", controller.session_id());
        self.sessions
            .borrow_mut()
            .insert(controller.session_id(), controller.clone());
        controller
    }

    /// Resume a stored session, loading its history on first access.
    pub async fn open(&self, session: ChatSession) -> Result<Rc<SessionStreamController>> {
        if let Some(existing) = self.get(&session.id) {
            return Ok(existing);
        }
        if session.is_deleted() {
            return Err(ChatError::SessionDeleted(session.id));
        }

        let messages = self.ports.persistence.load_messages(&session.id).await?;
        log::info!(
            "Opened chat session {} with {} stored messages",
            session.id,
            messages.len()
        );

        // Another `open` for the same id may have finished during the load.
        let mut sessions = self.sessions.borrow_mut();
        let controller = sessions
            .entry(session.id.clone())
            .or_insert_with(|| {
                Rc::new(SessionStreamController::open(
                    self.config.clone(),
                    self.ports.clone(),
                    session,
                    messages,
                ))
            })
            .clone();
        Ok(controller)
    }

    pub fn get(&self, session_id: &str) -> Option<Rc<SessionStreamController>> {
        self.sessions.borrow().get(session_id).cloned()
    }

    /// Soft-delete a session and forget its controller.
    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        let controller = self
            .sessions
            .borrow_mut()
            .remove(session_id)
            .ok_or_else(|| ChatError::Other(format!("Unknown session {}", session_id)))?;
        Ok(controller.delete().await)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.borrow().is_empty()
    }
}
