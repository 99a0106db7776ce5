//! Session stream controller: the send, stream and cancel lifecycle of one
//! chat session.
//!
//! Phases: `Idle → Sending → Streaming → {Completed | Cancelled | Failed} → Idle`.
//!
//! The controller is shared via `Rc` and driven from a single thread. A
//! `send` future stays pending while its stream is read, so `send` and
//! `cancel` may be called again while an earlier turn is still in flight.
//! Every turn owns a `CancellationToken`; starting a new turn cancels the
//! previous one, and no effect of a turn (chunk, finalize, save) happens
//! once its token is cancelled.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use futures::task::{LocalSpawn, LocalSpawnExt};
use futures::StreamExt;

use chat_types::{
    config::ChatConfig,
    event::{ChatStatus, ControllerEvent, StreamEvent, StreamPhase},
    message::{Message, MessageId},
    session::ChatSession,
    ChatError, Result,
};

use crate::cancellation::{CancelReason, CancellationToken};
use crate::event_bus::EventBus;
use crate::parser::{content_from_json, decode_stream};
use crate::persistence::PersistenceClient;
use crate::ports::*;
use crate::store::MessageStore;
use crate::title::TitleGenerator;

/// Text of the system note appended when the user stops a response
pub const STOPPED_NOTICE: &str = "Response stopped.";

/// Collaborators a controller needs
#[derive(Clone)]
pub struct ControllerPorts {
    pub backend: Rc<dyn ChatBackendPort>,
    pub persistence: Rc<dyn PersistencePort>,
    pub titles: Rc<dyn TitleGeneratorPort>,
    pub timer: Rc<dyn TimerPort>,
    /// Runs fire-and-forget work such as title generation
    pub spawner: Rc<dyn LocalSpawn>,
}

/// How one `send` ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed { message_id: MessageId },
    /// Stopped by `cancel()`
    Cancelled,
    /// Replaced by a newer `send`
    Superseded,
    Failed { error: ChatError },
}

impl TurnOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Completed { .. } => "completed",
            TurnOutcome::Cancelled => "cancelled",
            TurnOutcome::Superseded => "superseded",
            TurnOutcome::Failed { .. } => "failed",
        }
    }
}

/// Pending creation of the session record, awaited by every turn that needs it.
/// Resolves to whether the record was stored.
type SessionCreation = Shared<LocalBoxFuture<'static, bool>>;

struct ActiveTurn {
    token: CancellationToken,
    assistant_id: Option<MessageId>,
}

struct SessionState {
    session: ChatSession,
    /// Whether the session record is known to exist in persistence
    session_stored: bool,
    creation: Option<SessionCreation>,
    store: MessageStore,
    phase: StreamPhase,
    active: Option<ActiveTurn>,
    title_requested: bool,
    manual_title: bool,
    file_ids: Vec<String>,
}

impl SessionState {
    fn set_phase(&mut self, phase: StreamPhase, events: &mut Vec<ControllerEvent>) {
        if self.phase != phase {
            self.phase = phase;
            events.push(ControllerEvent::PhaseChanged { phase });
        }
    }

    /// Drop the active turn if it still belongs to `token`
    fn release(&mut self, token: &CancellationToken) {
        if self.active.as_ref().is_some_and(|a| a.token.id() == token.id()) {
            self.active = None;
        }
    }

    fn finalized_event(&self, id: &MessageId) -> Option<ControllerEvent> {
        self.store
            .get(id)
            .map(|message| ControllerEvent::MessageFinalized { message: message.clone() })
    }
}

/// Everything `send` needs after the synchronous first step
struct PreparedTurn {
    session_id: String,
    creation: Option<SessionCreation>,
    user_message: Message,
    first_message: bool,
    history: Vec<HistoryEntry>,
    workspace_id: Option<String>,
    file_ids: Vec<String>,
}

pub struct SessionStreamController {
    state: Rc<RefCell<SessionState>>,
    config: ChatConfig,
    backend: Rc<dyn ChatBackendPort>,
    persistence: PersistenceClient,
    titles: Rc<TitleGenerator>,
    spawner: Rc<dyn LocalSpawn>,
    events: EventBus,
}

impl SessionStreamController {
    /// A new, not yet persisted session. It is stored on the first `send`.
    pub fn new(config: ChatConfig, ports: ControllerPorts, workspace_id: Option<String>) -> Self {
        let session = ChatSession::new(workspace_id, config.placeholder_title.clone());
        Self::build(config, ports, session, false, MessageStore::new())
    }

    /// Resume an existing session with its persisted history.
    pub fn open(
        config: ChatConfig,
        ports: ControllerPorts,
        session: ChatSession,
        messages: Vec<Message>,
    ) -> Self {
        Self::build(config, ports, session, true, MessageStore::from_messages(messages))
    }

    fn build(
        config: ChatConfig,
        ports: ControllerPorts,
        session: ChatSession,
        session_stored: bool,
        store: MessageStore,
    ) -> Self {
        let events = EventBus::new();
        let title_requested = store.has_user_messages();
        let manual_title = session_stored && session.title != config.placeholder_title;
        let titles = TitleGenerator::new(ports.titles, ports.timer, config.title.clone());

        Self {
            state: Rc::new(RefCell::new(SessionState {
                session,
                session_stored,
                creation: None,
                store,
                phase: StreamPhase::Idle,
                active: None,
                title_requested,
                manual_title,
                file_ids: Vec::new(),
            })),
            persistence: PersistenceClient::new(ports.persistence, events.clone()),
            backend: ports.backend,
            titles: Rc::new(titles),
            spawner: ports.spawner,
            events,
            config,
        }
    }

    // ─── Read-only projection ────────────────────────────────

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn session(&self) -> ChatSession {
        self.state.borrow().session.clone()
    }

    pub fn session_id(&self) -> String {
        self.state.borrow().session.id.clone()
    }

    pub fn title(&self) -> String {
        self.state.borrow().session.title.clone()
    }

    /// Snapshot of the conversation in order
    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().store.messages().to_vec()
    }

    pub fn message(&self, id: &MessageId) -> Option<Message> {
        self.state.borrow().store.get(id).cloned()
    }

    pub fn phase(&self) -> StreamPhase {
        self.state.borrow().phase
    }

    pub fn status(&self) -> ChatStatus {
        self.phase().status()
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// Restrict subsequent queries to these files
    pub fn set_file_scope(&self, file_ids: Vec<String>) {
        self.state.borrow_mut().file_ids = file_ids;
    }

    // ─── Mutating entry points ───────────────────────────────

    /// Run one full turn: user message → stream → final assistant message.
    ///
    /// Calling `send` while a turn is in flight supersedes that turn.
    /// Only an empty query or a deleted session is an `Err`; stream and
    /// transport failures end as `TurnOutcome::Failed` with the details
    /// written into the assistant message.
    pub async fn send(&self, query: &str) -> Result<TurnOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ChatError::EmptyQuery);
        }
        {
            let state = self.state.borrow();
            if state.session.is_deleted() {
                return Err(ChatError::SessionDeleted(state.session.id.clone()));
            }
        }

        self.supersede_active();

        let token = CancellationToken::new();
        let turn = self.prepare_turn(&token, query);

        // The user message is in the conversation now, so it is saved and the
        // title is requested even if the turn is stopped meanwhile. Only the
        // response is skipped.
        if let Some(creation) = turn.creation {
            creation.await;
        }
        self.persistence.save(&turn.session_id, &turn.user_message).await;
        if turn.first_message {
            self.spawn_title(turn.session_id.clone(), query.to_string());
        }
        if let Some(outcome) = abort_outcome(&token) {
            return Ok(outcome);
        }

        let assistant_id = self.update(|state, events| {
            let message = state.store.begin_assistant();
            if let Some(active) = state.active.as_mut().filter(|a| a.token.id() == token.id()) {
                active.assistant_id = Some(message.id.clone());
            }
            events.push(ControllerEvent::MessageAppended { message: message.clone() });
            message.id
        });

        let payload = QueryPayload {
            query: query.to_string(),
            session_id: turn.session_id.clone(),
            history: turn.history,
            workspace_id: turn.workspace_id,
            file_ids: turn.file_ids,
            stream: true,
        };

        log::info!("Sending query for session {} (turn {})", turn.session_id, token.id());
        let signal = token.signal();
        let response = match signal
            .guard_future(self.backend.send_query(payload, signal.clone()))
            .await
        {
            Err(_aborted) => return Ok(self.aborted(&token)),
            Ok(Err(error)) => return Ok(self.fail_turn(&token, &assistant_id, error)),
            Ok(Ok(response)) => response,
        };
        if let Some(outcome) = abort_outcome(&token) {
            return Ok(outcome);
        }

        let outcome = match response {
            BackendResponse::Stream(bytes) => {
                self.consume_stream(&token, &assistant_id, &turn.session_id, bytes)
                    .await
            }
            BackendResponse::Json(value) => match content_from_json(&value) {
                Ok(content) => {
                    self.apply_chunk(&token, &assistant_id, &content);
                    self.complete_turn(&token, &assistant_id, &turn.session_id)
                        .await
                }
                Err(error) => self.fail_turn(&token, &assistant_id, error),
            },
        };
        Ok(outcome)
    }

    /// Stop the in-flight turn, if any.
    ///
    /// The partial assistant text is kept as-is and a system note is appended.
    /// Nothing is persisted for the stopped response.
    pub fn cancel(&self) -> bool {
        let Some(active) = self.update(|state, _| state.active.take()) else {
            return false;
        };
        self.update(|state, events| state.set_phase(StreamPhase::Cancelled, events));
        self.stop_turn(active, CancelReason::UserCancelled);
        self.update(|state, events| state.set_phase(StreamPhase::Idle, events));
        true
    }

    /// Manually rename the session. Disables the automatic title.
    pub async fn rename(&self, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::Other("Title is empty".to_string()));
        }
        let session_id = self.update(|state, events| {
            state.manual_title = true;
            state.session.title = title.to_string();
            state.session.touch();
            events.push(ControllerEvent::TitleChanged { title: title.to_string() });
            state.session.id.clone()
        });
        if self.session_ready().await {
            self.persistence.update_title(&session_id, title).await;
        }
        Ok(())
    }

    /// Stop any in-flight turn and soft-delete the session.
    pub async fn delete(&self) -> bool {
        self.cancel();
        let session_id = self.update(|state, _| {
            state.session.mark_deleted();
            state.session.id.clone()
        });
        if !self.session_ready().await {
            return true;
        }
        self.persistence.delete_session(&session_id).await
    }

    // ─── Turn internals ──────────────────────────────────────

    /// Wait for a pending session creation, then report whether the record exists
    async fn session_ready(&self) -> bool {
        let creation = self.state.borrow().creation.clone();
        if let Some(creation) = creation {
            creation.await;
        }
        self.state.borrow().session_stored
    }

    /// Start storing the session record. The outcome is written back to the
    /// state once, however many turns await it; a failure lets the next turn retry.
    fn begin_creation(&self, session: ChatSession) -> SessionCreation {
        let persistence = self.persistence.clone();
        let state = Rc::downgrade(&self.state);
        async move {
            let stored = persistence.ensure_session(&session).await;
            if let Some(state) = state.upgrade() {
                let mut state = state.borrow_mut();
                state.session_stored = stored;
                state.creation = None;
            }
            stored
        }
        .boxed_local()
        .shared()
    }

    fn update<R>(&self, f: impl FnOnce(&mut SessionState, &mut Vec<ControllerEvent>) -> R) -> R {
        let mut events = Vec::new();
        let result = f(&mut self.state.borrow_mut(), &mut events);
        // Emit outside the borrow: subscribers may read the controller.
        for event in events {
            self.events.emit(event);
        }
        result
    }

    /// Cancel the previous turn and freeze its message before a new one starts
    fn supersede_active(&self) {
        if let Some(previous) = self.update(|state, _| state.active.take()) {
            self.stop_turn(previous, CancelReason::Superseded);
        }
    }

    /// Cancel `turn`, freeze its partial text and append the stopped note
    fn stop_turn(&self, turn: ActiveTurn, reason: CancelReason) {
        log::info!("Stopping turn {} ({:?})", turn.token.id(), reason);
        turn.token.cancel(reason);

        self.update(|state, events| {
            let note = match &turn.assistant_id {
                Some(id) => {
                    let was_streaming = state.store.get(id).is_some_and(|m| m.streaming);
                    let note = state.store.mark_cancelled(id, STOPPED_NOTICE);
                    if was_streaming {
                        events.extend(state.finalized_event(id));
                    }
                    note
                }
                None => state.store.append_system(STOPPED_NOTICE),
            };
            events.push(ControllerEvent::MessageAppended { message: note });
        });
    }

    fn prepare_turn(&self, token: &CancellationToken, query: &str) -> PreparedTurn {
        let history_limit = self.config.history_turns;
        self.update(|state, events| {
            state.active = Some(ActiveTurn {
                token: token.clone(),
                assistant_id: None,
            });
            state.set_phase(StreamPhase::Sending, events);

            let first_message = !state.title_requested && !state.store.has_user_messages();
            if first_message {
                state.title_requested = true;
            }

            let history = state
                .store
                .history(history_limit)
                .into_iter()
                .map(HistoryEntry::from)
                .collect();

            let user_message = state.store.append_user(query);
            events.push(ControllerEvent::MessageAppended { message: user_message.clone() });
            state.session.touch();

            if !state.session_stored && state.creation.is_none() {
                state.creation = Some(self.begin_creation(state.session.clone()));
            }

            PreparedTurn {
                session_id: state.session.id.clone(),
                creation: state.creation.clone(),
                user_message,
                first_message,
                history,
                workspace_id: state.session.workspace_id.clone(),
                file_ids: state.file_ids.clone(),
            }
        })
    }

    async fn consume_stream(
        &self,
        token: &CancellationToken,
        assistant_id: &MessageId,
        session_id: &str,
        bytes: ByteStream,
    ) -> TurnOutcome {
        self.update(|state, events| {
            if !token.is_cancelled() {
                state.set_phase(StreamPhase::Streaming, events);
            }
        });

        let mut frames = token.signal().guard_stream(decode_stream(bytes));
        let mut received = false;
        while let Some(frame) = frames.next().await {
            if let Some(outcome) = abort_outcome(token) {
                return outcome;
            }
            match frame {
                Ok(StreamEvent::Chunk { chunk }) => {
                    received |= self.apply_chunk(token, assistant_id, &chunk);
                }
                Ok(StreamEvent::Done { .. }) => {
                    return self.complete_turn(token, assistant_id, session_id).await;
                }
                Ok(StreamEvent::Error { error, kind }) => {
                    let error = ChatError::Backend { message: error, category: kind };
                    return self.fail_turn(token, assistant_id, error);
                }
                Err(error) => return self.fail_turn(token, assistant_id, error),
            }
        }

        if let Some(outcome) = abort_outcome(token) {
            return outcome;
        }
        if received {
            log::debug!("Stream ended without a done frame; keeping the received text");
            self.complete_turn(token, assistant_id, session_id).await
        } else {
            let error = ChatError::Protocol("the stream ended without a response".to_string());
            self.fail_turn(token, assistant_id, error)
        }
    }

    /// Apply one chunk if the turn is still current. Observers see it before returning.
    fn apply_chunk(&self, token: &CancellationToken, id: &MessageId, delta: &str) -> bool {
        self.update(|state, events| {
            if token.is_cancelled() {
                return false;
            }
            let applied = state.store.apply_chunk(id, delta);
            if applied {
                events.push(ControllerEvent::ChunkApplied {
                    message_id: id.clone(),
                    delta: delta.to_string(),
                });
            }
            applied
        })
    }

    async fn complete_turn(
        &self,
        token: &CancellationToken,
        id: &MessageId,
        session_id: &str,
    ) -> TurnOutcome {
        let message = self.update(|state, events| {
            if token.is_cancelled() {
                return None;
            }
            state.store.finalize(id);
            token.complete();
            state.release(token);
            state.session.touch();
            events.extend(state.finalized_event(id));
            state.set_phase(StreamPhase::Completed, events);
            state.set_phase(StreamPhase::Idle, events);
            state.store.get(id).cloned()
        });

        let Some(message) = message else {
            return self.aborted(token);
        };
        self.persistence.save(session_id, &message).await;
        TurnOutcome::Completed { message_id: id.clone() }
    }

    fn fail_turn(&self, token: &CancellationToken, id: &MessageId, error: ChatError) -> TurnOutcome {
        if let Some(outcome) = abort_outcome(token) {
            return outcome;
        }
        log::warn!("Chat turn {} failed: {}", token.id(), error);
        let notice = error.user_message();
        self.update(|state, events| {
            if state.store.fail(id, &notice) {
                events.extend(state.finalized_event(id));
            }
            token.complete();
            state.release(token);
            events.push(ControllerEvent::Error { message: error.to_string() });
            state.set_phase(StreamPhase::Failed, events);
            state.set_phase(StreamPhase::Idle, events);
        });
        TurnOutcome::Failed { error }
    }

    /// Outcome for a turn whose work was interrupted by its token
    fn aborted(&self, token: &CancellationToken) -> TurnOutcome {
        abort_outcome(token).unwrap_or(TurnOutcome::Cancelled)
    }

    fn spawn_title(&self, session_id: String, first_message: String) {
        let titles = self.titles.clone();
        let persistence = self.persistence.clone();
        let events = self.events.clone();
        let state = Rc::downgrade(&self.state);

        let task = async move {
            let title = titles.generate(&first_message).await;
            let apply = match state.upgrade() {
                Some(state) => {
                    let mut state = state.borrow_mut();
                    if state.manual_title || state.session.is_deleted() || state.session.id != session_id {
                        log::debug!("Skipping automatic title for session {}", session_id);
                        false
                    } else {
                        state.session.title = title.clone();
                        state.session.touch();
                        true
                    }
                }
                None => false,
            };
            if apply {
                events.emit(ControllerEvent::TitleChanged { title: title.clone() });
                persistence.update_title(&session_id, &title).await;
            }
        };

        if let Err(e) = self.spawner.spawn_local(task) {
            log::warn!("Could not start title generation: {}", e);
        }
    }
}

fn abort_outcome(token: &CancellationToken) -> Option<TurnOutcome> {
    match token.reason()? {
        CancelReason::UserCancelled => Some(TurnOutcome::Cancelled),
        CancelReason::Superseded => Some(TurnOutcome::Superseded),
    }
}
