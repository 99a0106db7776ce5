#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::error::*;
    use crate::event::*;
    use crate::message::*;
    use crate::session::*;

    // ─── Message Tests ───────────────────────────────────────

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.streaming);
        assert!(msg.is_finalized());
    }

    #[test]
    fn test_message_assistant_placeholder_is_streaming() {
        let msg = Message::assistant_placeholder();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert!(msg.streaming);
        assert!(!msg.is_finalized());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::user("a");
        let b = Message::user("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_message_serialization_shape() {
        let msg = Message::system("Stopped.");
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "Stopped.");
        assert_eq!(json["streaming"], false);
        assert_eq!(json["id"], msg.id.as_str());
    }

    #[test]
    fn test_message_streaming_defaults_to_false() {
        let json = r#"{"id":"m1","role":"assistant","content":"hi","created_at":"2026-01-01T00:00:00Z"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, MessageId::from("m1"));
        assert!(!msg.streaming);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""assistant""#);
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    // ─── Stream Event Tests ──────────────────────────────────

    #[test]
    fn test_stream_event_wire_forms() {
        let chunk: StreamEvent = serde_json::from_str(r#"{"chunk":"Hel"}"#).unwrap();
        assert_eq!(chunk, StreamEvent::chunk("Hel"));

        let done: StreamEvent = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert_eq!(done, StreamEvent::done());

        let error: StreamEvent =
            serde_json::from_str(r#"{"error":"quota exceeded","type":"rate_limit"}"#).unwrap();
        assert_eq!(
            error,
            StreamEvent::Error {
                error: "quota exceeded".to_string(),
                kind: Some("rate_limit".to_string()),
            }
        );
    }

    #[test]
    fn test_stream_event_to_sse_line() {
        assert_eq!(StreamEvent::chunk("A").to_sse_line(), "data: {\"chunk\":\"A\"}\n");
        assert_eq!(StreamEvent::done().to_sse_line(), "data: {\"done\":true}\n");
    }

    #[test]
    fn test_phase_status_projection() {
        assert_eq!(StreamPhase::Idle.status(), ChatStatus::Idle);
        assert_eq!(StreamPhase::Sending.status(), ChatStatus::Processing);
        assert_eq!(StreamPhase::Streaming.status(), ChatStatus::Streaming);
        assert_eq!(StreamPhase::Cancelled.status(), ChatStatus::Idle);
        assert!(StreamPhase::Sending.is_busy());
        assert!(!StreamPhase::Failed.is_busy());
    }

    #[test]
    fn test_controller_event_is_tagged() {
        let event = ControllerEvent::TitleChanged { title: "Rust lifetimes".to_string() };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "title_changed");
        assert_eq!(json["title"], "Rust lifetimes");

        let event = ControllerEvent::PhaseChanged { phase: StreamPhase::Streaming };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["phase"], "streaming");
    }

    // ─── Config Tests ────────────────────────────────────────

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.history_turns, 10);
        assert_eq!(config.title.fallback_chars, 50);
        assert_eq!(config.title.timeout_ms, 5_000);
        assert_eq!(config.placeholder_title, DEFAULT_PLACEHOLDER_TITLE);
        assert_eq!(config.persistence.backend, PersistenceBackendType::Http);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ChatConfig =
            serde_json::from_str(r#"{"backend":{"base_url":"https://chat.example.com/"}}"#)
                .unwrap();
        assert_eq!(config.backend.chat_url(), "https://chat.example.com/api/chat");
        assert_eq!(config.backend.request_timeout_ms, 30_000);
        assert_eq!(config.history_turns, 10);
    }

    #[test]
    fn test_backend_urls_same_origin() {
        let backend = BackendConfig::default();
        assert_eq!(backend.chat_url(), "/api/chat");
        assert_eq!(backend.title_url(), "/api/generate-title");
        assert_eq!(backend.sessions_url(), "/api/chat-sessions");
    }

    #[test]
    fn test_persistence_backend_labels() {
        assert_eq!(PersistenceBackendType::IndexedDb.label(), "IndexedDB");
        assert_eq!(PersistenceBackendType::Http.label(), "HTTP");
    }

    // ─── Session Tests ───────────────────────────────────────

    #[test]
    fn test_session_new() {
        let session = ChatSession::new(Some("ws-1".to_string()), "New Chat");
        assert_eq!(session.title, "New Chat");
        assert_eq!(session.workspace_id.as_deref(), Some("ws-1"));
        assert!(!session.id.is_empty());
        assert!(!session.is_deleted());
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn test_session_mark_deleted() {
        let mut session = ChatSession::new(None, "New Chat");
        session.mark_deleted();
        assert!(session.is_deleted());
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("deleted_at"));
        assert!(!json.contains("workspace_id"));
    }

    // ─── Error Tests ─────────────────────────────────────────

    #[test]
    fn test_error_display() {
        assert_eq!(ChatError::Timeout(5000).to_string(), "Timeout after 5000ms");
        assert_eq!(ChatError::Cancelled.to_string(), "Cancelled");
        assert_eq!(
            ChatError::Http { status: 404, body: "missing".to_string() }.to_string(),
            "HTTP 404: missing"
        );
        assert_eq!(
            ChatError::SessionDeleted("s-1".to_string()).to_string(),
            "Session s-1 has been deleted"
        );
    }

    #[test]
    fn test_error_is_abort() {
        assert!(ChatError::Cancelled.is_abort());
        assert!(!ChatError::Transport("refused".to_string()).is_abort());
    }

    #[test]
    fn test_error_user_message_hints() {
        let msg = ChatError::Transport("connection refused".to_string()).user_message();
        assert!(msg.contains("connection refused"));
        assert!(msg.contains("try again"));

        let msg = ChatError::UpstreamFault("<html>".to_string()).user_message();
        assert!(msg.contains("error page"));

        let msg = ChatError::Backend {
            message: "model overloaded".to_string(),
            category: Some("capacity".to_string()),
        }
        .user_message();
        assert_eq!(msg, "Error (capacity): model overloaded");
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{invalid}}").unwrap_err();
        let err: ChatError = serde_err.into();
        assert!(matches!(err, ChatError::Serialization(_)));
    }
}
