//! WASM-target tests for chat-types.
//!
//! Covers the pieces that touch the platform (uuid, clock) under
//! wasm32-unknown-unknown via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use chat_types::config::*;
use chat_types::error::*;
use chat_types::event::*;
use chat_types::message::*;
use chat_types::session::*;

// ─── Message Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn message_ids_generated_in_wasm() {
    let a = Message::user("Hello");
    let b = Message::assistant_placeholder();
    assert_ne!(a.id, b.id);
    assert!(!a.created_at.is_empty());
    assert!(b.streaming);
}

#[wasm_bindgen_test]
fn message_json_roundtrip() {
    let msg = Message::assistant("done");
    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}

// ─── Event Tests ─────────────────────────────────────────

#[wasm_bindgen_test]
fn stream_event_parses_error_frame() {
    let event: StreamEvent = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
    assert_eq!(
        event,
        StreamEvent::Error { error: "boom".to_string(), kind: None }
    );
}

#[wasm_bindgen_test]
fn controller_event_serializes_for_js() {
    let event = ControllerEvent::ChunkApplied {
        message_id: MessageId::from("m1"),
        delta: "Hel".to_string(),
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains(r#""type":"chunk_applied""#));
    assert!(json.contains(r#""message_id":"m1""#));
}

// ─── Session / Config / Error Tests ──────────────────────

#[wasm_bindgen_test]
fn session_timestamps_in_wasm() {
    let mut session = ChatSession::new(None, DEFAULT_PLACEHOLDER_TITLE);
    session.touch();
    assert!(!session.updated_at.is_empty());
}

#[wasm_bindgen_test]
fn default_config_roundtrip() {
    let config = ChatConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back: ChatConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[wasm_bindgen_test]
fn error_user_message_for_timeout() {
    let msg = ChatError::Timeout(30_000).user_message();
    assert!(msg.contains("30000ms"));
}
