//! WASM-target tests for chat-platform (Node.js runtime).
//!
//! Tests MemoryStorage and KvPersistence under wasm32-unknown-unknown
//! via `wasm-pack test --node`.
//!
//! IndexedDB and fetch need a browser and are not covered here.

use wasm_bindgen_test::*;

use chat_core::ports::{PersistencePort, StoragePort, TimerPort};
use chat_platform::storage::{KvPersistence, MemoryStorage};
use chat_platform::GlooTimer;
use chat_types::message::{Message, Role};
use chat_types::session::ChatSession;
use std::rc::Rc;

// ─── MemoryStorage Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_storage_get_missing() {
    let storage = MemoryStorage::new();
    let result = storage.get("nonexistent").await.unwrap();
    assert!(result.is_none());
}

#[wasm_bindgen_test]
async fn memory_storage_overwrite() {
    let storage = MemoryStorage::new();
    storage.set("key", b"v1").await.unwrap();
    storage.set("key", b"v2").await.unwrap();
    let result = storage.get("key").await.unwrap();
    assert_eq!(result, Some(b"v2".to_vec()));
}

#[wasm_bindgen_test]
async fn memory_storage_delete_nonexistent() {
    let storage = MemoryStorage::new();
    storage.delete("nonexistent").await.unwrap();
}

// ─── KvPersistence Tests ─────────────────────────────────

#[wasm_bindgen_test]
async fn kv_persistence_history_roundtrip() {
    let store = KvPersistence::new(Rc::new(MemoryStorage::new()));
    let session = ChatSession::new(None, "New Chat");

    store.create_session(&session).await.unwrap();
    store.save_message(&session.id, &Message::user("question")).await.unwrap();
    store.save_message(&session.id, &Message::assistant("answer")).await.unwrap();

    let messages = store.load_messages(&session.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "question");
    assert_eq!(messages[1].role, Role::Assistant);
}

#[wasm_bindgen_test]
async fn kv_persistence_rename() {
    let store = KvPersistence::new(Rc::new(MemoryStorage::new()));
    let session = ChatSession::new(None, "New Chat");
    store.create_session(&session).await.unwrap();
    store.update_session_title(&session.id, "Trip plans").await.unwrap();

    let sessions = store.list_sessions().await.unwrap();
    assert_eq!(sessions[0].title, "Trip plans");
}

// ─── Timer Tests ─────────────────────────────────────────

#[wasm_bindgen_test]
async fn gloo_timer_sleep_resolves() {
    GlooTimer.sleep(1).await;
}
