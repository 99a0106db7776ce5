#[cfg(test)]
mod tests {
    use crate::http::persistence::MessagesResponse;
    use crate::http::{is_json_content_type, status_error};
    use crate::storage::{KvPersistence, MemoryStorage};
    use chat_core::ports::{PersistencePort, StoragePort};
    use chat_types::message::{Message, Role};
    use chat_types::session::ChatSession;
    use chat_types::ChatError;
    use futures::executor::block_on;
    use std::rc::Rc;

    // ─── HTTP Helpers ────────────────────────────────────────

    #[test]
    fn test_status_error_markup_is_upstream_fault() {
        let err = status_error(502, "<html><body>Bad Gateway</body></html>");
        assert!(matches!(err, ChatError::UpstreamFault(_)));
    }

    #[test]
    fn test_status_error_uses_json_error_field() {
        let err = status_error(400, r#"{"error":"query too long"}"#);
        assert_eq!(
            err,
            ChatError::Http {
                status: 400,
                body: "query too long".to_string()
            }
        );
    }

    #[test]
    fn test_status_error_plain_body() {
        let err = status_error(503, "  service unavailable \n");
        assert_eq!(
            err,
            ChatError::Http {
                status: 503,
                body: "service unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_json_content_type_detection() {
        assert!(is_json_content_type(Some("application/json")));
        assert!(is_json_content_type(Some("Application/JSON; charset=utf-8")));
        assert!(!is_json_content_type(Some("text/event-stream")));
        assert!(!is_json_content_type(None));
    }

    #[test]
    fn test_messages_response_shapes() {
        let list: MessagesResponse =
            serde_json::from_str(r#"[{"role":"user","content":"hi"}]"#).unwrap();
        let messages = list.into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert!(!messages[0].streaming);

        let wrapped: MessagesResponse = serde_json::from_str(
            r#"{"messages":[{"id":"m1","role":"assistant","content":"yo","created_at":"2024-01-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        let messages = wrapped.into_messages();
        assert_eq!(messages[0].id.as_str(), "m1");
        assert_eq!(messages[0].created_at, "2024-01-01T00:00:00Z");
    }

    // ─── MemoryStorage Tests ─────────────────────────────────

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        block_on(async {
            storage.set("a", b"1").await.unwrap();
            assert_eq!(storage.get("a").await.unwrap(), Some(b"1".to_vec()));
            assert!(storage.exists("a").await.unwrap());
            storage.delete("a").await.unwrap();
            assert!(storage.get("a").await.unwrap().is_none());
        });
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_storage_prefix_listing_is_sorted() {
        let storage = MemoryStorage::new();
        block_on(async {
            storage.set("p:2", b"").await.unwrap();
            storage.set("q:1", b"").await.unwrap();
            storage.set("p:1", b"").await.unwrap();
            assert_eq!(storage.list_keys("p:").await.unwrap(), vec!["p:1", "p:2"]);
        });
    }

    // ─── KvPersistence Tests ─────────────────────────────────

    fn kv() -> KvPersistence {
        KvPersistence::new(Rc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_kv_messages_load_in_order() {
        let store = kv();
        let session = ChatSession::new(None, "New Chat");
        block_on(async {
            store.create_session(&session).await.unwrap();
            store.save_message(&session.id, &Message::user("one")).await.unwrap();
            store.save_message(&session.id, &Message::assistant("two")).await.unwrap();
            store.save_message(&session.id, &Message::user("three")).await.unwrap();

            let messages = store.load_messages(&session.id).await.unwrap();
            let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, vec!["one", "two", "three"]);
            assert_eq!(messages[1].role, Role::Assistant);
        });
    }

    #[test]
    fn test_kv_keeps_message_id_and_timestamp() {
        let store = kv();
        let session = ChatSession::new(None, "New Chat");
        let mut message = Message::user("hello");
        message.created_at = "2026-03-01T09:30:00+00:00".to_string();
        block_on(async {
            store.create_session(&session).await.unwrap();
            store.save_message(&session.id, &message).await.unwrap();

            let loaded = store.load_messages(&session.id).await.unwrap();
            assert_eq!(loaded, vec![message.clone()]);
        });
    }

    #[test]
    fn test_kv_sessions_do_not_mix_messages() {
        let store = kv();
        let a = ChatSession::new(None, "A");
        let b = ChatSession::new(None, "B");
        block_on(async {
            store.create_session(&a).await.unwrap();
            store.create_session(&b).await.unwrap();
            store.save_message(&a.id, &Message::user("for a")).await.unwrap();
            store.save_message(&b.id, &Message::user("for b")).await.unwrap();

            assert_eq!(store.load_messages(&a.id).await.unwrap()[0].content, "for a");
            assert_eq!(store.load_messages(&b.id).await.unwrap().len(), 1);
        });
    }

    #[test]
    fn test_kv_title_update_and_soft_delete() {
        let store = kv();
        let session = ChatSession::new(Some("ws".to_string()), "New Chat");
        block_on(async {
            store.create_session(&session).await.unwrap();
            store.update_session_title(&session.id, "Renamed").await.unwrap();
            let loaded = store.load_session(&session.id).await.unwrap().unwrap();
            assert_eq!(loaded.title, "Renamed");
            assert_eq!(loaded.workspace_id.as_deref(), Some("ws"));

            assert_eq!(store.list_sessions().await.unwrap().len(), 1);
            store.delete_session(&session.id).await.unwrap();
            assert!(store.list_sessions().await.unwrap().is_empty());
            let deleted = store.load_session(&session.id).await.unwrap().unwrap();
            assert!(deleted.is_deleted());
        });
    }

    #[test]
    fn test_kv_unknown_session_errors() {
        let store = kv();
        block_on(async {
            assert!(matches!(
                store.update_session_title("missing", "x").await,
                Err(ChatError::Persistence(_))
            ));
            assert!(store.delete_session("missing").await.is_err());
            assert!(store.load_messages("missing").await.unwrap().is_empty());
        });
    }
}
