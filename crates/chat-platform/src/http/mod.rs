//! HTTP adapters for the chat API routes.
//!
//! All requests go through browser `fetch()` via gloo-net.

pub mod chat_backend;
pub mod persistence;
pub mod title;

pub use chat_backend::HttpChatBackend;
pub use persistence::HttpPersistence;
pub use title::HttpTitleGenerator;

use gloo_net::http::Response;
use wasm_bindgen::JsValue;

use chat_types::{ChatError, Result};

const BODY_PREVIEW_CHARS: usize = 200;

pub(crate) fn transport_error(e: gloo_net::Error) -> ChatError {
    match e {
        gloo_net::Error::SerdeError(e) => ChatError::Serialization(e.to_string()),
        other => ChatError::Transport(other.to_string()),
    }
}

pub(crate) fn js_error(e: JsValue) -> ChatError {
    ChatError::JsInterop(format!("{:?}", e))
}

/// Pass successful responses through; turn anything else into a `ChatError`.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// Classify a non-2xx response by its body.
///
/// Proxies answer with HTML error pages; JSON bodies carry an `error` field.
pub fn status_error(status: u16, body: &str) -> ChatError {
    let trimmed = body.trim();
    if trimmed.starts_with('<') {
        return ChatError::UpstreamFault(format!("HTTP {} with a markup body", status));
    }
    let detail = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| trimmed.chars().take(BODY_PREVIEW_CHARS).collect());
    ChatError::Http {
        status,
        body: detail,
    }
}

pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}
