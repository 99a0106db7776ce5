//! Chat endpoint adapter.
//!
//! Streams the response body through a `ReadableStream` reader and aborts the
//! underlying fetch through an `AbortController` when the turn is cancelled.

use async_trait::async_trait;
use futures::future::{self, Either};
use futures::stream;
use gloo_net::http::{Request, Response};
use gloo_timers::future::TimeoutFuture;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, ReadableStream, ReadableStreamDefaultReader};

use chat_core::cancellation::CancelSignal;
use chat_core::ports::*;
use chat_types::{config::BackendConfig, ChatError, Result};

use super::{check_status, is_json_content_type, js_error, transport_error};

pub struct HttpChatBackend {
    config: BackendConfig,
}

impl HttpChatBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl ChatBackendPort for HttpChatBackend {
    async fn send_query(&self, payload: QueryPayload, signal: CancelSignal) -> Result<BackendResponse> {
        let abort = AbortController::new().map_err(js_error)?;
        {
            let abort = abort.clone();
            signal.on_cancel(move |reason| {
                log::debug!("Aborting chat request ({:?})", reason);
                abort.abort();
            });
        }

        let url = self.config.chat_url();
        log::debug!("POST {} ({} history entries)", url, payload.history.len());
        let response = Request::post(&url)
            .header("Accept", "text/event-stream, application/json")
            .abort_signal(Some(&abort.signal()))
            .json(&payload)
            .map_err(transport_error)?
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;

        let content_type = response.headers().get("content-type");
        if is_json_content_type(content_type.as_deref()) {
            let value = read_json(&response, self.config.request_timeout_ms).await?;
            return Ok(BackendResponse::Json(value));
        }

        let body = response
            .body()
            .ok_or_else(|| ChatError::Protocol("the response has no body".to_string()))?;
        Ok(BackendResponse::Stream(read_body(body)?))
    }
}

async fn read_json(response: &Response, timeout_ms: u64) -> Result<serde_json::Value> {
    let body = Box::pin(response.json::<serde_json::Value>());
    let timeout = TimeoutFuture::new(u32::try_from(timeout_ms).unwrap_or(u32::MAX));
    match future::select(body, timeout).await {
        Either::Left((value, _)) => value.map_err(transport_error),
        Either::Right(_) => Err(ChatError::Timeout(timeout_ms)),
    }
}

fn read_body(body: ReadableStream) -> Result<ByteStream> {
    let reader: ReadableStreamDefaultReader = body
        .get_reader()
        .dyn_into()
        .map_err(|e| js_error(e.into()))?;
    Ok(Box::pin(stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        match read_chunk(&reader).await {
            Ok(Some(bytes)) => Some((Ok(bytes), Some(reader))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    })))
}

/// One `reader.read()`; `None` once the body is exhausted
async fn read_chunk(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>> {
    let result = JsFuture::from(reader.read())
        .await
        .map_err(|e| ChatError::Transport(format!("stream read failed: {:?}", e)))?;

    let done = Reflect::get(&result, &JsValue::from_str("done"))
        .map_err(js_error)?
        .as_bool()
        .unwrap_or(false);
    if done {
        return Ok(None);
    }

    let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js_error)?;
    Ok(Some(Uint8Array::new(&value).to_vec()))
}
