//! JavaScript-facing chat handles.
//!
//! `ChatApp` owns the session registry and the configuration;
//! `ChatSessionHandle` drives one session's send / cancel lifecycle.

use std::rc::Rc;

use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Function, Promise};
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use chat_core::controller::{ControllerPorts, SessionStreamController, TurnOutcome};
use chat_core::ports::StoragePort;
use chat_core::registry::SessionRegistry;
use chat_platform::storage::{auto_detect_storage, open_persistence};
use chat_platform::{GlooTimer, HttpChatBackend, HttpTitleGenerator, WasmSpawner};
use chat_types::{config::ChatConfig, session::ChatSession, ChatError, Result};

pub(crate) const CONFIG_STORAGE_KEY: &str = "chat:config";

fn to_js(e: ChatError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Parse a JSON config; missing fields take their defaults.
pub(crate) fn parse_config(json: &[u8]) -> Result<ChatConfig> {
    Ok(serde_json::from_slice(json)?)
}

/// Shape of the value a `send()` promise resolves to
pub(crate) fn outcome_json(outcome: &TurnOutcome) -> Value {
    match outcome {
        TurnOutcome::Completed { message_id } => json!({
            "outcome": outcome.label(),
            "messageId": message_id,
        }),
        TurnOutcome::Failed { error } => json!({
            "outcome": outcome.label(),
            "error": error.to_string(),
            "message": error.user_message(),
        }),
        TurnOutcome::Cancelled | TurnOutcome::Superseded => json!({ "outcome": outcome.label() }),
    }
}

#[wasm_bindgen]
pub struct ChatApp {
    registry: Rc<SessionRegistry>,
    config_storage: Rc<dyn StoragePort>,
}

#[wasm_bindgen]
impl ChatApp {
    /// Build the app from a JS config object.
    ///
    /// With `undefined`/`null` the config saved by a previous run is restored,
    /// falling back to defaults.
    pub async fn create(config: JsValue) -> std::result::Result<ChatApp, JsValue> {
        let config_storage = auto_detect_storage().await;
        let config = if config.is_undefined() || config.is_null() {
            restore_config(config_storage.as_ref()).await
        } else {
            config
                .into_serde::<ChatConfig>()
                .map_err(|e| to_js(ChatError::Config(e.to_string())))?
        };
        save_config(config_storage.as_ref(), &config).await;

        let persistence = open_persistence(config.persistence.backend, &config.backend).await;
        let ports = ControllerPorts {
            backend: Rc::new(HttpChatBackend::new(config.backend.clone())),
            persistence,
            titles: Rc::new(HttpTitleGenerator::new(config.backend.clone())),
            timer: Rc::new(GlooTimer),
            spawner: Rc::new(WasmSpawner),
        };
        log::info!("Chat app ready (endpoint {})", config.backend.chat_url());

        Ok(ChatApp {
            registry: Rc::new(SessionRegistry::new(config, ports)),
            config_storage,
        })
    }

    /// Current configuration as a plain JS object
    pub fn config(&self) -> std::result::Result<JsValue, JsValue> {
        JsValue::from_serde(self.registry.config())
            .map_err(|e| to_js(ChatError::Serialization(e.to_string())))
    }

    #[wasm_bindgen(js_name = newSession)]
    pub fn new_session(&self, workspace_id: Option<String>) -> ChatSessionHandle {
        ChatSessionHandle {
            controller: self.registry.create(workspace_id),
        }
    }

    /// Resume a stored session; resolves to a `ChatSessionHandle`.
    #[wasm_bindgen(js_name = openSession)]
    pub fn open_session(&self, session: JsValue) -> Promise {
        let registry = self.registry.clone();
        future_to_promise(async move {
            let session: ChatSession = session
                .into_serde()
                .map_err(|e| to_js(ChatError::Serialization(e.to_string())))?;
            let controller = registry.open(session).await.map_err(to_js)?;
            Ok(ChatSessionHandle { controller }.into())
        })
    }

    /// Stop and soft-delete a session; resolves to whether persistence agreed.
    #[wasm_bindgen(js_name = deleteSession)]
    pub fn delete_session(&self, session_id: String) -> Promise {
        let registry = self.registry.clone();
        future_to_promise(async move {
            let deleted = registry.delete(&session_id).await.map_err(to_js)?;
            Ok(JsValue::from_bool(deleted))
        })
    }

    #[wasm_bindgen(js_name = sessionIds)]
    pub fn session_ids(&self) -> Vec<String> {
        self.registry.session_ids()
    }

    /// Persist a new configuration for the next start.
    #[wasm_bindgen(js_name = saveConfig)]
    pub fn save_config(&self, config: JsValue) -> Promise {
        let storage = self.config_storage.clone();
        future_to_promise(async move {
            let config: ChatConfig = config
                .into_serde()
                .map_err(|e| to_js(ChatError::Config(e.to_string())))?;
            save_config(storage.as_ref(), &config).await;
            Ok(JsValue::UNDEFINED)
        })
    }
}

#[wasm_bindgen]
pub struct ChatSessionHandle {
    controller: Rc<SessionStreamController>,
}

#[wasm_bindgen]
impl ChatSessionHandle {
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.controller.session_id()
    }

    #[wasm_bindgen(getter)]
    pub fn title(&self) -> String {
        self.controller.title()
    }

    /// `"idle" | "processing" | "streaming"`
    #[wasm_bindgen(getter)]
    pub fn status(&self) -> String {
        self.controller.status().as_str().to_string()
    }

    #[wasm_bindgen(getter, js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub fn messages(&self) -> std::result::Result<JsValue, JsValue> {
        JsValue::from_serde(&self.controller.messages())
            .map_err(|e| to_js(ChatError::Serialization(e.to_string())))
    }

    pub fn session(&self) -> std::result::Result<JsValue, JsValue> {
        JsValue::from_serde(&self.controller.session())
            .map_err(|e| to_js(ChatError::Serialization(e.to_string())))
    }

    /// Run one turn. Resolves to `{ outcome, ... }`; rejects only for an
    /// empty query or a deleted session.
    pub fn send(&self, query: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let outcome = controller.send(&query).await.map_err(to_js)?;
            JsValue::from_serde(&outcome_json(&outcome))
                .map_err(|e| to_js(ChatError::Serialization(e.to_string())))
        })
    }

    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    pub fn rename(&self, title: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.rename(&title).await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Attach file ids to every following query
    #[wasm_bindgen(js_name = setFileScope)]
    pub fn set_file_scope(&self, file_ids: Vec<String>) {
        self.controller.set_file_scope(file_ids);
    }

    /// Call `callback` with every controller event as a plain JS object.
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: Function) {
        self.controller.events().subscribe(move |event| {
            match JsValue::from_serde(event) {
                Ok(value) => {
                    if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                        log::warn!("Event callback threw: {:?}", e);
                    }
                }
                Err(e) => log::warn!("Could not serialize event: {}", e),
            }
        });
    }
}

async fn restore_config(storage: &dyn StoragePort) -> ChatConfig {
    match storage.get(CONFIG_STORAGE_KEY).await {
        Ok(Some(data)) => match parse_config(&data) {
            Ok(config) => {
                log::info!("Config restored from storage");
                config
            }
            Err(e) => {
                log::warn!("Stored config unreadable ({}), using defaults", e);
                ChatConfig::default()
            }
        },
        Ok(None) => ChatConfig::default(),
        Err(e) => {
            log::warn!("Could not read stored config: {}", e);
            ChatConfig::default()
        }
    }
}

async fn save_config(storage: &dyn StoragePort, config: &ChatConfig) {
    let result = match serde_json::to_vec(config) {
        Ok(json) => storage.set(CONFIG_STORAGE_KEY, &json).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(()) => log::debug!("Config saved to storage"),
        Err(e) => log::warn!("Could not save config: {}", e),
    }
}
