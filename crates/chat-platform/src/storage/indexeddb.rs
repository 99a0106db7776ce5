//! IndexedDB storage backend.
//! Persistent across page reloads. Works in all modern browsers.
//! Uses web-sys bindings with wasm-bindgen-futures for async operations.

use async_trait::async_trait;
use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{IdbDatabase, IdbObjectStore, IdbRequest, IdbTransactionMode};

use chat_core::ports::StoragePort;
use chat_types::{ChatError, Result};

const DB_NAME: &str = "chat_sessions";
const STORE_NAME: &str = "kv";
const DB_VERSION: u32 = 1;

fn storage_error(e: JsValue) -> ChatError {
    ChatError::Storage(format!("{:?}", e))
}

pub struct IndexedDbStorage {
    db: IdbDatabase,
}

impl IndexedDbStorage {
    /// Open (or create) the IndexedDB database.
    pub async fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ChatError::Storage("No window object".to_string()))?;

        let idb_factory = window
            .indexed_db()
            .map_err(storage_error)?
            .ok_or_else(|| ChatError::Storage("IndexedDB not available".to_string()))?;

        let open_req = idb_factory
            .open_with_u32(DB_NAME, DB_VERSION)
            .map_err(storage_error)?;

        // First open (or version bump) creates the object store.
        let open_req_clone = open_req.clone();
        let onupgrade = Closure::once(move |_event: web_sys::Event| {
            match open_req_clone
                .result()
                .and_then(|db| db.dyn_into::<IdbDatabase>())
            {
                Ok(db) => {
                    if let Err(e) = db.create_object_store(STORE_NAME) {
                        log::debug!("Object store not created: {:?}", e);
                    }
                }
                Err(e) => log::warn!("IndexedDB upgrade without a database: {:?}", e),
            }
        });
        open_req.set_onupgradeneeded(Some(onupgrade.as_ref().unchecked_ref()));
        onupgrade.forget();

        let db: IdbDatabase = JsFuture::from(idb_request_to_promise(&open_req))
            .await
            .map_err(storage_error)?
            .dyn_into()
            .map_err(storage_error)?;

        Ok(Self { db })
    }

    fn store(&self, mode: IdbTransactionMode) -> Result<IdbObjectStore> {
        let tx = self
            .db
            .transaction_with_str_and_mode(STORE_NAME, mode)
            .map_err(storage_error)?;
        tx.object_store(STORE_NAME).map_err(storage_error)
    }
}

#[async_trait(?Send)]
impl StoragePort for IndexedDbStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let req = self
            .store(IdbTransactionMode::Readonly)?
            .get(&JsValue::from_str(key))
            .map_err(storage_error)?;
        let result = await_request(&req).await?;

        if result.is_undefined() || result.is_null() {
            return Ok(None);
        }
        Ok(Some(Uint8Array::new(&result).to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let req = self
            .store(IdbTransactionMode::Readwrite)?
            .put_with_key(&Uint8Array::from(value), &JsValue::from_str(key))
            .map_err(storage_error)?;
        await_request(&req).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let req = self
            .store(IdbTransactionMode::Readwrite)?
            .delete(&JsValue::from_str(key))
            .map_err(storage_error)?;
        await_request(&req).await?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let req = self
            .store(IdbTransactionMode::Readonly)?
            .get_all_keys()
            .map_err(storage_error)?;
        let array: Array = await_request(&req).await?.dyn_into().map_err(storage_error)?;

        let mut keys: Vec<String> = array
            .iter()
            .filter_map(|key| key.as_string())
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &str {
        "indexeddb"
    }
}

async fn await_request(req: &IdbRequest) -> Result<JsValue> {
    JsFuture::from(idb_request_to_promise(req))
        .await
        .map_err(storage_error)
}

/// Wrap the callback-based IDB request API into a Promise for `JsFuture`.
fn idb_request_to_promise(req: &IdbRequest) -> js_sys::Promise {
    let req_for_success = req.clone();
    let req_for_callbacks = req.clone();

    js_sys::Promise::new(&mut move |resolve, reject| {
        let req_inner = req_for_success.clone();
        let onsuccess = Closure::once(move |_: web_sys::Event| {
            let _ = resolve.call1(
                &JsValue::NULL,
                &req_inner.result().unwrap_or(JsValue::UNDEFINED),
            );
        });
        let onerror = Closure::once(move |_: web_sys::Event| {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("IDB request failed"));
        });
        req_for_callbacks.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
        req_for_callbacks.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onsuccess.forget();
        onerror.forget();
    })
}
