//! Backend selection from configuration.
//!
//! Priority for `Auto`: IndexedDB → Memory (fallback)

use std::rc::Rc;

use chat_core::ports::{PersistencePort, StoragePort};
use chat_types::config::{BackendConfig, PersistenceBackendType};

use super::{IndexedDbStorage, KvPersistence, MemoryStorage};
use crate::http::HttpPersistence;

/// Try to open the best available storage backend.
/// Never fails: memory is always available.
pub async fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match IndexedDbStorage::open().await {
        Ok(idb) => {
            log::info!("Storage backend: IndexedDB");
            Rc::new(idb)
        }
        Err(e) => {
            log::warn!("IndexedDB unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}

/// Build the session persistence named by `kind`.
pub async fn open_persistence(
    kind: PersistenceBackendType,
    backend: &BackendConfig,
) -> Rc<dyn PersistencePort> {
    log::info!("Persistence backend: {}", kind.label());
    match kind {
        PersistenceBackendType::Http => Rc::new(HttpPersistence::new(backend.clone())),
        PersistenceBackendType::Memory => {
            Rc::new(KvPersistence::new(Rc::new(MemoryStorage::new())))
        }
        PersistenceBackendType::Auto => Rc::new(KvPersistence::new(auto_detect_storage().await)),
        PersistenceBackendType::IndexedDb => match IndexedDbStorage::open().await {
            Ok(idb) => Rc::new(KvPersistence::new(Rc::new(idb))),
            Err(e) => {
                log::warn!("IndexedDB requested but unavailable ({}), using memory", e);
                Rc::new(KvPersistence::new(Rc::new(MemoryStorage::new())))
            }
        },
    }
}
