pub mod memory;
pub mod indexeddb;
pub mod auto;
pub mod session_store;

pub use memory::MemoryStorage;
pub use indexeddb::IndexedDbStorage;
pub use auto::{auto_detect_storage, open_persistence};
pub use session_store::KvPersistence;
