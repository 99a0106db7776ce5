pub mod http;
pub mod runtime;
pub mod storage;

#[cfg(test)]
mod tests;

pub use http::{HttpChatBackend, HttpPersistence, HttpTitleGenerator};
pub use runtime::{GlooTimer, WasmSpawner};
