//! Chat App — WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It assembles all platform adapters and exposes them to JavaScript
//! as `ChatApp` and `ChatSessionHandle`.

mod app;


pub use app::{ChatApp, ChatSessionHandle};

use wasm_bindgen::prelude::*;

/// WASM entry point — runs once when the module is instantiated
#[wasm_bindgen(start)]
pub fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Chat WASM starting...");
}
