//! Browser timer and task spawner for the controller.

use std::future::Future;
use std::pin::Pin;

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use gloo_timers::future::TimeoutFuture;

use chat_core::ports::TimerPort;

/// `setTimeout`-backed sleeps
#[derive(Debug, Default, Clone, Copy)]
pub struct GlooTimer;

impl TimerPort for GlooTimer {
    fn sleep(&self, ms: u64) -> Pin<Box<dyn Future<Output = ()>>> {
        Box::pin(TimeoutFuture::new(u32::try_from(ms).unwrap_or(u32::MAX)))
    }
}

/// Runs background futures on the browser microtask queue
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmSpawner;

impl LocalSpawn for WasmSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}
