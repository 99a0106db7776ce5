pub mod cancellation;
pub mod controller;
pub mod event_bus;
pub mod parser;
pub mod persistence;
pub mod ports;
pub mod registry;
pub mod store;
pub mod title;


pub use cancellation::{CancelReason, CancelSignal, CancellationToken};
pub use controller::{ControllerPorts, SessionStreamController, TurnOutcome};
pub use event_bus::EventBus;
pub use parser::StreamParser;
pub use registry::SessionRegistry;
