//! Multi-session orchestration core for an external agent runtime.
//!
//! Harbor fronts a long-running conversational agent with a multi-session
//! API that supports concurrent clients, live progress streaming over an
//! in-process event bus, cooperative cancellation, and transparent recovery
//! when a resumed conversation handle has expired server-side. This crate
//! holds the orchestration pieces: the event bus, the session store, the
//! cancellation registry, the turn runner, and the lifecycle coordinator
//! that ties them together. The agent runtime itself and the transport
//! layer are external collaborators reached through `harbor-runtime` and
//! the [`SessionService`] / [`EventBus`] APIs.

pub mod cancel;
pub mod config;
pub mod errors;
pub mod events;
pub mod message;
pub mod runner;
pub mod service;
pub mod store;

pub use cancel::*;
pub use config::*;
pub use errors::*;
pub use events::*;
pub use message::*;
pub use runner::*;
pub use service::*;
pub use store::*;
