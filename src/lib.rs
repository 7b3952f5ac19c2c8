//! Multi-account login and live profile mirroring for the League client.
//!
//! The [`orchestrator`] drives a login through UI automation, waits for the
//! local client to accept a session, then keeps an [`AccountSnapshot`] of the
//! account up to date from push events until the client shuts down.

pub mod automation;
pub mod config;
pub mod error;
pub mod lcu;
pub mod logging;
pub mod orchestrator;
pub mod state;

pub use config::{Config, Timings};
pub use error::AppError;
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use state::{AccountSnapshot, ConnectionState, Credentials, Update};
