//! Access to the League client's local API.
//!
//! [`LocalClient`] is the surface the orchestrator consumes; [`LcuConnector`]
//! is the concrete implementation talking HTTPS and WAMP to the running client.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::AppError;

pub mod auth;
pub mod client;
pub mod metrics;
pub mod tls;
pub mod types;
pub mod wamp;

pub use client::LcuConnector;

pub type ClientEventRx = mpsc::Receiver<ClientEvent>;
pub type ClientEventTx = mpsc::Sender<ClientEvent>;

pub const GAMEFLOW_PHASE_EVENT: &str = "OnJsonApiEvent_lol-gameflow_v1_gameflow-phase";
pub const OWNED_CHAMPIONS_EVENT: &str = "OnJsonApiEvent_lol-champions_v1_owned-champions-minimal";
pub const PRE_SHUTDOWN_EVENT: &str = "OnJsonApiEvent_riotclient_pre-shutdown_begin";

/// How the client's port and auth token are located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Read them from the client process' command line.
    Process,
    /// Read the lockfile in the given install directory.
    Lockfile(PathBuf),
    /// Command line first, lockfile as fallback.
    ProcessThenLockfile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub auth: AuthStrategy,
    /// Attempts made inside a single `connect` call.
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EventType {
    Create,
    Update,
    Delete,
}

/// A push event delivered by the local client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEvent {
    pub name: String,
    pub uri: String,
    pub event_type: EventType,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait LocalClient: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn connect(&self, options: &ConnectOptions) -> Result<(), AppError>;

    async fn request(&self, method: Method, path: &str) -> Result<serde_json::Value, AppError>;

    /// Registers `event`; matching events are forwarded to the event channel.
    async fn subscribe(&self, event: &str, types: &[EventType]) -> Result<(), AppError>;

    async fn unsubscribe_all(&self) -> Result<(), AppError>;
}
