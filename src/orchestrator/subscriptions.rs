use tracing::{debug, warn};

use crate::error::AppError;
use crate::lcu::types::GameflowPhase;
use crate::lcu::{
    ClientEvent, EventType, GAMEFLOW_PHASE_EVENT, LocalClient, OWNED_CHAMPIONS_EVENT,
    PRE_SHUTDOWN_EVENT,
};

/// Events observed while connected, with the event types each one reacts to.
///
/// Shutdown is registered first so teardown stays observable when a later
/// registration fails.
pub const WATCHED_EVENTS: [(&str, &[EventType]); 3] = [
    (PRE_SHUTDOWN_EVENT, &[EventType::Create, EventType::Update]),
    (GAMEFLOW_PHASE_EVENT, &[EventType::Update]),
    (
        OWNED_CHAMPIONS_EVENT,
        &[EventType::Create, EventType::Update, EventType::Delete],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherReason {
    Connected,
    Retry,
    PhaseChanged(GameflowPhase),
    InventoryChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Gather(GatherReason),
    Shutdown,
    Ignore,
}

/// The set of push-event handlers currently registered with the client.
#[derive(Debug, Default)]
pub struct Subscriptions {
    armed: Vec<&'static str>,
}

impl Subscriptions {
    pub fn is_armed(&self) -> bool {
        !self.armed.is_empty()
    }

    pub fn armed(&self) -> &[&'static str] {
        &self.armed
    }

    pub fn is_complete(&self) -> bool {
        self.armed.len() == WATCHED_EVENTS.len()
    }

    /// Clears every registration, then registers the watched events.
    ///
    /// On failure the events registered so far stay armed; the rest are not routed.
    pub async fn arm(&mut self, client: &dyn LocalClient) -> Result<(), AppError> {
        if let Err(e) = client.unsubscribe_all().await {
            warn!(error = %e, "📡 ⚠️ Failed to clear subscriptions before arming");
        }
        self.armed.clear();

        for (event, types) in WATCHED_EVENTS {
            client.subscribe(event, types).await?;
            self.armed.push(event);
        }

        debug!(count = self.armed.len(), "📡 Subscriptions armed");
        Ok(())
    }

    /// Drops every registration. No-op when nothing is armed.
    pub async fn clear(&mut self, client: &dyn LocalClient) {
        if !self.is_armed() {
            return;
        }

        if let Err(e) = client.unsubscribe_all().await {
            warn!(error = %e, "📡 ⚠️ Failed to unsubscribe");
        }
        self.armed.clear();
        debug!("📡 Subscriptions cleared");
    }

    /// Decides what an incoming event should trigger.
    pub fn route(&self, event: &ClientEvent) -> Reaction {
        if !self.armed.iter().any(|name| *name == event.name) {
            return Reaction::Ignore;
        }

        match event.name.as_str() {
            GAMEFLOW_PHASE_EVENT => {
                match serde_json::from_value::<GameflowPhase>(event.data.clone()) {
                    Ok(phase) if phase.is_stable() => {
                        Reaction::Gather(GatherReason::PhaseChanged(phase))
                    }
                    Ok(phase) => {
                        debug!(?phase, "📡 Gameflow phase ignored");
                        Reaction::Ignore
                    }
                    Err(e) => {
                        debug!(error = %e, "📡 Unreadable gameflow phase");
                        Reaction::Ignore
                    }
                }
            }
            OWNED_CHAMPIONS_EVENT => Reaction::Gather(GatherReason::InventoryChanged),
            PRE_SHUTDOWN_EVENT => Reaction::Shutdown,
            _ => Reaction::Ignore,
        }
    }
}
