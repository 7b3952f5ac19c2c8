//! Login and live-sync orchestration.
//!
//! One [`Orchestrator`] task owns the connection state, the push-event
//! subscriptions and the latest snapshot of every account. Commands from the
//! presentation layer, completions of background work and client push events
//! all arrive through its mailboxes and are handled one at a time, so none of
//! that state is ever mutated concurrently.
//!
//! A flow starts with [`OrchestratorHandle::start_login`] (or
//! [`OrchestratorHandle::watch`]) and walks through injection, connection
//! polling and the first gather. Subscriptions are armed as soon as a session
//! exists. Later gathers are triggered by push events, or retried on the poll
//! interval until the flow has published its first snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::automation::UiAutomation;
use crate::config::Timings;
use crate::error::AppError;
use crate::lcu::{ClientEvent, ClientEventRx, ConnectOptions, LocalClient};
use crate::state::{AccountSnapshot, ConnectionState, Credentials, Update};

use login::LoginOutcome;
use monitor::MonitorOutcome;
use subscriptions::{GatherReason, Reaction, Subscriptions};

pub mod aggregator;
pub mod login;
pub mod monitor;
pub mod subscriptions;

pub type CommandRx = mpsc::Receiver<Command>;
pub type CommandTx = mpsc::Sender<Command>;
pub type UpdateRx = mpsc::UnboundedReceiver<Update>;
pub type UpdateTx = mpsc::UnboundedSender<Update>;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// MPSC messages from the presentation layer.
#[derive(Debug)]
pub enum Command {
    StartLogin(Credentials),
    Watch {
        username: String,
    },
    LatestSnapshot {
        username: String,
        respond_to: oneshot::Sender<Option<AccountSnapshot>>,
    },
}

/// Completions posted back by a flow's background tasks.
#[derive(Debug)]
enum Internal {
    Submitted {
        flow: u64,
    },
    LoginFailed {
        flow: u64,
    },
    Monitor {
        flow: u64,
        outcome: MonitorOutcome,
    },
    GatherDue {
        flow: u64,
        reason: GatherReason,
    },
    Gathered {
        flow: u64,
        seq: u64,
        result: Result<AccountSnapshot, AppError>,
    },
}

/// The account the current flow logs into or watches.
#[derive(Debug)]
struct Session {
    flow: u64,
    username: String,
    /// Whether this flow has published a snapshot yet.
    published: bool,
}

/// Timers belonging to the current flow. At most one of each kind exists.
#[derive(Debug, Default)]
struct FlowTasks {
    login: Option<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
    /// Grace delay after connecting, or a scheduled gather retry.
    pending_gather: Option<JoinHandle<()>>,
}

impl FlowTasks {
    fn replace(slot: &mut Option<JoinHandle<()>>, task: JoinHandle<()>) {
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    fn cancel(slot: &mut Option<JoinHandle<()>>) {
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    fn cancel_all(&mut self) {
        Self::cancel(&mut self.login);
        Self::cancel(&mut self.monitor);
        Self::cancel(&mut self.pending_gather);
    }
}

pub struct Orchestrator {
    timings: Timings,
    connect: ConnectOptions,
    automation: Option<Arc<dyn UiAutomation>>,
    client: Arc<dyn LocalClient>,
    commands: CommandRx,
    events: ClientEventRx,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    updates: UpdateTx,
    state: watch::Sender<ConnectionState>,
    session: Option<Session>,
    tasks: FlowTasks,
    subscriptions: Subscriptions,
    snapshots: HashMap<String, AccountSnapshot>,
    next_flow: u64,
    next_gather: u64,
    last_published: u64,
}

impl Orchestrator {
    pub fn new(
        timings: Timings,
        connect: ConnectOptions,
        client: Arc<dyn LocalClient>,
        events: ClientEventRx,
        updates: UpdateTx,
    ) -> (Self, OrchestratorHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let orchestrator = Self {
            timings,
            connect,
            automation: None,
            client,
            commands: command_rx,
            events,
            internal_tx,
            internal_rx,
            updates,
            state: state_tx,
            session: None,
            tasks: FlowTasks::default(),
            subscriptions: Subscriptions::default(),
            snapshots: HashMap::new(),
            next_flow: 0,
            next_gather: 0,
            last_published: 0,
        };

        let handle = OrchestratorHandle {
            commands: command_tx,
            state: state_rx,
        };

        (orchestrator, handle)
    }

    /// Backend used to type credentials. Without one, logins are refused.
    pub fn with_automation(mut self, automation: Arc<dyn UiAutomation>) -> Self {
        self.automation = Some(automation);
        self
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(mut self) {
        info!("🧭 Orchestrator started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(internal) = self.internal_rx.recv() => self.handle_internal(internal).await,
                Some(event) = self.events.recv() => self.handle_event(event).await,
            }
        }

        self.tasks.cancel_all();
        self.subscriptions.clear(self.client.as_ref()).await;
        info!("🧭 Orchestrator stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartLogin(credentials) => self.start_login(credentials).await,
            Command::Watch { username } => {
                let flow = self.begin_flow(username).await;
                self.start_monitor(flow).await;
            }
            Command::LatestSnapshot {
                username,
                respond_to,
            } => {
                let _ = respond_to.send(self.snapshots.get(&username).cloned());
            }
        }
    }

    async fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::Submitted { flow } if self.is_current(flow) => {
                self.tasks.login = None;
                self.start_monitor(flow).await;
            }
            Internal::LoginFailed { flow } if self.is_current(flow) => {
                self.tasks.login = None;
                self.session = None;
            }
            Internal::Monitor { flow, outcome } if self.is_current(flow) => match outcome {
                MonitorOutcome::Connected { polls } => self.on_connected(flow, polls).await,
                MonitorOutcome::TimedOut { attempts } => self.on_connection_timeout(attempts),
            },
            Internal::GatherDue { flow, reason } if self.is_current(flow) => {
                self.tasks.pending_gather = None;
                self.spawn_gather(reason);
            }
            Internal::Gathered { flow, seq, result } => self.on_gathered(flow, seq, result).await,
            other => debug!(message = ?other, "🧭 Message from a superseded flow dropped"),
        }
    }

    async fn handle_event(&mut self, event: ClientEvent) {
        match self.subscriptions.route(&event) {
            Reaction::Gather(reason) => self.spawn_gather(reason),
            Reaction::Shutdown => self.on_pre_shutdown().await,
            Reaction::Ignore => debug!(event = %event.name, "📡 Event ignored"),
        }
    }

    fn is_current(&self, flow: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.flow == flow)
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&mut self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            info!(from = %previous, to = %state, "🔌 Connection state changed");
        }
    }

    /// Supersedes whatever flow was running.
    ///
    /// The previous session's timers and subscriptions are torn down and the
    /// state drops to `Disconnected`, so nothing gathered for the old account
    /// can be published under the new username.
    async fn begin_flow(&mut self, username: String) -> u64 {
        self.tasks.cancel_all();
        self.subscriptions.clear(self.client.as_ref()).await;
        self.set_state(ConnectionState::Disconnected);
        self.next_flow += 1;

        let flow = self.next_flow;
        let session = Session {
            flow,
            username,
            published: false,
        };
        if let Some(previous) = self.session.replace(session) {
            debug!(previous = %previous.username, "🧭 Previous flow superseded");
        }

        flow
    }

    #[instrument(skip_all, fields(username = %credentials.username()))]
    async fn start_login(&mut self, credentials: Credentials) {
        let Some(automation) = self.automation.clone() else {
            error!("🔑 ❌ No UI automation backend configured, login ignored");
            return;
        };

        let flow = self.begin_flow(credentials.username().to_string()).await;
        let tx = self.internal_tx.clone();
        let backoff = self.timings.injection_retry_backoff;
        let settle = self.timings.login_settle_delay;

        let task = tokio::spawn(async move {
            let outcome = login::inject_with_retry(automation.as_ref(), &credentials, backoff).await;
            drop(credentials);

            match outcome {
                LoginOutcome::Submitted { .. } => {
                    tokio::time::sleep(settle).await;
                    let _ = tx.send(Internal::Submitted { flow });
                }
                LoginOutcome::Failed => {
                    let _ = tx.send(Internal::LoginFailed { flow });
                }
            }
        });

        FlowTasks::replace(&mut self.tasks.login, task);
    }

    async fn start_monitor(&mut self, flow: u64) {
        self.subscriptions.clear(self.client.as_ref()).await;
        self.set_state(ConnectionState::Connecting);

        let client = self.client.clone();
        let options = self.connect.clone();
        let timings = self.timings;
        let tx = self.internal_tx.clone();

        let task = tokio::spawn(async move {
            let outcome = monitor::watch_connection(client, options, timings).await;
            let _ = tx.send(Internal::Monitor { flow, outcome });
        });

        FlowTasks::replace(&mut self.tasks.monitor, task);
    }

    async fn on_connected(&mut self, flow: u64, polls: u32) {
        FlowTasks::cancel(&mut self.tasks.monitor);
        self.set_state(ConnectionState::Connected);
        info!(polls, "🔌 ✅ Local client session established");

        if let Err(e) = self.subscriptions.arm(self.client.as_ref()).await {
            warn!(error = %e, "📡 ⚠️ Arming subscriptions failed, retried after the first gather");
        }

        self.schedule_gather(flow, self.timings.connect_grace_delay, GatherReason::Connected);
    }

    fn schedule_gather(&mut self, flow: u64, delay: Duration, reason: GatherReason) {
        let tx = self.internal_tx.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Internal::GatherDue { flow, reason });
        });

        FlowTasks::replace(&mut self.tasks.pending_gather, task);
    }

    fn on_connection_timeout(&mut self, attempts: u32) {
        FlowTasks::cancel(&mut self.tasks.monitor);
        self.set_state(ConnectionState::Disconnected);

        if let Some(session) = self.session.take() {
            error!(
                username = %session.username,
                error = %AppError::ConnectionTimeout { attempts },
                "🔌 ❌ Giving up on the local client"
            );
            let _ = self.updates.send(Update::ConnectionTimeout {
                username: session.username,
                attempts,
            });
        }
    }

    fn spawn_gather(&mut self, reason: GatherReason) {
        let Some(session) = &self.session else {
            debug!(?reason, "📥 No active session, gather skipped");
            return;
        };

        if self.connection_state() != ConnectionState::Connected {
            debug!(?reason, "📥 Not connected, gather skipped");
            return;
        }

        self.next_gather += 1;

        let seq = self.next_gather;
        let flow = session.flow;
        let username = session.username.clone();
        let client = self.client.clone();
        let options = self.connect.clone();
        let tx = self.internal_tx.clone();

        debug!(seq, ?reason, "📥 Gather started");

        tokio::spawn(async move {
            let result = aggregator::gather(client.as_ref(), &options, &username).await;
            let _ = tx.send(Internal::Gathered { flow, seq, result });
        });
    }

    async fn on_gathered(
        &mut self,
        flow: u64,
        seq: u64,
        result: Result<AccountSnapshot, AppError>,
    ) {
        if !self.is_current(flow) {
            debug!(seq, "📥 Gather from a superseded flow discarded");
            return;
        }

        if self.connection_state() != ConnectionState::Connected {
            debug!(seq, "📥 Gather finished after disconnect, discarded");
            return;
        }

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(seq, error = %e, "📥 ⚠️ Gather failed, previous snapshot kept");
                if !self.session.as_ref().is_some_and(|s| s.published) {
                    self.retry_first_gather(flow).await;
                }
                return;
            }
        };

        if seq < self.last_published {
            debug!(seq, last_published = self.last_published, "📥 Stale gather discarded");
            return;
        }

        match self.subscriptions.arm(self.client.as_ref()).await {
            Ok(()) => FlowTasks::cancel(&mut self.tasks.pending_gather),
            Err(e) => {
                warn!(error = %e, "📡 ⚠️ Arming subscriptions failed, retried on next gather");
                self.schedule_gather(flow, self.timings.poll_interval, GatherReason::Retry);
            }
        }

        if let Some(session) = self.session.as_mut() {
            session.published = true;
        }
        self.last_published = seq;
        self.snapshots
            .insert(snapshot.username.clone(), snapshot.clone());

        info!(
            seq,
            username = %snapshot.username,
            summoner = %snapshot.summoner_name,
            "📥 ✅ Snapshot published"
        );

        let update = Update::SnapshotUpdated {
            username: snapshot.username.clone(),
            snapshot,
        };
        if self.updates.send(update).is_err() {
            debug!("📥 Update inbox closed");
        }
    }

    /// Without a first snapshot no push event is guaranteed to come, so the
    /// gather is retried on the poll interval. A session lost in the meantime
    /// goes back to bounded connection monitoring.
    async fn retry_first_gather(&mut self, flow: u64) {
        if self.client.is_connected() {
            debug!(
                delay_secs = self.timings.poll_interval.as_secs(),
                "📥 First gather failed, retrying"
            );
            self.schedule_gather(flow, self.timings.poll_interval, GatherReason::Retry);
        } else {
            info!("🔌 Session lost before the first snapshot, monitoring again");
            self.start_monitor(flow).await;
        }
    }

    async fn on_pre_shutdown(&mut self) {
        info!("🛑 Local client is shutting down");

        self.subscriptions.clear(self.client.as_ref()).await;
        self.tasks.cancel_all();
        self.set_state(ConnectionState::Disconnected);
        self.session = None;
    }
}

/// Cloneable entry point for the presentation layer.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    commands: CommandTx,
    state: watch::Receiver<ConnectionState>,
}

impl OrchestratorHandle {
    /// Queues a login. The outcome only shows up as published updates.
    pub async fn start_login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), AppError> {
        let credentials = Credentials::new(username, password)?;
        self.send(Command::StartLogin(credentials)).await
    }

    /// Mirrors an account already logged in by hand.
    pub async fn watch(&self, username: impl Into<String>) -> Result<(), AppError> {
        let username = username.into();
        if username.is_empty() {
            return Err(AppError::EmptyCredentials);
        }
        self.send(Command::Watch { username }).await
    }

    pub async fn latest_snapshot(
        &self,
        username: impl Into<String>,
    ) -> Result<Option<AccountSnapshot>, AppError> {
        let (respond_to, response) = oneshot::channel();
        self.send(Command::LatestSnapshot {
            username: username.into(),
            respond_to,
        })
        .await?;

        response.await.map_err(|_| AppError::OrchestratorClosed)
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    async fn send(&self, command: Command) -> Result<(), AppError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::OrchestratorClosed)
    }
}
