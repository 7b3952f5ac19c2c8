//! Scripted collaborators and fixtures for orchestrator integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use shunpo::automation::{ControlSet, UiAutomation};
use shunpo::lcu::{AuthStrategy, ClientEvent, ClientEventTx, ConnectOptions, EventType, LocalClient};
use shunpo::orchestrator::aggregator::{
    OWNED_CHAMPIONS_PATH, PHONE_VERIFIED_PATH, RANKED_STATS_PATH, SUMMONER_PATH,
};
use shunpo::orchestrator::{Orchestrator, OrchestratorHandle, UpdateRx};
use shunpo::{AppError, Timings, Update};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

// ============================================================================
// Local client
// ============================================================================

/// In-memory local client. Connects succeed according to a script and every
/// path answers with queued JSON bodies, the last one repeating.
pub struct FakeClient {
    connected: AtomicBool,
    connecting: tokio::sync::Mutex<()>,
    connect_script: Mutex<VecDeque<bool>>,
    connect_default: AtomicBool,
    connect_latency: Mutex<Duration>,
    connect_calls: Mutex<Vec<Instant>>,
    connects_in_flight: AtomicU32,
    max_connects_in_flight: AtomicU32,
    responses: Mutex<HashMap<String, VecDeque<Value>>>,
    delays: Mutex<HashMap<String, VecDeque<Duration>>>,
    failures: Mutex<HashMap<String, u32>>,
    subscribe_failures: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<String>>,
    subscribe_calls: AtomicU32,
    unsubscribe_all_calls: AtomicU32,
    registrations: Mutex<Vec<String>>,
}

impl FakeClient {
    /// A client whose connects succeed, answering with [`account_fixture`].
    pub fn new() -> Arc<Self> {
        let client = Self {
            connected: AtomicBool::new(false),
            connecting: tokio::sync::Mutex::new(()),
            connect_script: Mutex::new(VecDeque::new()),
            connect_default: AtomicBool::new(true),
            connect_latency: Mutex::new(Duration::ZERO),
            connect_calls: Mutex::new(Vec::new()),
            connects_in_flight: AtomicU32::new(0),
            max_connects_in_flight: AtomicU32::new(0),
            responses: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            subscribe_failures: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            subscribe_calls: AtomicU32::new(0),
            unsubscribe_all_calls: AtomicU32::new(0),
            registrations: Mutex::new(Vec::new()),
        };

        for (path, body) in account_fixture("Faker", true, true) {
            client.respond(path, vec![body]);
        }

        Arc::new(client)
    }

    /// Replaces the queued bodies for `path`.
    pub fn respond(&self, path: &str, bodies: Vec<Value>) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), bodies.into());
    }

    /// Delays the next request to `path`.
    pub fn delay_next(&self, path: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(delay);
    }

    pub fn fail_next(&self, path: &str, times: u32) {
        self.failures.lock().unwrap().insert(path.to_string(), times);
    }

    /// Refuses the next `times` registrations of `event`.
    pub fn fail_subscribe(&self, event: &str, times: u32) {
        self.subscribe_failures
            .lock()
            .unwrap()
            .insert(event.to_string(), times);
    }

    pub fn script_connects(&self, results: &[bool]) {
        self.connect_script.lock().unwrap().extend(results);
    }

    pub fn set_connect_default(&self, succeeds: bool) {
        self.connect_default.store(succeeds, Ordering::SeqCst);
    }

    pub fn set_connect_latency(&self, latency: Duration) {
        *self.connect_latency.lock().unwrap() = latency;
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> Vec<Instant> {
        self.connect_calls.lock().unwrap().clone()
    }

    pub fn max_connects_in_flight(&self) -> u32 {
        self.max_connects_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|p| *p == path)
            .count()
    }

    pub fn subscribe_calls(&self) -> u32 {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_all_calls(&self) -> u32 {
        self.unsubscribe_all_calls.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> Vec<String> {
        self.registrations.lock().unwrap().clone()
    }

    fn next_body(&self, path: &str) -> Option<Value> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn take_failure(&self, path: &str) -> bool {
        take_scripted(&self.failures, path)
    }
}

fn take_scripted(scripted: &Mutex<HashMap<String, u32>>, key: &str) -> bool {
    let mut scripted = scripted.lock().unwrap();
    match scripted.get_mut(key) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

#[async_trait]
impl LocalClient for FakeClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self, _options: &ConnectOptions) -> Result<(), AppError> {
        let in_flight = self.connects_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_connects_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        let result = async {
            let _guard = self.connecting.lock().await;
            if self.is_connected() {
                return Ok(());
            }

            self.connect_calls.lock().unwrap().push(Instant::now());
            let latency = *self.connect_latency.lock().unwrap();
            tokio::time::sleep(latency).await;

            let succeeds = self
                .connect_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.connect_default.load(Ordering::SeqCst));

            if succeeds {
                self.set_connected(true);
                Ok(())
            } else {
                Err(AppError::Connection("client is not running".into()))
            }
        }
        .await;

        self.connects_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn request(&self, method: Method, path: &str) -> Result<Value, AppError> {
        self.requests.lock().unwrap().push(path.to_string());
        let body = self.next_body(path);

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(|queue| queue.pop_front());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if !self.is_connected() {
            return Err(AppError::NotConnected);
        }

        let status = |status| AppError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status,
        };

        if self.take_failure(path) {
            return Err(status(500));
        }

        body.ok_or_else(|| status(404))
    }

    async fn subscribe(&self, event: &str, _types: &[EventType]) -> Result<(), AppError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if take_scripted(&self.subscribe_failures, event) {
            return Err(AppError::Subscription {
                event: event.to_string(),
                message: "registration refused".into(),
            });
        }
        self.registrations.lock().unwrap().push(event.to_string());
        Ok(())
    }

    async fn unsubscribe_all(&self) -> Result<(), AppError> {
        self.unsubscribe_all_calls.fetch_add(1, Ordering::SeqCst);
        self.registrations.lock().unwrap().clear();
        Ok(())
    }
}

// ============================================================================
// UI automation
// ============================================================================

/// Login window that cannot be focused for the first `failures` attempts.
pub struct FakeAutomation {
    failures_left: AtomicU32,
    attempts: Mutex<Vec<Instant>>,
    typed: Mutex<Vec<(usize, String)>>,
    clicked: Mutex<Vec<usize>>,
}

impl FakeAutomation {
    pub fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicU32::new(failures),
            attempts: Mutex::new(Vec::new()),
            typed: Mutex::new(Vec::new()),
            clicked: Mutex::new(Vec::new()),
        })
    }

    pub fn working() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn typed(&self) -> Vec<(usize, String)> {
        self.typed.lock().unwrap().clone()
    }

    pub fn clicked(&self) -> Vec<usize> {
        self.clicked.lock().unwrap().clone()
    }
}

#[async_trait]
impl UiAutomation for FakeAutomation {
    async fn focus_target(&self) -> Result<(), AppError> {
        self.attempts.lock().unwrap().push(Instant::now());

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::Injection("login window not found".into()));
        }
        Ok(())
    }

    async fn find_edit_controls(&self) -> Result<ControlSet, AppError> {
        Ok(ControlSet { count: 2 })
    }

    async fn input_text(&self, index: usize, text: &str) -> bool {
        self.typed.lock().unwrap().push((index, text.to_string()));
        true
    }

    async fn find_button_controls(&self) -> Result<ControlSet, AppError> {
        Ok(ControlSet { count: 4 })
    }

    async fn click_button(&self, index: usize) -> bool {
        self.clicked.lock().unwrap().push(index);
        true
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub client: Arc<FakeClient>,
    pub automation: Arc<FakeAutomation>,
    pub handle: OrchestratorHandle,
    pub events: ClientEventTx,
    pub updates: UpdateRx,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn start(client: Arc<FakeClient>, automation: Arc<FakeAutomation>) -> Self {
        Self::with_timings(client, automation, Timings::default())
    }

    pub fn with_timings(
        client: Arc<FakeClient>,
        automation: Arc<FakeAutomation>,
        timings: Timings,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let (orchestrator, handle) = Orchestrator::new(
            timings,
            connect_options(),
            client.clone(),
            events_rx,
            updates_tx,
        );
        let task = orchestrator.with_automation(automation.clone()).start();

        Self {
            client,
            automation,
            handle,
            events: events_tx,
            updates: updates_rx,
            task,
        }
    }

    /// Next published update, failing the test after an hour of virtual time.
    pub async fn next_update(&mut self) -> Update {
        tokio::time::timeout(Duration::from_secs(3600), self.updates.recv())
            .await
            .expect("no update published")
            .expect("update channel closed")
    }

    /// Lets `duration` of virtual time pass, then asserts nothing was published.
    pub async fn assert_quiet_for(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
        if let Ok(update) = self.updates.try_recv() {
            panic!("unexpected update: {update:?}");
        }
    }

    pub async fn push(&self, name: &str, data: Value) {
        self.events
            .send(event(name, data))
            .await
            .expect("orchestrator stopped");
    }
}

pub fn connect_options() -> ConnectOptions {
    ConnectOptions {
        auth: AuthStrategy::Process,
        max_attempts: 1,
    }
}

pub fn event(name: &str, data: Value) -> ClientEvent {
    ClientEvent {
        name: name.to_string(),
        uri: String::new(),
        event_type: EventType::Update,
        data,
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn summoner(game_name: &str) -> Value {
    json!({
        "accountId": 22_417_312,
        "summonerId": 19_887_354,
        "puuid": "6c1b0b3e-1b77-5a6c-9c43-2f2c3c1f8d1e",
        "gameName": game_name,
        "tagLine": "KR1",
        "displayName": "",
        "summonerLevel": 512,
        "profileIconId": 6,
    })
}

pub fn ranked(solo: bool, flex: bool) -> Value {
    let mut queues = Vec::new();
    if solo {
        queues.push(json!({
            "queueType": "RANKED_SOLO_5x5",
            "tier": "CHALLENGER",
            "division": "I",
            "leaguePoints": 1204,
            "wins": 310,
            "losses": 251,
            "previousSeasonEndTier": "CHALLENGER",
            "previousSeasonEndDivision": "I",
        }));
    }
    if flex {
        queues.push(json!({
            "queueType": "RANKED_FLEX_SR",
            "tier": "DIAMOND",
            "division": "II",
            "leaguePoints": 40,
            "wins": 21,
            "losses": 17,
            "previousSeasonEndTier": "",
            "previousSeasonEndDivision": "",
        }));
    }
    queues.push(json!({ "queueType": "RANKED_TFT", "tier": "GOLD", "division": "IV" }));

    json!({ "queues": queues })
}

pub fn owned_champions() -> Value {
    json!([
        { "id": 7, "name": "LeBlanc" },
        { "id": 61, "name": "Orianna" },
        { "id": 238, "name": "Zed" },
    ])
}

/// Bodies for the four gather queries.
pub fn account_fixture(game_name: &str, solo: bool, flex: bool) -> Vec<(&'static str, Value)> {
    vec![
        (SUMMONER_PATH, summoner(game_name)),
        (RANKED_STATS_PATH, ranked(solo, flex)),
        (PHONE_VERIFIED_PATH, json!(true)),
        (OWNED_CHAMPIONS_PATH, owned_champions()),
    ]
}
