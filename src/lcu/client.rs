use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use reqwest::Method;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::Connector;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use super::auth::{self, ClientCredentials};
use super::metrics::RequestMetrics;
use super::{
    AuthStrategy, ClientEvent, ClientEventTx, ConnectOptions, EventType, LocalClient, tls, wamp,
};
use crate::error::AppError;

const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

type Registry = Arc<RwLock<HashMap<String, Vec<EventType>>>>;

/// One open connection: HTTP credentials plus the event socket tasks.
struct Session {
    credentials: ClientCredentials,
    outgoing: mpsc::UnboundedSender<String>,
    alive: Arc<AtomicBool>,
    tasks: [JoinHandle<()>; 2],
}

impl Session {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

pub struct LcuConnector {
    http: reqwest::Client,
    tls: Arc<rustls::ClientConfig>,
    session: Mutex<Option<Session>>,
    /// Serializes `connect` calls.
    connecting: tokio::sync::Mutex<()>,
    registry: Registry,
    events: ClientEventTx,
    metrics: Arc<RequestMetrics>,
}

impl LcuConnector {
    pub fn new(events: ClientEventTx) -> Result<Self, AppError> {
        let tls = tls::loopback_client_config()?;
        let http = reqwest::Client::builder()
            .use_preconfigured_tls(rustls::ClientConfig::clone(&tls))
            .build()?;

        Ok(Self {
            http,
            tls,
            session: Mutex::new(None),
            connecting: tokio::sync::Mutex::new(()),
            registry: Arc::new(RwLock::new(HashMap::new())),
            events,
            metrics: RequestMetrics::new(),
        })
    }

    pub fn metrics(&self) -> Arc<RequestMetrics> {
        self.metrics.clone()
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_credentials(&self) -> Option<ClientCredentials> {
        self.session()
            .as_ref()
            .filter(|session| session.is_alive())
            .map(|session| session.credentials.clone())
    }

    fn drop_session(&self) {
        if self.session().take().is_some() {
            info!("🔌 Local client session dropped");
        }
    }

    async fn open_session(&self, strategy: &AuthStrategy) -> Result<Session, AppError> {
        let strategy = strategy.clone();
        let credentials = tokio::task::spawn_blocking(move || auth::discover(&strategy))
            .await
            .map_err(|e| AppError::Connection(e.to_string()))??;

        let mut request = credentials.ws_url().into_client_request()?;
        let authorization = HeaderValue::from_str(&credentials.authorization_header())
            .map_err(|e| AppError::Connection(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, authorization);
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("wamp"));

        let (socket, _) = tokio_tungstenite::connect_async_tls_with_config(
            request,
            None,
            false,
            Some(Connector::Rustls(self.tls.clone())),
        )
        .await?;
        let (mut sink, stream) = socket.split();

        let alive = Arc::new(AtomicBool::new(true));
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();

        // Registrations outlive a dropped socket; replay them on the new one.
        for name in read_registry(&self.registry).keys() {
            let _ = outgoing.send(wamp::subscribe_frame(name));
        }

        let writer_alive = alive.clone();
        let writer = tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    warn!(error = %e, "🔌 ⚠️ Failed to write to event socket");
                    break;
                }
            }
            writer_alive.store(false, Ordering::SeqCst);
        });

        let reader = tokio::spawn(read_events(
            stream,
            self.registry.clone(),
            self.events.clone(),
            alive.clone(),
        ));

        Ok(Session {
            credentials,
            outgoing,
            alive,
            tasks: [writer, reader],
        })
    }
}

#[async_trait]
impl LocalClient for LcuConnector {
    fn is_connected(&self) -> bool {
        self.session()
            .as_ref()
            .is_some_and(|session| session.is_alive())
    }

    async fn connect(&self, options: &ConnectOptions) -> Result<(), AppError> {
        let _guard = self.connecting.lock().await;

        if self.is_connected() {
            return Ok(());
        }

        let mut last_error = None;

        for attempt in 1..=options.max_attempts {
            match self.open_session(&options.auth).await {
                Ok(session) => {
                    info!(attempt, port = session.credentials.port, "🔌 ✅ Connected to local client");
                    *self.session() = Some(session);
                    return Ok(());
                }
                Err(e) => {
                    debug!(attempt, error = %e, "🔌 Connect attempt failed");
                    last_error = Some(e);
                    if attempt < options.max_attempts {
                        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(AppError::Connection(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no connect attempt made".into()),
        ))
    }

    async fn request(&self, method: Method, path: &str) -> Result<Value, AppError> {
        let credentials = self.live_credentials().ok_or(AppError::NotConnected)?;

        let result = send_request(&self.http, &credentials, method, path, &self.metrics).await;

        if let Err(AppError::Http(e)) = &result {
            if e.is_connect() || e.is_timeout() {
                self.drop_session();
            }
        }

        result
    }

    async fn subscribe(&self, event: &str, types: &[EventType]) -> Result<(), AppError> {
        let failed = |message: &str| AppError::Subscription {
            event: event.to_string(),
            message: message.to_string(),
        };

        write_registry(&self.registry).insert(event.to_string(), types.to_vec());

        let sent = self
            .session()
            .as_ref()
            .filter(|session| session.is_alive())
            .map(|session| session.outgoing.send(wamp::subscribe_frame(event)).is_ok());

        match sent {
            Some(true) => {
                debug!(event, "📡 Subscribed");
                Ok(())
            }
            Some(false) => {
                write_registry(&self.registry).remove(event);
                Err(failed("event socket closed"))
            }
            None => {
                write_registry(&self.registry).remove(event);
                Err(failed("not connected"))
            }
        }
    }

    async fn unsubscribe_all(&self) -> Result<(), AppError> {
        let names: Vec<String> = write_registry(&self.registry)
            .drain()
            .map(|(name, _)| name)
            .collect();

        if let Some(session) = self.session().as_ref() {
            for name in &names {
                let _ = session.outgoing.send(wamp::unsubscribe_frame(name));
            }
        }

        debug!(count = names.len(), "📡 Unsubscribed from all events");
        Ok(())
    }
}

fn read_registry(
    registry: &Registry,
) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<EventType>>> {
    registry.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_registry(
    registry: &Registry,
) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<EventType>>> {
    registry.write().unwrap_or_else(PoisonError::into_inner)
}

fn is_registered(registry: &Registry, event: &ClientEvent) -> bool {
    read_registry(registry)
        .get(&event.name)
        .is_some_and(|types| types.contains(&event.event_type))
}

/// Forwards registered events in arrival order until the socket closes.
async fn read_events<S>(mut stream: S, registry: Registry, events: ClientEventTx, alive: Arc<AtomicBool>)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let Some(event) = wamp::parse_event(&text) else {
                    continue;
                };
                if !is_registered(&registry, &event) {
                    continue;
                }
                if events.send(event).await.is_err() {
                    debug!("📡 Event receiver dropped");
                    break;
                }
            }
            Ok(Message::Close(frame)) => {
                info!(?frame, "🔌 Event socket closed by client");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "🔌 ⚠️ Event socket error");
                break;
            }
        }
    }

    alive.store(false, Ordering::SeqCst);
}

/// Helper function which wraps the shared request logic.
async fn send_request(
    http: &reqwest::Client,
    credentials: &ClientCredentials,
    method: Method,
    path: &str,
    metrics: &RequestMetrics,
) -> Result<Value, AppError> {
    metrics.inc();
    tracing::trace!("[LCU::CLIENT] {} {}", method, path);

    let url = format!("{}{}", credentials.base_url(), path);
    let res = http
        .request(method.clone(), url)
        .basic_auth(credentials.user(), Some(&credentials.token))
        .send()
        .await
        .inspect_err(|_| metrics.inc_failure())?;

    let status = res.status();
    if !status.is_success() {
        metrics.inc_failure();
        return Err(AppError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
        });
    }

    let body = res.bytes().await?;
    if body.is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(&body)?)
}
