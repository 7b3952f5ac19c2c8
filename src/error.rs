use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Credential injection failed: {0}")]
    Injection(String),

    #[error("Login fields not available: found {edit_controls} edit controls")]
    LoginFieldsUnavailable { edit_controls: usize },

    #[error("Login submit button not available: found {buttons} button controls")]
    LoginSubmitUnavailable { buttons: usize },

    #[error("Local client connection failed: {0}")]
    Connection(String),

    #[error("Local client not reached after {attempts} attempts")]
    ConnectionTimeout { attempts: u32 },

    #[error("Gather failed on {query}: {source}")]
    Gather {
        query: &'static str,
        #[source]
        source: Box<AppError>,
    },

    #[error("Subscription to {event} failed: {message}")]
    Subscription { event: String, message: String },

    #[error("Local client returned {status} for {method} {path}")]
    Status {
        method: String,
        path: String,
        status: u16,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("TLS setup error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Local client credentials not found")]
    CredentialsNotFound,

    #[error("Not connected to the local client")]
    NotConnected,

    #[error("Username and password must not be empty")]
    EmptyCredentials,

    #[error("Orchestrator is no longer running")]
    OrchestratorClosed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::WebSocket(Box::new(err))
    }
}

impl AppError {
    /// Wraps a failure of one gather query with the query's path.
    pub fn gather(query: &'static str, source: AppError) -> Self {
        AppError::Gather {
            query,
            source: Box::new(source),
        }
    }
}
