//! Discovery of the local client's port and auth token.

use std::fmt;
use std::fs;
use std::path::Path;

use base64::{Engine, engine::general_purpose};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

use super::AuthStrategy;
use crate::error::AppError;

const CLIENT_PROCESS_PREFIX: &str = "LeagueClientUx";
const LOCKFILE_NAMES: [&str; 2] = ["lockfile", "LeagueClient.lockfile"];
const AUTH_USER: &str = "riot";

#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub port: u16,
    pub token: String,
    pub protocol: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("port", &self.port)
            .field("token", &"<redacted>")
            .field("protocol", &self.protocol)
            .finish()
    }
}

impl ClientCredentials {
    pub fn base_url(&self) -> String {
        format!("{}://127.0.0.1:{}", self.protocol, self.port)
    }

    pub fn ws_url(&self) -> String {
        let scheme = if self.protocol == "https" { "wss" } else { "ws" };
        format!("{}://127.0.0.1:{}/", scheme, self.port)
    }

    pub fn user(&self) -> &'static str {
        AUTH_USER
    }

    pub fn authorization_header(&self) -> String {
        let raw = format!("{}:{}", AUTH_USER, self.token);
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }
}

/// Blocking: scans processes and/or reads the lockfile.
pub fn discover(strategy: &AuthStrategy) -> Result<ClientCredentials, AppError> {
    match strategy {
        AuthStrategy::Process => from_process(),
        AuthStrategy::Lockfile(dir) => from_lockfile(dir),
        AuthStrategy::ProcessThenLockfile(dir) => from_process().or_else(|e| {
            debug!(error = %e, "🔐 Process discovery failed, trying lockfile");
            from_lockfile(dir)
        }),
    }
}

fn from_process() -> Result<ClientCredentials, AppError> {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );

    system
        .processes()
        .values()
        .filter(|process| {
            process
                .name()
                .to_string_lossy()
                .starts_with(CLIENT_PROCESS_PREFIX)
        })
        .find_map(|process| {
            parse_process_args(process.cmd().iter().map(|arg| arg.to_string_lossy()))
        })
        .ok_or(AppError::CredentialsNotFound)
}

fn from_lockfile(dir: &Path) -> Result<ClientCredentials, AppError> {
    for name in LOCKFILE_NAMES {
        let path = dir.join(name);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                if let Some(credentials) = parse_lockfile(&contents) {
                    return Ok(credentials);
                }
                debug!(path = %path.display(), "🔐 Malformed lockfile");
            }
            Err(e) => debug!(path = %path.display(), error = %e, "🔐 Lockfile not readable"),
        }
    }

    Err(AppError::CredentialsNotFound)
}

/// Parses `name:pid:port:password:protocol`.
pub fn parse_lockfile(contents: &str) -> Option<ClientCredentials> {
    let parts: Vec<&str> = contents.trim().split(':').collect();
    let [_, _, port, token, protocol] = parts.as_slice() else {
        return None;
    };

    Some(ClientCredentials {
        port: port.parse().ok()?,
        token: token.to_string(),
        protocol: protocol.to_string(),
    })
}

/// Extracts `--app-port=` and `--remoting-auth-token=` from a command line.
pub fn parse_process_args<I, S>(args: I) -> Option<ClientCredentials>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut port = None;
    let mut token = None;

    for arg in args {
        let arg = arg.as_ref().trim_matches('"');
        if let Some(value) = arg.strip_prefix("--app-port=") {
            port = value.parse::<u16>().ok();
        } else if let Some(value) = arg.strip_prefix("--remoting-auth-token=") {
            token = Some(value.to_string());
        }
    }

    Some(ClientCredentials {
        port: port?,
        token: token.filter(|t| !t.is_empty())?,
        protocol: "https".into(),
    })
}
