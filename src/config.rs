use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::lcu::{AuthStrategy, ConnectOptions};

/// Delays and bounds driving one login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Wait between the two injection attempts.
    pub injection_retry_backoff: Duration,
    /// Wait after a submitted login before the connection monitor starts.
    pub login_settle_delay: Duration,
    /// Wait between observing a connection and the first gather.
    pub connect_grace_delay: Duration,
    /// First delay between connection polls.
    pub poll_interval: Duration,
    /// Ceiling of the doubling poll delay.
    pub poll_max_interval: Duration,
    /// Polls allowed before a connection timeout is reported.
    pub max_connect_polls: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            injection_retry_backoff: Duration::from_millis(DEFAULT_INJECTION_RETRY_BACKOFF_MS),
            login_settle_delay: Duration::from_secs(DEFAULT_LOGIN_SETTLE_DELAY_SECS),
            connect_grace_delay: Duration::from_secs(DEFAULT_CONNECT_GRACE_DELAY_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_max_interval: Duration::from_secs(DEFAULT_POLL_MAX_INTERVAL_SECS),
            max_connect_polls: DEFAULT_MAX_CONNECT_POLLS,
        }
    }
}

const DEFAULT_INJECTION_RETRY_BACKOFF_MS: u64 = 300;
const DEFAULT_LOGIN_SETTLE_DELAY_SECS: u64 = 10;
const DEFAULT_CONNECT_GRACE_DELAY_SECS: u64 = 5;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_POLL_MAX_INTERVAL_SECS: u64 = 30;
const DEFAULT_MAX_CONNECT_POLLS: u32 = 24;
const DEFAULT_LCU_CONNECT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub timings: Timings,
    pub connect: ConnectOptions,
    /// Account to attach to on startup without injecting credentials.
    pub watch_username: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| parse_value::<u64>(&v));

        let timings = Timings {
            injection_retry_backoff: Duration::from_millis(
                parsed("INJECTION_RETRY_BACKOFF_MS").unwrap_or(DEFAULT_INJECTION_RETRY_BACKOFF_MS),
            ),
            login_settle_delay: Duration::from_secs(
                parsed("LOGIN_SETTLE_DELAY_SECS").unwrap_or(DEFAULT_LOGIN_SETTLE_DELAY_SECS),
            ),
            connect_grace_delay: Duration::from_secs(
                parsed("CONNECT_GRACE_DELAY_SECS").unwrap_or(DEFAULT_CONNECT_GRACE_DELAY_SECS),
            ),
            poll_interval: Duration::from_secs(
                parsed("CONNECTION_POLL_INTERVAL_SECS").unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            poll_max_interval: Duration::from_secs(
                parsed("CONNECTION_POLL_MAX_INTERVAL_SECS")
                    .unwrap_or(DEFAULT_POLL_MAX_INTERVAL_SECS),
            ),
            max_connect_polls: attempts(&lookup, "CONNECTION_MAX_ATTEMPTS", DEFAULT_MAX_CONNECT_POLLS)?,
        };

        if timings.poll_max_interval < timings.poll_interval {
            return Err(AppError::Config(
                "CONNECTION_POLL_MAX_INTERVAL_SECS must not be below CONNECTION_POLL_INTERVAL_SECS"
                    .into(),
            ));
        }

        let auth = match lookup("LCU_INSTALL_DIR").filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => AuthStrategy::ProcessThenLockfile(PathBuf::from(dir)),
            None => AuthStrategy::Process,
        };

        let connect = ConnectOptions {
            auth,
            max_attempts: attempts(&lookup, "LCU_CONNECT_ATTEMPTS", DEFAULT_LCU_CONNECT_ATTEMPTS)?,
        };

        let watch_username = lookup("SHUNPO_WATCH_USERNAME").filter(|name| !name.trim().is_empty());

        Ok(Self {
            timings,
            connect,
            watch_username,
        })
    }
}

fn parse_value<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

fn attempts<F>(lookup: &F, key: &str, default: u32) -> Result<u32, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).and_then(|v| parse_value::<u32>(&v)) {
        Some(0) => Err(AppError::Config(format!("{key} must be at least 1"))),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}
