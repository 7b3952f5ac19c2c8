use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Timings;
use crate::lcu::{ConnectOptions, LocalClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    Connected { polls: u32 },
    TimedOut { attempts: u32 },
}

/// Polls the local client until a session exists.
///
/// Each poll waits, checks the session, and otherwise makes one `connect` call
/// that is awaited before the next wait, so connects never overlap. The wait
/// doubles after every failed poll up to `poll_max_interval`.
pub async fn watch_connection(
    client: Arc<dyn LocalClient>,
    options: ConnectOptions,
    timings: Timings,
) -> MonitorOutcome {
    let mut delay = timings.poll_interval;
    let mut polls = 0;
    let mut attempts = 0;

    info!(
        interval_secs = delay.as_secs(),
        max_attempts = timings.max_connect_polls,
        "🔄 Connection monitor started"
    );

    loop {
        tokio::time::sleep(delay).await;
        polls += 1;

        if client.is_connected() {
            return MonitorOutcome::Connected { polls };
        }

        attempts += 1;

        match client.connect(&options).await {
            Ok(()) => debug!(attempt = attempts, "🔄 Connect call returned"),
            Err(e) => warn!(attempt = attempts, error = %e, "🔄 ⚠️ Local client not reachable"),
        }

        if client.is_connected() {
            return MonitorOutcome::Connected { polls };
        }

        if attempts >= timings.max_connect_polls {
            return MonitorOutcome::TimedOut { attempts };
        }

        delay = (delay * 2).min(timings.poll_max_interval);
    }
}
