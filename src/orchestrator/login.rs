use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::automation::{LoginForm, UiAutomation};
use crate::state::{Credentials, LoginAttempt};

/// Injection attempts per login request.
pub const MAX_INJECTION_ATTEMPTS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The form was filled and submitted on the given attempt.
    Submitted { attempt: u8 },
    Failed,
}

/// Injects `credentials`, retrying once after `backoff`.
#[instrument(skip_all, fields(username = %credentials.username()))]
pub async fn inject_with_retry(
    automation: &dyn UiAutomation,
    credentials: &Credentials,
    backoff: Duration,
) -> LoginOutcome {
    let form = LoginForm::new(automation);

    for attempt_number in 1..=MAX_INJECTION_ATTEMPTS {
        let attempt = LoginAttempt::new(credentials, attempt_number);

        match form.inject(attempt.credentials).await {
            Ok(()) => {
                info!(
                    attempt = attempt.attempt_number,
                    elapsed_ms = attempt.started_at.elapsed().as_millis() as u64,
                    "🔑 ✅ Credentials submitted"
                );
                return LoginOutcome::Submitted {
                    attempt: attempt.attempt_number,
                };
            }
            Err(e) => {
                warn!(
                    attempt = attempt.attempt_number,
                    error = %e,
                    "🔑 ⚠️ Injection attempt failed"
                );
                if attempt_number < MAX_INJECTION_ATTEMPTS {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    error!(
        attempts = MAX_INJECTION_ATTEMPTS,
        "🔑 ❌ Login failed, giving up"
    );
    LoginOutcome::Failed
}
