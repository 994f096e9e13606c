//! Transient-error classification and backoff.
//!
//! Connection establishment is the only retried operation: a command that
//! fails mid-deployment surfaces immediately with its ordinal. The
//! classifier treats connection-class server errors (SQLSTATE class 08
//! surfaces through the driver as closed-connection or send failures) and
//! a curated set of network error texts as transient.

use super::{SessionError, SessionResult};
use diesel::result::DatabaseErrorKind;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Message fragments that mark a transient network failure.
const TRANSIENT_MESSAGE_MARKERS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "broken pipe",
    "timed out waiting for connection",
    "server closed the connection",
    "could not connect",
    "eof detected",
    "the database system is starting up",
];

/// Exponential backoff settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Cap applied to the growing delay.
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to every delay.
    pub jitter: Duration,
    /// Factor applied to the delay after each attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: Duration::from_millis(100),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            multiplier: 1,
        }
    }

    fn delay_for(&self, completed_attempts: u32) -> Duration {
        let mut delay = self.initial_delay;
        for _ in 1..completed_attempts {
            delay = delay
                .saturating_mul(self.multiplier)
                .min(self.max_delay);
        }
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms > 0 {
            delay += Duration::from_millis(rand::rng().random_range(0..=jitter_ms));
        }
        delay
    }
}

/// Whether an error is worth another connection attempt.
#[must_use]
pub fn is_transient(error: &SessionError) -> bool {
    match error {
        SessionError::Pool { message, .. } => message_is_transient(message),
        SessionError::Database { source, .. } | SessionError::Load { source, .. } => {
            diesel_error_is_transient(source)
        }
        _ => false,
    }
}

fn diesel_error_is_transient(error: &diesel::result::Error) -> bool {
    match error {
        diesel::result::Error::DatabaseError(kind, info) => {
            matches!(
                kind,
                DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand
            ) || message_is_transient(info.message())
        }
        diesel::result::Error::BrokenTransactionManager => true,
        _ => false,
    }
}

fn message_is_transient(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    TRANSIENT_MESSAGE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Runs `op`, retrying transient failures with exponential backoff.
///
/// The cancellation token is consulted before every attempt and during
/// every backoff wait.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, the first
/// non-transient error immediately, or [`SessionError::Cancelled`].
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    during: &str,
    mut op: F,
) -> SessionResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SessionResult<T>>,
{
    let mut attempt = 0_u32;
    loop {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled {
                during: during.to_owned(),
            });
        }
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_attempts && is_transient(&error) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    target: "pgmi",
                    attempt,
                    ?delay,
                    %error,
                    "transient failure, backing off"
                );
                tokio::select! {
                    () = cancel.cancelled() => {
                        return Err(SessionError::Cancelled {
                            during: during.to_owned(),
                        });
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Err(error) => return Err(error),
        }
    }
}
