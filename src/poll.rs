use std::thread;
use std::time::Instant;

use tracing::debug;

use crate::config::PollSettings;
use crate::error::{Error, Result};

/// Answer of a single status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState<T> {
    /// Terminal state reached
    Ready(T),
    /// Still running; carries the provider's status for diagnostics
    Pending(String),
}

/// Call `check` until it reports a terminal state or the deadline passes
///
/// Errors returned by `check` end the loop immediately, so terminal failures
/// are never retried. Exceeding `settings.timeout` yields [`Error::Timeout`].
pub fn poll_until<T, F>(settings: &PollSettings, operation: &str, mut check: F) -> Result<T>
where
    F: FnMut() -> Result<PollState<T>>,
{
    let started = Instant::now();
    if !settings.initial_delay.is_zero() {
        thread::sleep(settings.initial_delay);
    }

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match check()? {
            PollState::Ready(value) => return Ok(value),
            PollState::Pending(status) => {
                let waited = started.elapsed();
                debug!(operation, attempt, status = %status, ?waited, "still waiting");
                if waited >= settings.timeout {
                    return Err(Error::Timeout {
                        operation: operation.to_string(),
                        waited,
                        last_status: status,
                    });
                }
                thread::sleep(settings.interval);
            }
        }
    }
}
