//! Bounded polling waits.
//!
//! Every wait in the lifecycle (change-set creation, execution, stack
//! deletion) goes through [`poll_until`]: fetch, test the terminal
//! predicate, sleep a fixed interval, give up after a fixed bound. The
//! utility is synchronous in shape (one linear sequence of calls) but async
//! so callers can share the command's runtime.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, StackError, StackpilotError};

/// Poll interval and bound for one wait loop.
#[derive(Debug, Clone, Copy)]
pub struct WaitSettings {
    /// Fixed delay between polls.
    pub poll_interval: Duration,
    /// Maximum total wait before timing out.
    pub max_wait: Duration,
}

impl WaitSettings {
    /// Waits used for change-set creation (5s x 120 attempts).
    #[must_use]
    pub const fn change_set() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(600),
        }
    }

    /// Waits used for stack execution and deletion (10s x 360 attempts).
    #[must_use]
    pub const fn stack() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(3600),
        }
    }

    /// Number of polls before the bound is exceeded.
    fn max_attempts(&self) -> u64 {
        let interval = self.poll_interval.as_millis().max(1);
        (self.max_wait.as_millis() / interval) as u64
    }
}

/// Polls `fetch` until `is_terminal` accepts the result.
///
/// `stack_name` and `waiting_for` only label the timeout error.
///
/// # Errors
///
/// Propagates fetch errors and returns [`StackError::Timeout`] when the
/// bound elapses without reaching a terminal state. A timeout is distinct
/// from a provider-reported failure: the remote operation may still be in
/// flight.
pub async fn poll_until<T, F, Fut, P>(
    settings: WaitSettings,
    stack_name: &str,
    waiting_for: &str,
    mut fetch: F,
    is_terminal: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let max_attempts = settings.max_attempts();

    for attempt in 0..max_attempts {
        let current = fetch().await?;
        if is_terminal(&current) {
            return Ok(current);
        }

        debug!(
            "Waiting for {waiting_for} on {stack_name} (attempt {}/{max_attempts})",
            attempt + 1
        );
        tokio::time::sleep(settings.poll_interval).await;
    }

    Err(StackpilotError::Stack(StackError::Timeout {
        stack_name: stack_name.to_string(),
        waiting_for: waiting_for.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_settings() -> WaitSettings {
        WaitSettings {
            poll_interval: Duration::from_millis(1),
            max_wait: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_returns_immediately_when_terminal() {
        let result = poll_until(
            fast_settings(),
            "test-Stack",
            "creation",
            || async { Ok(42_u32) },
            |v| *v == 42,
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_polls_until_terminal() {
        let counter = AtomicU32::new(0);
        let result = poll_until(
            fast_settings(),
            "test-Stack",
            "creation",
            || async { Ok(counter.fetch_add(1, Ordering::SeqCst)) },
            |v| *v >= 3,
        )
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_times_out() {
        let result = poll_until(
            fast_settings(),
            "test-Stack",
            "creation",
            || async { Ok(0_u32) },
            |v| *v == 42,
        )
        .await;
        match result {
            Err(StackpilotError::Stack(StackError::Timeout {
                stack_name,
                waiting_for,
            })) => {
                assert_eq!(stack_name, "test-Stack");
                assert_eq!(waiting_for, "creation");
            }
            other => panic!("Expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_propagates_fetch_errors() {
        let result: Result<u32> = poll_until(
            fast_settings(),
            "test-Stack",
            "creation",
            || async { Err(StackpilotError::internal("boom")) },
            |_| true,
        )
        .await;
        assert!(matches!(result, Err(StackpilotError::Internal(_))));
    }
}
