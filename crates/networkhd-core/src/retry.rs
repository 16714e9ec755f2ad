// ── Bounded retry ──
//
// Every controller query goes through `retry`. Between attempts the
// caller's `on_retry` hook runs; the coordinator uses it to reopen the
// session after connection-class failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How many times to try an operation and how long to pause in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

/// Outcome of [`retry_or_default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub value: T,
    /// `false` when every attempt failed and `value` is the default.
    pub succeeded: bool,
}

/// Run `op` up to `policy.attempts` times, returning the first success or
/// the last error.
///
/// After each failure except the last, `on_retry` is awaited with the
/// error and then the policy delay elapses.
pub async fn retry<T, E, Op, Fut, Hook, HookFut>(
    label: &str,
    policy: RetryPolicy,
    mut op: Op,
    mut on_retry: Hook,
) -> Result<T, E>
where
    E: Display,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Hook: FnMut(&E) -> HookFut,
    HookFut: Future<Output = ()>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt >= attempts => {
                warn!(label, attempts, error = %e, "giving up after final attempt");
                return Err(e);
            }
            Err(e) => {
                debug!(label, attempt, error = %e, "attempt failed, retrying");
                on_retry(&e).await;
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

/// Like [`retry`], but swallows exhaustion and yields `T::default()`.
pub async fn retry_or_default<T, E, Op, Fut, Hook, HookFut>(
    label: &str,
    policy: RetryPolicy,
    op: Op,
    on_retry: Hook,
) -> Fetched<T>
where
    T: Default,
    E: Display,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Hook: FnMut(&E) -> HookFut,
    HookFut: Future<Output = ()>,
{
    match retry(label, policy, op, on_retry).await {
        Ok(value) => Fetched {
            value,
            succeeded: true,
        },
        Err(_) => Fetched {
            value: T::default(),
            succeeded: false,
        },
    }
}
