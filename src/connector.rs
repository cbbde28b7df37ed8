//! Bounded-retry acquisition of external resources.
//!
//! Two independent waits share this primitive: establishing a metadata
//! database session and polling the CI platform for a green pipeline. Both
//! are "poll until ready or give up" with a fixed interval between attempts
//! and a wall-clock deadline.
use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::error::ConnectorError;

/// Retry interval and total deadline for one bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between acquisition attempts.
    pub interval: Duration,
    /// Wall-clock budget for the whole wait.
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    /// 15-second interval, 30-minute deadline.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            deadline: Duration::from_secs(30 * 60),
        }
    }
}

/// Attempts `acquire` until it succeeds or `policy.deadline` elapses,
/// sleeping `policy.interval` between attempts.
///
/// The failure is reported, not fatal: the caller decides whether to abort
/// the larger workflow. The wait blocks the calling thread; there is no
/// external cancellation.
pub fn acquire<T, E, F>(
    resource: &str,
    policy: RetryPolicy,
    mut attempt: F,
) -> Result<T, ConnectorError>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match attempt() {
            Ok(handle) => {
                debug!(resource, attempts, "resource acquired");
                return Ok(handle);
            }
            Err(err) => {
                let elapsed = started.elapsed();
                if elapsed >= policy.deadline {
                    return Err(ConnectorError::DeadlineExceeded {
                        resource: resource.to_string(),
                        attempts,
                        elapsed,
                        last_error: err.to_string(),
                    });
                }
                warn!(
                    resource,
                    attempts,
                    "not ready ({err}); retrying in {:?}",
                    policy.interval
                );
                thread::sleep(policy.interval);
            }
        }
    }
}

/// Process-lifetime cache of a lazily acquired resource handle.
///
/// The first successful acquisition wins; every later caller receives a clone
/// of the same `Arc`. The slot lock is held across the acquisition itself, so
/// concurrent callers wait for the in-flight attempt instead of piling on
/// with their own. The handle is never torn down.
#[derive(Debug)]
pub struct CachedHandle<T> {
    resource: &'static str,
    policy: RetryPolicy,
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> CachedHandle<T> {
    /// Creates an empty cache for `resource` governed by `policy`.
    pub fn new(resource: &'static str, policy: RetryPolicy) -> Self {
        Self {
            resource,
            policy,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached handle, acquiring it under the retry policy on
    /// first use. The acquisition function is not re-invoked once a handle
    /// exists.
    pub fn get_or_acquire<E, F>(&self, acquire_fn: F) -> Result<Arc<T>, ConnectorError>
    where
        F: FnMut() -> Result<T, E>,
        E: std::fmt::Display,
    {
        let mut slot = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(acquire(self.resource, self.policy, acquire_fn)?);
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }
}
