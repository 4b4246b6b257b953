//! Deadline-bounded polling used by the wait verbs.

use std::thread;
use std::time::{Duration, Instant};

use super::error::LifecycleError;

/// Interval between liveness probes.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Polls `observe` until it reports `true` or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout. The call never gives up before the
/// timeout and overshoots it by at most one `interval`. A timeout too large
/// to place on the clock polls without a deadline.
///
/// # Errors
///
/// Propagates the first error returned by `observe`.
pub(super) fn poll_until<F>(
    timeout: Duration,
    interval: Duration,
    mut observe: F,
) -> Result<bool, LifecycleError>
where
    F: FnMut() -> Result<bool, LifecycleError>,
{
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if observe()? {
            return Ok(true);
        }
        let pause = match deadline {
            Some(limit) => {
                let now = Instant::now();
                if now >= limit {
                    return Ok(false);
                }
                interval.min(limit.saturating_duration_since(now))
            }
            None => interval,
        };
        thread::sleep(pause);
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn returns_once_the_condition_holds() {
        let mut calls = 0;
        let reached = poll_until(Duration::from_secs(5), Duration::from_millis(5), || {
            calls += 1;
            Ok(calls == 3)
        })
        .expect("poll");
        assert!(reached);
        assert_eq!(calls, 3);
    }

    #[test]
    fn times_out_within_one_interval() {
        let timeout = Duration::from_millis(300);
        let interval = Duration::from_millis(50);
        let started = Instant::now();
        let reached = poll_until(timeout, interval, || Ok(false)).expect("poll");
        let elapsed = started.elapsed();
        assert!(!reached);
        assert!(elapsed >= timeout, "returned early after {elapsed:?}");
        assert!(
            elapsed < timeout + interval + Duration::from_millis(500),
            "overshot after {elapsed:?}"
        );
    }

    #[test]
    fn zero_timeout_observes_once() {
        let mut calls = 0;
        let reached = poll_until(Duration::ZERO, Duration::from_millis(50), || {
            calls += 1;
            Ok(false)
        })
        .expect("poll");
        assert!(!reached);
        assert_eq!(calls, 1);
    }

    #[test]
    fn unbounded_timeout_keeps_polling() {
        let mut calls = 0;
        let reached = poll_until(Duration::MAX, Duration::from_millis(5), || {
            calls += 1;
            Ok(calls == 3)
        })
        .expect("poll");
        assert!(reached);
        assert_eq!(calls, 3);
    }

    #[test]
    fn propagates_observation_errors() {
        let result = poll_until(Duration::from_secs(5), Duration::from_millis(5), || {
            Err(LifecycleError::Io(io::Error::other("probe failed")))
        });
        assert!(matches!(result, Err(LifecycleError::Io(_))));
    }
}
