use std::time::Duration;

use anyhow::Result;
use rand::Rng;

/// Bounded retry for one unit of network work.
///
/// The default allows a single retry with a randomized backoff so parallel
/// workers that hit the same transient failure do not re-request in
/// lockstep.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    /// No second attempt at all; for callers that prefer to record the
    /// failure and move on immediately.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn backoff(&self) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(0..=base);
        Duration::from_millis(base + jitter)
    }
}

pub fn with_retry<T>(policy: &RetryPolicy, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut last_err = None;
    for attempt in 0..=policy.max_retries {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = Some(err);
                if attempt < policy.max_retries {
                    std::thread::sleep(policy.backoff());
                }
            }
        }
    }
    Err(last_err.expect("loop ran at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn first_success_returns_immediately() {
        let mut calls = 0;
        let result = with_retry(&RetryPolicy::none(), || {
            calls += 1;
            Ok(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn one_retry_recovers_a_transient_failure() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::ZERO,
        };
        let mut calls = 0;
        let result = with_retry(&policy, || {
            calls += 1;
            if calls == 1 {
                Err(anyhow!("transient"))
            } else {
                Ok("ok")
            }
        });
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls, 2);
    }

    #[test]
    fn retries_are_bounded() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::ZERO,
        };
        let mut calls = 0;
        let result: Result<()> = with_retry(&policy, || {
            calls += 1;
            Err(anyhow!("still down"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }
}
