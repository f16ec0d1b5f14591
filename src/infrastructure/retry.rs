//! Bounded retry state machine
//!
//! A fetch moves through `Attempting -> (Waiting -> Attempting)* -> Succeeded | Exhausted`.
//! The delay between attempts comes from a [`BackoffPolicy`]; waiting goes
//! through a [`Sleeper`] so tests can observe delays without real time passing.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Where a retried operation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting { attempt: u32 },
    Waiting { attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
}

pub trait BackoffPolicy: Send + Sync {
    /// Total number of attempts allowed, at least 1
    fn max_attempts(&self) -> u32;

    /// Delay before the attempt following `attempt` (1-based)
    fn delay_after(&self, attempt: u32) -> Duration;
}

/// Same delay after every failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedDelay {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl BackoffPolicy for FixedDelay {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay_after(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Pure transition logic, no I/O
#[derive(Debug)]
pub struct RetryMachine<'a, P: BackoffPolicy + ?Sized> {
    policy: &'a P,
    state: RetryState,
}

impl<'a, P: BackoffPolicy + ?Sized> RetryMachine<'a, P> {
    pub fn new(policy: &'a P) -> Self {
        Self {
            policy,
            state: RetryState::Attempting { attempt: 1 },
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn on_success(&mut self) -> RetryState {
        if let RetryState::Attempting { attempt } = self.state {
            self.state = RetryState::Succeeded { attempts: attempt };
        }
        self.state
    }

    pub fn on_failure(&mut self) -> RetryState {
        if let RetryState::Attempting { attempt } = self.state {
            self.state = if attempt >= self.policy.max_attempts().max(1) {
                RetryState::Exhausted { attempts: attempt }
            } else {
                RetryState::Waiting {
                    attempt,
                    delay: self.policy.delay_after(attempt),
                }
            };
        }
        self.state
    }

    /// Leave `Waiting` once the delay has elapsed
    pub fn on_wait_elapsed(&mut self) -> RetryState {
        if let RetryState::Waiting { attempt, .. } = self.state {
            self.state = RetryState::Attempting {
                attempt: attempt + 1,
            };
        }
        self.state
    }
}

/// Final error of a retried operation
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_with<T, E, F, Fut>(
    policy: &(dyn BackoffPolicy + '_),
    sleeper: &(dyn Sleeper + '_),
    label: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut machine = RetryMachine::new(policy);

    loop {
        let RetryState::Attempting { attempt } = machine.state() else {
            unreachable!("retry loop always resumes in Attempting");
        };

        match op(attempt).await {
            Ok(value) => {
                machine.on_success();
                if attempt > 1 {
                    info!("✅ {} succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                warn!("⚠️ Error {}, attempt {}: {}", label, attempt, e);
                match machine.on_failure() {
                    RetryState::Waiting { delay, .. } => {
                        debug!("Retrying {} in {:?}", label, delay);
                        sleeper.sleep(delay).await;
                        machine.on_wait_elapsed();
                    }
                    RetryState::Exhausted { attempts } => {
                        return Err(RetryExhausted {
                            attempts,
                            last_error: e,
                        });
                    }
                    state => unreachable!("unexpected retry state after failure: {state:?}"),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records requested delays instead of sleeping
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn recorded(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_machine_transitions() {
        let policy = FixedDelay::new(2, Duration::from_secs(1));
        let mut machine = RetryMachine::new(&policy);

        assert_eq!(machine.state(), RetryState::Attempting { attempt: 1 });
        assert_eq!(
            machine.on_failure(),
            RetryState::Waiting {
                attempt: 1,
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(machine.on_wait_elapsed(), RetryState::Attempting { attempt: 2 });
        assert_eq!(machine.on_failure(), RetryState::Exhausted { attempts: 2 });
        // terminal states are sticky
        assert_eq!(machine.on_success(), RetryState::Exhausted { attempts: 2 });
    }

    #[test]
    fn test_zero_attempts_is_clamped_to_one() {
        let policy = FixedDelay::new(0, Duration::from_secs(1));
        let mut machine = RetryMachine::new(&policy);
        assert_eq!(machine.on_failure(), RetryState::Exhausted { attempts: 1 });
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt_with_two_delays() {
        let policy = FixedDelay::new(3, Duration::from_secs(5));
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result = retry_with(&policy, &sleeper, "test op", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("boom {attempt}"))
                } else {
                    Ok("page")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(5); 2]);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let policy = FixedDelay::new(3, Duration::from_secs(1));
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with(&policy, &sleeper, "test op", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("failure {attempt}")) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_no_sleep_after_first_success() {
        let policy = FixedDelay::new(3, Duration::from_secs(1));
        let sleeper = RecordingSleeper::default();

        let result: Result<u8, RetryExhausted<String>> =
            retry_with(&policy, &sleeper, "test op", |_| async { Ok(7) }).await;

        assert_eq!(result.unwrap(), 7);
        assert!(sleeper.recorded().is_empty());
    }
}
