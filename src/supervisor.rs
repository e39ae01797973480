// Process-level restart wrapper around the bot loop
use crate::config::SupervisorConfig;
use crate::model::BotError;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Anything the supervisor can restart.
#[async_trait::async_trait]
pub trait RunLoop: Send {
    async fn run(&mut self) -> Result<(), BotError>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: u32,
    pub transient_delay: Duration,
    /// Consecutive connectivity failures that together cost one attempt.
    pub transient_failures_per_attempt: u32,
    pub jitter: Duration,
}

impl From<&SupervisorConfig> for RetryPolicy {
    fn from(cfg: &SupervisorConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            base_delay: Duration::from_secs(cfg.base_delay_seconds),
            backoff_factor: cfg.backoff_factor.max(1),
            transient_delay: Duration::from_secs(cfg.transient_delay_seconds),
            transient_failures_per_attempt: cfg.transient_failures_per_attempt.max(1),
            jitter: Duration::from_secs(cfg.jitter_seconds),
        }
    }
}

impl RetryPolicy {
    /// Delay after a non-transient failure on `attempt` (1-based). Saturates
    /// at `Duration::MAX`.
    pub fn failure_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(attempt)
            .and_then(|d| d.checked_mul(self.backoff_factor))
            .unwrap_or(Duration::MAX)
    }

    fn with_jitter(&self, delay: Duration) -> Duration {
        if self.jitter.is_zero() {
            return delay;
        }
        let extra = rand::rng().random_range(0..=self.jitter.as_millis() as u64);
        delay.saturating_add(Duration::from_millis(extra))
    }
}

/// Runs `runner` until it returns cleanly or the attempt budget is spent.
///
/// Connectivity failures restart after a short fixed delay and only consume an
/// attempt every `transient_failures_per_attempt` in a row. Everything else
/// consumes one attempt and waits `base_delay * attempt * backoff_factor`.
pub async fn supervise<R: RunLoop>(runner: &mut R, policy: &RetryPolicy) -> Result<(), BotError> {
    let mut attempt = 1;
    let mut transient_streak = 0;

    while attempt <= policy.max_attempts {
        info!("starting attempt {}...", attempt);
        let delay = match runner.run().await {
            Ok(()) => {
                info!("run finished");
                return Ok(());
            }
            Err(e) if e.is_transient() => {
                transient_streak += 1;
                warn!("Connectivity failure ({}): {}", transient_streak, e);
                if transient_streak >= policy.transient_failures_per_attempt {
                    transient_streak = 0;
                    attempt += 1;
                }
                policy.transient_delay
            }
            Err(e) => {
                error!("Unhandled failure on attempt {}: {}", attempt, e);
                transient_streak = 0;
                let delay = policy.failure_delay(attempt);
                attempt += 1;
                delay
            }
        };

        if attempt > policy.max_attempts {
            break;
        }
        let delay = policy.with_jitter(delay);
        error!("restarting in {} seconds", delay.as_secs());
        sleep(delay).await;
    }

    error!("Giving up after {} attempts", policy.max_attempts);
    Err(BotError::AttemptsExhausted(policy.max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeedError, StorageError};
    use std::collections::VecDeque;

    struct Scripted {
        results: VecDeque<Result<(), BotError>>,
        runs: u32,
    }

    impl Scripted {
        fn new(results: Vec<Result<(), BotError>>) -> Self {
            Self { results: results.into(), runs: 0 }
        }
    }

    #[async_trait::async_trait]
    impl RunLoop for Scripted {
        async fn run(&mut self) -> Result<(), BotError> {
            self.runs += 1;
            self.results
                .pop_front()
                .unwrap_or_else(|| Err(StorageError::Duplicate("x".into()).into()))
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(90),
            backoff_factor: 1,
            transient_delay: Duration::from_secs(30),
            transient_failures_per_attempt: 2,
            jitter: Duration::ZERO,
        }
    }

    fn fatal() -> Result<(), BotError> {
        Err(StorageError::Duplicate("8r1x2k".into()).into())
    }

    fn transient() -> Result<(), BotError> {
        Err(FeedError::Unreachable("503".into()).into())
    }

    #[test]
    fn failure_delay_grows_with_attempts() {
        let mut p = policy();
        p.backoff_factor = 2;
        assert_eq!(p.failure_delay(1), Duration::from_secs(180));
        assert_eq!(p.failure_delay(3), Duration::from_secs(540));
    }

    #[test]
    fn failure_delay_saturates_on_huge_config() {
        let config = SupervisorConfig {
            base_delay_seconds: u64::MAX,
            backoff_factor: u32::MAX,
            jitter_seconds: 5,
            ..Default::default()
        };
        let p = RetryPolicy::from(&config);
        assert_eq!(p.failure_delay(1), Duration::MAX);
        assert_eq!(p.failure_delay(10), Duration::MAX);
        assert_eq!(p.with_jitter(p.failure_delay(2)), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_failures() {
        let mut runner = Scripted::new(vec![fatal(), fatal(), Ok(())]);
        let started = tokio::time::Instant::now();
        supervise(&mut runner, &policy()).await.unwrap();
        assert_eq!(runner.runs, 3);
        assert!(started.elapsed() >= Duration::from_secs(90 + 180));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts() {
        let mut runner = Scripted::new(vec![fatal(), fatal(), fatal(), Ok(())]);
        let result = supervise(&mut runner, &policy()).await;
        assert!(matches!(result, Err(BotError::AttemptsExhausted(3))));
        assert_eq!(runner.runs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_cheaper() {
        // Two transients cost one attempt, so four transients plus one fatal fit in three.
        let mut runner = Scripted::new(vec![
            transient(),
            transient(),
            transient(),
            fatal(),
            transient(),
            Ok(()),
        ]);
        supervise(&mut runner, &policy()).await.unwrap();
        assert_eq!(runner.runs, 6);
    }
}
