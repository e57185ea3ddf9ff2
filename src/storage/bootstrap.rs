use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::observability::metrics::STORAGE_CONNECT_ATTEMPTS;

/// Shortest window worth spending on one more attempt before the deadline.
const MIN_ATTEMPT_WINDOW: Duration = Duration::from_millis(10);

/// A storage endpoint the bootstrapper can dial.
#[async_trait]
pub trait StorageConnector: Send + Sync {
    type Handle: Send + 'static;

    /// Opens a session and verifies it is usable (ping). `budget` is what is
    /// left of the bootstrap deadline; the dial must not outlive it.
    async fn connect(&self, budget: Duration) -> Result<Self::Handle>;

    /// Applies pending schema migrations. Must be idempotent.
    async fn migrate(&self, handle: &Self::Handle) -> Result<()>;

    /// Human readable target without secrets.
    fn describe(&self) -> String;
}

/// Exponential backoff with jitter, bounded by both an attempt count and an
/// absolute deadline measured from the first attempt.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Fraction of each delay that is randomised, in `[0, 1]`.
    pub jitter: f64,
    pub max_attempts: u32,
    pub deadline: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        RetryPolicy {
            deadline: config.connect_timeout(),
            ..RetryPolicy::default()
        }
    }

    /// Un-jittered delay after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return delay;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(-jitter..=jitter);
        delay.mul_f64(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: 30,
            deadline: Duration::from_secs(30),
        }
    }
}

/// Dials `connector` until it yields a verified handle, then migrates it.
///
/// Runs once at startup. Never sleeps past the deadline: a delay that would
/// overshoot it is cut to half of the remaining budget and the attempt after
/// it is the last one. Fails with `ConnectionTimeout` carrying the last cause.
pub async fn bootstrap<C: StorageConnector>(connector: &C, policy: &RetryPolicy) -> Result<C::Handle> {
    let started = Instant::now();
    let deadline = started + policy.deadline;
    let mut attempts = 0u32;
    let mut last_error: Option<String> = None;
    let mut final_attempt = false;

    info!("Connecting to storage at {}", connector.describe());

    loop {
        attempts += 1;
        STORAGE_CONNECT_ATTEMPTS.inc();

        let budget = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout_at(deadline, connector.connect(budget)).await {
            Ok(Ok(handle)) => {
                info!(
                    "Storage connection established after {} attempt(s) in {:?}",
                    attempts,
                    started.elapsed()
                );
                connector.migrate(&handle).await?;
                return Ok(handle);
            }
            Ok(Err(e)) => {
                warn!("Storage connection attempt {} failed: {}", attempts, e);
                last_error = Some(e.to_string());
            }
            Err(_) => {
                warn!("Storage connection attempt {} hit the deadline", attempts);
                last_error.get_or_insert_with(|| "connection attempt did not finish before the deadline".to_string());
                break;
            }
        }

        if final_attempt || attempts >= policy.max_attempts {
            break;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let mut delay = policy.jittered(policy.backoff(attempts));
        if delay >= remaining {
            delay = remaining / 2;
            final_attempt = true;
        }
        if delay < MIN_ATTEMPT_WINDOW {
            break;
        }

        tokio::time::sleep(delay).await;
    }

    Err(Error::ConnectionTimeout {
        attempts,
        elapsed_ms: started.elapsed().as_millis(),
        last_error: last_error.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Fake endpoint that refuses the first `failures` dials.
    struct FlakyConnector {
        failures: u32,
        dials: AtomicU32,
        budgets: Mutex<Vec<Duration>>,
        migrations: Arc<AtomicU32>,
    }

    impl FlakyConnector {
        fn new(failures: u32) -> Self {
            FlakyConnector {
                failures,
                dials: AtomicU32::new(0),
                budgets: Mutex::new(Vec::new()),
                migrations: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl StorageConnector for FlakyConnector {
        type Handle = u32;

        async fn connect(&self, budget: Duration) -> Result<u32> {
            self.budgets.lock().unwrap().push(budget);
            let dial = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
            if dial <= self.failures {
                Err(Error::ConnectionFailed(format!("connection refused (dial {})", dial)))
            } else {
                Ok(dial)
            }
        }

        async fn migrate(&self, _handle: &u32) -> Result<()> {
            self.migrations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn describe(&self) -> String {
            "fake://storage".to_string()
        }
    }

    fn policy(deadline_secs: u64) -> RetryPolicy {
        RetryPolicy {
            jitter: 0.0,
            deadline: Duration::from_secs(deadline_secs),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = policy(30);
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy { jitter: 0.2, ..RetryPolicy::default() };
        for _ in 0..100 {
            let d = policy.jittered(Duration::from_secs(10));
            assert!(d >= Duration::from_secs(8) && d <= Duration::from_secs(12));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_once_endpoint_comes_up() {
        let connector = FlakyConnector::new(2);

        let handle = bootstrap(&connector, &policy(10)).await.unwrap();

        assert_eq!(handle, 3);
        assert_eq!(connector.migrations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tight_deadline_still_fits_a_final_attempt() {
        let connector = FlakyConnector::new(2);

        // Backoff alone (1s then 2s) would overshoot a 3s budget.
        let handle = bootstrap(&connector, &policy(3)).await.unwrap();
        assert_eq!(handle, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn each_dial_gets_the_remaining_budget() {
        let connector = FlakyConnector::new(2);

        bootstrap(&connector, &policy(3)).await.unwrap();

        let budgets = connector.budgets.lock().unwrap().clone();
        assert_eq!(
            budgets,
            vec![Duration::from_secs(3), Duration::from_secs(2), Duration::from_secs(1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_deadline_with_last_cause() {
        let connector = FlakyConnector::new(u32::MAX);
        let started = Instant::now();

        let err = bootstrap(&connector, &policy(5)).await.unwrap_err();

        assert!(started.elapsed() <= Duration::from_secs(5));
        match err {
            Error::ConnectionTimeout { attempts, last_error, .. } => {
                assert!(attempts >= 2);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(connector.migrations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_budget_is_respected() {
        let connector = FlakyConnector::new(u32::MAX);
        let policy = RetryPolicy { max_attempts: 3, ..policy(600) };

        let err = bootstrap(&connector, &policy).await.unwrap_err();

        assert!(matches!(err, Error::ConnectionTimeout { attempts: 3, .. }));
        assert_eq!(connector.dials.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn migration_failure_is_fatal() {
        struct BrokenSchema;

        #[async_trait]
        impl StorageConnector for BrokenSchema {
            type Handle = ();

            async fn connect(&self, _budget: Duration) -> Result<()> {
                Ok(())
            }

            async fn migrate(&self, _handle: &()) -> Result<()> {
                Err(Error::Migration("relation already exists".to_string()))
            }

            fn describe(&self) -> String {
                "fake://broken".to_string()
            }
        }

        let err = bootstrap(&BrokenSchema, &policy(5)).await.unwrap_err();
        assert!(matches!(err, Error::Migration(_)));
    }
}
