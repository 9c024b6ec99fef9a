//! Leaf limiter enforcing a single token-bucket constraint.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::application::cancel::CancellationSignal;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, RateLimiter};
use crate::domain::bucket::{Acquire, TokenBucket};
use crate::domain::error::{BuildError, CancellationError};
use crate::domain::rate::Rate;
use crate::infrastructure::clock::SystemClock;

/// Builder for constructing a `TokenBucketLimiter`.
///
/// # Example
/// ```
/// use composite_limiter::{Rate, TokenBucketLimiter};
/// use std::time::Duration;
///
/// let limiter = TokenBucketLimiter::builder()
///     .with_rate(Rate::per(10, Duration::from_secs(60)).unwrap())
///     .with_burst(10)
///     .build()
///     .unwrap();
/// assert_eq!(limiter.burst(), 10);
/// ```
#[derive(Debug)]
pub struct TokenBucketLimiterBuilder {
    rate: Option<Rate>,
    burst: usize,
    clock: Option<Arc<dyn Clock>>,
    metrics: Option<Metrics>,
}

impl TokenBucketLimiterBuilder {
    fn new() -> Self {
        Self {
            rate: None,
            burst: 1,
            clock: None,
            metrics: None,
        }
    }

    /// Set the refill rate. Defaults to [`Rate::INFINITE`].
    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the burst capacity. Defaults to 1.
    pub fn with_burst(mut self, burst: usize) -> Self {
        self.burst = burst;
        self
    }

    /// Set a custom clock (useful for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Record into an existing metrics handle instead of a fresh one.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the limiter. The bucket starts full.
    ///
    /// # Errors
    /// Returns `BuildError::ZeroBurst` if the burst capacity is zero.
    pub fn build(self) -> Result<TokenBucketLimiter, BuildError> {
        if self.burst == 0 {
            return Err(BuildError::ZeroBurst);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let rate = self.rate.unwrap_or(Rate::INFINITE);
        let bucket = TokenBucket::new(rate, self.burst, clock.now());

        Ok(TokenBucketLimiter {
            bucket: Mutex::new(bucket),
            clock,
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}

/// Rate limiter allowing `burst` back-to-back admissions, then one per
/// `1 / rate` seconds.
///
/// The bucket is refilled lazily on each call. Its state sits behind a mutex
/// that is held only for the arithmetic, never across a wait, so concurrent
/// callers neither block each other while sleeping nor see a negative or
/// over-capacity token count.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    bucket: Mutex<TokenBucket>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl TokenBucketLimiter {
    /// Create a limiter with the system clock.
    ///
    /// # Errors
    /// Returns `BuildError::ZeroBurst` if `burst` is zero.
    pub fn new(rate: Rate, burst: usize) -> Result<Self, BuildError> {
        Self::builder().with_rate(rate).with_burst(burst).build()
    }

    /// A limiter that never delays. Its limit is [`Rate::INFINITE`].
    pub fn unbounded() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        Self {
            bucket: Mutex::new(TokenBucket::new(Rate::INFINITE, 1, clock.now())),
            clock,
            metrics: Metrics::new(),
        }
    }

    /// Create a builder for configuring the limiter.
    pub fn builder() -> TokenBucketLimiterBuilder {
        TokenBucketLimiterBuilder::new()
    }

    /// Take a token if one is available right now, without waiting.
    pub fn try_acquire(&self) -> bool {
        let granted = self.lock().try_acquire(self.clock.now()).is_granted();
        if granted {
            self.metrics.record_immediate();
        }
        granted
    }

    /// Tokens currently in the bucket, including refill up to now.
    ///
    /// Observing does not modify the bucket.
    pub fn available(&self) -> f64 {
        self.lock().tokens_at(self.clock.now())
    }

    /// Burst capacity.
    pub fn burst(&self) -> usize {
        self.lock().capacity()
    }

    /// Metrics for this limiter.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn lock(&self) -> MutexGuard<'_, TokenBucket> {
        // The bucket is never left half-updated, so a poisoned lock is still usable
        self.bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn wait(&self, signal: &CancellationSignal) -> Result<(), CancellationError> {
        if signal.is_fired() {
            self.metrics.record_cancelled();
            debug!(rate = %self.limit(), "wait cancelled before first attempt");
            return Err(CancellationError);
        }

        let mut waited = false;
        loop {
            let outcome = self.lock().try_acquire(self.clock.now());

            let delay = match outcome {
                Acquire::Granted => {
                    if waited {
                        self.metrics.record_after_wait();
                    } else {
                        self.metrics.record_immediate();
                    }
                    trace!(rate = %self.limit(), waited, "admission granted");
                    return Ok(());
                }
                Acquire::Deficit(delay) => delay,
            };

            trace!(
                rate = %self.limit(),
                wait_ms = delay.as_secs_f64() * 1000.0,
                "waiting for token refill"
            );
            waited = true;

            if signal
                .run_until_fired(tokio::time::sleep(delay))
                .await
                .is_err()
            {
                self.metrics.record_cancelled();
                debug!(rate = %self.limit(), "wait cancelled while waiting for refill");
                return Err(CancellationError);
            }
            // Another waiter may have taken the refilled token; go around again
        }
    }

    fn limit(&self) -> Rate {
        self.lock().refill_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use std::time::{Duration, Instant};

    fn limiter(per_second: f64, burst: usize) -> TokenBucketLimiter {
        TokenBucketLimiter::new(Rate::new(per_second).unwrap(), burst).unwrap()
    }

    #[test]
    fn test_zero_burst_rejected() {
        let result = TokenBucketLimiter::new(Rate::new(1.0).unwrap(), 0);
        assert!(matches!(result, Err(BuildError::ZeroBurst)));

        let built = TokenBucketLimiter::builder()
            .with_rate(Rate::new(1.0).unwrap())
            .with_burst(0)
            .build();
        assert!(matches!(built, Err(BuildError::ZeroBurst)));
    }

    #[test]
    fn test_limit_is_refill_rate() {
        let limiter = limiter(2.5, 3);
        assert_eq!(limiter.limit(), Rate::new(2.5).unwrap());
        assert_eq!(limiter.burst(), 3);
    }

    #[test]
    fn test_builder_defaults_to_unbounded() {
        let limiter = TokenBucketLimiter::builder().build().unwrap();
        assert!(limiter.limit().is_unbounded());
        assert_eq!(limiter.burst(), 1);
    }

    #[test]
    fn test_try_acquire_with_mock_clock() {
        let clock = MockClock::new(Instant::now());
        let limiter = TokenBucketLimiter::builder()
            .with_rate(Rate::new(1.0).unwrap())
            .with_burst(2)
            .with_clock(Arc::new(clock.clone()))
            .build()
            .unwrap();

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.available(), 0.0);

        clock.advance(Duration::from_millis(500));
        assert!((limiter.available() - 0.5).abs() < 1e-9);
        assert!(!limiter.try_acquire());

        clock.advance(Duration::from_millis(500));
        assert!(limiter.try_acquire());
        assert_eq!(limiter.metrics().admitted_immediately(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_immediate() {
        let limiter = limiter(1.0, 5);
        let signal = CancellationSignal::new();
        let start = tokio::time::Instant::now();

        for _ in 0..5 {
            limiter.wait(&signal).await.unwrap();
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.metrics().admitted_immediately(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_after_burst_waits_one_interval() {
        let limiter = limiter(4.0, 2);
        let signal = CancellationSignal::new();

        limiter.wait(&signal).await.unwrap();
        limiter.wait(&signal).await.unwrap();

        let start = tokio::time::Instant::now();
        limiter.wait(&signal).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert_eq!(limiter.metrics().admitted_after_wait(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prefired_signal_consumes_nothing() {
        let limiter = limiter(1.0, 3);
        let signal = CancellationSignal::new();
        signal.fire();

        assert_eq!(limiter.wait(&signal).await, Err(CancellationError));
        assert_eq!(limiter.available(), 3.0);
        assert_eq!(limiter.metrics().cancelled(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_refill_wait() {
        let clock = MockClock::new(Instant::now());
        let limiter = TokenBucketLimiter::builder()
            .with_rate(Rate::new(0.1).unwrap())
            .with_clock(Arc::new(clock))
            .build()
            .unwrap();
        let signal = CancellationSignal::new();

        limiter.wait(&signal).await.unwrap();

        let firer = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            firer.fire();
        });

        let start = tokio::time::Instant::now();
        assert_eq!(limiter.wait(&signal).await, Err(CancellationError));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.available(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_each_get_one_token() {
        let limiter = Arc::new(limiter(10.0, 1));
        let signal = CancellationSignal::new();
        let start = tokio::time::Instant::now();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            let signal = signal.clone();
            handles.push(tokio::spawn(async move { limiter.wait(&signal).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // One from the burst, four more at 100ms apart
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert!(limiter.available() >= 0.0);
        assert_eq!(limiter.metrics().snapshot().admitted(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_glacial_rate_waits_without_overflow() {
        let limiter = TokenBucketLimiter::new(Rate::new(1e-20).unwrap(), 1).unwrap();
        let signal = CancellationSignal::new();
        limiter.wait(&signal).await.unwrap();

        let firer = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            firer.fire();
        });

        let start = tokio::time::Instant::now();
        assert_eq!(limiter.wait(&signal).await, Err(CancellationError));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.metrics().cancelled(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_honours_prefired_signal() {
        let limiter = TokenBucketLimiter::unbounded();
        let signal = CancellationSignal::new();
        signal.fire();

        assert_eq!(limiter.wait(&signal).await, Err(CancellationError));
        assert_eq!(limiter.metrics().cancelled(), 1);
        assert_eq!(limiter.metrics().snapshot().admitted(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poisoned_lock_is_recovered() {
        let limiter = Arc::new(limiter(1.0, 2));

        let poisoner = Arc::clone(&limiter);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.bucket.lock().unwrap();
            panic!("poison the bucket lock");
        })
        .join();
        assert!(result.is_err());
        assert!(limiter.bucket.is_poisoned());

        assert_eq!(limiter.available(), 2.0);
        assert_eq!(limiter.burst(), 2);
        assert!(limiter.try_acquire());

        let signal = CancellationSignal::new();
        limiter.wait(&signal).await.unwrap();
        assert_eq!(limiter.available(), 0.0);
        assert_eq!(limiter.metrics().admitted_immediately(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_never_waits() {
        let limiter = TokenBucketLimiter::unbounded();
        let signal = CancellationSignal::new();
        let start = tokio::time::Instant::now();

        for _ in 0..1000 {
            limiter.wait(&signal).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(limiter.limit().is_unbounded());
    }
}
