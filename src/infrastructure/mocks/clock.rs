//! Manually driven clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Mock clock for testing.
///
/// Time only moves when a test calls [`advance`](MockClock::advance) or
/// [`set`](MockClock::set). A limiter built on it refills deterministically,
/// and a limiter whose bucket is empty stays empty however long it sleeps,
/// which makes cancellation tests independent of timing.
///
/// # Examples
///
/// ```
/// use composite_limiter::infrastructure::mocks::MockClock;
/// use composite_limiter::{Rate, TokenBucketLimiter};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let clock = MockClock::new(Instant::now());
/// let limiter = TokenBucketLimiter::builder()
///     .with_rate(Rate::new(1.0).unwrap())
///     .with_clock(Arc::new(clock.clone()))
///     .build()
///     .unwrap();
///
/// assert!(limiter.try_acquire());
/// assert!(!limiter.try_acquire());
///
/// clock.advance(Duration::from_secs(1));
/// assert!(limiter.try_acquire());
/// ```
///
/// # Thread Safety
///
/// Clones share the same underlying time, so advancing one clone advances
/// all of them.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<Instant>>,
    start: Instant,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
            start,
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        *self.time() += duration;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: Instant) {
        *self.time() = instant;
    }

    /// Time advanced since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.time().saturating_duration_since(self.start)
    }

    fn time(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.time()
    }
}
