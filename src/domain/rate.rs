//! Throughput values.
//!
//! A [`Rate`] is a number of events per second. It is what every
//! [`RateLimiter`](crate::RateLimiter) reports from `limit()` and what the
//! [`MultiLimiter`](crate::MultiLimiter) sorts its constituents by.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use crate::domain::error::BuildError;

/// Events per second.
///
/// Always positive. [`Rate::INFINITE`] is the sentinel for a limiter that
/// imposes no cap; it sorts after every finite rate.
///
/// # Example
/// ```
/// use composite_limiter::Rate;
/// use std::time::Duration;
///
/// let rate = Rate::per(10, Duration::from_secs(60)).unwrap();
/// assert_eq!(rate.interval(), Some(Duration::from_secs(6)));
/// assert!(rate < Rate::new(1.0).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate(f64);

impl Rate {
    /// No cap at all.
    pub const INFINITE: Rate = Rate(f64::INFINITY);

    /// Create a rate from events per second.
    ///
    /// # Errors
    /// Returns `BuildError::InvalidRate` if the value is not finite and positive.
    /// Use [`Rate::INFINITE`] for an unbounded rate.
    pub fn new(per_second: f64) -> Result<Self, BuildError> {
        if !per_second.is_finite() || per_second <= 0.0 {
            return Err(BuildError::InvalidRate { rate: per_second });
        }
        Ok(Rate(per_second))
    }

    /// `events` spread evenly over `duration`.
    ///
    /// # Errors
    /// Returns `BuildError::ZeroEvents` for zero events and
    /// `BuildError::InvalidRate` for a zero duration.
    pub fn per(events: u32, duration: Duration) -> Result<Self, BuildError> {
        if events == 0 {
            return Err(BuildError::ZeroEvents);
        }
        Self::new(f64::from(events) / duration.as_secs_f64())
    }

    /// One event every `interval`.
    ///
    /// # Errors
    /// Returns `BuildError::InvalidRate` if `interval` is zero.
    pub fn every(interval: Duration) -> Result<Self, BuildError> {
        Self::new(1.0 / interval.as_secs_f64())
    }

    /// Events per second. `f64::INFINITY` for the unbounded sentinel.
    pub fn per_second(self) -> f64 {
        self.0
    }

    /// Whether this is [`Rate::INFINITE`].
    pub fn is_unbounded(self) -> bool {
        self.0.is_infinite()
    }

    /// Time between two events at this rate, `None` when unbounded.
    ///
    /// Saturates at `Duration::MAX` for rates too slow to express.
    pub fn interval(self) -> Option<Duration> {
        if self.is_unbounded() {
            None
        } else {
            Some(saturating_secs(1.0 / self.0))
        }
    }

    /// Time needed to accumulate `tokens` at this rate.
    ///
    /// Never rounds a positive amount down to zero, so a waiter always lets
    /// some time pass before it looks at the bucket again.
    pub(crate) fn duration_for(self, tokens: f64) -> Duration {
        if self.is_unbounded() || tokens <= 0.0 {
            return Duration::ZERO;
        }
        saturating_secs(tokens / self.0).max(Duration::from_nanos(1))
    }

    /// Tokens accumulated over `elapsed` at this rate.
    pub(crate) fn tokens_for(self, elapsed: Duration) -> f64 {
        elapsed.as_secs_f64() * self.0
    }
}

fn saturating_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

impl PartialOrd for Rate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.0.total_cmp(&other.0))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "unbounded")
        } else {
            write!(f, "{}/s", self.0)
        }
    }
}
