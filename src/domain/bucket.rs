//! Token bucket state.
//!
//! Pure bookkeeping with explicit timestamps: no locking, no clock, no
//! sleeping. [`TokenBucketLimiter`](crate::TokenBucketLimiter) wraps it with a
//! mutex and an async wait.

use std::time::{Duration, Instant};

use crate::domain::rate::Rate;

/// Outcome of asking the bucket for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// A token was taken.
    Granted,
    /// Not enough tokens; one will be available after this delay.
    Deficit(Duration),
}

impl Acquire {
    /// Check if this outcome is `Granted`.
    pub fn is_granted(&self) -> bool {
        matches!(self, Acquire::Granted)
    }
}

/// A bucket of up to `capacity` tokens refilling continuously at `refill_rate`.
///
/// Invariant: `0.0 <= tokens <= capacity` after every operation. Tokens only
/// grow through [`refill`](TokenBucket::refill) and only shrink by exactly one
/// per granted [`try_acquire`](TokenBucket::try_acquire).
///
/// # Example
/// ```
/// use composite_limiter::domain::bucket::TokenBucket;
/// use composite_limiter::Rate;
/// use std::time::{Duration, Instant};
///
/// let now = Instant::now();
/// let mut bucket = TokenBucket::new(Rate::new(2.0).unwrap(), 2, now);
///
/// assert!(bucket.try_acquire(now).is_granted());
/// assert!(bucket.try_acquire(now).is_granted());
/// assert!(!bucket.try_acquire(now).is_granted());
///
/// // Half a second later one token has come back
/// assert!(bucket.try_acquire(now + Duration::from_millis(500)).is_granted());
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: usize,
    refill_rate: Rate,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// `capacity` is clamped to at least one token. The limiter does not rely
    /// on this: [`TokenBucketLimiter`](crate::TokenBucketLimiter) validates its burst
    /// first and rejects zero with [`BuildError::ZeroBurst`](crate::BuildError::ZeroBurst).
    pub fn new(refill_rate: Rate, capacity: usize, now: Instant) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            refill_rate,
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    /// Add the tokens accrued since the last refill, capped at capacity.
    ///
    /// A `now` earlier than the last refill adds nothing and leaves the
    /// refill timestamp untouched.
    pub fn refill(&mut self, now: Instant) {
        self.tokens = self.tokens_at(now);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// Refill, then take one token if available.
    pub fn try_acquire(&mut self, now: Instant) -> Acquire {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Acquire::Granted
        } else {
            let deficit = 1.0 - self.tokens;
            Acquire::Deficit(self.refill_rate.duration_for(deficit))
        }
    }

    /// Tokens the bucket would hold at `now`, without mutating it.
    pub fn tokens_at(&self, now: Instant) -> f64 {
        let capacity = self.capacity as f64;
        if self.refill_rate.is_unbounded() {
            return capacity;
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        (self.tokens + self.refill_rate.tokens_for(elapsed)).min(capacity)
    }

    /// Burst capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Refill rate.
    pub fn refill_rate(&self) -> Rate {
        self.refill_rate
    }
}
