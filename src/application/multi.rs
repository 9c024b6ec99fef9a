//! Composite limiter enforcing several constraints at once.
//!
//! A [`MultiLimiter`] admits an operation only after every constituent has
//! admitted it. Constituents are sorted by `limit()` once, at construction,
//! and always waited on in that order, most restrictive first.
//!
//! # Partial consumption
//!
//! Constituents are waited on one after another. If a later constituent's wait
//! is cancelled, tokens already taken from earlier constituents are **not**
//! returned. A cancelled composite wait can therefore still use up capacity
//! of the faster constraints.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::application::cancel::CancellationSignal;
use crate::application::ports::RateLimiter;
use crate::domain::error::{BuildError, CancellationError};
use crate::domain::rate::Rate;

/// Rate limiter enforcing the conjunction of its constituents.
///
/// Worst-case latency of [`wait`](RateLimiter::wait) is the sum of the
/// constituents' waits, not their maximum: constituents are never waited on
/// in parallel.
///
/// # Example
/// ```
/// use composite_limiter::{CancellationSignal, MultiLimiter, Rate, RateLimiter, TokenBucketLimiter};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let per_second = TokenBucketLimiter::new(Rate::per(2, Duration::from_secs(1)).unwrap(), 2).unwrap();
/// let per_minute = TokenBucketLimiter::new(Rate::per(10, Duration::from_secs(60)).unwrap(), 10).unwrap();
///
/// let api = MultiLimiter::new(vec![
///     Arc::new(per_second) as Arc<dyn RateLimiter>,
///     Arc::new(per_minute),
/// ])
/// .unwrap();
///
/// // The per-minute constraint is the binding one
/// assert_eq!(api.limit(), Rate::per(10, Duration::from_secs(60)).unwrap());
///
/// let signal = CancellationSignal::new();
/// api.wait(&signal).await.unwrap();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MultiLimiter {
    limiters: Arc<[Arc<dyn RateLimiter>]>,
}

impl MultiLimiter {
    /// Compose `limiters`, sorting them ascending by `limit()`.
    ///
    /// The sort is stable: constituents with equal limits keep the order they
    /// were given in. That order is an implementation detail, not a guarantee.
    ///
    /// # Errors
    /// Returns `BuildError::NoConstituents` if `limiters` is empty.
    pub fn new<I>(limiters: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = Arc<dyn RateLimiter>>,
    {
        let mut keyed: Vec<(Rate, Arc<dyn RateLimiter>)> = limiters
            .into_iter()
            .map(|limiter| (limiter.limit(), limiter))
            .collect();
        if keyed.is_empty() {
            return Err(BuildError::NoConstituents);
        }

        keyed.sort_by(|(a, _), (b, _)| a.per_second().total_cmp(&b.per_second()));

        Ok(Self {
            limiters: keyed.into_iter().map(|(_, l)| l).collect(),
        })
    }

    /// Number of constituents.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Always false: an empty composite cannot be built.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Constituent limits in evaluation order.
    pub fn limits(&self) -> Vec<Rate> {
        self.limiters.iter().map(|l| l.limit()).collect()
    }
}

#[async_trait]
impl RateLimiter for MultiLimiter {
    async fn wait(&self, signal: &CancellationSignal) -> Result<(), CancellationError> {
        for (index, limiter) in self.limiters.iter().enumerate() {
            if let Err(err) = limiter.wait(signal).await {
                debug!(
                    constituent = index,
                    constituents = self.limiters.len(),
                    "composite wait cancelled; earlier admissions are kept"
                );
                return Err(err);
            }
            trace!(constituent = index, "constituent admitted");
        }
        Ok(())
    }

    fn limit(&self) -> Rate {
        // Sorted at construction, so the first constituent is the most restrictive
        self.limiters[0].limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::token_bucket::TokenBucketLimiter;
    use crate::infrastructure::mocks::MockClock;
    use std::time::{Duration, Instant};

    fn leaf(per_second: f64, burst: usize) -> Arc<TokenBucketLimiter> {
        Arc::new(TokenBucketLimiter::new(Rate::new(per_second).unwrap(), burst).unwrap())
    }

    fn frozen_leaf(clock: &MockClock, per_second: f64, burst: usize) -> Arc<TokenBucketLimiter> {
        Arc::new(
            TokenBucketLimiter::builder()
                .with_rate(Rate::new(per_second).unwrap())
                .with_burst(burst)
                .with_clock(Arc::new(clock.clone()))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_empty_is_rejected() {
        let result = MultiLimiter::new(Vec::new());
        assert!(matches!(result, Err(BuildError::NoConstituents)));
    }

    #[test]
    fn test_sorted_by_limit() {
        let multi = MultiLimiter::new(vec![
            leaf(5.0, 1) as Arc<dyn RateLimiter>,
            leaf(0.5, 1),
            Arc::new(TokenBucketLimiter::unbounded()),
            leaf(2.0, 1),
        ])
        .unwrap();

        let limits: Vec<f64> = multi.limits().iter().map(|r| r.per_second()).collect();
        assert_eq!(limits, vec![0.5, 2.0, 5.0, f64::INFINITY]);
        assert_eq!(multi.limit(), Rate::new(0.5).unwrap());
        assert_eq!(multi.len(), 4);
    }

    #[test]
    fn test_limit_is_minimum_for_every_order() {
        let rates = [3.0, 1.5, 7.0];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for order in orders {
            let multi = MultiLimiter::new(
                order
                    .iter()
                    .map(|&i| leaf(rates[i], 1) as Arc<dyn RateLimiter>)
                    .collect::<Vec<_>>(),
            )
            .unwrap();
            assert_eq!(
                multi.limit(),
                Rate::new(1.5).unwrap(),
                "order {:?} should report the minimum",
                order
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_limits_evaluated_in_insertion_order() {
        let clock = MockClock::new(Instant::now());
        let first = frozen_leaf(&clock, 1.0, 1);
        let second = frozen_leaf(&clock, 1.0, 2);

        let multi = MultiLimiter::new(vec![
            Arc::clone(&first) as Arc<dyn RateLimiter>,
            Arc::clone(&second) as Arc<dyn RateLimiter>,
        ])
        .unwrap();
        let signal = CancellationSignal::new();

        multi.wait(&signal).await.unwrap();

        let firer = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            firer.fire();
        });

        // `first` is empty and blocks, so `second` is never reached
        assert_eq!(multi.wait(&signal).await, Err(CancellationError));
        assert_eq!(first.available(), 0.0);
        assert_eq!(second.available(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_takes_a_token_from_every_constituent() {
        let clock = MockClock::new(Instant::now());
        let slow = frozen_leaf(&clock, 1.0, 3);
        let fast = frozen_leaf(&clock, 10.0, 3);

        let multi = MultiLimiter::new(vec![
            Arc::clone(&fast) as Arc<dyn RateLimiter>,
            Arc::clone(&slow) as Arc<dyn RateLimiter>,
        ])
        .unwrap();
        let signal = CancellationSignal::new();

        multi.wait(&signal).await.unwrap();
        assert_eq!(slow.available(), 2.0);
        assert_eq!(fast.available(), 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nested_composites() {
        let inner = MultiLimiter::new(vec![leaf(2.0, 1) as Arc<dyn RateLimiter>, leaf(4.0, 1)])
            .unwrap();
        let outer =
            MultiLimiter::new(vec![Arc::new(inner) as Arc<dyn RateLimiter>, leaf(1.0, 1)])
                .unwrap();

        assert_eq!(outer.limit(), Rate::new(1.0).unwrap());

        let signal = CancellationSignal::new();
        outer.wait(&signal).await.unwrap();

        let start = tokio::time::Instant::now();
        outer.wait(&signal).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
