//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::application::cancel::CancellationSignal;
use crate::domain::{error::CancellationError, rate::Rate};

/// Port for obtaining current time.
///
/// This abstraction allows limiters to refill against time without depending
/// on system clock implementation details. Infrastructure provides concrete
/// implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Admission control for a protected operation.
///
/// Implemented by single-constraint leaves
/// ([`TokenBucketLimiter`](crate::TokenBucketLimiter)) and by the
/// [`MultiLimiter`](crate::MultiLimiter) composite, so composites nest.
///
/// The limiter never performs the protected operation. Callers invoke it
/// only after `wait` returns `Ok(())`, and own any retry decision when it
/// returns `Err`.
#[async_trait]
pub trait RateLimiter: Send + Sync + Debug {
    /// Block until admitted or until `signal` fires.
    ///
    /// # Errors
    /// Returns `CancellationError` if the signal fired before admission was
    /// granted.
    async fn wait(&self, signal: &CancellationSignal) -> Result<(), CancellationError>;

    /// Configured or derived throughput.
    fn limit(&self) -> Rate;
}

#[async_trait]
impl<T> RateLimiter for Arc<T>
where
    T: RateLimiter + ?Sized,
{
    async fn wait(&self, signal: &CancellationSignal) -> Result<(), CancellationError> {
        (**self).wait(signal).await
    }

    fn limit(&self) -> Rate {
        (**self).limit()
    }
}
