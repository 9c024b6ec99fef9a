//! Cooperative cancellation.
//!
//! A [`CancellationSignal`] is created by the caller for one logical operation
//! and passed by reference into every call that can block. Firing it is
//! permanent and idempotent. Blocking operations in this crate race the
//! signal against their own completion through
//! [`CancellationSignal::run_until_fired`], so once it fires they return
//! within scheduler granularity.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::domain::error::CancellationError;

/// A broadcastable, one-way "stop" notification.
///
/// Clones are handles to the same signal: firing any of them fires all of
/// them, and every clone observes it.
///
/// # Example
/// ```
/// use composite_limiter::CancellationSignal;
///
/// let signal = CancellationSignal::new();
/// let observer = signal.clone();
/// assert!(!observer.is_fired());
///
/// signal.fire();
/// signal.fire(); // no additional effect
/// assert!(observer.is_fired());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
}

impl CancellationSignal {
    /// Create an unfired signal.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Fire the signal. Firing an already fired signal does nothing.
    pub fn fire(&self) {
        self.token.cancel();
    }

    /// Whether the signal has fired.
    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has fired. Resolves immediately if it already has.
    pub async fn fired(&self) {
        self.token.cancelled().await
    }

    /// A signal that fires whenever this one does.
    ///
    /// Firing the child does not fire the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Drive `future` to completion unless the signal fires first.
    ///
    /// An already fired signal wins without polling `future`. When both become
    /// ready in the same poll the signal wins. Either way `future` is dropped
    /// on cancellation, so it must not hold a half-done side effect across its
    /// await points.
    ///
    /// # Errors
    /// Returns `CancellationError` if the signal fired first.
    pub async fn run_until_fired<F>(&self, future: F) -> Result<F::Output, CancellationError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(CancellationError),
            output = future => Ok(output),
        }
    }
}
