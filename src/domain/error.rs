//! Error types.

/// Returned by `wait` when the cancellation signal fired before admission
/// was granted. No token was consumed by the limiter that returned it.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("wait cancelled before admission was granted")]
pub struct CancellationError;

/// Error returned when constructing a limiter fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// A composite limiter needs at least one constituent.
    #[error("multi limiter requires at least one constituent limiter")]
    NoConstituents,

    /// The rate is not finite and positive.
    #[error("invalid rate: {rate}. Rate must be finite and positive")]
    InvalidRate {
        /// The rejected value, in events per second.
        rate: f64,
    },

    /// Burst capacity must be at least one token.
    #[error("burst capacity must be greater than 0")]
    ZeroBurst,

    /// An event count of zero gives no rate.
    #[error("event count must be greater than 0")]
    ZeroEvents,
}
