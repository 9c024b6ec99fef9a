//! Clock adapters for time operations.
//!
//! Provides SystemClock implementation for production use.
//!
//! # Testing
//!
//! See `MockClock` (in `crate::infrastructure::mocks`) for a manually driven
//! test clock. Available with the `test-helpers` feature or in test builds:
//!
//! ```toml
//! [dev-dependencies]
//! composite-limiter = { version = "*", features = ["test-helpers"] }
//! ```

use crate::application::ports::Clock;
use std::time::Instant;

/// System clock reading tokio's time source.
///
/// Outside of tests this is `Instant::now()`. Under a paused tokio runtime
/// (`#[tokio::test(start_paused = true)]`) it follows the runtime's virtual
/// time, so refills and timed waits agree with each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
