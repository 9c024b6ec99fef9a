//! Application layer - limiters and cancellation-aware tasks.
//!
//! This layer turns the domain arithmetic into runtime behavior:
//! - Cancellation signal shared by every blocking operation
//! - Token bucket leaf limiter and the composite multi limiter
//! - Cancellable stream forwarding and one-shot stages
//! - Admission metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement, and the `RateLimiter` capability shared by
//! leaves and composites.

pub mod cancel;
pub mod metrics;
pub mod multi;
pub mod or_done;
pub mod ports;
pub mod stage;
pub mod token_bucket;
