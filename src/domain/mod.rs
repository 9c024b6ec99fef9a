//! Domain layer - pure rate arithmetic with no runtime dependencies.
//!
//! This layer contains the core concepts and invariants of admission control:
//! - Throughput values and their ordering
//! - Token bucket bookkeeping against explicit timestamps
//! - Error types
//!
//! All types in this layer are synchronous and easily testable.

pub mod bucket;
pub mod error;
pub mod rate;
