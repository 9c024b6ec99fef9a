//! Basic example of a single token bucket.
//!
//! Three admissions go through at once from the burst, after which the
//! limiter paces callers at two per second.

use composite_limiter::{CancellationSignal, Rate, RateLimiter, TokenBucketLimiter};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let limiter = TokenBucketLimiter::new(Rate::per(2, Duration::from_secs(1))?, 3)?;
    let signal = CancellationSignal::new();

    println!("=== Token Bucket Example ===\n");
    println!("Rate: {}, burst: {}\n", limiter.limit(), limiter.burst());

    let start = Instant::now();
    for i in 1..=8 {
        limiter.wait(&signal).await?;
        println!("{:>6.3}s  request {}", start.elapsed().as_secs_f64(), i);
    }

    let snapshot = limiter.metrics().snapshot();
    println!(
        "\nImmediate: {}, after waiting: {}",
        snapshot.admitted_immediately, snapshot.admitted_after_wait
    );
    println!("\n=== Example Complete ===");
    Ok(())
}
