//! An API client guarded by several composed limits.
//!
//! Every call is subject to the API-wide limit (2 per second and 10 per
//! minute). File reads are additionally limited to 1 per second, address
//! resolution to 3 per second. Twenty concurrent callers share one client.

use composite_limiter::{
    BuildError, CancellationError, CancellationSignal, MultiLimiter, Rate, RateLimiter,
    TokenBucketLimiter,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

struct ApiConnection {
    read_file_limit: MultiLimiter,
    resolve_address_limit: MultiLimiter,
}

impl ApiConnection {
    fn open() -> Result<Self, BuildError> {
        let api: Arc<dyn RateLimiter> = Arc::new(MultiLimiter::new(vec![
            leaf(Rate::per(2, Duration::from_secs(1))?, 2)?,
            leaf(Rate::per(10, Duration::from_secs(60))?, 10)?,
        ])?);
        let disk = leaf(Rate::new(1.0)?, 1)?;
        let network = leaf(Rate::per(3, Duration::from_secs(1))?, 3)?;

        Ok(Self {
            read_file_limit: MultiLimiter::new(vec![Arc::clone(&api), disk])?,
            resolve_address_limit: MultiLimiter::new(vec![api, network])?,
        })
    }

    async fn read_file(&self, signal: &CancellationSignal) -> Result<(), CancellationError> {
        self.read_file_limit.wait(signal).await?;
        // Pretend we do work here
        Ok(())
    }

    async fn resolve_address(&self, signal: &CancellationSignal) -> Result<(), CancellationError> {
        self.resolve_address_limit.wait(signal).await?;
        // Pretend we do work here
        Ok(())
    }
}

fn leaf(rate: Rate, burst: usize) -> Result<Arc<dyn RateLimiter>, BuildError> {
    Ok(Arc::new(TokenBucketLimiter::new(rate, burst)?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let connection = Arc::new(ApiConnection::open()?);
    let signal = CancellationSignal::new();
    let start = Instant::now();
    info!("Rate limited API calls");

    let mut handles = Vec::new();
    for i in 0..10 {
        let connection = Arc::clone(&connection);
        let signal = signal.clone();
        handles.push(tokio::spawn(async move {
            match connection.read_file(&signal).await {
                Ok(()) => info!(elapsed = ?start.elapsed(), call = i, "ReadFile"),
                Err(err) => info!(call = i, %err, "cannot ReadFile"),
            }
        }));
    }
    for i in 0..10 {
        let connection = Arc::clone(&connection);
        let signal = signal.clone();
        handles.push(tokio::spawn(async move {
            match connection.resolve_address(&signal).await {
                Ok(()) => info!(elapsed = ?start.elapsed(), call = i, "ResolveAddress"),
                Err(err) => info!(call = i, %err, "cannot ResolveAddress"),
            }
        }));
    }

    for handle in handles {
        handle.await?;
    }
    info!("Done");
    Ok(())
}
