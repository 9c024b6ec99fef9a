//! Forwarding a stream until a deadline fires.
//!
//! The input never closes, so only the signal ends the loop.

use composite_limiter::{filter_with_cancellation, CancellationSignal};
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let signal = CancellationSignal::new();

    let deadline = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        deadline.fire();
    });

    let (tx, rx) = mpsc::channel(8);
    for i in 0..8 {
        tx.send(i).await.expect("receiver is alive");
    }

    let mut values = filter_with_cancellation(&signal, rx);
    while let Some(v) = values.recv().await {
        print!("{} ", v);
    }

    signal.fired().await;
    println!("Done");
    drop(tx);
}
