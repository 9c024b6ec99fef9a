//! Cancellable forwarding of a value stream (the "or-done" pattern).
//!
//! [`filter_with_cancellation`] puts a producer task between an input queue
//! and the consumer. The task stops as soon as the signal fires, whether it is
//! waiting for the next input value or for the consumer to take the current
//! one, so a consumer that walks away never leaves it blocked.

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::trace;

use crate::application::cancel::CancellationSignal;

/// Lazy, single-pass output of [`filter_with_cancellation`].
///
/// Not restartable: once it yields `None` it stays exhausted.
#[derive(Debug)]
pub struct OrDone<T> {
    output: mpsc::Receiver<T>,
    signal: CancellationSignal,
    task: JoinHandle<()>,
}

/// Forward values from `input` until it closes or `signal` fires.
///
/// Before taking each input value and before handing each value on, the
/// producer checks the signal; once it has fired nothing more is forwarded and
/// the output closes. Must be called within a tokio runtime.
///
/// # Example
/// ```
/// use composite_limiter::{filter_with_cancellation, CancellationSignal};
/// use tokio::sync::mpsc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (tx, rx) = mpsc::channel(8);
/// for i in 0..8 {
///     tx.send(i).await.unwrap();
/// }
///
/// let signal = CancellationSignal::new();
/// let mut values = filter_with_cancellation(&signal, rx);
///
/// assert_eq!(values.recv().await, Some(0));
/// assert_eq!(values.recv().await, Some(1));
/// signal.fire();
/// assert_eq!(values.recv().await, None);
/// # }
/// ```
pub fn filter_with_cancellation<T>(
    signal: &CancellationSignal,
    mut input: mpsc::Receiver<T>,
) -> OrDone<T>
where
    T: Send + 'static,
{
    let (tx, output) = mpsc::channel(1);
    let done = signal.clone();

    let task = tokio::spawn(async move {
        let mut forwarded = 0usize;
        loop {
            let value = tokio::select! {
                biased;
                _ = done.fired() => break,
                next = input.recv() => match next {
                    Some(value) => value,
                    None => break,
                },
            };

            tokio::select! {
                biased;
                _ = done.fired() => break,
                sent = tx.send(value) => {
                    if sent.is_err() {
                        break;
                    }
                    forwarded += 1;
                }
            }
        }
        trace!(forwarded, cancelled = done.is_fired(), "or-done producer finished");
    });

    OrDone {
        output,
        signal: signal.clone(),
        task,
    }
}

impl<T> OrDone<T> {
    /// Next forwarded value, or `None` once the input closed or the signal fired.
    ///
    /// After the signal fires no further values are returned, including any
    /// value the producer had already handed over.
    pub async fn recv(&mut self) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.signal.fired() => {}
            value = self.output.recv() => return value,
        }
        self.output.close();
        None
    }

    /// Drain every remaining value.
    pub async fn collect_remaining(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(value) = self.recv().await {
            values.push(value);
        }
        values
    }

    /// Whether the producer task has terminated.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop consuming and wait for the producer task to terminate.
    ///
    /// Dropping the output first means the producer cannot stay blocked on a
    /// send, but a producer waiting on an open, idle input only returns once
    /// the input closes or the signal fires.
    ///
    /// # Errors
    /// Returns the `JoinError` if the producer task panicked or was aborted.
    pub async fn join(self) -> Result<(), JoinError> {
        let OrDone { output, task, .. } = self;
        drop(output);
        task.await
    }
}
