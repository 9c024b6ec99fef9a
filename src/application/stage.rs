//! One-shot pipeline stage with explicit cancellation checkpoints.
//!
//! A stage takes one value from its input, runs a computation on it and
//! hands back the result. Cancellation is checked at exactly these points:
//!
//! 1. while waiting for the input value,
//! 2. after the computation, before the result is delivered.
//!
//! The computation itself is **not** preemptable. Once started it runs to
//! completion unless it polls the signal it is given at its own sub-steps.
//! Callers waiting on [`Stage::result`] stop waiting as soon as the signal
//! fires either way; only the work itself may keep running.

use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::application::cancel::CancellationSignal;
use crate::domain::error::CancellationError;

/// Handle to a running stage.
#[derive(Debug)]
pub struct Stage<R> {
    result: oneshot::Receiver<R>,
    signal: CancellationSignal,
    task: JoinHandle<()>,
}

/// Spawn a stage computing `computation(signal, value)` on the next value of
/// `input`.
///
/// `computation` receives a clone of the signal. Code that wants to be
/// preemptable must check it between sub-steps, for example with
/// [`CancellationSignal::run_until_fired`]; code that ignores it is
/// non-preemptable. Must be called within a tokio runtime.
///
/// # Example
/// ```
/// use composite_limiter::{spawn_stage, CancellationSignal};
/// use tokio::sync::mpsc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (tx, rx) = mpsc::channel(1);
/// tx.send(20u64).await.unwrap();
///
/// let signal = CancellationSignal::new();
/// let stage = spawn_stage(&signal, rx, |_signal, n| async move { n * 2 + 2 });
///
/// assert_eq!(stage.result().await, Ok(42));
/// # }
/// ```
pub fn spawn_stage<T, R, F, Fut>(
    signal: &CancellationSignal,
    mut input: mpsc::Receiver<T>,
    computation: F,
) -> Stage<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: FnOnce(CancellationSignal, T) -> Fut + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let (tx, result) = oneshot::channel();
    let done = signal.clone();

    let task = tokio::spawn(async move {
        let value = match done.run_until_fired(input.recv()).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                trace!("stage input closed before a value arrived");
                return;
            }
            Err(_) => {
                trace!("stage cancelled while waiting for input");
                return;
            }
        };

        // Not a checkpoint: runs to completion unless the computation polls `done`
        let output = computation(done.clone(), value).await;

        if done.is_fired() {
            trace!("stage cancelled; result discarded");
            return;
        }
        // The receiver may already be gone; nothing is left pending either way
        let _ = tx.send(output);
    });

    Stage {
        result,
        signal: signal.clone(),
        task,
    }
}

impl<R> Stage<R> {
    /// Wait for the result.
    ///
    /// # Errors
    /// Returns `CancellationError` if the signal fired before a result was
    /// delivered, or if the stage ended without one because its input closed.
    pub async fn result(self) -> Result<R, CancellationError> {
        match self.signal.run_until_fired(self.result).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(_)) | Err(_) => Err(CancellationError),
        }
    }

    /// Whether the stage task has terminated.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
