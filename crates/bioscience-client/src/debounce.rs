//! Trailing-edge debouncer over a tokio channel.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Forwards only the last value pushed within each quiet period.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    output: mpsc::UnboundedReceiver<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        let (input, mut in_rx) = mpsc::unbounded_channel::<T>();
        let (out_tx, output) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                match pending.take() {
                    None => match in_rx.recv().await {
                        Some(v) => pending = Some(v),
                        None => break,
                    },
                    Some(v) => {
                        tokio::select! {
                            next = in_rx.recv() => match next {
                                Some(n) => pending = Some(n),
                                None => break,
                            },
                            _ = tokio::time::sleep(delay) => {
                                if out_tx.send(v).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        });

        Self { input, output, task }
    }

    /// Returns false once the debouncer has shut down.
    pub fn push(&self, value: T) -> bool {
        self.input.send(value).is_ok()
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<T> {
        self.input.clone()
    }

    /// Next settled value.
    pub async fn next(&mut self) -> Option<T> {
        self.output.recv().await
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
