use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{OperationId, OperationOutcome};

pub(super) type HandleParts = (
    OperationId,
    CancellationToken,
    oneshot::Receiver<OperationOutcome>,
    Option<JoinHandle<()>>,
);

/// One running operation.
///
/// Consume it with [`wait`](Self::wait) from synchronous code or
/// [`finish`](Self::finish) from async code.
#[derive(Debug)]
pub struct OperationHandle {
    pub(super) id: OperationId,
    pub(super) cancel: CancellationToken,
    pub(super) lines: mpsc::UnboundedReceiver<String>,
    pub(super) outcome: oneshot::Receiver<OperationOutcome>,
    pub(super) thread: Option<JoinHandle<()>>,
}

impl OperationHandle {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Block until the operation finishes, calling `on_line` as each status
    /// line is produced.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn wait(mut self, mut on_line: impl FnMut(&str)) -> OperationOutcome {
        while let Some(line) = self.lines.blocking_recv() {
            on_line(&line);
        }
        let outcome = self
            .outcome
            .blocking_recv()
            .unwrap_or_else(|_| OperationOutcome::terminated(self.id));
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(id = self.id, "Operation thread panicked");
            }
        }
        outcome
    }

    /// Resolve to the outcome without blocking a thread.
    ///
    /// Dropping the future before it resolves cancels the operation.
    pub async fn finish(self) -> OperationOutcome {
        let OperationHandle {
            id, cancel, outcome, ..
        } = self;
        let guard = cancel.drop_guard();
        let outcome = outcome
            .await
            .unwrap_or_else(|_| OperationOutcome::terminated(id));
        guard.disarm();
        outcome
    }

    pub(super) fn into_parts(self) -> HandleParts {
        (self.id, self.cancel, self.outcome, self.thread)
    }
}
