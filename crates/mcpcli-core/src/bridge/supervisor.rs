//! Ownership of every worker started on behalf of a long-lived surface.
//!
//! The GUI starts operations and forgets them; the supervisor keeps the
//! cancellation token and the thread of each so that shutdown can cancel and
//! join them all.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ExecutionBridge, OperationId, OperationOutcome, OperationRequest};

struct Worker {
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn join(mut self, id: OperationId) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(id, "Operation thread panicked");
            }
        }
    }
}

/// Outcome of an operation started through a [`TaskSupervisor`].
#[derive(Debug)]
pub struct PendingOperation {
    id: OperationId,
    outcome: oneshot::Receiver<OperationOutcome>,
}

impl PendingOperation {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub async fn finish(self) -> OperationOutcome {
        self.outcome
            .await
            .unwrap_or_else(|_| OperationOutcome::terminated(self.id))
    }
}

pub struct TaskSupervisor {
    bridge: ExecutionBridge,
    workers: Mutex<HashMap<OperationId, Worker>>,
}

impl TaskSupervisor {
    pub fn new(bridge: ExecutionBridge) -> Self {
        Self {
            bridge,
            workers: Mutex::new(HashMap::new()),
        }
    }

    pub fn bridge(&self) -> &ExecutionBridge {
        &self.bridge
    }

    pub fn start(&self, request: OperationRequest) -> PendingOperation {
        let (id, cancel, outcome, thread) = self.bridge.spawn(request).into_parts();
        self.workers().insert(id, Worker { cancel, thread });
        debug!(id, "Supervising operation");
        PendingOperation { id, outcome }
    }

    /// Request cancellation of one operation. False when it is not tracked.
    pub fn cancel(&self, id: OperationId) -> bool {
        match self.workers().get(&id) {
            Some(worker) => {
                worker.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of workers still running; finished ones are joined and dropped.
    pub fn active(&self) -> usize {
        let finished: Vec<(OperationId, Worker)> = {
            let mut workers = self.workers();
            let done: Vec<OperationId> = workers
                .iter()
                .filter(|(_, worker)| worker.is_finished())
                .map(|(id, _)| *id)
                .collect();
            done.into_iter()
                .filter_map(|id| workers.remove(&id).map(|worker| (id, worker)))
                .collect()
        };
        for (id, worker) in finished {
            worker.join(id);
        }
        self.workers().len()
    }

    /// Cancel every worker, then join every thread. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let workers: Vec<(OperationId, Worker)> = self.workers().drain().collect();
        if workers.is_empty() {
            return;
        }
        info!(count = workers.len(), "Shutting down operations");
        for (_, worker) in &workers {
            worker.cancel.cancel();
        }
        for (id, worker) in workers {
            worker.join(id);
        }
    }

    fn workers(&self) -> MutexGuard<'_, HashMap<OperationId, Worker>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
