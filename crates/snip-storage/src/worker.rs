use snip_core::{Result, StorageError, Storager};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A request to tombstone `tokens` on behalf of `owner_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTask {
    pub tokens: Vec<String>,
    pub owner_id: String,
}

/// Sending half of the delete worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DeleteQueue {
    sender: mpsc::Sender<DeleteTask>,
}

impl DeleteQueue {
    /// Hands a task to the worker.
    ///
    /// Returns once the task is queued, not once it ran. Waits while the
    /// queue is full and fails only if the worker has stopped.
    pub async fn submit(&self, task: DeleteTask) -> Result<()> {
        self.sender
            .send(task)
            .await
            .map_err(|_| StorageError::Unavailable("delete worker has stopped".to_string()))
    }
}

/// Background task running deletes detached from the requests that asked for them.
///
/// Failures are logged and dropped; the requester was already told the
/// delete was accepted.
pub struct DeleteWorker;

impl DeleteWorker {
    /// Spawns the worker on the current runtime.
    ///
    /// The worker exits once every [`DeleteQueue`] clone is dropped and the
    /// queued tasks are drained.
    pub fn spawn<S>(storage: Arc<S>, capacity: usize) -> (DeleteQueue, JoinHandle<()>)
    where
        S: Storager + ?Sized,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(storage, receiver));
        (DeleteQueue { sender }, handle)
    }
}

async fn run<S>(storage: Arc<S>, mut receiver: mpsc::Receiver<DeleteTask>)
where
    S: Storager + ?Sized,
{
    while let Some(task) = receiver.recv().await {
        match storage.delete(&task.tokens, &task.owner_id).await {
            Ok(deleted) => info!(
                owner_id = %task.owner_id,
                requested = task.tokens.len(),
                deleted,
                "delete task finished"
            ),
            Err(err) => error!(
                owner_id = %task.owner_id,
                requested = task.tokens.len(),
                error = %err,
                "delete task failed"
            ),
        }
    }
    debug!("delete queue closed, worker exiting");
}
