//! Task execution runner
//!
//! Starts each queued work function on its own execution unit and records
//! how it ended.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use super::panic::panic_message;
use super::{QueryError, StatusSummary, TaskId, TaskOutcome, TaskRecord, TaskRegistry, TaskStatus};

// ─────────────────────────────────────────────────────────────────
// Task Executor
// ─────────────────────────────────────────────────────────────────

/// Runs work functions without blocking the submitter and answers status
/// queries about them.
///
/// The executor is a cheap handle: clones share the same registry, so one
/// instance can be handed to every request handler. Separate instances
/// created with [`TaskExecutor::new`] are fully independent.
///
/// There is no bound on concurrently running tasks, no cancellation and no
/// timeout. A work function that never returns keeps its task
/// `INPROGRESS` and holds its execution unit for the life of the process.
#[derive(Clone, Default)]
pub struct TaskExecutor {
    registry: Arc<TaskRegistry>,
}

impl TaskExecutor {
    /// Create an executor with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a blocking work function on a dedicated OS thread.
    ///
    /// The task is recorded as `INPROGRESS` before the thread starts, and
    /// the id is returned without waiting for `work`. Errors and panics
    /// raised by `work` are recorded as `FAILURE`; they never reach the
    /// caller.
    pub fn queue_task<F, E>(&self, work: F) -> TaskId
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: fmt::Display,
    {
        let id = self.registry.insert_new();
        let registry = Arc::clone(&self.registry);

        let spawned = thread::Builder::new()
            .name(format!("task-{}", id.short()))
            .spawn(move || {
                // Rendering the error happens inside the guard as well, so a
                // panicking `Display` impl is still caught.
                let result = panic::catch_unwind(AssertUnwindSafe(move || {
                    work().map_err(|e| e.to_string())
                }));
                let outcome = match result {
                    Ok(Ok(())) => TaskOutcome::Success,
                    Ok(Err(message)) => TaskOutcome::Failed(message),
                    Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
                };
                complete(&registry, id, outcome);
            });

        match spawned {
            Ok(_) => info!(task_id = %id, unit = "thread", "Task queued"),
            Err(e) => {
                error!(task_id = %id, error = %e, "Failed to start execution thread");
                complete(
                    &self.registry,
                    id,
                    TaskOutcome::Failed(format!("failed to start execution thread: {}", e)),
                );
            }
        }

        id
    }

    /// Queue an async work function on the current tokio runtime.
    ///
    /// Same contract as [`queue_task`](Self::queue_task). The future should
    /// not block its worker thread; use `queue_task` for CPU-bound or
    /// blocking work. Called outside a runtime, the task is recorded as
    /// `FAILURE` immediately.
    pub fn queue_async<Fut, E>(&self, work: Fut) -> TaskId
    where
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let id = self.registry.insert_new();
        let registry = Arc::clone(&self.registry);

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let guarded = AssertUnwindSafe(async move {
                        work.await.map_err(|e| e.to_string())
                    });
                    let outcome = match guarded.catch_unwind().await {
                        Ok(Ok(())) => TaskOutcome::Success,
                        Ok(Err(message)) => TaskOutcome::Failed(message),
                        Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
                    };
                    complete(&registry, id, outcome);
                });
                info!(task_id = %id, unit = "async", "Task queued");
            }
            Err(e) => {
                error!(task_id = %id, error = %e, "No async runtime to run task on");
                complete(
                    &self.registry,
                    id,
                    TaskOutcome::Failed(format!("no async runtime available: {}", e)),
                );
            }
        }

        id
    }

    /// Point-in-time status of a task. Never waits for completion.
    ///
    /// A task that failed or panicked is reported as `Ok(TaskStatus::Failure)`;
    /// only an id this executor never issued yields an error.
    pub fn task_status(&self, id: &TaskId) -> Result<TaskStatus, QueryError> {
        self.registry.status(id)
    }

    /// Point-in-time snapshot of a task's full record, including the
    /// diagnostic failure cause
    pub fn task_record(&self, id: &TaskId) -> Result<TaskRecord, QueryError> {
        self.registry.record(id)
    }

    /// Poll [`task_status`](Self::task_status) every `poll_interval` until
    /// the task reaches a terminal state.
    ///
    /// Never returns for a task that never finishes; wrap in
    /// `tokio::time::timeout` to bound the wait.
    pub async fn wait_for(
        &self,
        id: &TaskId,
        poll_interval: Duration,
    ) -> Result<TaskStatus, QueryError> {
        loop {
            let status = self.task_status(id)?;
            if status.is_terminal() {
                return Ok(status);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Count of tasks in each state
    pub fn summary(&self) -> StatusSummary {
        self.registry.summary()
    }
}

impl fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("tasks", &self.registry.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Task Completion
// ─────────────────────────────────────────────────────────────────

/// Record a task's terminal outcome and log it
fn complete(registry: &TaskRegistry, id: TaskId, outcome: TaskOutcome) {
    match &outcome {
        TaskOutcome::Success => info!(task_id = %id, "Task completed successfully"),
        TaskOutcome::Failed(message) => warn!(task_id = %id, error = %message, "Task failed"),
        TaskOutcome::Panicked(message) => error!(task_id = %id, panic = %message, "Task panicked"),
    }

    if !registry.finish(&id, outcome) {
        debug!(task_id = %id, "Ignoring second completion for task");
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn wait_blocking(executor: &TaskExecutor, id: &TaskId) -> TaskStatus {
        loop {
            let status = executor.task_status(id).unwrap();
            if status.is_terminal() {
                return status;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_queue_task_success() {
        let executor = TaskExecutor::new();
        let id = executor.queue_task(|| Ok::<(), String>(()));

        assert_eq!(wait_blocking(&executor, &id), TaskStatus::Success);
        assert!(executor.task_record(&id).unwrap().error.is_none());
    }

    #[test]
    fn test_queue_task_error_keeps_message() {
        let executor = TaskExecutor::new();
        let id = executor.queue_task(|| Err::<(), _>("bad input"));

        assert_eq!(wait_blocking(&executor, &id), TaskStatus::Failure);
        assert_eq!(
            executor.task_record(&id).unwrap().error.as_deref(),
            Some("bad input")
        );
    }

    #[test]
    fn test_queue_task_panic_is_contained() {
        let executor = TaskExecutor::new();
        let id = executor.queue_task(|| -> Result<(), String> { panic!("boom") });

        assert_eq!(wait_blocking(&executor, &id), TaskStatus::Failure);
        assert_eq!(
            executor.task_record(&id).unwrap().error.as_deref(),
            Some("panicked: boom")
        );
    }

    #[test]
    fn test_panicking_display_is_contained() {
        struct Nasty;
        impl fmt::Display for Nasty {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                panic!("display exploded")
            }
        }

        let executor = TaskExecutor::new();
        let id = executor.queue_task(|| Err::<(), _>(Nasty));

        assert_eq!(wait_blocking(&executor, &id), TaskStatus::Failure);
    }

    #[test]
    fn test_in_progress_until_released() {
        let executor = TaskExecutor::new();
        let (tx, rx) = mpsc::channel::<()>();
        let id = executor.queue_task(move || rx.recv().map_err(|e| e.to_string()));

        assert_eq!(executor.task_status(&id), Ok(TaskStatus::InProgress));
        tx.send(()).unwrap();
        assert_eq!(wait_blocking(&executor, &id), TaskStatus::Success);
    }

    #[test]
    fn test_queue_async_without_runtime_fails_task() {
        let executor = TaskExecutor::new();
        let id = executor.queue_async(async { Ok::<(), String>(()) });

        let record = executor.task_record(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Failure);
        assert!(record.error.unwrap().contains("no async runtime"));
    }

    #[tokio::test]
    async fn test_queue_async_outcomes() {
        let executor = TaskExecutor::new();
        let poll = Duration::from_millis(1);

        let ok = executor.queue_async(async { Ok::<(), String>(()) });
        let failed = executor.queue_async(async { Err::<(), _>("bad input".to_string()) });
        let panicked = executor.queue_async(async {
            if true {
                panic!("boom");
            }
            Ok::<(), String>(())
        });

        assert_eq!(executor.wait_for(&ok, poll).await, Ok(TaskStatus::Success));
        assert_eq!(executor.wait_for(&failed, poll).await, Ok(TaskStatus::Failure));
        assert_eq!(executor.wait_for(&panicked, poll).await, Ok(TaskStatus::Failure));
    }

    #[tokio::test]
    async fn test_wait_for_unknown_id() {
        let executor = TaskExecutor::new();
        let stranger = TaskId::new();

        assert_eq!(
            executor.wait_for(&stranger, Duration::from_millis(1)).await,
            Err(QueryError::NotFound(stranger))
        );
    }

    #[test]
    fn test_executors_are_independent() {
        let first = TaskExecutor::new();
        let second = TaskExecutor::new();
        let id = first.queue_task(|| Ok::<(), String>(()));

        assert!(first.task_status(&id).is_ok());
        assert_eq!(second.task_status(&id), Err(QueryError::NotFound(id)));
    }

    #[test]
    fn test_clones_share_registry() {
        let executor = TaskExecutor::new();
        let handle = executor.clone();
        let id = handle.queue_task(|| Ok::<(), String>(()));

        assert_eq!(wait_blocking(&executor, &id), TaskStatus::Success);
        assert_eq!(executor.summary().succeeded, 1);
    }
}
