//! Task status tracking
//!
//! The status store shared between the executor's execution units and
//! status queries.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────
// Task Identity
// ─────────────────────────────────────────────────────────────────

/// Opaque handle identifying one queued unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Draw a fresh random id.
    ///
    /// Uniqueness within an executor is enforced by [`TaskRegistry::insert_new`],
    /// not by this constructor.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for thread names and compact log lines
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Task Status
// ─────────────────────────────────────────────────────────────────

/// Lifecycle state of a task.
///
/// The only transitions are `InProgress -> Success` and
/// `InProgress -> Failure`; both terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Submitted and not yet finished
    InProgress,
    /// Work function returned success
    Success,
    /// Work function returned an error or panicked
    Failure,
}

impl TaskStatus {
    /// Whether this status can never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::InProgress)
    }

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "INPROGRESS",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a work function ended, as seen by the execution wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Returned `Ok(())`
    Success,
    /// Returned an error (rendered with `Display`)
    Failed(String),
    /// Panicked; carries the panic message
    Panicked(String),
}

impl TaskOutcome {
    fn status(&self) -> TaskStatus {
        match self {
            TaskOutcome::Success => TaskStatus::Success,
            TaskOutcome::Failed(_) | TaskOutcome::Panicked(_) => TaskStatus::Failure,
        }
    }

    fn into_error(self) -> Option<String> {
        match self {
            TaskOutcome::Success => None,
            TaskOutcome::Failed(message) => Some(message),
            TaskOutcome::Panicked(message) => Some(format!("panicked: {}", message)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Task Record
// ─────────────────────────────────────────────────────────────────

/// Snapshot of one task's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    /// Current status
    pub status: TaskStatus,

    /// Diagnostic cause for a failure; never set for other states
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the task was queued
    pub queued_at: DateTime<Utc>,

    /// When the task reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    fn new() -> Self {
        Self {
            status: TaskStatus::InProgress,
            error: None,
            queued_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Apply the terminal transition. Returns `false` if already terminal.
    fn finish(&mut self, outcome: TaskOutcome) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = outcome.status();
        self.error = outcome.into_error();
        self.finished_at = Some(Utc::now());
        true
    }
}

/// Error returned by a status lookup itself, independent of task outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The id was never issued by this executor
    #[error("no task with id {0}")]
    NotFound(TaskId),
}

/// Number of records in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub in_progress: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl StatusSummary {
    /// Total number of records
    pub fn total(&self) -> usize {
        self.in_progress + self.succeeded + self.failed
    }
}

// ─────────────────────────────────────────────────────────────────
// Task Registry
// ─────────────────────────────────────────────────────────────────

/// Concurrency-safe map from task id to status record.
///
/// Records are inserted once, finished at most once, and never removed.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id and insert an `InProgress` record for it.
    ///
    /// The id is drawn while holding the write lock, so a collision with an
    /// existing record is detected and redrawn instead of overwriting it.
    pub fn insert_new(&self) -> TaskId {
        let mut tasks = self.tasks.write();
        loop {
            let id = TaskId::new();
            if let Entry::Vacant(slot) = tasks.entry(id) {
                slot.insert(TaskRecord::new());
                return id;
            }
        }
    }

    /// Move a record to its terminal state.
    ///
    /// Returns `false` when the id is unknown or the record is already
    /// terminal; the record is left untouched in both cases.
    pub fn finish(&self, id: &TaskId, outcome: TaskOutcome) -> bool {
        self.tasks
            .write()
            .get_mut(id)
            .map(|record| record.finish(outcome))
            .unwrap_or(false)
    }

    /// Current status of a task
    pub fn status(&self, id: &TaskId) -> Result<TaskStatus, QueryError> {
        self.tasks
            .read()
            .get(id)
            .map(|record| record.status)
            .ok_or(QueryError::NotFound(*id))
    }

    /// Full snapshot of a task's record
    pub fn record(&self, id: &TaskId) -> Result<TaskRecord, QueryError> {
        self.tasks
            .read()
            .get(id)
            .cloned()
            .ok_or(QueryError::NotFound(*id))
    }

    /// Count records by status
    pub fn summary(&self) -> StatusSummary {
        let tasks = self.tasks.read();
        let mut summary = StatusSummary::default();
        for record in tasks.values() {
            match record.status {
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Success => summary.succeeded += 1,
                TaskStatus::Failure => summary.failed += 1,
            }
        }
        summary
    }

    /// Number of records
    pub(crate) fn len(&self) -> usize {
        self.tasks.read().len()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
