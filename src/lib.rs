//! transcribe4all
//!
//! Audio transcription job service. Jobs are submitted over HTTP, run in the
//! background by a [`executor::TaskExecutor`] and polled by id.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod transcription;
pub mod web;

pub use error::{Error, ErrorCode, Result};
pub use executor::{QueryError, TaskExecutor, TaskId, TaskStatus};
