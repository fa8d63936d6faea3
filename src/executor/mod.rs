//! Task executor module
//!
//! Handles the task lifecycle:
//! - Accepting work functions without blocking the submitter
//! - Running each one on an independent execution unit
//! - Converting returned errors and panics into `FAILURE`
//! - Answering point-in-time status queries

mod panic;
mod runner;
mod state;

pub use runner::*;
pub use state::*;
