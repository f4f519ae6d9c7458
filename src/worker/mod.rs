//! Worker module for queueing and executing rank check jobs
//!
//! This module provides:
//! - JobQueue: FIFO queue of deferred work items
//! - JobWorker: Single consumer loop with failure isolation
//! - JobLifecycle: Status transitions around one rank check execution
//! - WorkerConfig: Configuration for the worker

pub mod config;
pub mod lifecycle;
pub mod queue;
pub mod runner;

pub use config::WorkerConfig;
pub use lifecycle::JobLifecycle;
pub use queue::{JobQueue, WorkItem};
pub use runner::{setup_signal_handler, ItemOutcome, JobWorker};
