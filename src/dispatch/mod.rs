//! Recognition dispatch.
//!
//! [`Dispatcher`] is the entry point for running recognition "isolated when
//! safe". It consults the [`CompatibilityController`](crate::compat::CompatibilityController)
//! on every call and falls back to the engine's synchronous path whenever
//! isolated workers are not safe in this process.

mod executor;
mod facade;
mod job;

pub use executor::{IsolatedExecutor, SubprocessExecutor};
pub use facade::{DispatchMode, Dispatcher};
pub use job::{serve_job, RecognitionJob, WorkerFailure, WorkerReply};
