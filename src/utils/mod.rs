//! Shared utility functions.
//!
//! This module contains reusable utilities used across the codebase:
//! - `process`: child process execution with cancellation and deadlines

pub mod process;

pub use process::{ProcessError, ProcessHandle, ProcessOutput};
