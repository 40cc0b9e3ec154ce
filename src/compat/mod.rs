//! Execution compatibility for isolated workers.
//!
//! [`CompatibilityController`] inspects the host runtime's process-creation
//! method once per process and records whether recognition may be handed to
//! a separate worker. The decision is consumed by [`crate::dispatch`].

mod controller;
mod runtime;

pub use controller::{CompatError, CompatibilityController, CompatibilityStatus, WorkaroundPolicy};
pub use runtime::{
    ParseVersionError, ProcessContext, ProcessRuntime, RuntimeVersion, StartMethod,
    StartMethodError,
};
