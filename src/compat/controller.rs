//! Decides whether isolated-worker dispatch is safe in this process.
//!
//! Host runtimes from a known version onwards default to a process-creation
//! method that re-executes the program in a fresh process. Workers started
//! that way cannot receive closures that capture engine state. The controller
//! switches the runtime to the duplicating method when it can, and otherwise
//! records that isolation is unsafe so dispatch stays in-process.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::runtime::{ProcessRuntime, RuntimeVersion, StartMethod, StartMethodError};

#[derive(Debug, Error)]
pub enum CompatError {
    #[error("cannot switch process-creation method to {requested}: {source}")]
    DerivationFailed {
        requested: StartMethod,
        #[source]
        source: StartMethodError,
    },
}

/// Which runtime versions need the duplicating process-creation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkaroundPolicy {
    /// First runtime version whose default method breaks captured state.
    pub affected_since: RuntimeVersion,
    /// Method that keeps captured state intact.
    pub method: StartMethod,
}

impl WorkaroundPolicy {
    pub fn new(affected_since: RuntimeVersion) -> Self {
        Self {
            affected_since,
            method: StartMethod::Fork,
        }
    }

    pub fn needs_workaround(&self, version: RuntimeVersion) -> bool {
        version >= self.affected_since
    }
}

impl Default for WorkaroundPolicy {
    fn default() -> Self {
        Self::new(RuntimeVersion::new(3, 14, 0))
    }
}

/// Snapshot of the controller's view of the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityStatus {
    pub version: RuntimeVersion,
    pub needs_workaround: bool,
    pub active_method: Option<StartMethod>,
    pub initialized: bool,
    /// True when no workaround is needed or the workaround method is active.
    pub compatible: bool,
}

/// Process-wide compatibility decision.
///
/// Construct one at startup and share it by reference; `initialize` is
/// idempotent unless forced.
pub struct CompatibilityController {
    runtime: Arc<dyn ProcessRuntime>,
    policy: WorkaroundPolicy,
    initialized: Mutex<bool>,
}

impl CompatibilityController {
    pub fn new(runtime: Arc<dyn ProcessRuntime>, policy: WorkaroundPolicy) -> Self {
        Self {
            runtime,
            policy,
            initialized: Mutex::new(false),
        }
    }

    pub fn runtime(&self) -> &Arc<dyn ProcessRuntime> {
        &self.runtime
    }

    pub fn policy(&self) -> &WorkaroundPolicy {
        &self.policy
    }

    pub fn needs_workaround(&self) -> bool {
        self.policy.needs_workaround(self.runtime.version())
    }

    /// Derive and record the process-creation method.
    ///
    /// Once initialized, further calls without `force` return `Ok` without
    /// touching the runtime. A method change the runtime refuses is only an
    /// error when `force` is set; otherwise it is logged and reflected as
    /// `compatible: false` in [`status`](Self::status).
    pub fn initialize(&self, force: bool) -> Result<(), CompatError> {
        // Held for the whole derivation so racing first calls serialize.
        let mut initialized = self.lock();
        if *initialized && !force {
            debug!("process compatibility already initialized");
            return Ok(());
        }

        let version = self.runtime.version();
        debug!("runtime {} detected", version);

        if !self.policy.needs_workaround(version) {
            debug!("no process-creation workaround needed for runtime {}", version);
            *initialized = true;
            return Ok(());
        }

        let target = self.policy.method;
        let current = self.runtime.start_method();
        if current == Some(target) {
            debug!("process-creation method already set to {}", target);
            *initialized = true;
            return Ok(());
        }

        match self.runtime.set_start_method(target, force) {
            Ok(()) => {
                info!(
                    "changed process-creation method from {} to {}",
                    describe(current),
                    target
                );
                *initialized = true;
                Ok(())
            }
            Err(source) if !force => {
                warn!(
                    "process-creation method stays {} ({}); isolated dispatch disabled",
                    describe(current),
                    source
                );
                *initialized = true;
                Ok(())
            }
            Err(source) => {
                warn!("could not force process-creation method {}: {}", target, source);
                Err(CompatError::DerivationFailed {
                    requested: target,
                    source,
                })
            }
        }
    }

    /// Initialize without force, logging instead of failing.
    pub fn ensure_initialized(&self) {
        if let Err(e) = self.initialize(false) {
            warn!("process compatibility initialization failed: {}", e);
        }
    }

    pub fn is_initialized(&self) -> bool {
        *self.lock()
    }

    pub fn status(&self) -> CompatibilityStatus {
        let initialized = self.is_initialized();
        let version = self.runtime.version();
        let needs_workaround = self.policy.needs_workaround(version);
        let active_method = self.runtime.start_method();
        CompatibilityStatus {
            version,
            needs_workaround,
            active_method,
            initialized,
            compatible: !needs_workaround || active_method == Some(self.policy.method),
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.status().compatible
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.initialized
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn describe(method: Option<StartMethod>) -> &'static str {
    method.map(|m| m.as_str()).unwrap_or("unset")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::compat::runtime::ProcessContext;

    /// Runtime that counts mutation attempts.
    struct CountingRuntime {
        inner: ProcessContext,
        set_calls: AtomicUsize,
    }

    impl CountingRuntime {
        fn new(inner: ProcessContext) -> Arc<Self> {
            Arc::new(Self {
                inner,
                set_calls: AtomicUsize::new(0),
            })
        }
    }

    impl ProcessRuntime for CountingRuntime {
        fn version(&self) -> RuntimeVersion {
            self.inner.version()
        }

        fn start_method(&self) -> Option<StartMethod> {
            self.inner.start_method()
        }

        fn set_start_method(&self, method: StartMethod, force: bool) -> Result<(), StartMethodError> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.set_start_method(method, force)
        }

        fn commit(&self) {
            self.inner.commit()
        }
    }

    #[test]
    fn test_workaround_threshold() {
        let policy = WorkaroundPolicy::default();
        assert!(!policy.needs_workaround(RuntimeVersion::new(3, 13, 5)));
        assert!(policy.needs_workaround(RuntimeVersion::new(3, 14, 0)));
        assert!(policy.needs_workaround(RuntimeVersion::new(4, 0, 0)));
        assert!(!policy.needs_workaround(RuntimeVersion::default()));
    }

    #[test]
    fn test_unaffected_runtime_is_never_mutated() {
        let runtime = CountingRuntime::new(ProcessContext::new(RuntimeVersion::new(3, 13, 0)));
        let controller = CompatibilityController::new(runtime.clone(), WorkaroundPolicy::default());

        assert!(controller.initialize(false).is_ok());
        let status = controller.status();
        assert!(!status.needs_workaround);
        assert!(status.compatible);
        assert_eq!(status.active_method, None);
        assert_eq!(runtime.set_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_repeated_initialize_does_not_rederive() {
        let runtime = CountingRuntime::new(ProcessContext::new(RuntimeVersion::new(3, 14, 0)));
        let controller = CompatibilityController::new(runtime.clone(), WorkaroundPolicy::default());

        controller.initialize(false).unwrap();
        let first = controller.status();
        for _ in 0..5 {
            controller.initialize(false).unwrap();
        }
        assert_eq!(controller.status(), first);
        assert_eq!(runtime.set_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_before_initialize() {
        let controller = CompatibilityController::new(
            Arc::new(ProcessContext::new(RuntimeVersion::new(3, 14, 1))),
            WorkaroundPolicy::default(),
        );
        let status = controller.status();
        assert!(!status.initialized);
        assert!(status.needs_workaround);
        assert!(!status.compatible);
    }

    #[test]
    fn test_status_serializes_for_reporting() {
        let controller = CompatibilityController::new(
            Arc::new(ProcessContext::new(RuntimeVersion::new(3, 12, 0))),
            WorkaroundPolicy::default(),
        );
        controller.ensure_initialized();
        let json = serde_json::to_value(controller.status()).unwrap();
        assert_eq!(json["version"], "3.12.0");
        assert_eq!(json["active_method"], serde_json::Value::Null);
        assert_eq!(json["compatible"], true);
    }
}
