//! Host runtime model: version and process-creation method.
//!
//! The process-creation method may be chosen once. After that only a forced
//! change is accepted, and once a worker has been launched the method is
//! committed for the rest of the process lifetime.

use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host runtime version triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl RuntimeVersion {
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }

    pub fn as_tuple(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.micro)
    }
}

impl std::fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid runtime version '{0}', expected MAJOR.MINOR[.MICRO]")]
pub struct ParseVersionError(String);

impl FromStr for RuntimeVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVersionError(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid());
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl From<RuntimeVersion> for String {
    fn from(version: RuntimeVersion) -> Self {
        version.to_string()
    }
}

impl TryFrom<String> for RuntimeVersion {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How the runtime creates a process for isolated work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMethod {
    /// Duplicate the calling process image; captured state is inherited.
    Fork,
    /// Launch a fresh process that re-enters the program from the start.
    Spawn,
    /// Ask a clean server process to fork workers on demand.
    ForkServer,
}

impl StartMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartMethod::Fork => "fork",
            StartMethod::Spawn => "spawn",
            StartMethod::ForkServer => "forkserver",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fork" => Some(StartMethod::Fork),
            "spawn" => Some(StartMethod::Spawn),
            "forkserver" | "fork-server" => Some(StartMethod::ForkServer),
            _ => None,
        }
    }

    /// Whether workers inherit the parent's memory instead of receiving
    /// serialized state.
    pub fn duplicates_process(&self) -> bool {
        matches!(self, StartMethod::Fork)
    }

    /// Methods this platform can use.
    pub fn supported() -> &'static [StartMethod] {
        if cfg!(unix) {
            &[StartMethod::Fork, StartMethod::Spawn, StartMethod::ForkServer]
        } else {
            &[StartMethod::Spawn]
        }
    }

    /// Method the runtime fixes on first use when nothing was chosen.
    pub fn platform_default() -> StartMethod {
        if cfg!(unix) {
            StartMethod::ForkServer
        } else {
            StartMethod::Spawn
        }
    }
}

impl std::fmt::Display for StartMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the process-creation method could not be changed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StartMethodError {
    #[error("context has already been set to {0}")]
    AlreadySet(StartMethod),

    #[error("context is committed to {0}, workers have already been launched")]
    Committed(StartMethod),

    #[error("start method {0} is not supported on this platform")]
    Unsupported(StartMethod),
}

/// The hosting runtime's process-creation controls.
pub trait ProcessRuntime: Send + Sync {
    fn version(&self) -> RuntimeVersion;

    /// Currently chosen method, or `None` while still unset.
    fn start_method(&self) -> Option<StartMethod>;

    /// Choose the method. Without `force`, fails once any method was chosen.
    fn set_start_method(&self, method: StartMethod, force: bool) -> Result<(), StartMethodError>;

    /// Fix the method permanently; called before the first worker launches.
    fn commit(&self);
}

#[derive(Debug, Default)]
struct ContextState {
    method: Option<StartMethod>,
    committed: bool,
}

/// In-process [`ProcessRuntime`] with set-once semantics.
#[derive(Debug)]
pub struct ProcessContext {
    version: RuntimeVersion,
    state: Mutex<ContextState>,
}

impl ProcessContext {
    pub fn new(version: RuntimeVersion) -> Self {
        Self {
            version,
            state: Mutex::new(ContextState::default()),
        }
    }

    /// Context whose method was already chosen by another component.
    pub fn with_method(version: RuntimeVersion, method: StartMethod) -> Self {
        Self {
            version,
            state: Mutex::new(ContextState {
                method: Some(method),
                committed: false,
            }),
        }
    }

    pub fn is_committed(&self) -> bool {
        self.lock().committed
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProcessRuntime for ProcessContext {
    fn version(&self) -> RuntimeVersion {
        self.version
    }

    fn start_method(&self) -> Option<StartMethod> {
        self.lock().method
    }

    fn set_start_method(&self, method: StartMethod, force: bool) -> Result<(), StartMethodError> {
        if !StartMethod::supported().contains(&method) {
            return Err(StartMethodError::Unsupported(method));
        }
        let mut state = self.lock();
        if let Some(current) = state.method {
            if state.committed && current != method {
                return Err(StartMethodError::Committed(current));
            }
            if !force {
                return Err(StartMethodError::AlreadySet(current));
            }
        }
        state.method = Some(method);
        Ok(())
    }

    fn commit(&self) {
        let mut state = self.lock();
        state.method.get_or_insert_with(StartMethod::platform_default);
        state.committed = true;
    }
}
