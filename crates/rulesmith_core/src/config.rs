use thiserror::Error;

/// Lowest accepted worker count.
pub const MIN_WORKERS: usize = 1;
/// Highest accepted worker count; the remote service throttles beyond this.
pub const MAX_WORKERS: usize = 50;
/// Worker count used when none is given.
pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("parallel workers must be between {MIN_WORKERS} and {MAX_WORKERS} (got {got})")]
    InvalidWorkerCount { got: usize },
    #[error("missing required connection parameter: {name}")]
    MissingParameter { name: &'static str },
}

/// Validated batch execution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    workers: usize,
}

impl BatchSettings {
    /// Rejects worker counts outside `MIN_WORKERS..=MAX_WORKERS`; nothing is
    /// silently clamped.
    pub fn new(workers: usize) -> Result<Self, ConfigError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(ConfigError::InvalidWorkerCount { got: workers });
        }
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}
