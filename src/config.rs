// Ledger configuration

use crate::ledger::LedgerLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for a ledger service and its store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Directory of the sled database
    pub data_dir: PathBuf,
    /// Maximum number of candidates per election. Unset keeps the limit
    /// stored with the ledger (64 for a new one).
    pub max_candidates: Option<usize>,
    /// Maximum number of allowed voters per election. Unset keeps the limit
    /// stored with the ledger (10 000 for a new one).
    pub max_voters: Option<usize>,
    /// Buffered ledger events per subscriber
    pub event_capacity: usize,
    /// Flush the store after every successful transition
    pub flush_on_write: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("votes-data"),
            max_candidates: None,
            max_voters: None,
            event_capacity: 256,
            flush_on_write: true,
        }
    }
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = Some(max);
        self
    }

    pub fn with_max_voters(mut self, max: usize) -> Self {
        self.max_voters = Some(max);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }

    /// Limits for a ledger currently running with `current`; only the
    /// limits set in this config override it
    pub fn limits_over(&self, current: LedgerLimits) -> LedgerLimits {
        LedgerLimits {
            max_candidates: self.max_candidates.unwrap_or(current.max_candidates),
            max_voters: self.max_voters.unwrap_or(current.max_voters),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_candidates == Some(0) {
            return Err(ConfigError::Invalid("max_candidates cannot be 0".to_string()));
        }
        if self.max_voters == Some(0) {
            return Err(ConfigError::Invalid("max_voters cannot be 0".to_string()));
        }
        // broadcast channels panic on zero capacity
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity cannot be 0".to_string()));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir cannot be empty".to_string()));
        }
        Ok(())
    }
}
