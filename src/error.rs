//! Error kinds for the validation engine
//!
//! Each component fails with its own closed taxonomy. "Absent" results are
//! modelled with `Option`, so these only describe genuine failures.

use crate::models::Phase;
use std::path::PathBuf;
use std::time::Duration;

/// Errors from hashing the calculation engine's source tree
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Source directory not found: {0}")]
    MissingRoot(PathBuf),

    #[error("No qualifying source files found under {0}")]
    EmptyInput(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the persistence store
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("No validation state at {0}")]
    NotFound(PathBuf),

    #[error("Validation state at {path} is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("Persistence I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from running a qualification phase's test collaborator
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{phase} test run exceeded {}s timeout", .timeout.as_secs())]
    Timeout { phase: Phase, timeout: Duration },

    #[error("{phase} test run failed: {message}")]
    SubprocessFailure { phase: Phase, message: String },
}

impl WorkflowError {
    pub fn phase(&self) -> Phase {
        match self {
            WorkflowError::Timeout { phase, .. } => *phase,
            WorkflowError::SubprocessFailure { phase, .. } => *phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_messages() {
        let err = WorkflowError::Timeout {
            phase: Phase::Pq,
            timeout: Duration::from_secs(3600),
        };
        assert_eq!(err.to_string(), "PQ test run exceeded 3600s timeout");
        assert_eq!(err.phase(), Phase::Pq);

        let err = WorkflowError::SubprocessFailure {
            phase: Phase::Iq,
            message: "killed by signal".to_string(),
        };
        assert!(err.to_string().starts_with("IQ test run failed"));
    }
}
