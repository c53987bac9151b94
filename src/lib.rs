// Qualify - Validation State Engine
// Tracks whether a calculation engine is validated and runs IQ/OQ/PQ qualification

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod state;
pub mod store;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use config::ValidationConfig;
pub use error::{HashError, PersistenceError, WorkflowError};
pub use models::{
    EnvironmentFingerprint, Phase, PhaseResult, PhaseStatus, ValidationEvent, ValidationResult,
    ValidationState, ValidationStatus,
};
pub use orchestrator::{persist_outcome, WorkflowOrchestrator};
pub use state::{HashEngine, ValidationStatusEngine};
pub use store::PersistenceStore;
