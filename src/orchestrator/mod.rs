//! Qualification Workflow
//!
//! Runs IQ → OQ → PQ against an external test runner, reports progress,
//! optionally generates a certificate, and records outcomes in the store.

pub mod certificate;
pub mod progress;
pub mod test_runner;
pub mod workflow;

pub use certificate::{CertificateGenerator, GeneratedCertificate, JsonCertificateGenerator};
pub use progress::ProgressCallback;
pub use test_runner::{CommandTestRunner, TestRunner};
pub use workflow::{WorkflowOrchestrator, WorkflowStage};

use crate::error::PersistenceError;
use crate::models::{EventResult, EventType, ValidationEvent, ValidationResult, ValidationState};
use crate::store::PersistenceStore;

/// Record a finished workflow run
///
/// Replaces the state record (a failed run records its `FAIL` statuses so a
/// previous validation no longer counts), appends a `workflow_completed`
/// event and trims the history. Returns the saved state, or `None` when the
/// run produced no source hash and nothing could be saved.
pub fn persist_outcome(
    store: &PersistenceStore,
    result: &ValidationResult,
    expiry_window_days: u32,
    history_max_entries: usize,
) -> Result<Option<ValidationState>, PersistenceError> {
    let state = ValidationState::from_result(result, expiry_window_days);
    match &state {
        Some(state) => store.save_state(state)?,
        None => tracing::warn!("Workflow produced no source hash; validation state left unchanged"),
    }

    let mut event = ValidationEvent::new(
        EventType::WorkflowCompleted,
        EventResult::from_passed(result.success),
    )
    .with_detail("state_saved", state.is_some());
    if let Some(hash) = &result.validation_hash {
        event = event.with_hash(hash.clone());
    }
    if let Some(phase) = result.failed_phase {
        event = event.with_detail("failed_phase", phase.name());
    }
    for phase_result in result.phase_results() {
        event = event.with_detail(
            format!("{}_status", phase_result.phase.tag()),
            phase_result.status().as_str(),
        );
    }
    if let Some(path) = &result.certificate_path {
        event = event.with_detail("certificate_path", path.display().to_string());
    }

    store.append_event(&event)?;
    store.trim_history(history_max_entries)?;
    Ok(state)
}
