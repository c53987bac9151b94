//! Validation status evaluation
//!
//! Combines four independent criteria into one `ValidationStatus`:
//! - source hash still matches the validated hash
//! - validation has not expired
//! - runtime/dependency environment is unchanged
//! - all three qualification phases passed
//!
//! Every failing criterion contributes its own reason.

use super::compare::compare;
use super::expiry::{check_expiry, reminder_due};
use super::fingerprint::{CommandProbe, EnvironmentFingerprinter, VersionProbe};
use super::hash::HashEngine;
use crate::config::ValidationConfig;
use crate::models::{ValidationState, ValidationStatus};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub struct ValidationStatusEngine {
    engine_dir: PathBuf,
    expiry_window_days: u32,
    reminder_thresholds: Vec<u32>,
    hasher: HashEngine,
    fingerprinter: EnvironmentFingerprinter,
}

impl ValidationStatusEngine {
    pub fn new(config: &ValidationConfig, probe: Box<dyn VersionProbe>) -> Self {
        Self {
            engine_dir: config.engine_dir.clone(),
            expiry_window_days: config.expiry_window_days,
            reminder_thresholds: config.reminder_thresholds.clone(),
            hasher: HashEngine::new(config.hash.clone()),
            fingerprinter: EnvironmentFingerprinter::new(
                config.tracked_dependencies.clone(),
                probe,
            ),
        }
    }

    /// Engine probing versions with the configured commands
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config, Box::new(CommandProbe::new(config.probe.clone())))
    }

    pub fn evaluate(&self, state: Option<&ValidationState>) -> ValidationStatus {
        self.evaluate_at(state, Utc::now())
    }

    pub fn evaluate_at(
        &self,
        state: Option<&ValidationState>,
        now: DateTime<Utc>,
    ) -> ValidationStatus {
        let Some(state) = state else {
            return ValidationStatus::no_state();
        };

        let mut failure_reasons = Vec::new();

        // Hash
        let hash_match = match self.hasher.compute_directory_hash(&self.engine_dir) {
            Ok(current) if current == state.validation_hash => true,
            Ok(_) => {
                failure_reasons
                    .push("Calculation engine source has changed since validation".to_string());
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Source hash unavailable during status evaluation");
                failure_reasons.push(format!("Could not verify source hash: {}", e));
                false
            }
        };

        // Expiry
        let expiry = check_expiry(state.validation_timestamp, self.expiry_window_days, now);
        let days_until_expiry = if expiry.expired {
            failure_reasons.push(format!(
                "Validation expired: {} days since validation (window is {} days)",
                expiry.days_elapsed, self.expiry_window_days
            ));
            None
        } else {
            Some(i64::from(self.expiry_window_days) - expiry.days_elapsed)
        };

        // Environment
        let current = self.fingerprinter.capture();
        let comparison = compare(&state.environment_fingerprint, &current);
        if !comparison.equal {
            failure_reasons.push(format!(
                "Environment changed since validation: {}",
                comparison.differences.join("; ")
            ));
        }

        // Phases
        let tests_passed = state.all_phases_passed();
        if !tests_passed {
            failure_reasons.push(format!(
                "Qualification incomplete: IQ={} OQ={} PQ={}",
                state.iq_status.as_str(),
                state.oq_status.as_str(),
                state.pq_status.as_str()
            ));
        }

        let is_validated = hash_match && !expiry.expired && comparison.equal && tests_passed;
        tracing::info!(
            is_validated,
            hash_match,
            expired = expiry.expired,
            environment_match = comparison.equal,
            tests_passed,
            "Evaluated validation status"
        );

        ValidationStatus {
            is_validated,
            validation_timestamp: Some(state.validation_timestamp),
            days_until_expiry,
            hash_match,
            environment_match: comparison.equal,
            tests_passed,
            failure_reasons,
            reminder_threshold: days_until_expiry
                .and_then(|d| reminder_due(d, &self.reminder_thresholds)),
        }
    }
}
