use super::{EnvironmentFingerprint, PhaseStatus, ValidationResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Persisted validation record
///
/// Written only by an explicit save after a workflow run. A new save replaces
/// the whole record; nothing updates it field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationState {
    #[serde(rename = "validation_date")]
    pub validation_timestamp: DateTime<Utc>,

    /// Hex SHA-256 of the calculation engine's source tree
    pub validation_hash: String,

    pub environment_fingerprint: EnvironmentFingerprint,

    pub iq_status: PhaseStatus,
    pub oq_status: PhaseStatus,
    pub pq_status: PhaseStatus,

    #[serde(rename = "expiry_date")]
    pub expiry_timestamp: DateTime<Utc>,

    /// Hash of the generated certificate. Tamper evidence only: the
    /// certificate embeds its generation time, so this is not a content key.
    #[serde(default)]
    pub certificate_hash: Option<String>,
}

impl ValidationState {
    /// Derive the record to persist from a finished workflow run
    ///
    /// Returns `None` when the run never produced a source hash, since such
    /// a record could never match anything.
    pub fn from_result(result: &ValidationResult, expiry_window_days: u32) -> Option<Self> {
        let validation_hash = result.validation_hash.clone()?;
        Some(Self {
            validation_timestamp: result.validation_timestamp,
            validation_hash,
            environment_fingerprint: result.environment_fingerprint.clone(),
            iq_status: result.iq_result.status(),
            oq_status: result.oq_result.status(),
            pq_status: result.pq_result.status(),
            expiry_timestamp: result.validation_timestamp
                + Duration::days(i64::from(expiry_window_days)),
            certificate_hash: result.certificate_hash.clone(),
        })
    }

    /// True when all three persisted phase statuses are `PASS`
    pub fn all_phases_passed(&self) -> bool {
        [self.iq_status, self.oq_status, self.pq_status]
            .iter()
            .all(|s| *s == PhaseStatus::Pass)
    }
}

/// Derived, never persisted: whether the engine is validated right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatus {
    pub is_validated: bool,
    pub validation_timestamp: Option<DateTime<Utc>>,
    /// Present only when the validation has not expired
    pub days_until_expiry: Option<i64>,
    pub hash_match: bool,
    pub environment_match: bool,
    pub tests_passed: bool,
    /// One entry per failing criterion
    pub failure_reasons: Vec<String>,
    /// Tightest configured reminder threshold already reached, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_threshold: Option<u32>,
}

impl ValidationStatus {
    pub fn no_state() -> Self {
        Self {
            is_validated: false,
            validation_timestamp: None,
            days_until_expiry: None,
            hash_match: false,
            environment_match: false,
            tests_passed: false,
            failure_reasons: vec!["No validation state found".to_string()],
            reminder_threshold: None,
        }
    }
}
