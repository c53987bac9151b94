use super::{EnvironmentFingerprint, Phase, PhaseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host information recorded alongside a workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMetadata {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub user: String,
    pub tool_version: String,
}

impl SystemMetadata {
    pub fn capture() -> Self {
        let from_env = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
                .unwrap_or_else(|| "unknown".to_string())
        };

        Self {
            hostname: from_env(&["HOSTNAME", "COMPUTERNAME"]),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            user: from_env(&["USER", "USERNAME"]),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Output of one IQ → OQ → PQ run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub validation_timestamp: DateTime<Utc>,
    /// `None` when the source tree could not be hashed
    pub validation_hash: Option<String>,
    pub environment_fingerprint: EnvironmentFingerprint,
    pub iq_result: PhaseResult,
    pub oq_result: PhaseResult,
    pub pq_result: PhaseResult,
    /// First phase that did not pass
    pub failed_phase: Option<Phase>,
    pub system: SystemMetadata,
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
    /// Tamper evidence for the certificate file, see `ValidationState`
    #[serde(default)]
    pub certificate_hash: Option<String>,
}

impl ValidationResult {
    pub fn phase_results(&self) -> [&PhaseResult; 3] {
        [&self.iq_result, &self.oq_result, &self.pq_result]
    }

    pub fn phase_result(&self, phase: Phase) -> &PhaseResult {
        match phase {
            Phase::Iq => &self.iq_result,
            Phase::Oq => &self.oq_result,
            Phase::Pq => &self.pq_result,
        }
    }

    /// Human-readable diagnostic for a failed run; empty on success
    pub fn failure_summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.validation_hash.is_none() {
            lines.push("Source tree could not be hashed".to_string());
        }

        let Some(phase) = self.failed_phase else {
            return lines;
        };

        let result = self.phase_result(phase);
        lines.push(format!(
            "{} ({}) failed: {}/{} checks passed",
            phase.name(),
            phase.title(),
            result.passed_count(),
            result.checks.len()
        ));
        for check in result.failed_checks() {
            let reason = check.failure_reason.as_deref().unwrap_or("no detail");
            match &check.traceability_id {
                Some(trace) => lines.push(format!("  - {} [{}]: {}", check.name, trace, reason)),
                None => lines.push(format!("  - {}: {}", check.name, reason)),
            }
        }
        if result.checks.is_empty() {
            lines.push("  - no checks were reported".to_string());
        }

        lines
    }
}
