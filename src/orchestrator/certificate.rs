//! Validation certificate generation
//!
//! A certificate embeds the moment it was generated, so regenerating one for
//! the same result yields a different file and a different hash. The hash is
//! tamper evidence for one specific file; never use it to deduplicate or to
//! compare validation runs.

use crate::models::ValidationResult;
use crate::store::atomic_write;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCertificate {
    pub path: PathBuf,
    /// Hex SHA-256 of the written file
    pub hash: String,
}

/// Renders a completed workflow result into a certificate artifact
pub trait CertificateGenerator: Send + Sync {
    fn generate(&self, result: &ValidationResult) -> Result<GeneratedCertificate>;
}

/// Writes a JSON certificate document into a directory
pub struct JsonCertificateGenerator {
    output_dir: PathBuf,
}

impl JsonCertificateGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl CertificateGenerator for JsonCertificateGenerator {
    fn generate(&self, result: &ValidationResult) -> Result<GeneratedCertificate> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create certificate directory {}", self.output_dir.display())
        })?;

        let generated_at = Utc::now();
        let phases: Vec<_> = result
            .phase_results()
            .iter()
            .map(|p| {
                json!({
                    "phase": p.phase.name(),
                    "title": p.phase.title(),
                    "status": p.status().as_str(),
                    "executed": p.executed,
                    "checks_total": p.checks.len(),
                    "checks_passed": p.passed_count(),
                })
            })
            .collect();

        let document = json!({
            "certificate": "Calculation Engine Validation Certificate",
            "generated_at": generated_at.to_rfc3339(),
            "outcome": if result.success { "VALIDATED" } else { "NOT VALIDATED" },
            "validation_date": result.validation_timestamp.to_rfc3339(),
            "validation_hash": result.validation_hash,
            "environment_fingerprint": result.environment_fingerprint,
            "phases": phases,
            "failure_summary": result.failure_summary(),
            "system": result.system,
        });

        let bytes = serde_json::to_vec_pretty(&document)?;
        let path = self.output_dir.join(format!(
            "validation_certificate_{}.json",
            generated_at.format("%Y%m%dT%H%M%S%.3fZ")
        ));
        atomic_write(&path, &bytes)
            .with_context(|| format!("Failed to write certificate {}", path.display()))?;

        let hash = format!("{:x}", Sha256::digest(&bytes));
        tracing::info!(path = %path.display(), %hash, "Generated validation certificate");
        Ok(GeneratedCertificate { path, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnvironmentFingerprint, Phase, PhaseResult, SystemMetadata};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn result() -> ValidationResult {
        ValidationResult {
            success: false,
            validation_timestamp: Utc::now(),
            validation_hash: Some("ab".repeat(32)),
            environment_fingerprint: EnvironmentFingerprint::new("3.12.1", BTreeMap::new()),
            iq_result: PhaseResult::from_checks(Phase::Iq, Vec::new()),
            oq_result: PhaseResult::not_executed(Phase::Oq),
            pq_result: PhaseResult::not_executed(Phase::Pq),
            failed_phase: Some(Phase::Iq),
            system: SystemMetadata::capture(),
            certificate_path: None,
            certificate_hash: None,
        }
    }

    #[test]
    fn test_certificate_hash_matches_file() {
        let temp = TempDir::new().unwrap();
        let generator = JsonCertificateGenerator::new(temp.path().join("certs"));

        let cert = generator.generate(&result()).unwrap();
        let bytes = std::fs::read(&cert.path).unwrap();
        assert_eq!(cert.hash, format!("{:x}", Sha256::digest(&bytes)));

        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["outcome"], "NOT VALIDATED");
        assert_eq!(doc["phases"][1]["executed"], false);
    }

    #[test]
    fn test_unwritable_directory_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let generator = JsonCertificateGenerator::new(blocker.join("certs"));
        assert!(generator.generate(&result()).is_err());
    }
}
