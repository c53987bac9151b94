//! Qualification phase types
//!
//! IQ, OQ and PQ share one result shape. What differs between phases is how
//! test records are mapped into checks (see `orchestrator::workflow`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three sequential qualification phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Installation Qualification
    Iq,
    /// Operational Qualification
    Oq,
    /// Performance Qualification
    Pq,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Iq, Phase::Oq, Phase::Pq];

    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Iq => "IQ",
            Phase::Oq => "OQ",
            Phase::Pq => "PQ",
        }
    }

    /// Full regulatory name
    pub fn title(&self) -> &'static str {
        match self {
            Phase::Iq => "Installation Qualification",
            Phase::Oq => "Operational Qualification",
            Phase::Pq => "Performance Qualification",
        }
    }

    /// Tag the test runner filters on
    pub fn tag(&self) -> &'static str {
        match self {
            Phase::Iq => "iq",
            Phase::Oq => "oq",
            Phase::Pq => "pq",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Persisted outcome of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl PhaseStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            PhaseStatus::Pass
        } else {
            PhaseStatus::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pass => "PASS",
            PhaseStatus::Fail => "FAIL",
        }
    }
}

/// Outcome of a single test as reported by the test runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
    Error,
}

/// Stable per-test tuple recovered from a test runner report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: String,
    pub outcome: TestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Traceability marker linking the test to a requirement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl TestRecord {
    pub fn new(id: impl Into<String>, outcome: TestOutcome) -> Self {
        Self {
            id: id.into(),
            outcome,
            detail: None,
            trace: None,
            group: None,
        }
    }
}

/// A single check within a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub description: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Requirement this check traces to (OQ/PQ)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceability_id: Option<String>,
    /// Functional area (OQ) or module (PQ)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl CheckResult {
    pub fn passed(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            passed: true,
            expected: None,
            actual: None,
            failure_reason: None,
            traceability_id: None,
            group: None,
        }
    }

    pub fn failed(
        name: impl Into<String>,
        description: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            passed: false,
            failure_reason: Some(reason.into()),
            ..Self::passed(name, description)
        }
    }
}

/// Result of one qualification phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: Phase,
    pub passed: bool,
    /// False when the phase was skipped because an earlier phase failed
    pub executed: bool,
    pub timestamp: DateTime<Utc>,
    pub checks: Vec<CheckResult>,
}

impl PhaseResult {
    /// Build an executed phase result; it passes only when every check passed
    /// and at least one check ran.
    pub fn from_checks(phase: Phase, checks: Vec<CheckResult>) -> Self {
        let passed = !checks.is_empty() && checks.iter().all(|c| c.passed);
        Self {
            phase,
            passed,
            executed: true,
            timestamp: Utc::now(),
            checks,
        }
    }

    /// Placeholder for a phase that never ran
    pub fn not_executed(phase: Phase) -> Self {
        Self {
            phase,
            passed: false,
            executed: false,
            timestamp: Utc::now(),
            checks: Vec::new(),
        }
    }

    pub fn status(&self) -> PhaseStatus {
        PhaseStatus::from_passed(self.passed)
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }
}
