use super::certificate::{CertificateGenerator, JsonCertificateGenerator};
use super::progress::{report, ProgressCallback};
use super::test_runner::{CommandTestRunner, TestRunner};
use crate::config::{RunnerConfig, ValidationConfig};
use crate::models::{
    CheckResult, Phase, PhaseResult, SystemMetadata, TestOutcome, TestRecord, ValidationResult,
};
use crate::state::{CommandProbe, EnvironmentFingerprinter, HashEngine, VersionProbe};
use chrono::Utc;
use std::path::PathBuf;

/// Where a workflow run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Init,
    Iq,
    Oq,
    Pq,
    FailedAtIq,
    FailedAtOq,
    Certificate,
    Done,
}

impl WorkflowStage {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStage::Init => "INIT",
            WorkflowStage::Iq => "IQ",
            WorkflowStage::Oq => "OQ",
            WorkflowStage::Pq => "PQ",
            WorkflowStage::FailedAtIq => "FAILED_AT_IQ",
            WorkflowStage::FailedAtOq => "FAILED_AT_OQ",
            WorkflowStage::Certificate => "CERTIFICATE",
            WorkflowStage::Done => "DONE",
        }
    }

    fn running(phase: Phase) -> Self {
        match phase {
            Phase::Iq => WorkflowStage::Iq,
            Phase::Oq => WorkflowStage::Oq,
            Phase::Pq => WorkflowStage::Pq,
        }
    }

    /// Progress fraction at the start and end of a phase
    fn span(phase: Phase) -> (f64, f64) {
        match phase {
            Phase::Iq => (0.05, 0.30),
            Phase::Oq => (0.30, 0.60),
            Phase::Pq => (0.60, 0.90),
        }
    }
}

const CERTIFICATE_START: f64 = 0.90;
const CERTIFICATE_END: f64 = 0.95;

/// Sequential IQ → OQ → PQ qualification run
///
/// A later phase only runs when the previous one passed. Phases that never
/// ran are reported as `PhaseResult::not_executed`.
pub struct WorkflowOrchestrator {
    engine_dir: PathBuf,
    runner_config: RunnerConfig,
    hasher: HashEngine,
    fingerprinter: EnvironmentFingerprinter,
    test_runner: Box<dyn TestRunner>,
    certificates: Option<Box<dyn CertificateGenerator>>,
}

impl WorkflowOrchestrator {
    pub fn new(
        config: &ValidationConfig,
        test_runner: Box<dyn TestRunner>,
        probe: Box<dyn VersionProbe>,
    ) -> Self {
        Self {
            engine_dir: config.engine_dir.clone(),
            runner_config: config.runner.clone(),
            hasher: HashEngine::new(config.hash.clone()),
            fingerprinter: EnvironmentFingerprinter::new(
                config.tracked_dependencies.clone(),
                probe,
            ),
            test_runner,
            certificates: None,
        }
    }

    /// Orchestrator using the configured subprocess runner, version probe and,
    /// when an output directory is set, JSON certificates
    pub fn from_config(config: &ValidationConfig) -> Self {
        let orchestrator = Self::new(
            config,
            Box::new(CommandTestRunner::new(config.runner.clone())),
            Box::new(CommandProbe::new(config.probe.clone())),
        );
        match &config.certificate_output_dir {
            Some(dir) => {
                orchestrator.with_certificates(Box::new(JsonCertificateGenerator::new(dir)))
            }
            None => orchestrator,
        }
    }

    pub fn with_certificates(mut self, generator: Box<dyn CertificateGenerator>) -> Self {
        self.certificates = Some(generator);
        self
    }

    pub fn without_certificates(mut self) -> Self {
        self.certificates = None;
        self
    }

    pub async fn execute_workflow(
        &self,
        progress: Option<&ProgressCallback<'_>>,
    ) -> ValidationResult {
        let mut stage = WorkflowStage::Init;
        report(progress, stage.name(), 0.0);

        let validation_timestamp = Utc::now();
        let validation_hash = match self.hasher.compute_directory_hash(&self.engine_dir) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::error!(error = %e, "Could not hash calculation engine source");
                None
            }
        };
        let environment_fingerprint = self.fingerprinter.capture();

        let iq_result = self.run_stage(Phase::Iq, &mut stage, progress).await;
        let oq_result = if iq_result.passed {
            self.run_stage(Phase::Oq, &mut stage, progress).await
        } else {
            PhaseResult::not_executed(Phase::Oq)
        };
        let pq_result = if oq_result.passed {
            self.run_stage(Phase::Pq, &mut stage, progress).await
        } else {
            PhaseResult::not_executed(Phase::Pq)
        };

        let failed_phase = [&iq_result, &oq_result, &pq_result]
            .iter()
            .find(|r| !r.passed)
            .map(|r| r.phase);

        let mut result = ValidationResult {
            success: failed_phase.is_none(),
            validation_timestamp,
            validation_hash,
            environment_fingerprint,
            iq_result,
            oq_result,
            pq_result,
            failed_phase,
            system: SystemMetadata::capture(),
            certificate_path: None,
            certificate_hash: None,
        };

        if let Some(generator) = &self.certificates {
            stage = transition(stage, WorkflowStage::Certificate);
            report(progress, stage.name(), CERTIFICATE_START);
            match generator.generate(&result) {
                Ok(cert) => {
                    result.certificate_path = Some(cert.path);
                    result.certificate_hash = Some(cert.hash);
                }
                Err(e) => tracing::error!(error = %e, "Certificate generation failed"),
            }
            report(progress, stage.name(), CERTIFICATE_END);
        }

        let stage = transition(stage, WorkflowStage::Done);
        report(progress, stage.name(), 1.0);

        tracing::info!(
            success = result.success,
            failed_phase = ?result.failed_phase.map(|p| p.name()),
            "Qualification workflow finished"
        );
        result
    }

    async fn run_stage(
        &self,
        phase: Phase,
        stage: &mut WorkflowStage,
        progress: Option<&ProgressCallback<'_>>,
    ) -> PhaseResult {
        *stage = transition(*stage, WorkflowStage::running(phase));
        let (start, end) = WorkflowStage::span(phase);
        report(progress, stage.name(), start);

        let result = self.run_phase(phase).await;
        report(progress, stage.name(), end);

        if !result.passed {
            match phase {
                Phase::Iq => *stage = transition(*stage, WorkflowStage::FailedAtIq),
                Phase::Oq => *stage = transition(*stage, WorkflowStage::FailedAtOq),
                Phase::Pq => {}
            }
        }
        result
    }

    async fn run_phase(&self, phase: Phase) -> PhaseResult {
        let timeout = self.runner_config.timeout_for(phase);
        let checks = match self.test_runner.run_phase(phase, timeout).await {
            Ok(records) if records.is_empty() => vec![CheckResult::failed(
                format!("{}-runner", phase.tag()),
                format!("{} test run", phase.title()),
                format!("No tests reported for tag '{}'", phase.tag()),
            )],
            Ok(records) => records.iter().map(|r| map_record(phase, r)).collect(),
            Err(e) => {
                tracing::warn!(%phase, error = %e, "Phase failed at subprocess level");
                vec![CheckResult::failed(
                    format!("{}-runner", phase.tag()),
                    format!("{} test run", phase.title()),
                    e.to_string(),
                )]
            }
        };

        let result = PhaseResult::from_checks(phase, checks);
        tracing::info!(
            %phase,
            passed = result.passed,
            checks = result.checks.len(),
            failed = result.failed_checks().count(),
            "Phase complete"
        );
        result
    }
}

fn transition(from: WorkflowStage, to: WorkflowStage) -> WorkflowStage {
    tracing::debug!(from = from.name(), to = to.name(), "Workflow transition");
    to
}

/// Map one test record to a phase check
///
/// IQ checks are plain installation checks. OQ checks carry traceability and
/// the functional area; PQ checks carry traceability and the module.
fn map_record(phase: Phase, record: &TestRecord) -> CheckResult {
    let (passed, actual, failure_reason) = match record.outcome {
        TestOutcome::Passed => (true, "passed", None),
        TestOutcome::Failed => (
            false,
            "failed",
            Some(record.detail.clone().unwrap_or_else(|| "Test failed".to_string())),
        ),
        TestOutcome::Error => (
            false,
            "error",
            Some(record.detail.clone().unwrap_or_else(|| "Test errored".to_string())),
        ),
        TestOutcome::Skipped => (
            false,
            "skipped",
            Some(match &record.detail {
                Some(detail) => format!("Skipped: {}", detail),
                None => "Skipped".to_string(),
            }),
        ),
    };

    let description = match (phase, &record.group) {
        (Phase::Iq, _) | (_, None) => format!("{} test", phase.title()),
        (Phase::Oq, Some(group)) => format!("{} test, functional area {}", phase.title(), group),
        (Phase::Pq, Some(group)) => format!("{} test, module {}", phase.title(), group),
    };

    let (traceability_id, group) = match phase {
        Phase::Iq => (None, None),
        Phase::Oq | Phase::Pq => (record.trace.clone(), record.group.clone()),
    };

    CheckResult {
        name: record.id.clone(),
        description,
        passed,
        expected: Some("passed".to_string()),
        actual: Some(actual.to_string()),
        failure_reason,
        traceability_id,
        group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::orchestrator::certificate::GeneratedCertificate;
    use crate::state::StaticProbe;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    type Script = HashMap<Phase, std::result::Result<Vec<TestRecord>, String>>;

    struct ScriptedRunner {
        script: Script,
        calls: Arc<AtomicUsize>,
        timeouts: Arc<Mutex<Vec<(Phase, Duration)>>>,
    }

    #[async_trait]
    impl TestRunner for ScriptedRunner {
        async fn run_phase(
            &self,
            phase: Phase,
            timeout: Duration,
        ) -> std::result::Result<Vec<TestRecord>, WorkflowError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.timeouts.lock().unwrap().push((phase, timeout));
            match self.script.get(&phase) {
                Some(Ok(records)) => Ok(records.clone()),
                Some(Err(msg)) if msg == "timeout" => {
                    Err(WorkflowError::Timeout { phase, timeout })
                }
                Some(Err(msg)) => Err(WorkflowError::SubprocessFailure {
                    phase,
                    message: msg.clone(),
                }),
                None => Ok(Vec::new()),
            }
        }
    }

    struct FailingCertificates;

    impl CertificateGenerator for FailingCertificates {
        fn generate(&self, _: &ValidationResult) -> Result<GeneratedCertificate> {
            anyhow::bail!("renderer unavailable")
        }
    }

    fn passing(phase: Phase) -> Vec<TestRecord> {
        let mut record =
            TestRecord::new(format!("{}::suite::check", phase.tag()), TestOutcome::Passed);
        record.trace = Some(format!("URS-{}", phase.tag()));
        record.group = Some("suite".to_string());
        vec![record]
    }

    fn failing(phase: Phase) -> Vec<TestRecord> {
        let mut record =
            TestRecord::new(format!("{}::suite::broken", phase.tag()), TestOutcome::Failed);
        record.detail = Some("expected 1.0, got 0.9".to_string());
        vec![record]
    }

    type Timeouts = Arc<Mutex<Vec<(Phase, Duration)>>>;

    fn setup(temp: &TempDir, script: Script) -> (WorkflowOrchestrator, Arc<AtomicUsize>, Timeouts) {
        let engine_dir = temp.path().join("engine");
        std::fs::create_dir_all(&engine_dir).unwrap();
        std::fs::write(engine_dir.join("calc.py"), "def calc(): return 42\n").unwrap();

        let config = ValidationConfig {
            engine_dir,
            tracked_dependencies: vec!["numeric-core".to_string()],
            ..ValidationConfig::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let timeouts = Arc::new(Mutex::new(Vec::new()));
        let runner = ScriptedRunner {
            script,
            calls: calls.clone(),
            timeouts: timeouts.clone(),
        };
        let probe = StaticProbe::new("3.12.1").with("numeric-core", "1.26.4");
        (
            WorkflowOrchestrator::new(&config, Box::new(runner), Box::new(probe)),
            calls,
            timeouts,
        )
    }

    fn all_passing() -> Script {
        Phase::ALL.iter().map(|p| (*p, Ok(passing(*p)))).collect()
    }

    #[tokio::test]
    async fn test_full_pass() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, calls, timeouts) = setup(&temp, all_passing());

        let result = orchestrator.execute_workflow(None).await;

        assert!(result.success);
        assert_eq!(result.failed_phase, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(result.validation_hash.is_some());
        assert_eq!(result.environment_fingerprint.dependency_version("numeric-core"), "1.26.4");

        let oq_check = &result.oq_result.checks[0];
        assert_eq!(oq_check.traceability_id.as_deref(), Some("URS-oq"));
        assert!(oq_check.description.contains("functional area suite"));
        assert!(result.pq_result.checks[0].description.contains("module suite"));
        assert!(result.iq_result.checks[0].traceability_id.is_none());

        let timeouts = timeouts.lock().unwrap();
        assert!(timeouts[2].1 > timeouts[0].1, "PQ timeout should exceed IQ timeout");
    }

    #[tokio::test]
    async fn test_iq_failure_stops_workflow() {
        let temp = TempDir::new().unwrap();
        let mut script = all_passing();
        script.insert(Phase::Iq, Ok(failing(Phase::Iq)));
        let (orchestrator, calls, _) = setup(&temp, script);

        let result = orchestrator.execute_workflow(None).await;

        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.failed_phase, Some(Phase::Iq));
        assert!(!result.oq_result.executed && !result.oq_result.passed);
        assert!(!result.pq_result.executed && !result.pq_result.passed);
        assert_eq!(
            result.iq_result.checks[0].failure_reason.as_deref(),
            Some("expected 1.0, got 0.9")
        );
    }

    #[tokio::test]
    async fn test_oq_failure_skips_pq() {
        let temp = TempDir::new().unwrap();
        let mut script = all_passing();
        script.insert(Phase::Oq, Ok(failing(Phase::Oq)));
        let (orchestrator, calls, _) = setup(&temp, script);

        let result = orchestrator.execute_workflow(None).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.failed_phase, Some(Phase::Oq));
        assert!(result.iq_result.passed);
        assert!(!result.pq_result.executed);
    }

    #[tokio::test]
    async fn test_pq_decides_success() {
        let temp = TempDir::new().unwrap();
        let mut script = all_passing();
        script.insert(Phase::Pq, Ok(failing(Phase::Pq)));
        let (orchestrator, calls, _) = setup(&temp, script);

        let result = orchestrator.execute_workflow(None).await;
        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.failed_phase, Some(Phase::Pq));
    }

    #[tokio::test]
    async fn test_subprocess_failures_become_diagnostics() {
        let temp = TempDir::new().unwrap();
        let mut script = all_passing();
        script.insert(Phase::Iq, Err("timeout".to_string()));
        let (orchestrator, _, _) = setup(&temp, script);

        let result = orchestrator.execute_workflow(None).await;
        let check = &result.iq_result.checks[0];
        assert_eq!(check.name, "iq-runner");
        assert!(check.failure_reason.as_deref().unwrap().contains("timeout"));

        let temp = TempDir::new().unwrap();
        let mut script = all_passing();
        script.insert(Phase::Oq, Err("killed by signal 9".to_string()));
        let (orchestrator, _, _) = setup(&temp, script);

        let result = orchestrator.execute_workflow(None).await;
        assert_eq!(result.failed_phase, Some(Phase::Oq));
        assert!(result.oq_result.checks[0].failure_reason.as_deref().unwrap().contains("signal 9"));
    }

    #[tokio::test]
    async fn test_empty_report_fails_phase() {
        let temp = TempDir::new().unwrap();
        let mut script = all_passing();
        script.remove(&Phase::Iq);
        let (orchestrator, _, _) = setup(&temp, script);

        let result = orchestrator.execute_workflow(None).await;
        assert_eq!(result.failed_phase, Some(Phase::Iq));
        assert!(result.iq_result.checks[0]
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("No tests reported"));
    }

    #[tokio::test]
    async fn test_skipped_test_fails_phase() {
        let temp = TempDir::new().unwrap();
        let mut script = all_passing();
        let mut records = passing(Phase::Oq);
        records.push(TestRecord::new("oq::suite::optional", TestOutcome::Skipped));
        script.insert(Phase::Oq, Ok(records));
        let (orchestrator, _, _) = setup(&temp, script);

        let result = orchestrator.execute_workflow(None).await;
        assert_eq!(result.failed_phase, Some(Phase::Oq));
        assert_eq!(result.oq_result.checks[1].actual.as_deref(), Some("skipped"));
    }

    #[tokio::test]
    async fn test_progress_sequence() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, _, _) = setup(&temp, all_passing());
        let orchestrator = orchestrator.with_certificates(Box::new(JsonCertificateGenerator::new(
            temp.path().join("certs"),
        )));

        let seen = Mutex::new(Vec::new());
        let callback = |stage: &str, fraction: f64| -> Result<()> {
            seen.lock().unwrap().push((stage.to_string(), fraction));
            anyhow::bail!("progress display closed")
        };

        let result = orchestrator.execute_workflow(Some(&callback)).await;
        assert!(result.success);
        assert!(result.certificate_path.as_ref().unwrap().exists());
        assert_eq!(result.certificate_hash.as_ref().unwrap().len(), 64);

        let seen = seen.into_inner().unwrap();
        let stages: Vec<&str> = seen.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(
            stages,
            vec!["INIT", "IQ", "IQ", "OQ", "OQ", "PQ", "PQ", "CERTIFICATE", "CERTIFICATE", "DONE"]
        );
        assert_eq!(seen.first().unwrap().1, 0.0);
        assert_eq!(seen.last().unwrap().1, 1.0);
        assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[tokio::test]
    async fn test_early_exit_progress_still_completes() {
        let temp = TempDir::new().unwrap();
        let mut script = all_passing();
        script.insert(Phase::Iq, Ok(failing(Phase::Iq)));
        let (orchestrator, _, _) = setup(&temp, script);

        let seen = Mutex::new(Vec::new());
        let callback = |stage: &str, fraction: f64| -> Result<()> {
            seen.lock().unwrap().push((stage.to_string(), fraction));
            Ok(())
        };

        orchestrator.execute_workflow(Some(&callback)).await;
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.last().unwrap(), &("DONE".to_string(), 1.0));
        assert!(!seen.iter().any(|(s, _)| s == "OQ" || s == "PQ"));
    }

    #[tokio::test]
    async fn test_certificate_failure_does_not_change_outcome() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, _, _) = setup(&temp, all_passing());
        let orchestrator = orchestrator.with_certificates(Box::new(FailingCertificates));

        let result = orchestrator.execute_workflow(None).await;
        assert!(result.success);
        assert!(result.certificate_hash.is_none());
        assert!(result.certificate_path.is_none());
    }

    #[tokio::test]
    async fn test_missing_source_still_runs() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, calls, _) = setup(&temp, all_passing());
        std::fs::remove_file(temp.path().join("engine/calc.py")).unwrap();

        let result = orchestrator.execute_workflow(None).await;
        assert!(result.validation_hash.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.failure_summary()[0], "Source tree could not be hashed");
    }
}
