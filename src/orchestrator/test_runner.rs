use crate::config::RunnerConfig;
use crate::error::WorkflowError;
use crate::models::{Phase, TestOutcome, TestRecord};
use crate::parser::parse_report;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Runs the tests tagged for one qualification phase
///
/// Implementations only need to recover the per-test tuple; how the runner
/// reports it is their own business.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run_phase(
        &self,
        phase: Phase,
        timeout: Duration,
    ) -> Result<Vec<TestRecord>, WorkflowError>;
}

/// Runs the configured command as a subprocess and parses its JSON Lines report
pub struct CommandTestRunner {
    config: RunnerConfig,
}

impl CommandTestRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, phase: Phase) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.config.args.iter().map(|arg| arg.replace("{tag}", phase.tag())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run_phase(
        &self,
        phase: Phase,
        timeout: Duration,
    ) -> Result<Vec<TestRecord>, WorkflowError> {
        let failure = |message: String| WorkflowError::SubprocessFailure { phase, message };

        let mut child = self.build_command(phase).spawn().map_err(|e| {
            failure(format!(
                "Command '{}' could not be started: {}. \
                 Please ensure it is installed and in your PATH.",
                self.config.program, e
            ))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| failure("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| failure("Failed to capture stderr".to_string()))?;

        tracing::info!(
            %phase,
            program = %self.config.program,
            timeout_secs = timeout.as_secs(),
            "Starting test runner"
        );

        // Drain stdout and stderr together so a chatty runner cannot block on a full pipe
        let run = async {
            let mut stdout_reader = BufReader::new(stdout).lines();
            let mut stderr_reader = BufReader::new(stderr).lines();
            let mut output = String::new();
            let mut stderr_output = String::new();
            let mut stdout_done = false;
            let mut stderr_done = false;

            while !stdout_done || !stderr_done {
                tokio::select! {
                    line = stdout_reader.next_line(), if !stdout_done => {
                        match line {
                            Ok(Some(line)) => {
                                output.push_str(&line);
                                output.push('\n');
                            }
                            Ok(None) => stdout_done = true,
                            Err(e) => return Err(format!("Failed to read stdout: {}", e)),
                        }
                    }
                    line = stderr_reader.next_line(), if !stderr_done => {
                        match line {
                            Ok(Some(line)) => {
                                tracing::debug!(%phase, "runner: {}", line);
                                stderr_output.push_str(&line);
                                stderr_output.push('\n');
                            }
                            Ok(None) => stderr_done = true,
                            Err(e) => return Err(format!("Failed to read stderr: {}", e)),
                        }
                    }
                }
            }

            let status = child
                .wait()
                .await
                .map_err(|e| format!("Failed to wait for runner: {}", e))?;
            Ok((output, stderr_output, status))
        };

        let outcome = tokio::time::timeout(timeout, run).await;
        let (output, stderr_output, status) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(message)) => return Err(failure(message)),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(%phase, error = %e, "Failed to kill timed-out test runner");
                }
                tracing::warn!(%phase, timeout_secs = timeout.as_secs(), "Test runner timed out");
                return Err(WorkflowError::Timeout { phase, timeout });
            }
        };

        let mut records = parse_report(&output);

        // A non-zero exit is how runners report failing tests; only treat it as
        // abnormal when nothing was reported or the runner died on a signal.
        match status.code() {
            None => Err(failure(format!("Runner terminated abnormally ({})", status))),
            Some(code) if code != 0 && records.is_empty() => Err(failure(format!(
                "Runner exited with code {} without reporting tests\nStderr: {}",
                code,
                tail(&stderr_output, 20)
            ))),
            Some(code) => {
                // A failing exit must never reduce to an all-passed report
                let reported_failure = records.iter().any(|r| r.outcome != TestOutcome::Passed);
                if code != 0 && !reported_failure {
                    tracing::warn!(%phase, code, "Runner failed but reported no failing tests");
                    let id = format!("{}::runner-exit", phase.tag());
                    let mut record = TestRecord::new(id, TestOutcome::Error);
                    record.detail = Some(format!(
                        "Runner exited with code {} although every reported test passed\n\
                         Stderr: {}",
                        code,
                        tail(&stderr_output, 20)
                    ));
                    records.push(record);
                }

                tracing::info!(%phase, tests = records.len(), exit = code, "Test runner finished");
                Ok(records)
            }
        }
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
