//! Runtime and dependency version capture

use crate::config::ProbeConfig;
use crate::models::{EnvironmentFingerprint, NOT_INSTALLED, VERSION_UNKNOWN};
use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::process::Command;

/// Resolves installed versions
///
/// `resolve` returns `Ok(None)` when the dependency is not installed and
/// `Err` when its version could not be determined.
pub trait VersionProbe: Send + Sync {
    fn runtime_version(&self) -> Result<String>;
    fn resolve(&self, name: &str) -> Result<Option<String>>;
}

/// Probe that shells out to the configured version commands
#[derive(Debug, Clone)]
pub struct CommandProbe {
    config: ProbeConfig,
}

impl CommandProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    fn run(&self, argv: &[String]) -> Result<(Option<i32>, String)> {
        let Some((program, args)) = argv.split_first() else {
            bail!("Version command is empty");
        };

        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run '{}'", program))?;

        // Some runtimes print their version on stderr
        let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            text = String::from_utf8_lossy(&output.stderr).trim().to_string();
        }

        Ok((output.status.code(), text))
    }
}

impl VersionProbe for CommandProbe {
    fn runtime_version(&self) -> Result<String> {
        let (code, text) = self.run(&self.config.runtime_command)?;
        if code != Some(0) {
            bail!("Runtime version command exited with {:?}", code);
        }
        let version = first_line(&text);
        if version.is_empty() {
            bail!("Runtime version command printed nothing");
        }
        Ok(version)
    }

    fn resolve(&self, name: &str) -> Result<Option<String>> {
        let argv: Vec<String> = self
            .config
            .dependency_command
            .iter()
            .map(|arg| arg.replace("{name}", name))
            .collect();

        match self.run(&argv)? {
            (Some(0), text) if !text.is_empty() => Ok(Some(first_line(&text))),
            (Some(0), _) => bail!("Version command for '{}' printed nothing", name),
            (Some(code), _) if code == self.config.missing_exit_code => Ok(None),
            (code, text) => {
                bail!("Version command for '{}' exited with {:?}: {}", name, code, text)
            }
        }
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

/// Probe answering from a fixed table
///
/// Dependencies mapped to `None` resolve with an error.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub runtime: Option<String>,
    pub versions: HashMap<String, Option<String>>,
}

impl StaticProbe {
    pub fn new(runtime: impl Into<String>) -> Self {
        Self {
            runtime: Some(runtime.into()),
            versions: HashMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.versions.insert(name.into(), Some(version.into()));
        self
    }

    pub fn with_broken(mut self, name: impl Into<String>) -> Self {
        self.versions.insert(name.into(), None);
        self
    }
}

impl VersionProbe for StaticProbe {
    fn runtime_version(&self) -> Result<String> {
        self.runtime.clone().context("Runtime version unavailable")
    }

    fn resolve(&self, name: &str) -> Result<Option<String>> {
        match self.versions.get(name) {
            None => Ok(None),
            Some(Some(version)) => Ok(Some(version.clone())),
            Some(None) => bail!("Metadata for '{}' is unreadable", name),
        }
    }
}

/// Captures an `EnvironmentFingerprint` for the tracked dependencies
pub struct EnvironmentFingerprinter {
    tracked: Vec<String>,
    probe: Box<dyn VersionProbe>,
}

impl EnvironmentFingerprinter {
    pub fn new(tracked: Vec<String>, probe: Box<dyn VersionProbe>) -> Self {
        Self { tracked, probe }
    }

    /// Never fails: lookup problems become sentinel versions
    pub fn capture(&self) -> EnvironmentFingerprint {
        let runtime_version = self.probe.runtime_version().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not resolve runtime version");
            VERSION_UNKNOWN.to_string()
        });

        let mut dependencies = BTreeMap::new();
        for name in &self.tracked {
            let version = match self.probe.resolve(name) {
                Ok(Some(version)) => version,
                Ok(None) => NOT_INSTALLED.to_string(),
                Err(e) => {
                    tracing::warn!(
                        dependency = %name,
                        error = %e,
                        "Could not resolve dependency version"
                    );
                    VERSION_UNKNOWN.to_string()
                }
            };
            dependencies.insert(name.clone(), version);
        }

        EnvironmentFingerprint::new(runtime_version, dependencies)
    }
}
