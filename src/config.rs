//! Qualification Configuration
//!
//! Loaded from `qualify.toml` at the project root. Every component receives
//! the pieces it needs through its constructor; nothing reads this globally.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "qualify.toml";

/// Rules deciding which files count as calculation-engine source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashRules {
    /// File extensions (without the dot) that qualify
    pub extensions: Vec<String>,
    /// Directory names whose contents never qualify (caches, build output)
    pub excluded_dirs: Vec<String>,
}

impl Default for HashRules {
    fn default() -> Self {
        Self {
            extensions: vec!["rs".to_string(), "py".to_string(), "toml".to_string()],
            excluded_dirs: [
                ".git",
                "target",
                "build",
                "dist",
                "__pycache__",
                ".pytest_cache",
                ".mypy_cache",
                "node_modules",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// External test runner invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub program: String,
    /// Arguments; `{tag}` is replaced with the phase tag (`iq`, `oq`, `pq`)
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    pub iq_timeout_secs: u64,
    pub oq_timeout_secs: u64,
    /// Longer: PQ drives the full UI surface
    pub pq_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "qualify-tests".to_string(),
            args: vec![
                "--tag".to_string(),
                "{tag}".to_string(),
                "--report".to_string(),
                "jsonl".to_string(),
            ],
            working_dir: None,
            iq_timeout_secs: 300,
            oq_timeout_secs: 900,
            pq_timeout_secs: 3600,
        }
    }
}

impl RunnerConfig {
    pub fn timeout_for(&self, phase: crate::models::Phase) -> Duration {
        use crate::models::Phase;
        let secs = match phase {
            Phase::Iq => self.iq_timeout_secs,
            Phase::Oq => self.oq_timeout_secs,
            Phase::Pq => self.pq_timeout_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Commands used to resolve runtime and dependency versions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Prints the runtime version on stdout
    pub runtime_command: Vec<String>,
    /// Prints a dependency's version; `{name}` is replaced with the dependency
    pub dependency_command: Vec<String>,
    /// Exit code meaning "dependency not installed"
    pub missing_exit_code: i32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            runtime_command: vec!["python3".to_string(), "--version".to_string()],
            dependency_command: vec![
                "python3".to_string(),
                "-c".to_string(),
                concat!(
                    "import sys, importlib.metadata as m\n",
                    "try: print(m.version('{name}'))\n",
                    "except m.PackageNotFoundError: sys.exit(3)",
                )
                .to_string(),
            ],
            missing_exit_code: 3,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Calculation engine source tree whose content is hashed
    pub engine_dir: PathBuf,

    pub expiry_window_days: u32,

    pub tracked_dependencies: Vec<String>,

    /// Holds the state record and history log
    pub persistence_dir: PathBuf,

    /// Where certificates are written; no certificate when unset
    #[serde(default)]
    pub certificate_output_dir: Option<PathBuf>,

    /// Days-before-expiry at which to start reminding
    #[serde(default = "default_reminder_thresholds")]
    pub reminder_thresholds: Vec<u32>,

    #[serde(default = "default_history_max_entries")]
    pub history_max_entries: usize,

    #[serde(default)]
    pub hash: HashRules,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub probe: ProbeConfig,
}

fn default_reminder_thresholds() -> Vec<u32> {
    vec![30, 14, 7]
}

fn default_history_max_entries() -> usize {
    1000
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            engine_dir: PathBuf::from("engine"),
            expiry_window_days: 365,
            tracked_dependencies: Vec::new(),
            persistence_dir: PathBuf::from(".qualify"),
            certificate_output_dir: None,
            reminder_thresholds: default_reminder_thresholds(),
            history_max_entries: default_history_max_entries(),
            hash: HashRules::default(),
            runner: RunnerConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl ValidationConfig {
    /// Load config from `qualify.toml`, falling back to defaults
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        Self::load_from(&project_root.join(CONFIG_FILE))
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: ValidationConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        Ok(config)
    }

    /// Save config to `qualify.toml`
    pub fn save(&self, project_root: &Path) -> anyhow::Result<()> {
        let config_path = project_root.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }

    /// Resolve relative paths against the project root
    pub fn resolve_paths(mut self, project_root: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = project_root.join(&*p);
            }
        };
        resolve(&mut self.engine_dir);
        resolve(&mut self.persistence_dir);
        if let Some(dir) = self.certificate_output_dir.as_mut() {
            resolve(dir);
        }
        if let Some(dir) = self.runner.working_dir.as_mut() {
            resolve(dir);
        }
        self
    }
}
