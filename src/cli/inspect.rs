//! Read-only inspection commands

use crate::config::ValidationConfig;
use crate::state::{CommandProbe, EnvironmentFingerprinter, HashEngine};
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn hash(config: &ValidationConfig, path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or(&config.engine_dir);
    let hash = HashEngine::new(config.hash.clone()).compute_directory_hash(root)?;
    println!("{}", hash);
    Ok(())
}

pub fn fingerprint(config: &ValidationConfig, json: bool) -> Result<()> {
    let fingerprinter = EnvironmentFingerprinter::new(
        config.tracked_dependencies.clone(),
        Box::new(CommandProbe::new(config.probe.clone())),
    );
    let fp = fingerprinter.capture();

    if json {
        println!("{}", serde_json::to_string_pretty(&fp)?);
        return Ok(());
    }

    println!("{} {}", "Runtime:".cyan(), fp.runtime_version());
    for (name, version) in fp.dependencies() {
        println!("   {:<24} {}", name, version);
    }
    Ok(())
}
