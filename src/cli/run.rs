use crate::config::ValidationConfig;
use crate::orchestrator::{persist_outcome, WorkflowOrchestrator};
use crate::store::PersistenceStore;
use crate::Result;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

pub async fn run(config: &ValidationConfig, yes: bool, no_certificate: bool) -> Result<()> {
    if !yes {
        let proceed = Confirm::new()
            .with_prompt(
                "Run IQ → OQ → PQ qualification now? \
                 This replaces the current validation state.",
            )
            .default(false)
            .interact()?;
        if !proceed {
            println!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }

    let mut orchestrator = WorkflowOrchestrator::from_config(config);
    if no_certificate {
        orchestrator = orchestrator.without_certificates();
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let progress = |stage: &str, fraction: f64| -> Result<()> {
        pb.set_position((fraction * 100.0).round() as u64);
        pb.set_message(stage.to_string());
        Ok(())
    };

    let result = orchestrator.execute_workflow(Some(&progress)).await;
    pb.finish_and_clear();

    let store = PersistenceStore::new(&config.persistence_dir);
    let saved = persist_outcome(
        &store,
        &result,
        config.expiry_window_days,
        config.history_max_entries,
    )?;

    println!("{}", "Qualification results".cyan().bold());
    for phase in result.phase_results() {
        let status = if !phase.executed {
            "NOT EXECUTED".bright_black()
        } else if phase.passed {
            "PASS".green()
        } else {
            "FAIL".red()
        };
        println!(
            "   {}: {} ({}/{} checks)",
            phase.phase.name(),
            status,
            phase.passed_count(),
            phase.checks.len()
        );
    }

    if let Some(path) = &result.certificate_path {
        println!("   Certificate: {}", path.display());
    }

    if result.success {
        println!("\n{}", "✅ Calculation engine validated".green().bold());
        if let Some(state) = &saved {
            println!("   Valid until {}", state.expiry_timestamp.format("%Y-%m-%d"));
        }
    } else {
        println!("\n{}", "⛔ Qualification failed".red().bold());
        for line in result.failure_summary() {
            println!("   {}", line);
        }
    }

    if saved.is_none() {
        println!(
            "{}",
            "⚠️  Validation state was not updated (source tree could not be hashed)".yellow()
        );
    }

    Ok(())
}
