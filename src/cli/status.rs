use crate::config::ValidationConfig;
use crate::models::{EventResult, EventType, ValidationEvent, ValidationState, ValidationStatus};
use crate::state::ValidationStatusEngine;
use crate::store::PersistenceStore;
use crate::Result;
use colored::Colorize;

pub fn run(config: &ValidationConfig, json: bool) -> Result<()> {
    let store = PersistenceStore::new(&config.persistence_dir);
    let state = store.load_state();
    let status = ValidationStatusEngine::from_config(config).evaluate(state.as_ref());

    record_check(&store, config, &status, state.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Validation status".cyan().bold());
    println!();

    if status.is_validated {
        println!("   State:     {} {}", "✅", "VALIDATED".green().bold());
    } else {
        println!("   State:     {} {}", "⛔", "NOT VALIDATED".red().bold());
    }

    if let Some(validated_at) = &status.validation_timestamp {
        println!("   Validated: {}", validated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(days) = status.days_until_expiry {
        let line = format!("{} days", days);
        match status.reminder_threshold {
            Some(threshold) => println!(
                "   Expires:   {} {}",
                line.yellow(),
                format!("(within {}-day reminder window)", threshold).yellow()
            ),
            None => println!("   Expires:   {}", line),
        }
    }

    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };
    if status.validation_timestamp.is_some() {
        println!("   Source:      {}", mark(status.hash_match));
        println!("   Environment: {}", mark(status.environment_match));
        println!("   IQ/OQ/PQ:    {}", mark(status.tests_passed));
    }

    if !status.failure_reasons.is_empty() {
        println!("\n{}", "Reasons:".yellow());
        for reason in &status.failure_reasons {
            println!("   • {}", reason);
        }
    }

    Ok(())
}

/// Log a `status_checked` event and keep the history bounded
///
/// Status stays readable when the history cannot be written.
fn record_check(
    store: &PersistenceStore,
    config: &ValidationConfig,
    status: &ValidationStatus,
    state: Option<&ValidationState>,
) {
    let mut event = ValidationEvent::new(
        EventType::StatusChecked,
        EventResult::from_passed(status.is_validated),
    )
    .with_detail("failure_count", status.failure_reasons.len());
    if let Some(state) = state {
        event = event.with_hash(state.validation_hash.clone());
    }

    let recorded = store
        .append_event(&event)
        .and_then(|()| store.trim_history(config.history_max_entries));
    if let Err(e) = recorded {
        tracing::warn!(error = %e, "Could not record status check");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_status_checks_keep_history_bounded() {
        let temp = TempDir::new().unwrap();
        let config = ValidationConfig {
            history_max_entries: 2,
            ..ValidationConfig::default().resolve_paths(temp.path())
        };

        for _ in 0..4 {
            run(&config, true).unwrap();
        }

        let store = PersistenceStore::new(&config.persistence_dir);
        let history = store.get_history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e.event_type == EventType::StatusChecked));
        assert!(history.iter().all(|e| e.result == EventResult::Fail));
    }
}
