use crate::config::ValidationConfig;
use crate::models::EventResult;
use crate::store::PersistenceStore;
use crate::Result;
use colored::Colorize;

pub fn run(config: &ValidationConfig, limit: usize, json: bool) -> Result<()> {
    let store = PersistenceStore::new(&config.persistence_dir);
    let events = store.get_history(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", "No validation history yet.".yellow());
        return Ok(());
    }

    for event in &events {
        let result = match event.result {
            EventResult::Pass => "pass".green(),
            EventResult::Fail => "fail".red(),
            EventResult::Info => "info".normal(),
        };
        let hash = event
            .validation_hash
            .as_deref()
            .map(|h| &h[..h.len().min(12)])
            .unwrap_or("-");
        println!(
            "{}  {:<22} {:<5} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type.name(),
            result,
            hash.bright_black()
        );
    }

    Ok(())
}

pub fn trim(config: &ValidationConfig, max_entries: usize) -> Result<()> {
    let store = PersistenceStore::new(&config.persistence_dir);
    let dropped = store.trim_history(max_entries)?;
    if dropped == 0 {
        println!("History already within {} entries.", max_entries);
    } else {
        println!("{}", format!("Dropped {} old events, kept {}.", dropped, max_entries).green());
    }
    Ok(())
}
