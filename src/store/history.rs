//! Append-only JSON Lines event log

use super::atomic::atomic_write;
use crate::models::ValidationEvent;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Append one event as a single line
///
/// A torn last line left by an interrupted append is terminated first so the
/// new event stays on a line of its own.
pub fn append(path: &Path, event: &ValidationEvent) -> std::io::Result<()> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    if !ends_with_newline(&mut file)? {
        tracing::warn!(path = %path.display(), "History log ends with a partial line");
        line.insert(0, '\n');
    }
    file.write_all(line.as_bytes())?;
    file.flush()
}

/// True for an empty file or one whose last byte is `\n`
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Every parsable event in file order (oldest first)
///
/// Lines that fail to parse are skipped; a missing log reads as empty.
pub fn read_all(path: &Path) -> std::io::Result<Vec<ValidationEvent>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ValidationEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::debug!(line = index + 1, error = %e, "Skipping unparsable history line");
            }
        }
    }

    Ok(events)
}

/// Rewrite the log keeping only the newest `max_entries`, oldest first
///
/// Returns the number of events dropped.
pub fn trim(path: &Path, max_entries: usize) -> std::io::Result<usize> {
    let events = read_all(path)?;
    if events.len() <= max_entries {
        return Ok(0);
    }

    let dropped = events.len() - max_entries;
    let mut content = String::new();
    for event in &events[dropped..] {
        content.push_str(&serde_json::to_string(event)?);
        content.push('\n');
    }

    atomic_write(path, content.as_bytes())?;
    Ok(dropped)
}
