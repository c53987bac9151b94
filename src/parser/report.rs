//! Test Runner Report Parser
//!
//! Recovers `TestRecord`s from a runner's JSON Lines report:
//! - One JSON object per test: `id`, `outcome`, optional `detail`/`trace`/`group`
//! - Lines that are not JSON objects are runner noise and are ignored
//! - A JSON object that is not a valid record becomes an `error` record, so a
//!   reported test is never lost
//! - A `[trace:ID]` marker embedded in the id fills a missing `trace`
//! - A missing `group` is derived from the id's module path

use crate::models::{TestOutcome, TestRecord};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

fn trace_marker() -> &'static Regex {
    static TRACE_MARKER: OnceLock<Regex> = OnceLock::new();
    TRACE_MARKER
        .get_or_init(|| Regex::new(r"\[trace:([A-Za-z0-9._-]+)\]").expect("valid trace regex"))
}

/// Parse every test record out of a runner report
pub fn parse_report(output: &str) -> Vec<TestRecord> {
    let mut records = Vec::new();

    for (index, line) in output.lines().enumerate() {
        let line = line.trim();
        if !line.starts_with('{') {
            continue;
        }

        let value = match serde_json::from_str::<JsonValue>(line) {
            Ok(value @ JsonValue::Object(_)) => value,
            Ok(_) | Err(_) => {
                tracing::debug!(line = index + 1, "Ignoring non-JSON report line");
                continue;
            }
        };

        match serde_json::from_value::<TestRecord>(value.clone()) {
            Ok(record) => records.push(enrich(record)),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Unrecognized test record");
                records.push(enrich(unrecognized(index + 1, &value, line, &e)));
            }
        }
    }

    records
}

/// Stand-in for a record the runner reported in a shape we cannot read
fn unrecognized(
    line_number: usize,
    value: &JsonValue,
    line: &str,
    error: &serde_json::Error,
) -> TestRecord {
    let id = value
        .get("id")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("report-line-{}", line_number));

    let mut record = TestRecord::new(id, TestOutcome::Error);
    record.detail = Some(format!("Unrecognized report line ({}): {}", error, line));
    record
}

fn enrich(mut record: TestRecord) -> TestRecord {
    if record.trace.is_none() {
        record.trace = extract_trace_marker(&record.id);
    }
    if record.group.is_none() {
        record.group = derive_group(&record.id);
    }
    record
}

/// First `[trace:ID]` marker in `text`
pub fn extract_trace_marker(text: &str) -> Option<String> {
    trace_marker()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Group a test by where it lives
///
/// `oq::stats::test_mean` → `oq::stats`; `tests/oq/test_stats.py::test_mean`
/// → `test_stats`. Returns `None` for bare names.
pub fn derive_group(id: &str) -> Option<String> {
    let id = trace_marker().replace_all(id, "");
    let (path, _) = id.rsplit_once("::")?;

    if path.contains('/') || path.contains('.') {
        let file = path.rsplit('/').next().unwrap_or(path);
        let stem = file.split_once('.').map_or(file, |(stem, _)| stem);
        return (!stem.is_empty()).then(|| stem.to_string());
    }

    (!path.is_empty()).then(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestOutcome;

    #[test]
    fn test_parse_report_ignores_noise() {
        let output = r#"
collecting tests...
{"id": "iq::install::test_layout", "outcome": "passed"}
WARNING: something printed by a test
{"id": "iq::install::test_checksums", "outcome": "failed", "detail": "line 1\nline 2"}
{"broken json
summary: 1 passed, 1 failed
"#;
        let records = parse_report(output);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome, TestOutcome::Passed);
        assert_eq!(records[1].outcome, TestOutcome::Failed);
        assert_eq!(records[1].detail.as_deref(), Some("line 1\nline 2"));
        assert_eq!(records[1].group.as_deref(), Some("iq::install"));
    }

    #[test]
    fn test_explicit_fields_win() {
        let output = serde_json::json!({
            "id": "oq::stats::test_mean[trace:URS-001]",
            "outcome": "passed",
            "trace": "URS-999",
            "group": "Descriptive statistics",
        })
        .to_string();
        let records = parse_report(&output);
        assert_eq!(records[0].trace.as_deref(), Some("URS-999"));
        assert_eq!(records[0].group.as_deref(), Some("Descriptive statistics"));
    }

    #[test]
    fn test_embedded_trace_marker() {
        let output = r#"{"id": "oq::stats::test_mean[trace:URS-001]", "outcome": "skipped"}"#;
        let records = parse_report(output);
        assert_eq!(records[0].trace.as_deref(), Some("URS-001"));
        assert_eq!(records[0].group.as_deref(), Some("oq::stats"));
        assert_eq!(records[0].outcome, TestOutcome::Skipped);
    }

    #[test]
    fn test_derive_group() {
        assert_eq!(derive_group("tests/pq/test_ui.py::test_export").as_deref(), Some("test_ui"));
        assert_eq!(derive_group("pq::report::export").as_deref(), Some("pq::report"));
        assert_eq!(derive_group("standalone"), None);
    }

    #[test]
    fn test_unrecognized_records_become_errors() {
        let output = r#"{"id": "iq::install::a", "outcome": "passed"}
{"id": "iq::install::b", "outcome": "xfail", "detail": "boom"}
{"id": "iq::install::c", "outcome": "FAILED"}
{"id": "iq::install::d", "status": "failed"}
{"outcome": "passed", "name": "no id"}"#;
        let records = parse_report(output);

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].outcome, TestOutcome::Passed);
        for record in &records[1..] {
            assert_eq!(record.outcome, TestOutcome::Error);
            assert!(record.detail.as_deref().unwrap().starts_with("Unrecognized report line"));
        }
        assert_eq!(records[1].id, "iq::install::b");
        assert_eq!(records[3].group.as_deref(), Some("iq::install"));
        assert_eq!(records[4].id, "report-line-5");
    }
}
