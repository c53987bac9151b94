//! Schema check for the persisted state document

use chrono::DateTime;
use jsonschema::Validator;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

const STATE_SCHEMA: &str = include_str!("../../schemas/validation_state.schema.json");

const TIMESTAMP_FIELDS: &[&str] = &["validation_date", "expiry_date"];

/// True when `raw` is a structurally valid state document
pub fn verify_integrity(raw: &JsonValue) -> bool {
    integrity_violations(raw).is_empty()
}

/// Every schema violation in `raw`, empty when the document is valid
pub fn integrity_violations(raw: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();

    match state_validator() {
        Ok(validator) => {
            for error in validator.iter_errors(raw) {
                let path = error.instance_path.to_string();
                if path.is_empty() {
                    violations.push(error.to_string());
                } else {
                    violations.push(format!("{}: {}", path, error));
                }
            }
        }
        Err(e) => violations.push(e.clone()),
    }

    // JSON Schema `format` is annotation-only by default; parse timestamps here
    for field in TIMESTAMP_FIELDS {
        if let Some(value) = raw.get(*field).and_then(|v| v.as_str()) {
            if DateTime::parse_from_rfc3339(value).is_err() {
                violations.push(format!("/{}: '{}' is not an RFC 3339 timestamp", field, value));
            }
        }
    }

    violations
}

/// Compiled once per process
fn state_validator() -> Result<&'static Validator, &'static String> {
    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    VALIDATOR.get_or_init(compile_schema).as_ref()
}

fn compile_schema() -> Result<Validator, String> {
    let schema: JsonValue = serde_json::from_str(STATE_SCHEMA)
        .map_err(|e| format!("Failed to parse state schema: {}", e))?;
    Validator::new(&schema).map_err(|e| format!("Failed to compile state schema: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_compiled_once() {
        let (Ok(first), Ok(second)) = (state_validator(), state_validator()) else {
            panic!("state schema failed to compile");
        };
        assert!(std::ptr::eq(first, second));
    }

    fn valid_document() -> JsonValue {
        json!({
            "validation_date": "2026-03-01T12:00:00Z",
            "validation_hash": "ab".repeat(32),
            "environment_fingerprint": {
                "runtime_version": "3.12.1",
                "dependencies": { "numeric-core": "1.26.4", "plotting": "NOT_INSTALLED" }
            },
            "iq_status": "PASS",
            "oq_status": "PASS",
            "pq_status": "FAIL",
            "expiry_date": "2027-03-01T12:00:00Z",
            "certificate_hash": null
        })
    }

    #[test]
    fn test_valid_document() {
        assert!(verify_integrity(&valid_document()));

        let mut doc = valid_document();
        doc.as_object_mut().unwrap().remove("certificate_hash");
        assert!(verify_integrity(&doc));

        doc["certificate_hash"] = json!("cd".repeat(32));
        assert!(verify_integrity(&doc));
    }

    #[test]
    fn test_every_required_field_removed() {
        for field in [
            "validation_date",
            "validation_hash",
            "environment_fingerprint",
            "iq_status",
            "oq_status",
            "pq_status",
            "expiry_date",
        ] {
            let mut doc = valid_document();
            doc.as_object_mut().unwrap().remove(field);
            assert!(!verify_integrity(&doc), "missing {field} accepted");
        }
    }

    #[test]
    fn test_every_field_wrong_type() {
        for field in [
            "validation_date",
            "validation_hash",
            "environment_fingerprint",
            "iq_status",
            "oq_status",
            "pq_status",
            "expiry_date",
            "certificate_hash",
        ] {
            let mut doc = valid_document();
            doc[field] = json!(42);
            assert!(!verify_integrity(&doc), "numeric {field} accepted");
        }
    }

    #[test]
    fn test_status_must_be_exact() {
        let mut doc = valid_document();
        doc["iq_status"] = json!("pass");
        assert!(!verify_integrity(&doc));

        doc["iq_status"] = json!("SKIPPED");
        assert!(!verify_integrity(&doc));
    }

    #[test]
    fn test_malformed_timestamp() {
        let mut doc = valid_document();
        doc["expiry_date"] = json!("next tuesday");
        let violations = integrity_violations(&doc);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("expiry_date"));
    }

    #[test]
    fn test_fingerprint_sub_fields() {
        let mut doc = valid_document();
        doc["environment_fingerprint"].as_object_mut().unwrap().remove("dependencies");
        assert!(!verify_integrity(&doc));

        let mut doc = valid_document();
        doc["environment_fingerprint"].as_object_mut().unwrap().remove("runtime_version");
        assert!(!verify_integrity(&doc));

        let mut doc = valid_document();
        doc["environment_fingerprint"]["dependencies"]["numeric-core"] = json!(1.26);
        assert!(!verify_integrity(&doc));
    }

    #[test]
    fn test_non_hex_hash() {
        let mut doc = valid_document();
        doc["validation_hash"] = json!("not-a-hash");
        assert!(!verify_integrity(&doc));
    }

    #[test]
    fn test_non_object_document() {
        assert!(!verify_integrity(&json!([1, 2, 3])));
        assert!(!verify_integrity(&json!(null)));
    }
}
