//! Fingerprint diffing

use crate::models::{EnvironmentFingerprint, NOT_INSTALLED};
use std::collections::BTreeSet;

/// Outcome of comparing two fingerprints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub equal: bool,
    /// One line per mismatched key, runtime first, then dependencies by name
    pub differences: Vec<String>,
}

/// Compare `expected` (usually the persisted fingerprint) against `actual`
///
/// Dependencies are compared over the union of both key sets; a key missing
/// on either side reads as `NOT_INSTALLED`.
pub fn compare(expected: &EnvironmentFingerprint, actual: &EnvironmentFingerprint) -> Comparison {
    let mut differences = Vec::new();

    if expected.runtime_version() != actual.runtime_version() {
        differences.push(format!(
            "runtime: {} -> {}",
            expected.runtime_version(),
            actual.runtime_version()
        ));
    }

    let names: BTreeSet<&String> = expected
        .dependencies()
        .keys()
        .chain(actual.dependencies().keys())
        .collect();

    for name in names {
        let before = expected.dependencies().get(name).map_or(NOT_INSTALLED, String::as_str);
        let after = actual.dependencies().get(name).map_or(NOT_INSTALLED, String::as_str);
        if before != after {
            differences.push(format!("{}: {} -> {}", name, before, after));
        }
    }

    Comparison {
        equal: differences.is_empty(),
        differences,
    }
}
