use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel version for a tracked dependency that is not installed
pub const NOT_INSTALLED: &str = "NOT_INSTALLED";

/// Sentinel version for a dependency whose version could not be resolved
pub const VERSION_UNKNOWN: &str = "VERSION_UNKNOWN";

/// Snapshot of the runtime and tracked dependency versions
///
/// Immutable once captured. Dependencies are kept in a `BTreeMap` so the
/// serialized form is stable across captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFingerprint {
    runtime_version: String,
    dependencies: BTreeMap<String, String>,
}

impl EnvironmentFingerprint {
    pub fn new(runtime_version: impl Into<String>, dependencies: BTreeMap<String, String>) -> Self {
        Self {
            runtime_version: runtime_version.into(),
            dependencies,
        }
    }

    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    pub fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.dependencies
    }

    /// Version of a dependency, treating an untracked name as not installed
    pub fn dependency_version(&self, name: &str) -> &str {
        self.dependencies
            .get(name)
            .map(String::as_str)
            .unwrap_or(NOT_INSTALLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_reads_as_not_installed() {
        let mut deps = BTreeMap::new();
        deps.insert("numeric-core".to_string(), "1.26.4".to_string());
        let fp = EnvironmentFingerprint::new("3.12.1", deps);

        assert_eq!(fp.dependency_version("numeric-core"), "1.26.4");
        assert_eq!(fp.dependency_version("plotting"), NOT_INSTALLED);
    }

    #[test]
    fn test_serialized_field_names() {
        let fp = EnvironmentFingerprint::new("3.12.1", BTreeMap::new());
        let value = serde_json::to_value(&fp).unwrap();
        assert_eq!(value["runtime_version"], "3.12.1");
        assert!(value["dependencies"].is_object());
    }
}
