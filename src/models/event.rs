use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of history event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    WorkflowCompleted,
    StatusChecked,
    StateSaved,
    CertificateGenerated,
    /// Written by a newer version; kept readable instead of dropped
    #[serde(other)]
    Unknown,
}

impl EventType {
    pub fn name(&self) -> &'static str {
        match self {
            EventType::WorkflowCompleted => "workflow_completed",
            EventType::StatusChecked => "status_checked",
            EventType::StateSaved => "state_saved",
            EventType::CertificateGenerated => "certificate_generated",
            EventType::Unknown => "unknown",
        }
    }
}

/// Outcome recorded with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventResult {
    Pass,
    Fail,
    Info,
}

impl EventResult {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            EventResult::Pass
        } else {
            EventResult::Fail
        }
    }
}

/// One line of the append-only history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub result: EventResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_hash: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ValidationEvent {
    pub fn new(event_type: EventType, result: EventResult) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            result,
            validation_hash: None,
            details: BTreeMap::new(),
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.validation_hash = Some(hash.into());
        self
    }

    pub fn with_detail(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}
