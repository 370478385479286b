use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Severity;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// Immutable code → label lookup used by the aggregator, metrics and renderer.
///
/// Built once by the caller and passed by reference; there is no process-wide table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelTables {
    host_status: BTreeMap<String, String>,
    severity: BTreeMap<u8, String>,
    /// Item/trigger enablement: (enabled, disabled).
    enablement: (String, String),
    /// Trigger state: (problem, ok).
    trigger_state: (String, String),
    unknown: String,
}

impl Default for LabelTables {
    fn default() -> Self {
        Self::empty()
            .with_host_status("0", "Enabled")
            .with_host_status("1", "Disabled")
            .with_severity(Severity::new(0), "Not classified")
            .with_severity(Severity::new(1), "Information")
            .with_severity(Severity::new(2), "Warning")
            .with_severity(Severity::new(3), "Average")
            .with_severity(Severity::new(4), "High")
            .with_severity(Severity::new(5), "Disaster")
            .with_enablement("Enabled", "Disabled")
            .with_trigger_state("Problem", "OK")
    }
}

impl LabelTables {
    pub fn empty() -> Self {
        Self {
            host_status: BTreeMap::new(),
            severity: BTreeMap::new(),
            enablement: (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string()),
            trigger_state: (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string()),
            unknown: UNKNOWN_LABEL.to_string(),
        }
    }

    pub fn with_host_status(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.host_status.insert(code.into(), label.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity, label: impl Into<String>) -> Self {
        self.severity.insert(severity.ordinal(), label.into());
        self
    }

    pub fn with_enablement(
        mut self,
        enabled: impl Into<String>,
        disabled: impl Into<String>,
    ) -> Self {
        self.enablement = (enabled.into(), disabled.into());
        self
    }

    pub fn with_trigger_state(mut self, problem: impl Into<String>, ok: impl Into<String>) -> Self {
        self.trigger_state = (problem.into(), ok.into());
        self
    }

    pub fn with_unknown(mut self, label: impl Into<String>) -> Self {
        self.unknown = label.into();
        self
    }

    pub fn host_status(&self, code: &str) -> &str {
        self.host_status
            .get(code.trim())
            .map(String::as_str)
            .unwrap_or(&self.unknown)
    }

    pub fn enablement(&self, enabled: bool) -> &str {
        if enabled {
            &self.enablement.0
        } else {
            &self.enablement.1
        }
    }

    pub fn trigger_state(&self, in_problem: bool) -> &str {
        if in_problem {
            &self.trigger_state.0
        } else {
            &self.trigger_state.1
        }
    }

    pub fn severity(&self, severity: Severity) -> &str {
        self.severity
            .get(&severity.ordinal())
            .map(String::as_str)
            .unwrap_or(&self.unknown)
    }
}

impl Severity {
    pub fn label(self, labels: &LabelTables) -> &str {
        labels.severity(self)
    }
}
