use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

pub const SEVERITY_MAX: u8 = 5;

/// Problem severity ordinal: 0 = not classified .. 5 = highest.
///
/// Deserialization goes through `Severity::new`, so out-of-range ordinals are clamped there too.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(from = "u8")]
pub struct Severity(u8);

impl From<u8> for Severity {
    fn from(ordinal: u8) -> Self {
        Self::new(ordinal)
    }
}

impl Severity {
    /// Out-of-range ordinals are clamped to the highest severity.
    pub fn new(ordinal: u8) -> Self {
        Self(ordinal.min(SEVERITY_MAX))
    }

    pub fn ordinal(self) -> u8 {
        self.0
    }
}

/// One reported problem instance, already validated and typed at the adapter boundary.
///
/// Notes:
/// - `end` is `None` while the problem is unresolved.
/// - `host_name` is the display name of the associated host; empty falls back to `host_id`.
/// - Records with an empty `host_id`/`trigger_id` are not rejected here; the aggregator skips and
///   counts them so the run stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentRecord {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
    pub host_id: String,
    pub host_name: String,
    pub trigger_id: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub key: String,
    pub enabled: bool,
    pub in_error: bool,
    pub last_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trigger {
    pub id: String,
    pub description: String,
    pub enabled: bool,
    pub in_problem: bool,
    pub severity: Severity,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_change: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interface {
    pub id: String,
    pub kind: String,
    pub ip: String,
    pub dns: String,
    pub port: String,
}

/// Inventory snapshot of one monitored host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Host {
    pub id: String,
    pub name: String,
    /// Raw status code as reported upstream; rendered through `LabelTables`.
    pub status: String,
    pub items: Vec<Item>,
    pub triggers: Vec<Trigger>,
    pub interfaces: Vec<Interface>,
}

impl Host {
    /// Case-insensitive substring match on name or id.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term) || self.id.to_lowercase().contains(&term)
    }
}

pub fn filter_hosts(hosts: &[Host], term: &str) -> Vec<Host> {
    hosts.iter().filter(|h| h.matches(term)).cloned().collect()
}

/// Busiest (trigger, day) pair seen for a host. Zero-valued (`count == 0`, `day == None`) when
/// the host had no incidents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeakRecord {
    pub trigger_id: String,
    pub trigger_name: String,
    pub day: Option<Date>,
    pub count: i64,
    pub severity: String,
}

/// Aggregate for one host over one reporting period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostMonthlyAnalysis {
    pub host_id: String,
    pub host_name: String,
    pub total_incidents: i64,
    /// Incidents still active at aggregation time.
    pub limit_exceeded: i64,
    pub incidents_by_trigger: BTreeMap<String, i64>,
    pub unavailable_seconds: i64,
    pub peak: PeakRecord,
}

impl HostMonthlyAnalysis {
    pub fn new(host_id: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            host_name: host_name.into(),
            total_incidents: 0,
            limit_exceeded: 0,
            incidents_by_trigger: BTreeMap::new(),
            unavailable_seconds: 0,
            peak: PeakRecord::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
