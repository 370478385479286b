use serde::Serialize;
use time::OffsetDateTime;
use zrep_core::domain::IncidentRecord;
use zrep_core::error::AppError;
use zrep_core::source::{HostScope, IncidentSource};

use crate::client::ZabbixClient;
use crate::schema::{
    incident_from_wire, recovery_event_ids, recovery_index, RawProblemEvent, RawRecoveryEvent,
};

/// `event.get` parameters for trigger problem events in a time range.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemEventQuery {
    pub output: [&'static str; 6],
    /// 0 = trigger events.
    pub source: u8,
    /// 0 = trigger objects.
    pub object: u8,
    /// 1 = PROBLEM.
    pub value: u8,
    pub time_from: i64,
    pub time_till: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hostids: Vec<String>,
    #[serde(rename = "selectHosts")]
    pub select_hosts: [&'static str; 3],
    pub sortfield: [&'static str; 2],
    pub sortorder: &'static str,
}

impl ProblemEventQuery {
    pub fn new(scope: &HostScope, start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self {
            output: ["eventid", "name", "severity", "clock", "r_eventid", "objectid"],
            source: 0,
            object: 0,
            value: 1,
            time_from: start.unix_timestamp(),
            time_till: end.unix_timestamp(),
            hostids: scope.host_ids.clone(),
            select_hosts: ["hostid", "host", "name"],
            // Chronological order keeps first-writer tie-breaks stable across runs.
            sortfield: ["clock", "eventid"],
            sortorder: "ASC",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct RecoveryEventQuery {
    output: [&'static str; 2],
    eventids: Vec<String>,
}

impl IncidentSource for ZabbixClient {
    fn fetch_incidents(
        &self,
        scope: &HostScope,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<IncidentRecord>, AppError> {
        tracing::info!(
            %scope,
            from = start.unix_timestamp(),
            till = end.unix_timestamp(),
            "fetching problem events"
        );
        let problems: Vec<RawProblemEvent> =
            self.call("event.get", ProblemEventQuery::new(scope, start, end))?;

        let recovery_ids = recovery_event_ids(&problems);
        let recoveries = if recovery_ids.is_empty() {
            Default::default()
        } else {
            let raw: Vec<RawRecoveryEvent> = self.call(
                "event.get",
                RecoveryEventQuery {
                    output: ["eventid", "clock"],
                    eventids: recovery_ids,
                },
            )?;
            recovery_index(raw)
        };

        let received = problems.len();
        let incidents: Vec<IncidentRecord> = problems
            .into_iter()
            .filter_map(|p| incident_from_wire(p, &recoveries))
            .collect();
        tracing::info!(
            received,
            kept = incidents.len(),
            resolved = recoveries.len(),
            "problem events fetched"
        );
        Ok(incidents)
    }
}
