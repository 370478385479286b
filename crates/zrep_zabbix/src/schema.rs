//! Wire shapes returned by the Zabbix API and their conversion into engine types.
//!
//! Zabbix encodes numbers, flags and timestamps as strings. Everything is parsed here so the
//! engine never sees loosely-typed values; unparseable optional fields degrade instead of failing.

use std::collections::BTreeMap;

use serde::Deserialize;
use time::OffsetDateTime;
use zrep_core::domain::{Host, IncidentRecord, Interface, Item, Severity, Trigger};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawItem {
    pub itemid: String,
    pub name: String,
    pub key_: String,
    pub status: String,
    pub state: String,
    pub lastvalue: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTrigger {
    pub triggerid: String,
    pub description: String,
    pub status: String,
    pub value: String,
    pub priority: String,
    pub lastchange: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawInterface {
    pub interfaceid: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ip: String,
    pub dns: String,
    pub port: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawHost {
    pub hostid: String,
    pub host: String,
    pub name: String,
    pub status: String,
    pub items: Vec<RawItem>,
    pub triggers: Vec<RawTrigger>,
    pub interfaces: Vec<RawInterface>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEventHost {
    pub hostid: String,
    pub host: String,
    pub name: String,
}

/// Problem event from `event.get` with `selectHosts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProblemEvent {
    pub eventid: String,
    pub name: String,
    pub severity: String,
    pub clock: String,
    pub r_eventid: String,
    pub objectid: String,
    pub hosts: Vec<RawEventHost>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecoveryEvent {
    pub eventid: String,
    pub clock: String,
}

/// Zabbix flag semantics: `"0"` means enabled/OK, anything else does not.
fn is_zero(code: &str) -> bool {
    code.trim() == "0"
}

fn is_one(code: &str) -> bool {
    code.trim() == "1"
}

/// Unix seconds → UTC instant. `"0"`, empty or junk yield `None`.
pub fn parse_unix_ts(raw: &str) -> Option<OffsetDateTime> {
    let secs = raw.trim().parse::<i64>().ok().filter(|s| *s > 0)?;
    OffsetDateTime::from_unix_timestamp(secs).ok()
}

pub fn parse_severity(raw: &str) -> Severity {
    Severity::new(raw.trim().parse::<u8>().unwrap_or(0))
}

fn non_empty(raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}

pub fn item_from_wire(raw: RawItem) -> Option<Item> {
    if raw.itemid.trim().is_empty() {
        return None;
    }
    Some(Item {
        enabled: is_zero(&raw.status),
        in_error: is_one(&raw.state),
        last_value: non_empty(raw.lastvalue),
        id: raw.itemid,
        name: raw.name,
        key: raw.key_,
    })
}

pub fn trigger_from_wire(raw: RawTrigger) -> Option<Trigger> {
    if raw.triggerid.trim().is_empty() {
        return None;
    }
    Some(Trigger {
        enabled: is_zero(&raw.status),
        in_problem: is_one(&raw.value),
        severity: parse_severity(&raw.priority),
        last_change: parse_unix_ts(&raw.lastchange),
        id: raw.triggerid,
        description: raw.description,
    })
}

fn interface_from_wire(raw: RawInterface) -> Interface {
    Interface {
        id: raw.interfaceid,
        kind: raw.kind,
        ip: raw.ip,
        dns: raw.dns,
        port: raw.port,
    }
}

/// Convert a host. Returns `None` when the host id is missing; nested records without ids are
/// dropped individually.
pub fn host_from_wire(raw: RawHost) -> Option<Host> {
    if raw.hostid.trim().is_empty() {
        tracing::warn!(host = %raw.host, "dropping host without hostid");
        return None;
    }
    let name = if raw.name.trim().is_empty() {
        raw.host
    } else {
        raw.name
    };
    let item_count = raw.items.len();
    let trigger_count = raw.triggers.len();
    let items: Vec<Item> = raw.items.into_iter().filter_map(item_from_wire).collect();
    let triggers: Vec<Trigger> = raw
        .triggers
        .into_iter()
        .filter_map(trigger_from_wire)
        .collect();
    if items.len() != item_count || triggers.len() != trigger_count {
        tracing::warn!(
            hostid = %raw.hostid,
            dropped_items = item_count - items.len(),
            dropped_triggers = trigger_count - triggers.len(),
            "dropped nested records without ids"
        );
    }
    Some(Host {
        // Left as the raw code; unknown or missing codes render through the label fallback.
        status: raw.status.trim().to_string(),
        items,
        triggers,
        interfaces: raw.interfaces.into_iter().map(interface_from_wire).collect(),
        id: raw.hostid,
        name,
    })
}

/// Recovery event id → resolution instant.
pub fn recovery_index(events: Vec<RawRecoveryEvent>) -> BTreeMap<String, OffsetDateTime> {
    events
        .into_iter()
        .filter_map(|e| parse_unix_ts(&e.clock).map(|ts| (e.eventid, ts)))
        .collect()
}

/// Ids of recovery events worth resolving (`"0"` marks an open problem).
pub fn recovery_event_ids(events: &[RawProblemEvent]) -> Vec<String> {
    let mut ids: Vec<String> = events
        .iter()
        .map(|e| e.r_eventid.trim())
        .filter(|id| !id.is_empty() && *id != "0")
        .map(str::to_string)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Convert a problem event. Only an unparseable start clock drops the record; missing host or
/// trigger ids are passed through so the aggregator can count them as skipped.
pub fn incident_from_wire(
    raw: RawProblemEvent,
    recoveries: &BTreeMap<String, OffsetDateTime>,
) -> Option<IncidentRecord> {
    let Some(start) = parse_unix_ts(&raw.clock) else {
        tracing::warn!(eventid = %raw.eventid, clock = %raw.clock, "dropping event with bad clock");
        return None;
    };
    let r_eventid = raw.r_eventid.trim();
    let end = if r_eventid.is_empty() || r_eventid == "0" {
        None
    } else {
        let found = recoveries.get(r_eventid).copied();
        if found.is_none() {
            tracing::warn!(
                eventid = %raw.eventid,
                r_eventid,
                "recovery event not found; treating problem as open"
            );
        }
        found
    };
    // A resolved incident always carries its resolution instant.
    let open = end.is_none();
    let (host_id, host_name) = match raw.hosts.into_iter().next() {
        Some(h) => {
            let name = if h.name.trim().is_empty() { h.host } else { h.name };
            (h.hostid, name)
        }
        None => (String::new(), String::new()),
    };
    Some(IncidentRecord {
        id: raw.eventid,
        name: raw.name,
        severity: parse_severity(&raw.severity),
        start,
        end,
        host_id,
        host_name,
        trigger_id: raw.objectid,
        active: open,
    })
}
