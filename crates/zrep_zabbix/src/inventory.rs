use serde::Serialize;
use zrep_core::domain::Host;
use zrep_core::error::AppError;
use zrep_core::source::HostInventory;

use crate::client::ZabbixClient;
use crate::schema::{host_from_wire, RawHost};

#[derive(Debug, Clone, Serialize)]
struct HostQuery {
    output: [&'static str; 4],
    #[serde(rename = "selectItems")]
    select_items: [&'static str; 6],
    #[serde(rename = "selectTriggers")]
    select_triggers: [&'static str; 6],
    #[serde(rename = "selectInterfaces")]
    select_interfaces: [&'static str; 5],
}

const HOST_QUERY: HostQuery = HostQuery {
    output: ["hostid", "host", "name", "status"],
    select_items: ["itemid", "name", "key_", "status", "state", "lastvalue"],
    select_triggers: [
        "triggerid",
        "description",
        "status",
        "value",
        "priority",
        "lastchange",
    ],
    select_interfaces: ["interfaceid", "type", "ip", "dns", "port"],
};

impl HostInventory for ZabbixClient {
    fn fetch_hosts(&self) -> Result<Vec<Host>, AppError> {
        tracing::info!(url = %self.config().url, "fetching host inventory");
        let raw: Vec<RawHost> = self.call("host.get", HOST_QUERY)?;
        let received = raw.len();
        let hosts: Vec<Host> = raw.into_iter().filter_map(host_from_wire).collect();
        tracing::info!(received, kept = hosts.len(), "host inventory fetched");
        Ok(hosts)
    }
}
