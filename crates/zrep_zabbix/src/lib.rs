//! Zabbix JSON-RPC adapter: implements the engine's `IncidentSource` and `HostInventory` seams.

pub mod client;
pub mod config;
pub mod incidents;
pub mod inventory;
pub mod schema;

pub use client::ZabbixClient;
pub use config::ZabbixConfig;
