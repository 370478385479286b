use std::fmt;
use std::io::Write;

use time::OffsetDateTime;

use crate::analysis::{aggregate_incidents, MonthlyAggregation};
use crate::domain::{Host, IncidentRecord};
use crate::error::AppError;
use crate::labels::LabelTables;
use crate::metrics::build_report_row;
use crate::period::ReportingPeriod;
use crate::report::{write_host_report, ReportView};

/// Hosts an incident fetch is restricted to. Empty means every host the source can see.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HostScope {
    pub host_ids: Vec<String>,
}

impl HostScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn hosts<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.host_ids.is_empty()
    }
}

impl fmt::Display for HostScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            write!(f, "all hosts")
        } else {
            write!(f, "hosts [{}]", self.host_ids.join(","))
        }
    }
}

/// Upstream provider of incident records for a host scope and inclusive UTC range.
///
/// Transport or authentication failures must come back as `Err`, never as an empty list.
pub trait IncidentSource {
    fn fetch_incidents(
        &self,
        scope: &HostScope,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<IncidentRecord>, AppError>;
}

/// Upstream provider of the host inventory for the currently selected server.
pub trait HostInventory {
    fn fetch_hosts(&self) -> Result<Vec<Host>, AppError>;
}

/// Fetch one period's incidents and aggregate them. A failed fetch aborts the call; no partial
/// aggregation is returned.
pub fn run_monthly_analysis<S: IncidentSource + ?Sized>(
    source: &S,
    scope: &HostScope,
    period: &ReportingPeriod,
    labels: &LabelTables,
) -> Result<MonthlyAggregation, AppError> {
    let (start, end) = (period.start(), period.end());
    let incidents = source.fetch_incidents(scope, start, end).map_err(|e| {
        e.with_context(format!(
            "scope={scope}; period={period}; start={}; end={}",
            start.unix_timestamp(),
            end.unix_timestamp()
        ))
    })?;
    Ok(aggregate_incidents(period, &incidents, labels))
}

/// Fetch the inventory, derive per-host metrics as of `now` and render them into `sink`.
pub fn export_inventory_report<I, W>(
    inventory: &I,
    sink: &mut W,
    view: ReportView,
    labels: &LabelTables,
    now: OffsetDateTime,
) -> Result<usize, AppError>
where
    I: HostInventory + ?Sized,
    W: Write,
{
    let hosts = inventory
        .fetch_hosts()
        .map_err(|e| e.with_context("stage=inventory"))?;
    let rows: Vec<_> = hosts
        .iter()
        .map(|h| build_report_row(h, now, labels))
        .collect();
    write_host_report(sink, &rows, view)
}
