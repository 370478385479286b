use std::fs;
use std::io::Write;
use std::path::Path;

use crate::domain::{Host, HostMonthlyAnalysis};
use crate::error::AppError;
use crate::labels::LabelTables;
use crate::metrics::{format_duration_seconds, format_timestamp, ReportRow, NOT_APPLICABLE};

pub const FIELD_DELIMITER: u8 = b';';

/// Base columns shared by every host report view. Positional consumers may rely on this prefix.
pub const SUMMARY_HEADER: [&str; 6] = [
    "Host ID",
    "Name",
    "Status",
    "Availability (%)",
    "Total Items",
    "Total Triggers",
];

/// Columns appended after `SUMMARY_HEADER` by the full view.
pub const FULL_EXTRA_HEADER: [&str; 12] = [
    "Active Items",
    "Items In Error",
    "Active Triggers",
    "Triggers In Problem",
    "Recent Problems (24h)",
    "Mean Time To Resolution",
    "Last Change",
    "CPU (%)",
    "Memory (%)",
    "Primary Interface",
    "Traffic In",
    "Traffic Out",
];

pub const DETAILED_HEADER: [&str; 14] = [
    "Host ID",
    "Host Name",
    "Record Type",
    "Item ID",
    "Item Name",
    "Item Key",
    "Item Status",
    "Item Last Value",
    "Trigger ID",
    "Trigger Description",
    "Trigger Status",
    "Trigger Severity",
    "Trigger State",
    "Trigger Last Change",
];

pub const MONTHLY_HEADER: [&str; 10] = [
    "Host ID",
    "Host Name",
    "Total Incidents",
    "Limit Exceeded",
    "Distinct Triggers",
    "Unavailable",
    "Peak Trigger",
    "Peak Day",
    "Peak Count",
    "Peak Severity",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReportView {
    Summary,
    Full,
}

impl ReportView {
    pub fn header(self) -> Vec<&'static str> {
        match self {
            ReportView::Summary => SUMMARY_HEADER.to_vec(),
            ReportView::Full => SUMMARY_HEADER
                .iter()
                .chain(FULL_EXTRA_HEADER.iter())
                .copied()
                .collect(),
        }
    }
}

fn format_pct(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}"),
        None => NOT_APPLICABLE.to_string(),
    }
}

impl ReportRow {
    /// Cells in header order for `view`.
    pub fn cells(&self, view: ReportView) -> Vec<String> {
        let mut cells = vec![
            self.host_id.clone(),
            self.name.clone(),
            self.status.clone(),
            format!("{:.2}", self.availability_pct),
            self.total_items.to_string(),
            self.total_triggers.to_string(),
        ];
        if view == ReportView::Full {
            cells.extend([
                self.active_items.to_string(),
                self.degraded_items.to_string(),
                self.active_triggers.to_string(),
                self.problem_triggers.to_string(),
                self.recent_problems.to_string(),
                self.mean_time_to_resolution.clone(),
                self.last_change.clone(),
                format_pct(self.cpu_pct),
                format_pct(self.memory_pct),
                self.primary_interface.clone(),
                self.traffic_in.clone(),
                self.traffic_out.clone(),
            ]);
        }
        cells
    }
}

/// Write `header` then every row, in order, to `sink`.
///
/// Each record is flushed before the next is produced so a sink failure is reported against the
/// row that hit it (`row_index` is 0-based over data rows). The sink is neither opened nor closed
/// here; discarding partial output is the caller's job. Returns the number of data rows written.
pub fn write_table<W, I>(sink: &mut W, header: &[&str], rows: I) -> Result<usize, AppError>
where
    W: Write,
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .from_writer(sink);

    wtr.write_record(header)
        .and_then(|_| wtr.flush().map_err(csv::Error::from))
        .map_err(|e| {
            AppError::new("REPORT_HEADER_WRITE_FAILED", "Failed to write report header")
                .with_details(e.to_string())
        })?;

    let mut written = 0usize;
    for (idx, row) in rows.into_iter().enumerate() {
        wtr.write_record(&row)
            .and_then(|_| wtr.flush().map_err(csv::Error::from))
            .map_err(|e| {
                AppError::new("REPORT_ROW_WRITE_FAILED", "Failed to write report row")
                    .with_details(format!("row_index={idx}; err={e}"))
            })?;
        written += 1;
    }

    tracing::debug!(rows = written, columns = header.len(), "report written");
    Ok(written)
}

pub fn write_host_report<W: Write>(
    sink: &mut W,
    rows: &[ReportRow],
    view: ReportView,
) -> Result<usize, AppError> {
    write_table(sink, &view.header(), rows.iter().map(|r| r.cells(view)))
}

/// One row per (host, item) followed by one row per (host, trigger); the columns belonging to
/// the other record type are left blank.
pub fn detailed_rows(hosts: &[Host], labels: &LabelTables) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for host in hosts {
        for item in &host.items {
            let mut row = vec![
                host.id.clone(),
                host.name.clone(),
                "item".to_string(),
                item.id.clone(),
                item.name.clone(),
                item.key.clone(),
                labels.enablement(item.enabled).to_string(),
                item.last_value.clone().unwrap_or_default(),
            ];
            row.resize(DETAILED_HEADER.len(), String::new());
            rows.push(row);
        }
        for trigger in &host.triggers {
            let mut row = vec![host.id.clone(), host.name.clone(), "trigger".to_string()];
            row.resize(8, String::new());
            row.extend([
                trigger.id.clone(),
                trigger.description.clone(),
                labels.enablement(trigger.enabled).to_string(),
                trigger.severity.label(labels).to_string(),
                labels.trigger_state(trigger.in_problem).to_string(),
                format_timestamp(trigger.last_change),
            ]);
            rows.push(row);
        }
    }
    rows
}

pub fn write_detailed_report<W: Write>(
    sink: &mut W,
    hosts: &[Host],
    labels: &LabelTables,
) -> Result<usize, AppError> {
    write_table(sink, &DETAILED_HEADER, detailed_rows(hosts, labels))
}

pub fn monthly_row(analysis: &HostMonthlyAnalysis) -> Vec<String> {
    let peak = &analysis.peak;
    let (trigger, day, severity) = if peak.is_empty() {
        (String::new(), String::new(), String::new())
    } else {
        (
            peak.trigger_name.clone(),
            peak.day.map(|d| d.to_string()).unwrap_or_default(),
            peak.severity.clone(),
        )
    };
    vec![
        analysis.host_id.clone(),
        analysis.host_name.clone(),
        analysis.total_incidents.to_string(),
        analysis.limit_exceeded.to_string(),
        analysis.incidents_by_trigger.len().to_string(),
        format_duration_seconds(Some(analysis.unavailable_seconds)),
        trigger,
        day,
        peak.count.to_string(),
        severity,
    ]
}

pub fn write_monthly_report<'a, W, I>(sink: &mut W, analyses: I) -> Result<usize, AppError>
where
    W: Write,
    I: IntoIterator<Item = &'a HostMonthlyAnalysis>,
{
    write_table(sink, &MONTHLY_HEADER, analyses.into_iter().map(monthly_row))
}

/// Create `path` (and its parent directories) and write a host report into it.
pub fn export_report_to_path(
    path: &Path,
    rows: &[ReportRow],
    view: ReportView,
) -> Result<usize, AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::new("REPORT_MKDIR_FAILED", "Failed to create report directory")
                .with_details(format!("path={}: {}", dir.display(), e))
        })?;
    }
    let mut file = fs::File::create(path).map_err(|e| {
        AppError::new("REPORT_FILE_CREATE_FAILED", "Failed to create report file")
            .with_details(format!("path={}: {}", path.display(), e))
    })?;
    write_host_report(&mut file, rows, view)
        .map_err(|e| e.with_context(format!("path={}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct FailAfter {
        remaining: usize,
    }

    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            self.remaining -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn row(id: &str) -> ReportRow {
        ReportRow {
            host_id: id.to_string(),
            name: format!("host-{id}"),
            status: "Enabled".to_string(),
            availability_pct: 100.0,
            total_items: 0,
            active_items: 0,
            degraded_items: 0,
            total_triggers: 0,
            active_triggers: 0,
            problem_triggers: 0,
            recent_problems: 0,
            mean_time_to_resolution: NOT_APPLICABLE.to_string(),
            last_change: NOT_APPLICABLE.to_string(),
            cpu_pct: None,
            memory_pct: None,
            primary_interface: NOT_APPLICABLE.to_string(),
            traffic_in: NOT_APPLICABLE.to_string(),
            traffic_out: NOT_APPLICABLE.to_string(),
        }
    }

    #[test]
    fn summary_header_is_prefix_of_full() {
        let full = ReportView::Full.header();
        assert_eq!(&full[..SUMMARY_HEADER.len()], &SUMMARY_HEADER[..]);
        assert_eq!(full.len(), 18);
        assert_eq!(row("1").cells(ReportView::Full).len(), full.len());
        assert_eq!(row("1").cells(ReportView::Summary).len(), SUMMARY_HEADER.len());
    }

    #[test]
    fn sink_failure_reports_row_index() {
        // Header plus first row succeed; the second data row hits the failure.
        let mut sink = FailAfter { remaining: 2 };
        let rows = [row("1"), row("2"), row("3")];
        let err = write_host_report(&mut sink, &rows, ReportView::Summary).unwrap_err();
        assert_eq!(err.code, "REPORT_ROW_WRITE_FAILED");
        assert!(err.details.unwrap_or_default().starts_with("row_index=1;"));
    }

    #[test]
    fn header_failure_is_distinct() {
        let mut sink = FailAfter { remaining: 0 };
        let err = write_host_report(&mut sink, &[], ReportView::Full).unwrap_err();
        assert_eq!(err.code, "REPORT_HEADER_WRITE_FAILED");
    }
}
