use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{HostMonthlyAnalysis, IncidentRecord, PeakRecord, ValidationWarning};
use crate::error::AppError;
use crate::labels::LabelTables;
use crate::period::{DayBucketKey, ReportingPeriod};

mod peak;

/// Result of one aggregation call: per-host analyses plus the audit tallies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlyAggregation {
    pub period: ReportingPeriod,
    pub hosts: BTreeMap<String, HostMonthlyAnalysis>,
    /// Incidents folded into `hosts`.
    pub processed: i64,
    /// Malformed incidents (missing ids, end before start) that were skipped.
    pub skipped: i64,
    /// Well-formed incidents whose start lies outside the period.
    pub out_of_window: i64,
    pub warnings: Vec<ValidationWarning>,
}

impl MonthlyAggregation {
    pub fn empty(period: ReportingPeriod) -> Self {
        Self {
            period,
            hosts: BTreeMap::new(),
            processed: 0,
            skipped: 0,
            out_of_window: 0,
            warnings: Vec::new(),
        }
    }
}

fn malformed_reason(incident: &IncidentRecord) -> Option<(&'static str, &'static str)> {
    if incident.host_id.trim().is_empty() {
        return Some(("AGG_MISSING_HOST_ID", "Incident has no host id"));
    }
    if incident.trigger_id.trim().is_empty() {
        return Some(("AGG_MISSING_TRIGGER_ID", "Incident has no trigger id"));
    }
    if matches!(incident.end, Some(end) if end < incident.start) {
        return Some(("AGG_END_BEFORE_START", "Incident ends before it starts"));
    }
    None
}

/// Seconds the incident kept the host unavailable within the period. Open incidents run until
/// the end of the period.
fn unavailable_seconds(period: &ReportingPeriod, incident: &IncidentRecord) -> i64 {
    let until = match incident.end {
        Some(end) => end.min(period.end()),
        None => period.end(),
    };
    (until - incident.start).whole_seconds().max(0)
}

/// Fold one period's incidents into per-host statistics.
///
/// Incidents are processed in slice order. Counts do not depend on that order; the peak does
/// when two (trigger, day) buckets reach the same count, since the first to get there is kept.
/// Callers wanting "earliest day wins" must pass records sorted by start time.
pub fn aggregate_incidents(
    period: &ReportingPeriod,
    incidents: &[IncidentRecord],
    labels: &LabelTables,
) -> MonthlyAggregation {
    let mut out = MonthlyAggregation::empty(*period);
    let mut day_counts: BTreeMap<DayBucketKey, i64> = BTreeMap::new();

    for incident in incidents {
        if let Some((code, message)) = malformed_reason(incident) {
            tracing::warn!(incident_id = %incident.id, code, "skipping malformed incident");
            out.skipped += 1;
            out.warnings.push(
                ValidationWarning::new(code, message).with_details(format!(
                    "incident_id={}; host_id={}; trigger_id={}",
                    incident.id, incident.host_id, incident.trigger_id
                )),
            );
            continue;
        }

        let Some(key) = period.bucket_key(incident) else {
            out.out_of_window += 1;
            continue;
        };

        let analysis = out
            .hosts
            .entry(incident.host_id.clone())
            .or_insert_with(|| {
                let name = if incident.host_name.trim().is_empty() {
                    incident.host_id.clone()
                } else {
                    incident.host_name.clone()
                };
                HostMonthlyAnalysis::new(incident.host_id.clone(), name)
            });

        analysis.total_incidents += 1;
        *analysis
            .incidents_by_trigger
            .entry(incident.trigger_id.clone())
            .or_insert(0) += 1;
        if incident.active {
            analysis.limit_exceeded += 1;
        }
        analysis.unavailable_seconds = analysis
            .unavailable_seconds
            .saturating_add(unavailable_seconds(period, incident));

        let day = key.day;
        let count = day_counts.entry(key).or_insert(0);
        *count += 1;

        analysis.peak.offer(PeakRecord {
            trigger_id: incident.trigger_id.clone(),
            trigger_name: incident.name.clone(),
            day: Some(day),
            count: *count,
            severity: incident.severity.label(labels).to_string(),
        });

        out.processed += 1;
    }

    tracing::debug!(
        period = %period,
        hosts = out.hosts.len(),
        processed = out.processed,
        skipped = out.skipped,
        out_of_window = out.out_of_window,
        "aggregated incidents"
    );

    out
}

/// Combine two partial analyses of the same host.
///
/// Counts and durations are summed, per-trigger maps are unioned by summing, and `b`'s peak is
/// offered to `a`'s under the same strict-greater rule. Peaks are combined as candidates only:
/// a (trigger, day) bucket split across both inputs is not re-counted.
pub fn merge_host_analysis(
    a: &HostMonthlyAnalysis,
    b: &HostMonthlyAnalysis,
) -> Result<HostMonthlyAnalysis, AppError> {
    if a.host_id != b.host_id {
        return Err(AppError::new(
            "ANALYSIS_MERGE_HOST_MISMATCH",
            "Cannot merge analyses of different hosts",
        )
        .with_details(format!("a={}; b={}", a.host_id, b.host_id)));
    }

    let mut merged = a.clone();
    merged.total_incidents += b.total_incidents;
    merged.limit_exceeded += b.limit_exceeded;
    merged.unavailable_seconds = merged
        .unavailable_seconds
        .saturating_add(b.unavailable_seconds);
    for (trigger, count) in &b.incidents_by_trigger {
        *merged
            .incidents_by_trigger
            .entry(trigger.clone())
            .or_insert(0) += count;
    }
    if merged.host_name == merged.host_id && b.host_name != b.host_id {
        merged.host_name = b.host_name.clone();
    }
    merged.peak.offer(b.peak.clone());
    Ok(merged)
}

/// Merge-combine two aggregations of the same period produced by independent workers.
pub fn merge_aggregations(
    a: &MonthlyAggregation,
    b: &MonthlyAggregation,
) -> Result<MonthlyAggregation, AppError> {
    if a.period != b.period {
        return Err(AppError::new(
            "ANALYSIS_MERGE_PERIOD_MISMATCH",
            "Cannot merge aggregations of different periods",
        )
        .with_details(format!("a={}; b={}", a.period, b.period)));
    }

    let mut merged = a.clone();
    for (host_id, analysis) in &b.hosts {
        let combined = match merged.hosts.get(host_id) {
            Some(existing) => merge_host_analysis(existing, analysis)?,
            None => analysis.clone(),
        };
        merged.hosts.insert(host_id.clone(), combined);
    }
    merged.processed += b.processed;
    merged.skipped += b.skipped;
    merged.out_of_window += b.out_of_window;
    merged.warnings.extend(b.warnings.iter().cloned());
    Ok(merged)
}
