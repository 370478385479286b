use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::domain::{Host, Interface, Item, Trigger};
use crate::labels::LabelTables;

pub const NOT_APPLICABLE: &str = "N/A";

const RECENT_PROBLEM_WINDOW: Duration = Duration::hours(24);

/// Flattened, presentation-ready fields for one host. Produced here, consumed by the renderer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct ReportRow {
    pub host_id: String,
    pub name: String,
    pub status: String,
    pub availability_pct: f64,
    pub total_items: i64,
    pub active_items: i64,
    pub degraded_items: i64,
    pub total_triggers: i64,
    pub active_triggers: i64,
    pub problem_triggers: i64,
    pub recent_problems: i64,
    pub mean_time_to_resolution: String,
    pub last_change: String,
    pub cpu_pct: Option<f64>,
    pub memory_pct: Option<f64>,
    pub primary_interface: String,
    pub traffic_in: String,
    pub traffic_out: String,
}

pub fn count_active_items(items: &[Item]) -> i64 {
    items.iter().filter(|i| i.enabled).count() as i64
}

pub fn count_degraded_items(items: &[Item]) -> i64 {
    items.iter().filter(|i| i.in_error).count() as i64
}

pub fn count_active_triggers(triggers: &[Trigger]) -> i64 {
    triggers.iter().filter(|t| t.enabled).count() as i64
}

pub fn count_problem_triggers(triggers: &[Trigger]) -> i64 {
    triggers.iter().filter(|t| t.in_problem).count() as i64
}

/// Percentage of triggers not currently in a problem state; 100.0 when there are no triggers.
pub fn availability_ratio(triggers: &[Trigger]) -> f64 {
    if triggers.is_empty() {
        return 100.0;
    }
    let total = triggers.len() as f64;
    let problems = count_problem_triggers(triggers) as f64;
    (100.0 * (1.0 - problems / total)).clamp(0.0, 100.0)
}

/// Average of `now - last_change` over triggers that carry a timestamp, rounded to the nearest
/// minute and returned in seconds. Future timestamps count as zero.
pub fn mean_time_to_resolution(triggers: &[Trigger], now: OffsetDateTime) -> Option<i64> {
    let samples: Vec<i128> = triggers
        .iter()
        .filter_map(|t| t.last_change)
        .map(|changed| (now - changed).whole_seconds().max(0) as i128)
        .collect();
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as i128;
    let total: i128 = samples.iter().sum();
    let minutes = (total + n * 30) / (n * 60);
    Some(std::cmp::min(minutes * 60, i64::MAX as i128) as i64)
}

/// Problem triggers whose state changed within the last 24 hours.
pub fn count_recent_problems(triggers: &[Trigger], now: OffsetDateTime) -> i64 {
    let since = now - RECENT_PROBLEM_WINDOW;
    triggers
        .iter()
        .filter(|t| t.in_problem)
        .filter(|t| matches!(t.last_change, Some(c) if c >= since && c <= now))
        .count() as i64
}

pub fn latest_change(triggers: &[Trigger]) -> Option<OffsetDateTime> {
    triggers.iter().filter_map(|t| t.last_change).max()
}

/// `"IP (DNS)"` of the first interface, or `N/A` when the host has none.
pub fn primary_interface_label(interfaces: &[Interface]) -> String {
    match interfaces.first() {
        Some(iface) => format!("{} ({})", iface.ip, iface.dns),
        None => NOT_APPLICABLE.to_string(),
    }
}

fn parse_last_value(item: &Item) -> Option<f64> {
    item.last_value
        .as_deref()
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Mean last value over enabled items whose key satisfies `matches`; unparseable values are
/// ignored.
fn mean_item_value(items: &[Item], matches: impl Fn(&str) -> bool) -> Option<f64> {
    let values: Vec<f64> = items
        .iter()
        .filter(|i| i.enabled && matches(&i.key))
        .filter_map(parse_last_value)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn cpu_utilisation(items: &[Item]) -> Option<f64> {
    mean_item_value(items, |k| k.starts_with("system.cpu.util"))
}

pub fn memory_utilisation(items: &[Item]) -> Option<f64> {
    mean_item_value(items, |k| {
        k.starts_with("vm.memory.util") || k == "vm.memory.size[pused]"
    })
}

pub fn traffic_in(items: &[Item]) -> Option<f64> {
    mean_item_value(items, |k| k.starts_with("net.if.in["))
}

pub fn traffic_out(items: &[Item]) -> Option<f64> {
    mean_item_value(items, |k| k.starts_with("net.if.out["))
}

pub fn format_traffic(bytes_per_sec: Option<f64>) -> String {
    let Some(mut v) = bytes_per_sec else {
        return NOT_APPLICABLE.to_string();
    };
    let mut unit = "B/s";
    for next in ["KB/s", "MB/s", "GB/s"] {
        if v.abs() < 1024.0 {
            break;
        }
        v /= 1024.0;
        unit = next;
    }
    format!("{v:.2} {unit}")
}

pub fn format_duration_seconds(secs: Option<i64>) -> String {
    match secs {
        None => NOT_APPLICABLE.to_string(),
        Some(s) => {
            let minutes = s / 60;
            let rem = s % 60;
            if minutes >= 60 {
                let hours = minutes / 60;
                let m = minutes % 60;
                format!("{hours}h {m}m")
            } else if minutes > 0 && rem == 0 {
                format!("{minutes}m")
            } else if minutes > 0 {
                format!("{minutes}m {rem}s")
            } else {
                format!("{rem}s")
            }
        }
    }
}

pub fn format_timestamp(at: Option<OffsetDateTime>) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.and_then(|t| t.to_offset(UtcOffset::UTC).format(&fmt).ok())
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

/// Derive every report field for `host` as of `now`. Never fails: missing inputs degrade to zero
/// or `N/A`.
pub fn build_report_row(host: &Host, now: OffsetDateTime, labels: &LabelTables) -> ReportRow {
    ReportRow {
        host_id: host.id.clone(),
        name: host.name.clone(),
        status: labels.host_status(&host.status).to_string(),
        availability_pct: availability_ratio(&host.triggers),
        total_items: host.items.len() as i64,
        active_items: count_active_items(&host.items),
        degraded_items: count_degraded_items(&host.items),
        total_triggers: host.triggers.len() as i64,
        active_triggers: count_active_triggers(&host.triggers),
        problem_triggers: count_problem_triggers(&host.triggers),
        recent_problems: count_recent_problems(&host.triggers, now),
        mean_time_to_resolution: format_duration_seconds(mean_time_to_resolution(
            &host.triggers,
            now,
        )),
        last_change: format_timestamp(latest_change(&host.triggers)),
        cpu_pct: cpu_utilisation(&host.items),
        memory_pct: memory_utilisation(&host.items),
        primary_interface: primary_interface_label(&host.interfaces),
        traffic_in: format_traffic(traffic_in(&host.items)),
        traffic_out: format_traffic(traffic_out(&host.items)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;
    use time::macros::datetime;

    fn trigger(in_problem: bool, last_change: Option<OffsetDateTime>) -> Trigger {
        Trigger {
            id: "t".to_string(),
            description: "t".to_string(),
            enabled: true,
            in_problem,
            severity: Severity::new(3),
            last_change,
        }
    }

    fn item(key: &str, last_value: &str) -> Item {
        Item {
            id: key.to_string(),
            name: key.to_string(),
            key: key.to_string(),
            enabled: true,
            in_error: false,
            last_value: Some(last_value.to_string()),
        }
    }

    #[test]
    fn availability_is_bounded() {
        assert_eq!(availability_ratio(&[]), 100.0);
        let all_down = vec![trigger(true, None), trigger(true, None)];
        assert_eq!(availability_ratio(&all_down), 0.0);
        let half = vec![trigger(true, None), trigger(false, None)];
        assert_eq!(availability_ratio(&half), 50.0);
    }

    #[test]
    fn mttr_rounds_to_nearest_minute() {
        let now = datetime!(2024-03-10 12:00:00 UTC);
        assert_eq!(mean_time_to_resolution(&[trigger(false, None)], now), None);

        // 89s and 31s average to 60s.
        let ts = vec![
            trigger(false, Some(now - Duration::seconds(89))),
            trigger(false, Some(now - Duration::seconds(31))),
            trigger(false, None),
        ];
        assert_eq!(mean_time_to_resolution(&ts, now), Some(60));

        // 90s rounds half up to 2 minutes.
        let half = vec![trigger(false, Some(now - Duration::seconds(90)))];
        assert_eq!(mean_time_to_resolution(&half, now), Some(120));

        let future = vec![trigger(false, Some(now + Duration::hours(1)))];
        assert_eq!(mean_time_to_resolution(&future, now), Some(0));
    }

    #[test]
    fn recent_problems_only_count_last_day() {
        let now = datetime!(2024-03-10 12:00:00 UTC);
        let ts = vec![
            trigger(true, Some(now - Duration::hours(2))),
            trigger(true, Some(now - Duration::hours(30))),
            trigger(false, Some(now - Duration::hours(1))),
            trigger(true, None),
        ];
        assert_eq!(count_recent_problems(&ts, now), 1);
    }

    #[test]
    fn item_values_feed_performance_columns() {
        let items = vec![
            item("system.cpu.util", "40"),
            item("system.cpu.util[,user]", "60"),
            item("vm.memory.size[pused]", "67.8"),
            item("net.if.in[eth0]", "2048"),
            item("net.if.out[eth0]", "not-a-number"),
        ];
        assert_eq!(cpu_utilisation(&items), Some(50.0));
        assert_eq!(memory_utilisation(&items), Some(67.8));
        assert_eq!(format_traffic(traffic_in(&items)), "2.00 KB/s");
        assert_eq!(format_traffic(traffic_out(&items)), NOT_APPLICABLE);
        assert_eq!(format_traffic(Some(512.0)), "512.00 B/s");
        assert_eq!(format_traffic(Some(3.0 * 1024.0 * 1024.0 * 1024.0)), "3.00 GB/s");
    }

    #[test]
    fn disabled_items_do_not_feed_performance_columns() {
        let mut stale = item("system.cpu.util", "95");
        stale.enabled = false;
        assert_eq!(cpu_utilisation(&[stale.clone()]), None);
        assert_eq!(cpu_utilisation(&[stale, item("system.cpu.util", "15")]), Some(15.0));
    }

    #[test]
    fn durations_are_human_readable() {
        assert_eq!(format_duration_seconds(None), NOT_APPLICABLE);
        assert_eq!(format_duration_seconds(Some(45)), "45s");
        assert_eq!(format_duration_seconds(Some(45 * 60)), "45m");
        assert_eq!(format_duration_seconds(Some(61)), "1m 1s");
        assert_eq!(format_duration_seconds(Some(90 * 60)), "1h 30m");
    }

    #[test]
    fn interface_label_and_timestamp_sentinels() {
        assert_eq!(primary_interface_label(&[]), NOT_APPLICABLE);
        let iface = Interface {
            id: "1".to_string(),
            kind: "1".to_string(),
            ip: "10.0.0.5".to_string(),
            dns: "web01.local".to_string(),
            port: "10050".to_string(),
        };
        assert_eq!(primary_interface_label(&[iface]), "10.0.0.5 (web01.local)");
        assert_eq!(format_timestamp(None), NOT_APPLICABLE);
        assert_eq!(
            format_timestamp(Some(datetime!(2024-03-05 10:00:00 +02:00))),
            "2024-03-05 08:00:00"
        );
    }
}
