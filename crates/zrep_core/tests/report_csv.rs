use pretty_assertions::assert_eq;
use time::macros::datetime;
use zrep_core::analysis::aggregate_incidents;
use zrep_core::domain::{Host, IncidentRecord, Interface, Item, Severity, Trigger};
use zrep_core::labels::LabelTables;
use zrep_core::metrics::{build_report_row, ReportRow};
use zrep_core::period::ReportingPeriod;
use zrep_core::report::{
    export_report_to_path, write_detailed_report, write_host_report, write_monthly_report,
    ReportView, DETAILED_HEADER, MONTHLY_HEADER, SUMMARY_HEADER,
};

fn host(id: &str, name: &str) -> Host {
    Host {
        id: id.to_string(),
        name: name.to_string(),
        status: "0".to_string(),
        items: vec![Item {
            id: "i1".to_string(),
            name: "CPU utilization".to_string(),
            key: "system.cpu.util".to_string(),
            enabled: true,
            in_error: false,
            last_value: Some("12.5".to_string()),
        }],
        triggers: vec![Trigger {
            id: "t1".to_string(),
            description: "High CPU".to_string(),
            enabled: true,
            in_problem: true,
            severity: Severity::new(4),
            last_change: Some(datetime!(2024-03-10 11:00:00 UTC)),
        }],
        interfaces: vec![Interface {
            id: "1".to_string(),
            kind: "1".to_string(),
            ip: "10.0.0.5".to_string(),
            dns: "web01".to_string(),
            port: "10050".to_string(),
        }],
    }
}

fn rows(hosts: &[Host]) -> Vec<ReportRow> {
    let now = datetime!(2024-03-10 12:00:00 UTC);
    let labels = LabelTables::default();
    hosts
        .iter()
        .map(|h| build_report_row(h, now, &labels))
        .collect()
}

fn parse(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_reader(bytes);
    rdr.records()
        .map(|r| r.expect("record").iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn n_hosts_render_n_plus_one_lines_with_matching_field_counts() {
    let hosts = vec![
        host("10084", "web01"),
        host("10085", "db; primary"),
        host("10086", "say \"hi\"\nnow"),
    ];
    let mut out = Vec::new();
    let written = write_host_report(&mut out, &rows(&hosts), ReportView::Full).expect("write");
    assert_eq!(written, 3);

    let records = parse(&out);
    assert_eq!(records.len(), 4);
    let header_len = ReportView::Full.header().len();
    assert_eq!(records[0], ReportView::Full.header());
    for rec in &records {
        assert_eq!(rec.len(), header_len);
    }
    assert_eq!(records[2][1], "db; primary");
    assert_eq!(records[3][1], "say \"hi\"\nnow");
}

#[test]
fn fields_are_quoted_only_when_needed() {
    let mut out = Vec::new();
    write_host_report(
        &mut out,
        &rows(&[host("1", "a;b"), host("2", "q\"x")]),
        ReportView::Summary,
    )
    .expect("write");
    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "Host ID;Name;Status;Availability (%);Total Items;Total Triggers"
    );
    assert_eq!(lines[1], "1;\"a;b\";Enabled;0.00;1;1");
    assert_eq!(lines[2], "2;\"q\"\"x\";Enabled;0.00;1;1");
}

#[test]
fn full_row_renders_derived_metrics() {
    let mut out = Vec::new();
    write_host_report(&mut out, &rows(&[host("10084", "web01")]), ReportView::Full).expect("write");
    let records = parse(&out);
    assert_eq!(
        records[1],
        vec![
            "10084",
            "web01",
            "Enabled",
            "0.00",
            "1",
            "1",
            "1",
            "0",
            "1",
            "1",
            "1",
            "1h 0m",
            "2024-03-10 11:00:00",
            "12.50",
            "N/A",
            "10.0.0.5 (web01)",
            "N/A",
            "N/A",
        ]
    );
}

#[test]
fn empty_host_list_renders_only_the_header() {
    let mut out = Vec::new();
    let written = write_host_report(&mut out, &[], ReportView::Summary).expect("write");
    assert_eq!(written, 0);
    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(text.lines().count(), 1);
    assert_eq!(parse(text.as_bytes())[0], SUMMARY_HEADER.to_vec());
}

#[test]
fn detailed_report_leaves_complementary_columns_blank() {
    let mut out = Vec::new();
    let written =
        write_detailed_report(&mut out, &[host("10084", "web01")], &LabelTables::default())
            .expect("write");
    assert_eq!(written, 2);
    let records = parse(&out);
    assert_eq!(records[0], DETAILED_HEADER.to_vec());

    let item_row = &records[1];
    assert_eq!(item_row[2], "item");
    assert_eq!(item_row[5], "system.cpu.util");
    assert!(item_row[8..].iter().all(String::is_empty));

    let trigger_row = &records[2];
    assert_eq!(trigger_row[2], "trigger");
    assert!(trigger_row[3..8].iter().all(String::is_empty));
    assert_eq!(trigger_row[11], "High");
    assert_eq!(trigger_row[12], "Problem");
}

#[test]
fn detailed_report_uses_injected_labels() {
    let labels = LabelTables::default()
        .with_enablement("Habilitado", "Desabilitado")
        .with_trigger_state("Problema", "OK")
        .with_severity(Severity::new(4), "Alta");
    let mut out = Vec::new();
    write_detailed_report(&mut out, &[host("10084", "web01")], &labels).expect("write");
    let records = parse(&out);

    assert_eq!(records[1][6], "Habilitado");
    assert_eq!(records[2][10], "Habilitado");
    assert_eq!(records[2][11], "Alta");
    assert_eq!(records[2][12], "Problema");
}

#[test]
fn monthly_report_renders_one_row_per_host() {
    let period = ReportingPeriod::new(2024, 3).expect("period");
    let incidents: Vec<IncidentRecord> = (0..3)
        .map(|i| IncidentRecord {
            id: i.to_string(),
            name: "Disk full on /var".to_string(),
            severity: Severity::new(5),
            start: datetime!(2024-03-06 09:00:00 UTC) + time::Duration::hours(i),
            end: Some(datetime!(2024-03-06 09:30:00 UTC) + time::Duration::hours(i)),
            host_id: "10084".to_string(),
            host_name: "web01".to_string(),
            trigger_id: "disk-full".to_string(),
            active: false,
        })
        .collect();
    let agg = aggregate_incidents(&period, &incidents, &LabelTables::default());

    let mut out = Vec::new();
    write_monthly_report(&mut out, agg.hosts.values()).expect("write");
    let records = parse(&out);
    assert_eq!(records[0], MONTHLY_HEADER.to_vec());
    assert_eq!(
        records[1],
        vec![
            "10084",
            "web01",
            "3",
            "0",
            "1",
            "1h 30m",
            "Disk full on /var",
            "2024-03-06",
            "3",
            "Disaster",
        ]
    );
}

#[test]
fn export_creates_parent_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reports").join("zabbix").join("report_main.csv");
    let written = export_report_to_path(&path, &rows(&[host("1", "a")]), ReportView::Summary)
        .expect("export");
    assert_eq!(written, 1);
    let text = std::fs::read_to_string(&path).expect("read");
    assert_eq!(text.lines().count(), 2);
}
