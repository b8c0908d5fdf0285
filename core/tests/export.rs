use retention_core::{
    config::SimConfig,
    engine::{simulate, SimParams},
    export::{csv_header, write_csv, write_report},
    summary::RunSummary,
};

#[test]
fn csv_has_header_and_one_row_per_month() {
    let config = SimConfig::builtin();
    let records = simulate(&config, &SimParams::new(10_000, 800, "Default", 3)).unwrap();

    let mut buf = Vec::new();
    write_csv(&records, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], csv_header().join(","));
    assert_eq!(
        lines[0],
        "Month,Total Customers,Monthly Revenue,Churn Rate,Immediate Repurchase,\
         Loyal Customer,Occasional Buyer,Discount Buyer,No Repurchase"
    );
    assert_eq!(lines[1], "0,10000,694270.83,0.0000,2500,2500,2500,2500,0");
    assert!(lines[2].starts_with("1,10800,"));
    assert!(lines[2].ends_with(",7.5000,1785,3200,2365,2700,750"));
}

#[test]
fn report_contains_every_section() {
    let config = SimConfig::builtin();
    let records = simulate(&config, &SimParams::new(10_000, 800, "New Competitor", 12)).unwrap();
    let summary = RunSummary::from_records(&records).unwrap();

    let mut buf = Vec::new();
    write_report("New Competitor", &summary, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    for section in [
        "Scenario: New Competitor",
        "SUMMARY METRICS:",
        "CHANGE ANALYSIS",
        "OVERALL PERFORMANCE:",
        "SEGMENT SHIFTS:",
        "CHURN ANALYSIS:",
        "Initial customers: 10,000",
    ] {
        assert!(text.contains(section), "report is missing '{section}':\n{text}");
    }
}
