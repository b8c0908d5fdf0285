use retention_core::{
    config::SimConfig,
    engine::{simulate, SimParams},
    segment::Segment,
    summary::{compare_scenarios, new_customer_series, RunSummary},
};

#[test]
fn summary_reflects_first_and_last_records() {
    let config = SimConfig::builtin();
    let records = simulate(&config, &SimParams::new(10_000, 800, "Default", 3)).unwrap();
    let summary = RunSummary::from_records(&records).unwrap();

    assert_eq!(summary.first_month, 0);
    assert_eq!(summary.last_month, 3);
    assert_eq!(summary.initial_customers, 10_000);
    assert_eq!(summary.final_customers, 12_399);
    let growth = summary.customer_growth_pct.unwrap();
    assert!((growth - 23.99).abs() < 1e-9, "growth {growth}");

    let expected_trend = records[3].churn_rate - records[2].churn_rate;
    assert!((summary.churn_trend - expected_trend).abs() < 1e-12);
    assert!(summary.churn_trend < 0.0);

    let at_risk = records[3].monthly_revenue * records[3].churn_rate / 100.0 * 12.0;
    assert!((summary.annual_revenue_at_risk - at_risk).abs() < 1e-6);
}

#[test]
fn segment_changes_skip_percent_for_empty_start() {
    let config = SimConfig::builtin();
    let records = simulate(&config, &SimParams::new(10_000, 800, "Default", 3)).unwrap();
    let summary = RunSummary::from_records(&records).unwrap();

    let nr = summary
        .segment_changes
        .iter()
        .find(|c| c.segment == Segment::NoRepurchase)
        .unwrap();
    assert_eq!(nr.initial, 0);
    assert_eq!(nr.final_, 2180);
    assert_eq!(nr.delta, 2180);
    assert_eq!(nr.percent, None);

    let ir = &summary.segment_changes[0];
    assert_eq!((ir.initial, ir.final_, ir.delta), (2500, 1740, -760));

    // Loyal grows 2500 -> 3291, Immediate shrinks 2500 -> 1740.
    assert_eq!(summary.fastest_growing.map(|(s, _)| s), Some(Segment::LoyalCustomer));
    assert_eq!(summary.fastest_declining.map(|(s, _)| s), Some(Segment::ImmediateRepurchase));
}

#[test]
fn empty_run_has_no_summary() {
    assert!(RunSummary::from_records(&[]).is_none());
    assert!(new_customer_series(&[]).is_empty());
}

#[test]
fn new_customers_match_inflow_plus_churn() {
    let config = SimConfig::builtin();
    let records = simulate(&config, &SimParams::new(10_000, 800, "Default", 2)).unwrap();
    // month 1: +800 total, +750 churned
    assert_eq!(new_customer_series(&records), vec![10_000, 1_550, 1_525]);
}

#[test]
fn comparison_covers_catalog_in_order() {
    let config = SimConfig::builtin();
    let outcomes = compare_scenarios(&config, &SimParams::new(10_000, 800, "Default", 12)).unwrap();

    let names: Vec<&str> = outcomes.iter().map(|o| o.scenario.as_str()).collect();
    assert_eq!(names, config.catalog.scenario_names());

    let default = &outcomes[0];
    assert_eq!(default.final_customers, 19_602);
    let direct = simulate(&config, &SimParams::new(10_000, 800, "Default", 12)).unwrap();
    assert_eq!(default.final_revenue, direct[12].monthly_revenue);
}
