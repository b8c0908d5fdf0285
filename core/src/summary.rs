//! Run analytics: summary metrics and scenario comparison.
//!
//! Pure functions over a finished record sequence. Nothing here feeds
//! back into the engine.

use crate::{
    config::SimConfig,
    engine::{simulate, SimParams},
    error::SimResult,
    record::MonthlyRecord,
    segment::Segment,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentChange {
    pub segment: Segment,
    pub initial: i64,
    #[serde(rename = "final")]
    pub final_:  i64,
    pub delta:   i64,
    /// None when the segment started empty.
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub first_month:             u64,
    pub last_month:              u64,
    pub initial_customers:       i64,
    pub final_customers:         i64,
    pub customer_growth_pct:     Option<f64>,
    pub initial_revenue:         f64,
    pub final_revenue:           f64,
    pub revenue_growth_pct:      Option<f64>,
    pub revenue_per_customer_change_pct: Option<f64>,
    pub final_churn_rate:        f64,
    /// Last month's churn rate minus the one before; 0 for single-record runs.
    pub churn_trend:             f64,
    /// final revenue × final churn × 12 months.
    pub annual_revenue_at_risk:  f64,
    pub segment_changes:         Vec<SegmentChange>,
    pub fastest_growing:         Option<(Segment, f64)>,
    pub fastest_declining:       Option<(Segment, f64)>,
}

fn pct_change(from: f64, to: f64) -> Option<f64> {
    (from != 0.0).then(|| (to / from - 1.0) * 100.0)
}

impl RunSummary {
    pub fn from_records(records: &[MonthlyRecord]) -> Option<Self> {
        let first = records.first()?;
        let last = records.last()?;

        let segment_changes: Vec<SegmentChange> = Segment::ALL
            .iter()
            .map(|s| {
                let initial = first.count(*s);
                let final_ = last.count(*s);
                SegmentChange {
                    segment: *s,
                    initial,
                    final_,
                    delta: final_ - initial,
                    percent: pct_change(initial as f64, final_ as f64),
                }
            })
            .collect();

        let active_growth = segment_changes
            .iter()
            .filter(|c| !c.segment.is_terminal())
            .filter_map(|c| c.percent.map(|p| (c.segment, p)));
        let cmp = |a: &(Segment, f64), b: &(Segment, f64)| {
            a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
        };
        let fastest_growing = active_growth.clone().max_by(cmp);
        let fastest_declining = active_growth.min_by(cmp);

        let rpc = |r: &MonthlyRecord| {
            (r.total_customers > 0).then(|| r.monthly_revenue / r.total_customers as f64)
        };
        let revenue_per_customer_change_pct = match (rpc(first), rpc(last)) {
            (Some(a), Some(b)) => pct_change(a, b),
            _ => None,
        };

        let churn_trend = match records.len() {
            0 | 1 => 0.0,
            n => records[n - 1].churn_rate - records[n - 2].churn_rate,
        };

        Some(Self {
            first_month: first.month,
            last_month: last.month,
            initial_customers: first.total_customers,
            final_customers: last.total_customers,
            customer_growth_pct: pct_change(first.total_customers as f64, last.total_customers as f64),
            initial_revenue: first.monthly_revenue,
            final_revenue: last.monthly_revenue,
            revenue_growth_pct: pct_change(first.monthly_revenue, last.monthly_revenue),
            revenue_per_customer_change_pct,
            final_churn_rate: last.churn_rate,
            churn_trend,
            annual_revenue_at_risk: last.monthly_revenue * (last.churn_rate / 100.0) * 12.0,
            segment_changes,
            fastest_growing,
            fastest_declining,
        })
    }
}

/// Customers entering each month: total growth plus what churn took away.
/// Month 0 counts the whole seed population as new.
pub fn new_customer_series(records: &[MonthlyRecord]) -> Vec<i64> {
    let nr = Segment::TERMINAL;
    records
        .iter()
        .enumerate()
        .map(|(i, r)| match i {
            0 => r.total_customers,
            _ => {
                let prev = &records[i - 1];
                (r.total_customers - prev.total_customers) + (r.count(nr) - prev.count(nr))
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    pub scenario:        String,
    pub final_customers: i64,
    pub final_revenue:   f64,
    pub final_churn_rate: f64,
}

/// Run the same parameters under every scenario in the catalog.
pub fn compare_scenarios(config: &SimConfig, params: &SimParams) -> SimResult<Vec<ScenarioOutcome>> {
    params.validate(config)?;
    let mut out = Vec::with_capacity(config.catalog.scenarios().len());
    for name in config.catalog.scenario_names() {
        let run = SimParams { scenario: name.to_string(), ..params.clone() };
        let records = simulate(config, &run)?;
        if let Some(last) = records.last() {
            out.push(ScenarioOutcome {
                scenario:         name.to_string(),
                final_customers:  last.total_customers,
                final_revenue:    last.monthly_revenue,
                final_churn_rate: last.churn_rate,
            });
        }
    }
    Ok(out)
}
