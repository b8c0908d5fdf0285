//! Export: tabular dump of a run and a plain-text report.

use crate::{
    error::SimResult,
    record::MonthlyRecord,
    segment::Segment,
    summary::RunSummary,
};
use std::io::Write;

/// Fixed CSV header: metrics first, then every segment by full name.
pub fn csv_header() -> Vec<&'static str> {
    let mut header = vec!["Month", "Total Customers", "Monthly Revenue", "Churn Rate"];
    header.extend(Segment::ALL.iter().map(|s| s.name()));
    header
}

pub fn csv_file_name(scenario: &str) -> String {
    format!("customer_simulation_{}.csv", scenario.replace(' ', "_"))
}

pub fn report_file_name(scenario: &str) -> String {
    format!("report_{}.txt", scenario.replace(' ', "_"))
}

/// One row per month, in record order.
pub fn write_csv<W: Write>(records: &[MonthlyRecord], writer: W) -> SimResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(csv_header())?;

    for record in records {
        let mut row = vec![
            record.month.to_string(),
            record.total_customers.to_string(),
            format!("{:.2}", record.monthly_revenue),
            format!("{:.4}", record.churn_rate),
        ];
        row.extend(record.counts.iter().map(|c| c.to_string()));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Fixed decimals with thousands separators: 12345.5 -> "12,345.50".
fn grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };
    let mut out = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(&frac);
    }
    if value < 0.0 && value.abs() >= 0.5 * 10f64.powi(-(decimals as i32)) {
        out.insert(0, '-');
    }
    out
}

fn signed_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.2}%"))
}

/// Human-readable run report: summary metrics followed by change analysis.
pub fn write_report<W: Write>(scenario: &str, summary: &RunSummary, mut out: W) -> SimResult<()> {
    writeln!(out, "CUSTOMER RETENTION SIMULATION REPORT")?;
    writeln!(out, "Scenario: {scenario}")?;
    writeln!(out, "Months: {} to {}", summary.first_month, summary.last_month)?;
    writeln!(out, "{}", "-".repeat(40))?;
    writeln!(out)?;

    writeln!(out, "SUMMARY METRICS:")?;
    writeln!(out, "Initial customers: {}", grouped(summary.initial_customers as f64, 0))?;
    writeln!(out, "Final customers: {}", grouped(summary.final_customers as f64, 0))?;
    writeln!(out, "Initial monthly revenue: ${}", grouped(summary.initial_revenue, 2))?;
    writeln!(out, "Final monthly revenue: ${}", grouped(summary.final_revenue, 2))?;
    writeln!(out, "Revenue growth: {}", signed_pct(summary.revenue_growth_pct))?;
    writeln!(out, "Final churn rate: {:.2}%", summary.final_churn_rate)?;
    writeln!(out)?;

    writeln!(out, "CHANGE ANALYSIS")?;
    writeln!(out, "{}", "=".repeat(30))?;
    writeln!(out)?;

    writeln!(out, "OVERALL PERFORMANCE:")?;
    if let Some(growth) = summary.customer_growth_pct {
        let trend = if growth > 0.0 { "Growing" } else { "Shrinking" };
        writeln!(out, "- Customer base: {trend} at {:.1}% over period", growth.abs())?;
    }
    if let Some(growth) = summary.revenue_growth_pct {
        let trend = if growth > 0.0 { "Positive" } else { "Negative" };
        writeln!(out, "- Revenue trend: {trend} at {:.1}%", growth.abs())?;
    }
    if let Some(change) = summary.revenue_per_customer_change_pct {
        let trend = if change > 0.0 { "Increased" } else { "Decreased" };
        writeln!(out, "- Revenue per customer: {trend} by {:.1}%", change.abs())?;
    }
    writeln!(out)?;

    writeln!(out, "SEGMENT SHIFTS:")?;
    for change in &summary.segment_changes {
        writeln!(
            out,
            "- {}: {} -> {} ({:+}{})",
            change.segment,
            change.initial,
            change.final_,
            change.delta,
            change.percent.map_or_else(String::new, |p| format!(", {p:+.2}%")),
        )?;
    }
    if let Some((segment, pct)) = summary.fastest_growing {
        writeln!(out, "- Fastest growing: {segment} ({pct:+.1}%)")?;
    }
    if let Some((segment, pct)) = summary.fastest_declining {
        writeln!(out, "- Fastest declining: {segment} ({pct:+.1}%)")?;
    }
    writeln!(out)?;

    writeln!(out, "CHURN ANALYSIS:")?;
    writeln!(out, "- Current churn rate: {:.1}%", summary.final_churn_rate)?;
    let direction = if summary.churn_trend > 0.0 { "Accelerating" } else { "Decelerating" };
    writeln!(out, "- Churn rate trend: {direction} ({:.2}% change)", summary.churn_trend.abs())?;
    writeln!(
        out,
        "- Projected annual impact: ${} revenue at risk",
        grouped(summary.annual_revenue_at_risk, 2)
    )?;
    Ok(())
}
