//! Monthly records: the externally visible output of a run.
//!
//! A record is built once per step and never mutated. Serialization is a
//! pure projection: every segment count is written under all three key
//! conventions, and every metric under both its spaced and underscored key.

use crate::{
    segment::{KeyConvention, Segment},
    types::{Month, SegmentCounts},
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::{Map, Value};

pub const MONTH_KEY: &str = "Month";
pub const TOTAL_CUSTOMERS_KEYS: [&str; 2] = ["Total Customers", "Total_Customers"];
pub const MONTHLY_REVENUE_KEYS: [&str; 2] = ["Monthly Revenue", "Monthly_Revenue"];
pub const CHURN_RATE_KEYS: [&str; 2] = ["Churn Rate", "Churn_Rate"];

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRecord {
    pub month:           Month,
    pub counts:          SegmentCounts,
    pub total_customers: i64,
    pub monthly_revenue: f64,
    /// Percent of last month's active base that moved into churn this month.
    pub churn_rate:      f64,
}

impl MonthlyRecord {
    pub fn count(&self, segment: Segment) -> i64 {
        self.counts[segment.index()]
    }

    pub fn active_customers(&self) -> i64 {
        Segment::ACTIVE.iter().map(|s| self.count(*s)).sum()
    }

    /// Copy of this record with a different month index.
    pub fn renumbered(&self, month: Month) -> Self {
        Self { month, ..self.clone() }
    }

    /// Project into the redundant-key JSON object consumed downstream.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(MONTH_KEY.into(), Value::from(self.month));
        for key in TOTAL_CUSTOMERS_KEYS {
            out.insert(key.into(), Value::from(self.total_customers));
        }
        for key in MONTHLY_REVENUE_KEYS {
            out.insert(key.into(), Value::from(self.monthly_revenue));
        }
        for key in CHURN_RATE_KEYS {
            out.insert(key.into(), Value::from(self.churn_rate));
        }
        for segment in Segment::ALL {
            for convention in KeyConvention::PRIORITY {
                out.insert(segment.key(convention).into(), Value::from(self.count(segment)));
            }
        }
        out
    }
}

impl Serialize for MonthlyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let projected = self.to_json();
        let mut map = serializer.serialize_map(Some(projected.len()))?;
        for (key, value) in &projected {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Project a whole run, preserving order.
pub fn records_to_json(records: &[MonthlyRecord]) -> Vec<Value> {
    records.iter().map(|r| Value::Object(r.to_json())).collect()
}
