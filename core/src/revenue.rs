//! Revenue model: per-segment average monthly spend.

use crate::{
    segment::Segment,
    types::{SegmentCounts, SEGMENT_COUNT},
};

/// Average monthly spend per customer, in `Segment::ALL` order.
pub const MONTHLY_SPEND: [f64; SEGMENT_COUNT] = [
    1120.0 / 12.0,       // Immediate Repurchase
    (165.0 * 6.5) / 12.0, // Loyal: $165/purchase, ~6.5 purchases/year
    (190.0 * 3.5) / 12.0, // Occasional: $190/purchase, 3–4 purchases/year
    (95.0 * 5.0) / 12.0,  // Discount: $95/purchase, 4–6 purchases/year
    0.0,                  // No Repurchase
];

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueModel {
    monthly_spend: [f64; SEGMENT_COUNT],
}

impl Default for RevenueModel {
    fn default() -> Self {
        Self { monthly_spend: MONTHLY_SPEND }
    }
}

impl RevenueModel {
    /// Spend values must be finite and non-negative; checked by the config loader.
    pub fn new(monthly_spend: [f64; SEGMENT_COUNT]) -> Self {
        Self { monthly_spend }
    }

    pub fn spend(&self, segment: Segment) -> f64 {
        self.monthly_spend[segment.index()]
    }

    /// Monthly revenue for a population vector.
    pub fn revenue(&self, counts: &SegmentCounts) -> f64 {
        counts
            .iter()
            .zip(self.monthly_spend.iter())
            .map(|(count, spend)| *count as f64 * spend)
            .sum()
    }
}
