//! The simulation engine, the heart of the retention model.
//!
//! STEP ORDER (fixed, documented, never reordered):
//!   1. Transition:  next[j] = Σ_i counts[i] · P[i][j]   (dense, f64)
//!   2. Inflow:      next += new_customers · acquisition  (after transition)
//!   3. Rounding:    round half to even, once, on the stored counts
//!   4. Metrics:     total, revenue, churn rate vs. the previous month
//!   5. Emit the record and advance the month
//!
//! RULES:
//!   - The state is owned by exactly one engine and mutated only by step().
//!   - Intermediate values stay in f64; rounding before summation is forbidden.
//!   - Parameters are validated before any state is computed.
//!   - A run yields every record or an error, never a prefix.

use crate::{
    catalog::TransitionMatrix,
    config::SimConfig,
    error::{SimError, SimResult},
    record::MonthlyRecord,
    segment::Segment,
    steady_state::steady_state,
    types::{Distribution, Month, SegmentCounts, SEGMENT_COUNT},
};

/// Equal split across the active segments, nobody churned.
pub const DEFAULT_INITIAL_DISTRIBUTION: Distribution = [0.25, 0.25, 0.25, 0.25, 0.0];

const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Ceilings on caller input. With these, population + months × inflow stays
/// far below `i64::MAX` and inside the range where f64 counts are exact.
pub const MAX_POPULATION: i64 = 1_000_000_000_000;
pub const MAX_NEW_CUSTOMERS_PER_MONTH: i64 = 1_000_000_000_000;
pub const MAX_MONTHS: i64 = 1_200;

/// Caller-supplied parameters for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub initial_population:      i64,
    pub new_customers_per_month: i64,
    pub scenario:                String,
    pub months:                  i64,
    pub initial_distribution:    Distribution,
}

impl SimParams {
    pub fn new(
        initial_population: i64,
        new_customers_per_month: i64,
        scenario: impl Into<String>,
        months: i64,
    ) -> Self {
        Self {
            initial_population,
            new_customers_per_month,
            scenario: scenario.into(),
            months,
            initial_distribution: DEFAULT_INITIAL_DISTRIBUTION,
        }
    }

    pub fn with_initial_distribution(mut self, distribution: Distribution) -> Self {
        self.initial_distribution = distribution;
        self
    }

    /// Reject bad input before anything is computed.
    pub fn validate(&self, config: &SimConfig) -> SimResult<()> {
        config.catalog.transition_matrix_for(&self.scenario)?;
        if self.initial_population <= 0 {
            return Err(SimError::InvalidParameters(format!(
                "initial population must be positive, got {}",
                self.initial_population
            )));
        }
        validate_population(self.initial_population)?;
        validate_run_shape(self.new_customers_per_month, self.months)?;
        validate_distribution(&self.initial_distribution)
    }
}

pub(crate) fn validate_population(population: i64) -> SimResult<()> {
    if !(0..=MAX_POPULATION).contains(&population) {
        return Err(SimError::InvalidParameters(format!(
            "population must be between 0 and {MAX_POPULATION}, got {population}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_run_shape(new_customers_per_month: i64, months: i64) -> SimResult<()> {
    if new_customers_per_month < 0 {
        return Err(SimError::InvalidParameters(format!(
            "new customers per month must not be negative, got {new_customers_per_month}"
        )));
    }
    if new_customers_per_month > MAX_NEW_CUSTOMERS_PER_MONTH {
        return Err(SimError::InvalidParameters(format!(
            "new customers per month must not exceed {MAX_NEW_CUSTOMERS_PER_MONTH}, got {new_customers_per_month}"
        )));
    }
    if months <= 0 {
        return Err(SimError::InvalidParameters(format!(
            "months must be positive, got {months}"
        )));
    }
    if months > MAX_MONTHS {
        return Err(SimError::InvalidParameters(format!(
            "months must not exceed {MAX_MONTHS}, got {months}"
        )));
    }
    Ok(())
}

/// Shares only: finite and non-negative. Rehydrated seeds may sum above 1
/// when the prior counts were fractional.
fn validate_shares(distribution: &Distribution) -> SimResult<()> {
    if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(SimError::InvalidParameters(format!(
            "initial distribution must be finite and non-negative, got {distribution:?}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_distribution(distribution: &Distribution) -> SimResult<()> {
    validate_shares(distribution)?;
    let sum: f64 = distribution.iter().sum();
    if sum > 1.0 + DISTRIBUTION_TOLERANCE {
        return Err(SimError::InvalidParameters(format!(
            "initial distribution sums to {sum}, more than 1"
        )));
    }
    Ok(())
}

/// Current month and per-segment counts of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimState {
    month:  Month,
    counts: SegmentCounts,
}

impl SimState {
    pub fn month(&self) -> Month {
        self.month
    }

    pub fn counts(&self) -> &SegmentCounts {
        &self.counts
    }

    pub fn total(&self) -> i64 {
        self.counts.iter().sum()
    }

    pub fn active(&self) -> i64 {
        Segment::ACTIVE.iter().map(|s| self.counts[s.index()]).sum()
    }
}

pub struct SimEngine<'a> {
    config:   &'a SimConfig,
    scenario: String,
    matrix:   &'a TransitionMatrix,
    inflow:   f64,
    state:    SimState,
    records:  Vec<MonthlyRecord>,
}

impl<'a> SimEngine<'a> {
    /// Validate `params`, seed the month-0 state and emit its record.
    pub fn new(config: &'a SimConfig, params: &SimParams) -> SimResult<Self> {
        params.validate(config)?;
        Self::seeded(
            config,
            &params.scenario,
            params.new_customers_per_month,
            params.initial_population,
            &params.initial_distribution,
        )
    }

    /// Seed without the positive-population check. Used by the extension
    /// path, where an empty prior state is a legal (if dull) starting point.
    pub(crate) fn seeded(
        config: &'a SimConfig,
        scenario: &str,
        new_customers_per_month: i64,
        population: i64,
        distribution: &Distribution,
    ) -> SimResult<Self> {
        let matrix = config.catalog.transition_matrix_for(scenario)?;
        validate_population(population)?;
        if !(0..=MAX_NEW_CUSTOMERS_PER_MONTH).contains(&new_customers_per_month) {
            return Err(SimError::InvalidParameters(format!(
                "new customers per month must be between 0 and {MAX_NEW_CUSTOMERS_PER_MONTH}, got {new_customers_per_month}"
            )));
        }
        validate_shares(distribution)?;

        if log::log_enabled!(log::Level::Debug) {
            match steady_state(matrix) {
                Ok(ss) => log::debug!("scenario '{scenario}': active steady state {ss:?}"),
                Err(e) => log::debug!("scenario '{scenario}': steady state unavailable: {e}"),
            }
        }

        let mut seed = [0.0; SEGMENT_COUNT];
        for (slot, share) in seed.iter_mut().zip(distribution.iter()) {
            *slot = share * population as f64;
        }
        let counts = round_counts(&seed, 0)?;
        let state = SimState { month: 0, counts };

        let mut engine = Self {
            config,
            scenario: scenario.to_string(),
            matrix,
            inflow: new_customers_per_month as f64,
            records: Vec::new(),
            state,
        };
        let seed_record = engine.record_for(&engine.state, 0.0);
        engine.records.push(seed_record);
        log::debug!(
            "month=0 engine: seeded '{}' with {} customers",
            engine.scenario,
            engine.state.total()
        );
        Ok(engine)
    }

    /// Advance one month. This is the core simulation step.
    pub fn step(&mut self) -> SimResult<&MonthlyRecord> {
        let month = self.state.month + 1;
        let acquisition = self.config.catalog.acquisition_distribution();
        let rows = self.matrix.rows();

        // 1. Transition.
        let mut next = [0.0f64; SEGMENT_COUNT];
        for (i, row) in rows.iter().enumerate() {
            let from = self.state.counts[i] as f64;
            for (j, p) in row.iter().enumerate() {
                next[j] += from * p;
            }
        }

        // 2. Inflow.
        for (slot, share) in next.iter_mut().zip(acquisition.iter()) {
            *slot += self.inflow * share;
        }

        // 3. Rounding.
        let counts = round_counts(&next, month)?;

        // 4. Churn flow relative to last month's active base.
        let terminal = Segment::TERMINAL.index();
        let newly_churned = counts[terminal] - self.state.counts[terminal];
        let active_before = self.state.active();
        let churn_rate = if active_before > 0 {
            newly_churned as f64 / active_before as f64 * 100.0
        } else {
            0.0
        };

        // 5. Emit, then advance. A failed month leaves the state untouched.
        let next_state = SimState { month, counts };
        let record = self.record_for(&next_state, churn_rate);
        if !record.monthly_revenue.is_finite() {
            return Err(SimError::Computation {
                month,
                detail: format!("non-finite revenue {}", record.monthly_revenue),
            });
        }
        log::debug!(
            "month={month} engine: total={} revenue={:.2} churn={:.2}%",
            record.total_customers,
            record.monthly_revenue,
            record.churn_rate,
        );
        self.state = next_state;
        self.records.push(record);
        self.records.last().ok_or_else(|| SimError::Computation {
            month,
            detail: "record was not stored".into(),
        })
    }

    /// Apply step() `n` times.
    pub fn run_months(&mut self, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn records(&self) -> &[MonthlyRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MonthlyRecord> {
        self.records
    }

    fn record_for(&self, state: &SimState, churn_rate: f64) -> MonthlyRecord {
        MonthlyRecord {
            month:           state.month,
            counts:          state.counts,
            total_customers: state.total(),
            monthly_revenue: self.config.revenue.revenue(&state.counts),
            churn_rate,
        }
    }
}

/// Run a fresh simulation: `months + 1` records, month 0 being the seed.
pub fn simulate(config: &SimConfig, params: &SimParams) -> SimResult<Vec<MonthlyRecord>> {
    let mut engine = SimEngine::new(config, params)?;
    engine.run_months(params.months as u64)?;
    let records = engine.into_records();
    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        log::info!(
            "simulate '{}': {} months, customers {} -> {}, revenue {:.2} -> {:.2}",
            params.scenario,
            params.months,
            first.total_customers,
            last.total_customers,
            first.monthly_revenue,
            last.monthly_revenue,
        );
    }
    Ok(records)
}

/// Round half to even, rejecting anything that cannot be a head count.
fn round_counts(values: &[f64; SEGMENT_COUNT], month: Month) -> SimResult<SegmentCounts> {
    let mut counts = [0i64; SEGMENT_COUNT];
    for (segment, (slot, value)) in Segment::ALL.iter().zip(counts.iter_mut().zip(values.iter())) {
        if !value.is_finite() || value.abs() >= i64::MAX as f64 {
            return Err(SimError::Computation {
                month,
                detail: format!("count for '{segment}' is not representable: {value}"),
            });
        }
        *slot = value.round_ties_even() as i64;
    }
    Ok(counts)
}
