//! State rehydration: rebuild a run's starting point from a prior record.
//!
//! Prior records come back from callers in whatever shape they kept them:
//! any of the three segment key conventions, numbers as JSON numbers or as
//! strings with thousands separators, fields missing altogether.
//!
//! RULES:
//!   - Detection is an explicit, ordered probe: full name, underscored,
//!     abbreviated. First match wins.
//!   - Missing or unparsable fields never abort the extension. They fall
//!     back to documented defaults and are logged at warn level.
//!   - The engine never sees serialized records; only the typed seed.

use crate::{
    config::SimConfig,
    engine::{validate_population, validate_run_shape, SimEngine, DEFAULT_INITIAL_DISTRIBUTION},
    error::{SimError, SimResult},
    record::{MonthlyRecord, MONTH_KEY},
    segment::{KeyConvention, Segment},
    types::{Distribution, Month, SEGMENT_COUNT},
};
use serde_json::{Map, Value};

/// Typed starting point recovered from a prior record sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RehydratedSeed {
    pub convention:   Option<KeyConvention>,
    pub counts:       [f64; SEGMENT_COUNT],
    pub population:   i64,
    pub distribution: Distribution,
    pub start_month:  Month,
}

/// Parameters for continuing a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendParams {
    pub new_customers_per_month: i64,
    pub scenario:                String,
    pub months:                  i64,
    /// Replaces the population summed from the prior record.
    pub starting_population:     Option<i64>,
}

/// Which key convention does this record use? Probes one known key per
/// convention, in priority order.
pub fn detect_convention(record: &Map<String, Value>) -> Option<KeyConvention> {
    let probe = Segment::ImmediateRepurchase;
    KeyConvention::PRIORITY
        .into_iter()
        .find(|c| record.contains_key(probe.key(*c)))
}

/// Numeric coercion for loosely typed fields. Strings may carry
/// thousands separators ("1,234"); booleans count as 1 and 0.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Per-segment counts under the detected convention; 0 wherever a value
/// is missing, unparsable or negative.
pub fn segment_counts(
    record: &Map<String, Value>,
    convention: Option<KeyConvention>,
) -> [f64; SEGMENT_COUNT] {
    let mut counts = [0.0; SEGMENT_COUNT];
    let Some(convention) = convention else {
        log::warn!("rehydrate: no known segment keys in prior record, using 0 for every segment");
        return counts;
    };

    for segment in Segment::ALL {
        let key = segment.key(convention);
        let value = match record.get(key) {
            Some(v) => v,
            None => {
                log::warn!("rehydrate: could not find value for '{segment}', using 0");
                continue;
            }
        };
        match coerce_number(value) {
            Some(n) if n >= 0.0 => counts[segment.index()] = n,
            Some(n) => log::warn!("rehydrate: negative count {n} for '{segment}', using 0"),
            None => log::warn!("rehydrate: could not convert '{segment}' value {value} to a number, using 0"),
        }
    }
    counts
}

/// The month to continue from: the last record's own month, else the
/// largest month found anywhere in the sequence, else 0.
pub fn start_month(prior: &[Value]) -> Month {
    let month_of = |record: &Value| {
        record
            .get(MONTH_KEY)
            .and_then(coerce_number)
            .filter(|m| *m >= 0.0)
            .map(|m| m.trunc() as Month)
    };

    if let Some(month) = prior.last().and_then(month_of) {
        return month;
    }
    if let Some(last) = prior.last().and_then(|r| r.get(MONTH_KEY)) {
        log::warn!("rehydrate: could not convert Month {last} to an integer");
    }
    match prior.iter().filter_map(month_of).max() {
        Some(month) => month,
        None => {
            log::warn!("rehydrate: could not determine last month, defaulting to 0");
            0
        }
    }
}

/// Rebuild `(population, distribution, start month)` from the last record.
pub fn rehydrate(prior: &[Value]) -> SimResult<RehydratedSeed> {
    let last = prior
        .last()
        .ok_or_else(|| SimError::InvalidParameters("No previous results provided".into()))?;

    let empty = Map::new();
    let record = match last {
        Value::Object(map) => map,
        other => {
            log::warn!("rehydrate: last prior record is not an object: {other}");
            &empty
        }
    };

    let convention = detect_convention(record);
    log::debug!("rehydrate: detected convention {convention:?}");
    let counts = segment_counts(record, convention);

    let sum: f64 = counts.iter().sum();
    let population = sum.trunc() as i64;
    let distribution = if population > 0 {
        let mut d = [0.0; SEGMENT_COUNT];
        // Divides by the truncated population, so fractional counts can
        // leave Σ slightly above 1; the seed then rounds back to the counts.
        for (slot, count) in d.iter_mut().zip(counts.iter()) {
            *slot = count / population as f64;
        }
        d
    } else {
        DEFAULT_INITIAL_DISTRIBUTION
    };

    let seed = RehydratedSeed {
        convention,
        counts,
        population,
        distribution,
        start_month: start_month(prior),
    };
    log::debug!(
        "rehydrate: population={} start_month={} distribution={:?}",
        seed.population, seed.start_month, seed.distribution
    );
    Ok(seed)
}

/// Continue a prior run under `params`.
///
/// The engine's month-0 record is the seed itself, so the run steps
/// `months` times, drops that first record, and renumbers the rest from
/// `start_month + 1`.
pub fn extend(
    config: &SimConfig,
    prior: &[Value],
    params: &ExtendParams,
) -> SimResult<Vec<MonthlyRecord>> {
    if prior.is_empty() {
        return Err(SimError::InvalidParameters("No previous results provided".into()));
    }
    validate_run_shape(params.new_customers_per_month, params.months)?;
    config.catalog.transition_matrix_for(&params.scenario)?;
    if let Some(p) = params.starting_population {
        if p <= 0 {
            return Err(SimError::InvalidParameters(format!(
                "starting population must be positive, got {p}"
            )));
        }
        validate_population(p)?;
    }

    let seed = rehydrate(prior)?;
    let population = params.starting_population.unwrap_or(seed.population);

    let mut engine = SimEngine::seeded(
        config,
        &params.scenario,
        params.new_customers_per_month,
        population,
        &seed.distribution,
    )?;
    engine.run_months(params.months as u64)?;

    let records: Vec<MonthlyRecord> = engine
        .into_records()
        .into_iter()
        .skip(1)
        .enumerate()
        .map(|(i, r)| r.renumbered(seed.start_month + 1 + i as Month))
        .collect();

    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        log::info!(
            "extend '{}': months {}..={}, customers {} -> {}, revenue {:.2} -> {:.2}",
            params.scenario,
            first.month,
            last.month,
            first.total_customers,
            last.total_customers,
            first.monthly_revenue,
            last.monthly_revenue,
        );
    }
    Ok(records)
}
