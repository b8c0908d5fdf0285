//! Scenario catalog: named transition matrices plus the acquisition mix.
//!
//! RULE: A catalog is validated once, at construction, and never mutated.
//! Engines borrow it; concurrent runs share it without locking.

use crate::{
    error::{SimError, SimResult},
    segment::Segment,
    types::{Distribution, SEGMENT_COUNT},
};
use serde::{Deserialize, Serialize};

/// Tolerance accepted on row and vector sums.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// How newly acquired customers split across segments.
/// Based on a retail acquisition study; nobody is acquired into churn.
pub const NEW_CUSTOMER_DISTRIBUTION: Distribution = [0.20, 0.25, 0.30, 0.25, 0.0];

/// Row-stochastic monthly transition probabilities, indexed `[from][to]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix(pub [[f64; SEGMENT_COUNT]; SEGMENT_COUNT]);

impl TransitionMatrix {
    pub fn rows(&self) -> &[[f64; SEGMENT_COUNT]; SEGMENT_COUNT] {
        &self.0
    }

    pub fn probability(&self, from: Segment, to: Segment) -> f64 {
        self.0[from.index()][to.index()]
    }

    pub fn row_sum(&self, from: Segment) -> f64 {
        self.0[from.index()].iter().sum()
    }

    fn validate(&self, scenario: &str) -> SimResult<()> {
        for from in Segment::ALL {
            let row = &self.0[from.index()];
            if let Some(p) = row.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0) {
                return Err(SimError::InvalidCatalog(format!(
                    "scenario '{scenario}': row '{from}' has out-of-range probability {p}"
                )));
            }
            let sum = self.row_sum(from);
            if (sum - 1.0).abs() > SUM_TOLERANCE {
                return Err(SimError::InvalidCatalog(format!(
                    "scenario '{scenario}': row '{from}' sums to {sum}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name:   String,
    pub matrix: TransitionMatrix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioCatalog {
    scenarios:   Vec<Scenario>,
    acquisition: Distribution,
}

impl ScenarioCatalog {
    /// Build a catalog, rejecting malformed matrices and acquisition vectors.
    pub fn new(scenarios: Vec<Scenario>, acquisition: Distribution) -> SimResult<Self> {
        if scenarios.is_empty() {
            return Err(SimError::InvalidCatalog("no scenarios defined".into()));
        }
        for (i, scenario) in scenarios.iter().enumerate() {
            if scenarios[..i].iter().any(|s| s.name == scenario.name) {
                return Err(SimError::InvalidCatalog(format!(
                    "duplicate scenario '{}'", scenario.name
                )));
            }
            scenario.matrix.validate(&scenario.name)?;
        }

        if acquisition.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(SimError::InvalidCatalog(format!(
                "acquisition distribution has invalid entries: {acquisition:?}"
            )));
        }
        let sum: f64 = acquisition.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(SimError::InvalidCatalog(format!(
                "acquisition distribution sums to {sum}"
            )));
        }
        if acquisition[Segment::TERMINAL.index()] != 0.0 {
            return Err(SimError::InvalidCatalog(
                "new customers cannot be acquired into the terminal segment".into(),
            ));
        }

        Ok(Self { scenarios, acquisition })
    }

    /// The five business scenarios shipped with the model.
    pub fn builtin() -> Self {
        let scenario = |name: &str, rows| Scenario {
            name:   name.to_string(),
            matrix: TransitionMatrix(rows),
        };
        Self {
            scenarios: vec![
                scenario("Default", [
                    [0.30, 0.40, 0.10, 0.15, 0.05],
                    [0.20, 0.50, 0.15, 0.10, 0.05],
                    [0.05, 0.20, 0.40, 0.25, 0.10],
                    [0.10, 0.10, 0.20, 0.50, 0.10],
                    [0.01, 0.01, 0.01, 0.01, 0.96],
                ]),
                scenario("Economic Recession", [
                    [0.20, 0.30, 0.15, 0.25, 0.10],
                    [0.15, 0.35, 0.20, 0.20, 0.10],
                    [0.05, 0.15, 0.30, 0.35, 0.15],
                    [0.05, 0.05, 0.15, 0.65, 0.10],
                    [0.01, 0.01, 0.01, 0.01, 0.96],
                ]),
                scenario("Strong Marketing Campaign", [
                    [0.40, 0.45, 0.05, 0.05, 0.05],
                    [0.30, 0.50, 0.10, 0.05, 0.05],
                    [0.10, 0.30, 0.40, 0.15, 0.05],
                    [0.05, 0.20, 0.20, 0.45, 0.10],
                    [0.01, 0.01, 0.01, 0.01, 0.96],
                ]),
                scenario("New Competitor", [
                    [0.25, 0.30, 0.20, 0.15, 0.10],
                    [0.15, 0.40, 0.25, 0.10, 0.10],
                    [0.05, 0.20, 0.35, 0.30, 0.10],
                    [0.05, 0.10, 0.20, 0.55, 0.10],
                    [0.01, 0.01, 0.01, 0.01, 0.96],
                ]),
                scenario("Price Increase", [
                    [0.20, 0.30, 0.15, 0.25, 0.10],
                    [0.10, 0.35, 0.20, 0.20, 0.15],
                    [0.05, 0.15, 0.30, 0.40, 0.10],
                    [0.05, 0.05, 0.15, 0.55, 0.20],
                    [0.01, 0.01, 0.01, 0.01, 0.96],
                ]),
            ],
            acquisition: NEW_CUSTOMER_DISTRIBUTION,
        }
    }

    pub fn transition_matrix_for(&self, name: &str) -> SimResult<&TransitionMatrix> {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.matrix)
            .ok_or_else(|| SimError::UnknownScenario {
                name:      name.to_string(),
                available: self.scenario_names().into_iter().map(String::from).collect(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.iter().any(|s| s.name == name)
    }

    /// Registered scenario names, in registration order.
    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn acquisition_distribution(&self) -> &Distribution {
        &self.acquisition
    }
}
