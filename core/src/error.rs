use crate::types::Month;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown scenario: {name}. Available scenarios: {available:?}")]
    UnknownScenario { name: String, available: Vec<String> },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid scenario catalog: {0}")]
    InvalidCatalog(String),

    #[error("Simulation error at month {month}: {detail}")]
    Computation { month: Month, detail: String },

    #[error("Run '{run_id}' not found")]
    RunNotFound { run_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    /// True for caller-input errors that are detected before a run starts.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SimError::UnknownScenario { .. } | SimError::InvalidParameters(_)
        )
    }

    /// Status classification used by the request boundary.
    pub fn status_code(&self) -> u16 {
        if self.is_validation() { 400 } else { 500 }
    }
}

pub type SimResult<T> = Result<T, SimError>;
