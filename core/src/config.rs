use crate::{
    catalog::{Scenario, ScenarioCatalog},
    revenue::RevenueModel,
    segment::Segment,
    types::{Distribution, SEGMENT_COUNT},
};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
struct ScenarioCatalogFile {
    acquisition_distribution: HashMap<Segment, f64>,
    scenarios:                Vec<Scenario>,
}

#[derive(Debug, Clone, Deserialize)]
struct SegmentSpendFile {
    monthly_spend: HashMap<Segment, f64>,
}

/// Everything a simulation run reads but never writes.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub catalog: ScenarioCatalog,
    pub revenue: RevenueModel,
}

impl SimConfig {
    /// Compiled-in scenarios and spend table. Used by tests and as the
    /// runner's fallback when no data directory is given.
    pub fn builtin() -> Self {
        Self {
            catalog: ScenarioCatalog::builtin(),
            revenue: RevenueModel::default(),
        }
    }

    /// Load from the data/ directory.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let catalog_path = format!("{data_dir}/scenarios.json");
        let catalog_content = std::fs::read_to_string(&catalog_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {catalog_path}: {e}"))?;
        let catalog_file: ScenarioCatalogFile = serde_json::from_str(&catalog_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {catalog_path}: {e}"))?;
        let acquisition = per_segment(
            &catalog_file.acquisition_distribution,
            "acquisition_distribution",
        )?;
        let catalog = ScenarioCatalog::new(catalog_file.scenarios, acquisition)?;

        let spend_path = format!("{data_dir}/segment_spend.json");
        let spend_content = std::fs::read_to_string(&spend_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {spend_path}: {e}"))?;
        let spend_file: SegmentSpendFile = serde_json::from_str(&spend_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {spend_path}: {e}"))?;
        let spend = per_segment(&spend_file.monthly_spend, "monthly_spend")?;
        if let Some(bad) = spend.iter().find(|s| !s.is_finite() || **s < 0.0) {
            anyhow::bail!("{spend_path}: monthly spend must be finite and non-negative, got {bad}");
        }

        log::info!(
            "Loaded {} scenarios from {data_dir}",
            catalog.scenario_names().len()
        );
        Ok(Self { catalog, revenue: RevenueModel::new(spend) })
    }
}

/// Every segment must be present; a partial table is a config error.
fn per_segment(values: &HashMap<Segment, f64>, field: &str) -> anyhow::Result<Distribution> {
    let mut out = [0.0; SEGMENT_COUNT];
    for segment in Segment::ALL {
        out[segment.index()] = *values
            .get(&segment)
            .ok_or_else(|| anyhow::anyhow!("{field}: missing entry for '{segment}'"))?;
    }
    Ok(out)
}
