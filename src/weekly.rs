// =============================================================================
// Weekly Input — One week's observed facts
// =============================================================================
//
// The ingestion collaborator resolves the weekly closes (manual overrides
// already applied) and classifies each indicator reading before this document
// reaches the engine. Readings are immutable once produced; a new week gets a
// fresh set.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::forecast_config::ForecastConfig;
use crate::types::IndicatorState;

/// One indicator's weekly reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub indicator_key: String,

    /// Raw numeric reading; absent when the provider had no print this week.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    /// Change vs. the prior week's value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,

    pub state: IndicatorState,
}

/// Everything the engine consumes for one week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyInput {
    pub week_ending: NaiveDate,

    /// Resolved BTC weekly close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btc_close: Option<f64>,

    /// Resolved SPY weekly close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spy_close: Option<f64>,

    #[serde(default)]
    pub readings: Vec<IndicatorReading>,

    /// Set upstream when the VIX regime warrants a confidence downgrade.
    #[serde(default)]
    pub vix_stress: bool,
}

impl WeeklyInput {
    /// Load a weekly input document from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read weekly input from {}", path.display()))?;

        let input: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse weekly input from {}", path.display()))?;

        info!(
            path = %path.display(),
            week_ending = %input.week_ending,
            readings = input.readings.len(),
            "weekly input loaded"
        );

        Ok(input)
    }

    /// Observed readings ÷ expected indicator count, clamped to [0, 1].
    ///
    /// A reading counts as observed even when its numeric value is null — a
    /// classified state is still evidence. 1.0 when the config defines no
    /// indicators (nothing was expected, so nothing is missing).
    pub fn data_completeness(&self, config: &ForecastConfig) -> f64 {
        let expected = config.indicators.len();
        if expected == 0 {
            return 1.0;
        }
        (self.readings.len() as f64 / expected as f64).clamp(0.0, 1.0)
    }
}
