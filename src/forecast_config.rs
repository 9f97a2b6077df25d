// =============================================================================
// Forecast Configuration — Versioned scenario document with weight tables
// =============================================================================
//
// The standing forecast is an analyst-authored JSON document: one plan per
// scenario (label, dated price bands, checkpoint/invalidation bullets), global
// scenario priors, the softmax temperature, the SPX proxy factor, and the
// indicator weight tables.
//
// A published config is immutable; historical weeks keep the version string of
// the config they were computed against so results stay reproducible after a
// new version ships.
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file. Historical field aliases (`from`/`to` on band
// dates, `timeline` for the band list) are resolved here at the load boundary;
// the scoring modules only ever see the resolved schema and never re-validate.
//
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{IndicatorState, Scenario};

/// Per-state, per-scenario evidence contribution table.
///
/// `weights[state][scenario]` is the log-odds contribution an indicator in
/// `state` adds to `scenario`. Partial by design: a missing scenario entry
/// contributes zero, and neutral states conventionally map to zero everywhere.
pub type WeightTable = HashMap<IndicatorState, HashMap<Scenario, f64>>;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_version() -> String {
    "v1".to_string()
}

fn default_priors() -> HashMap<Scenario, f64> {
    let mut priors = HashMap::new();
    priors.insert(Scenario::Bull, 0.2);
    priors.insert(Scenario::Base, 0.6);
    priors.insert(Scenario::Bear, 0.2);
    priors
}

fn default_temperature() -> f64 {
    1.4
}

fn default_spx_factor() -> f64 {
    0.1
}

// =============================================================================
// IndicatorDefinition
// =============================================================================

/// Configured definition of one weekly indicator. The indicator key is the
/// map key in [`ForecastConfig::indicators`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    /// Display name for dashboards and tripwire evidence bullets.
    #[serde(default)]
    pub name: String,

    /// Evidence contribution table; indicators without one are skipped by
    /// the scorer rather than rejected.
    #[serde(default)]
    pub weights: WeightTable,
}

impl IndicatorDefinition {
    /// Look up the contribution of `state` to `scenario`; absent entries
    /// contribute zero.
    pub fn weight(&self, state: IndicatorState, scenario: Scenario) -> f64 {
        self.weights
            .get(&state)
            .and_then(|by_scenario| by_scenario.get(&scenario))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether a weight table is configured at all.
    pub fn has_weights(&self) -> bool {
        !self.weights.is_empty()
    }
}

// =============================================================================
// PeriodBand
// =============================================================================

/// A dated low–high window for both tracked assets.
///
/// BTC carries the primary range; SPY carries the approximate proxy range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodBand {
    /// First week ending covered by this band (inclusive).
    #[serde(alias = "from")]
    pub start: NaiveDate,

    /// Last week ending covered by this band (inclusive).
    #[serde(alias = "to")]
    pub end: NaiveDate,

    pub btc_low: f64,
    pub btc_high: f64,

    pub spy_low: f64,
    pub spy_high: f64,
}

impl PeriodBand {
    /// Whether `date` falls inside this band's `[start, end]` window.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// =============================================================================
// ScenarioPlan
// =============================================================================

/// One scenario's slice of the standing forecast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioPlan {
    #[serde(default)]
    pub label: String,

    /// Ordered band windows. First band covering a given week ending wins.
    /// `timeline` is the historical name for this field.
    #[serde(default, alias = "timeline")]
    pub bands: Vec<PeriodBand>,

    /// Bullets that confirm the path when they hold.
    #[serde(default)]
    pub checkpoints: Vec<String>,

    /// Bullets that would break the path if they trigger.
    #[serde(default)]
    pub invalidations: Vec<String>,
}

impl ScenarioPlan {
    /// First band covering `date`, by configured order.
    pub fn band_for(&self, date: NaiveDate) -> Option<&PeriodBand> {
        self.bands.iter().find(|b| b.covers(date))
    }
}

// =============================================================================
// ForecastConfig
// =============================================================================

/// Top-level versioned forecast document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Version string recorded on every snapshot computed against this config.
    #[serde(default = "default_version")]
    pub version: String,

    /// RFC 3339 publish timestamp, if the authoring tool stamped one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    /// One plan per scenario. All three must be present.
    #[serde(default)]
    pub scenarios: HashMap<Scenario, ScenarioPlan>,

    /// Scenario prior weights for the evidence scorer's log-odds seed.
    #[serde(default = "default_priors")]
    pub priors: HashMap<Scenario, f64>,

    /// Softmax temperature for probability calibration.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// SPY → SPX equivalence factor (SPX ≈ SPY / factor).
    #[serde(default = "default_spx_factor")]
    pub spx_factor: f64,

    /// Indicator definitions keyed by indicator key.
    #[serde(default)]
    pub indicators: HashMap<String, IndicatorDefinition>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            published_at: None,
            scenarios: HashMap::new(),
            priors: default_priors(),
            temperature: default_temperature(),
            spx_factor: default_spx_factor(),
            indicators: HashMap::new(),
        }
    }
}

impl ForecastConfig {
    /// Load a forecast config from a JSON file at `path` and validate it once.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read forecast config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse forecast config from {}", path.display()))?;

        config.validate()?;

        info!(
            path = %path.display(),
            version = %config.version,
            indicators = config.indicators.len(),
            "forecast config loaded"
        );

        Ok(config)
    }

    /// One-time boundary validation. Hard errors only for documents the core
    /// cannot score at all; anything recoverable is a warning.
    pub fn validate(&self) -> Result<()> {
        for scenario in Scenario::ALL {
            if !self.scenarios.contains_key(&scenario) {
                bail!("forecast config is missing the {scenario} scenario plan");
            }
        }

        for (scenario, prior) in &self.priors {
            if *prior < 0.0 {
                bail!("prior for {scenario} is negative ({prior})");
            }
        }

        if self.temperature <= 0.0 {
            warn!(
                temperature = self.temperature,
                "non-positive softmax temperature; scorer will clamp to epsilon"
            );
        }

        for (scenario, plan) in &self.scenarios {
            for band in &plan.bands {
                if band.start > band.end {
                    warn!(%scenario, start = %band.start, end = %band.end, "band window is inverted");
                }
                if band.btc_low > band.btc_high || band.spy_low > band.spy_high {
                    warn!(%scenario, start = %band.start, "band range low exceeds high");
                }
            }
        }

        Ok(())
    }

    /// Plan for `scenario`. Validation guarantees presence after `load`, but
    /// hand-built configs in tests may be partial.
    pub fn plan(&self, scenario: Scenario) -> Option<&ScenarioPlan> {
        self.scenarios.get(&scenario)
    }
}
