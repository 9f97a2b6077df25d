// =============================================================================
// Alignment Engine — Realized closes vs. published forecast bands
// =============================================================================
//
// For each scenario, finds the period band covering the week ending and tests
// both tracked assets against it:
//
//   in_band   = low <= close <= high        (edges count as in-band)
//   drift_pct = (low − close) / low × 100   when below the band
//             = (close − high) / high × 100 when above the band
//
// Drift is measured against the violated edge's own value, not the range
// width, so it reads directly as "how far outside, relative to where the line
// was". In-band cells carry no drift at all — presentation layers must be able
// to tell "in band" apart from "not yet computed".
//
// When no band covers the week, no cell is produced for that scenario; the
// SPY → SPX equivalence is still reported whenever the SPY close exists.
// =============================================================================

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::forecast_config::ForecastConfig;
use crate::types::Scenario;

/// Membership verdict for one asset against one scenario's band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetAlignment {
    pub in_band: bool,

    /// Percentage distance from the violated edge; absent when in band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_pct: Option<f64>,
}

impl AssetAlignment {
    /// Drift consumed as a plain number: in-band is exactly zero.
    pub fn drift_value(&self) -> f64 {
        if self.in_band {
            0.0
        } else {
            self.drift_pct.unwrap_or(0.0)
        }
    }
}

/// Per-scenario alignment cells. An absent asset cell means the band (or the
/// close) was unavailable — not the same thing as drift zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioAlignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btc: Option<AssetAlignment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spy: Option<AssetAlignment>,
}

impl ScenarioAlignment {
    /// Whether at least one asset cell was computed.
    pub fn has_any(&self) -> bool {
        self.btc.is_some() || self.spy.is_some()
    }

    /// Both assets computed and inside their bands.
    pub fn both_in_band(&self) -> bool {
        matches!(&self.btc, Some(a) if a.in_band) && matches!(&self.spy, Some(a) if a.in_band)
    }

    /// Both assets computed and outside their bands.
    pub fn both_out_of_band(&self) -> bool {
        matches!(&self.btc, Some(a) if !a.in_band) && matches!(&self.spy, Some(a) if !a.in_band)
    }
}

/// Weekly alignment across all scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub week_ending: NaiveDate,

    pub cells: HashMap<Scenario, ScenarioAlignment>,

    /// SPX-equivalent of the SPY close, for display. Present whenever the SPY
    /// close is, band or no band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spx_equiv: Option<f64>,
}

impl AlignmentResult {
    pub fn cell(&self, scenario: Scenario) -> Option<&ScenarioAlignment> {
        self.cells.get(&scenario)
    }

    /// The active scenario's cell, falling back to the base scenario's when
    /// the active one has nothing computed.
    pub fn cell_for_active(&self, active: Scenario) -> Option<&ScenarioAlignment> {
        match self.cell(active) {
            Some(cell) if cell.has_any() => Some(cell),
            _ => self.cell(Scenario::Base),
        }
    }
}

/// SPX-equivalent of a SPY value: `value / factor`. A zero factor yields 0
/// rather than an infinity that would poison downstream display math.
pub fn spx_equivalent(value: f64, factor: f64) -> f64 {
    if factor == 0.0 {
        return 0.0;
    }
    value / factor
}

/// Edge-inclusive band membership with violated-edge drift.
pub fn band_membership(value: f64, low: f64, high: f64) -> AssetAlignment {
    if value >= low && value <= high {
        return AssetAlignment {
            in_band: true,
            drift_pct: None,
        };
    }

    let drift = if value < low {
        if low.abs() > f64::EPSILON {
            (low - value) / low * 100.0
        } else {
            0.0
        }
    } else if high.abs() > f64::EPSILON {
        (value - high) / high * 100.0
    } else {
        0.0
    };

    AssetAlignment {
        in_band: false,
        drift_pct: Some(drift),
    }
}

/// Evaluate the week's closes against the active forecast config.
pub fn evaluate_alignment(
    config: &ForecastConfig,
    week_ending: NaiveDate,
    btc_close: Option<f64>,
    spy_close: Option<f64>,
) -> AlignmentResult {
    let mut cells = HashMap::new();

    for scenario in Scenario::ALL {
        let band = config
            .plan(scenario)
            .and_then(|plan| plan.band_for(week_ending));

        let cell = match band {
            Some(band) => ScenarioAlignment {
                btc: btc_close.map(|v| band_membership(v, band.btc_low, band.btc_high)),
                spy: spy_close.map(|v| band_membership(v, band.spy_low, band.spy_high)),
            },
            None => {
                debug!(%scenario, %week_ending, "no band covers this week ending");
                ScenarioAlignment::default()
            }
        };

        cells.insert(scenario, cell);
    }

    AlignmentResult {
        week_ending,
        cells,
        spx_equiv: spy_close.map(|v| spx_equivalent(v, config.spx_factor)),
    }
}
