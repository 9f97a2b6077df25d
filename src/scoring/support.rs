// =============================================================================
// Support-Delta Calculator — Active scenario vs. best rival
// =============================================================================
//
// Reduces the week's indicator evidence to one signed number: how much more
// the active scenario is supported than whichever rival is closest. Positive
// means the evidence favours the tracked read; negative means it is leaning
// toward a different scenario.
//
// The raw support sums deliberately carry no prior seed — this is pure
// evidence weight, not calibrated probability. Both downstream consumers
// (tripwire classification and path-integrity composition) call the same
// function here, so their ±0.5 thresholds always see an identical number.
// =============================================================================

use std::collections::HashMap;

use tracing::debug;

use crate::forecast_config::IndicatorDefinition;
use crate::types::Scenario;
use crate::weekly::IndicatorReading;

/// Sum each scenario's evidence weight across all readings with a configured
/// weight table. Same skip rule as the evidence scorer: no table, no
/// contribution.
pub fn scenario_support(
    readings: &[IndicatorReading],
    definitions: &HashMap<String, IndicatorDefinition>,
) -> HashMap<Scenario, f64> {
    let mut support: HashMap<Scenario, f64> = Scenario::ALL.iter().map(|s| (*s, 0.0)).collect();

    for reading in readings {
        let Some(def) = definitions.get(&reading.indicator_key) else {
            continue;
        };
        if !def.has_weights() {
            continue;
        }
        for scenario in Scenario::ALL {
            *support.entry(scenario).or_insert(0.0) += def.weight(reading.state, scenario);
        }
    }

    support
}

/// `support(active) − max(support(rivals))`.
///
/// Unbounded in principle; in practice the configured weights keep it roughly
/// within ±1.5.
pub fn support_delta(
    readings: &[IndicatorReading],
    definitions: &HashMap<String, IndicatorDefinition>,
    active: Scenario,
) -> f64 {
    let support = scenario_support(readings, definitions);

    let own = support.get(&active).copied().unwrap_or(0.0);
    let best_rival = Scenario::ALL
        .iter()
        .filter(|s| **s != active)
        .map(|s| support.get(s).copied().unwrap_or(0.0))
        .fold(f64::NEG_INFINITY, f64::max);

    let delta = own - best_rival;
    debug!(
        active = %active,
        own = format!("{:.4}", own),
        best_rival = format!("{:.4}", best_rival),
        delta = format!("{:.4}", delta),
        "support delta computed"
    );
    delta
}
