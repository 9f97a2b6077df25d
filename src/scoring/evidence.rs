// =============================================================================
// Evidence Scorer — Weekly indicator readings → scenario probabilities
// =============================================================================
//
// Pipeline:
//   1. Seed each scenario's score with ln(max(prior, 1e-9))
//   2. Add weights[state][scenario] for every reading with a weight table
//   3. Temperature-scaled softmax → calibrated probabilities
//   4. Active scenario = highest probability (bull → base → bear tie break)
//   5. Confidence tier from probability lead + data completeness, downgraded
//      one tier under VIX stress
//   6. Top 3 contributors by |weight(active) − weight(runner-up)|
//
// Indicators without a configured weight table contribute nothing and are
// skipped silently; a thin data week degrades the confidence tier instead of
// erroring.
// =============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::forecast_config::IndicatorDefinition;
use crate::types::{ConfidenceTier, Scenario};
use crate::weekly::IndicatorReading;

/// Floor applied to priors before taking the log, so a zero-configured prior
/// still yields a defined log-odds baseline.
const PRIOR_FLOOR: f64 = 1e-9;

/// Floor applied to the softmax temperature (division guard).
const TEMPERATURE_FLOOR: f64 = 1e-6;

/// One indicator's pull toward the active scenario over its runner-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub indicator_key: String,
    pub contribution: f64,
}

/// Full output of the weekly evidence scoring pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioScoreSet {
    /// Raw per-scenario log-odds scores (prior seed + evidence).
    pub scores: HashMap<Scenario, f64>,

    /// Calibrated probabilities; sum to 1 within floating-point tolerance.
    pub probabilities: HashMap<Scenario, f64>,

    pub active: Scenario,
    pub runner_up: Scenario,

    /// Probability lead of the active scenario over the runner-up.
    pub lead: f64,

    pub confidence: ConfidenceTier,

    /// Observed ÷ expected indicator ratio this week.
    pub data_completeness: f64,

    /// Whether the VIX stress downgrade was applied.
    pub vix_stress: bool,

    /// Up to 3 largest movers between active and runner-up.
    pub top_contributors: Vec<Contributor>,
}

/// Temperature-scaled softmax over per-scenario scores.
///
/// Scores are divided by `max(temperature, 1e-6)`, shifted by the maximum for
/// numerical stability, exponentiated, and normalised. An empty input maps to
/// an empty output; equal scores map to an exactly uniform distribution.
pub fn softmax(scores: &HashMap<Scenario, f64>, temperature: f64) -> HashMap<Scenario, f64> {
    if scores.is_empty() {
        return HashMap::new();
    }

    let t = temperature.max(TEMPERATURE_FLOOR);

    let scaled: Vec<(Scenario, f64)> = scores.iter().map(|(s, v)| (*s, v / t)).collect();
    let max = scaled
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max);

    let exps: Vec<(Scenario, f64)> = scaled
        .into_iter()
        .map(|(s, v)| (s, (v - max).exp()))
        .collect();
    let sum: f64 = exps.iter().map(|(_, e)| *e).sum();

    exps.into_iter().map(|(s, e)| (s, e / sum)).collect()
}

/// Score one week of indicator readings against the configured weight tables.
pub fn score_evidence(
    readings: &[IndicatorReading],
    definitions: &HashMap<String, IndicatorDefinition>,
    data_completeness: f64,
    vix_stress: bool,
    priors: &HashMap<Scenario, f64>,
    temperature: f64,
) -> ScenarioScoreSet {
    // ── 1. Prior seed ────────────────────────────────────────────────────
    let mut scores: HashMap<Scenario, f64> = HashMap::new();
    for scenario in Scenario::ALL {
        let prior = priors.get(&scenario).copied().unwrap_or(0.0);
        scores.insert(scenario, prior.max(PRIOR_FLOOR).ln());
    }

    // ── 2. Evidence accumulation ─────────────────────────────────────────
    for reading in readings {
        let Some(def) = definitions.get(&reading.indicator_key) else {
            continue;
        };
        if !def.has_weights() {
            continue;
        }
        for scenario in Scenario::ALL {
            *scores.entry(scenario).or_insert(0.0) += def.weight(reading.state, scenario);
        }
    }

    // ── 3. Calibration ───────────────────────────────────────────────────
    let probabilities = softmax(&scores, temperature);

    // ── 4. Active / runner-up (first max wins in fixed order) ────────────
    let active = arg_max(&probabilities, None);
    let runner_up = arg_max(&probabilities, Some(active));

    // ── 5. Confidence tier ───────────────────────────────────────────────
    let p_active = probabilities.get(&active).copied().unwrap_or(0.0);
    let p_runner = probabilities.get(&runner_up).copied().unwrap_or(0.0);
    let lead = p_active - p_runner;

    let mut confidence = if lead >= 0.20 && data_completeness >= 0.90 {
        ConfidenceTier::High
    } else if lead >= 0.10 && data_completeness >= 0.75 {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    };
    if vix_stress {
        confidence = confidence.downgraded();
    }

    // ── 6. Top contributors ──────────────────────────────────────────────
    let mut contributors: Vec<Contributor> = readings
        .iter()
        .filter_map(|reading| {
            let def = definitions.get(&reading.indicator_key)?;
            if !def.has_weights() {
                return None;
            }
            let contribution =
                def.weight(reading.state, active) - def.weight(reading.state, runner_up);
            Some(Contributor {
                indicator_key: reading.indicator_key.clone(),
                contribution,
            })
        })
        .collect();
    contributors.sort_by(|a, b| {
        b.contribution
            .abs()
            .partial_cmp(&a.contribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    contributors.truncate(3);

    debug!(
        active = %active,
        runner_up = %runner_up,
        lead = format!("{:.4}", lead),
        confidence = %confidence,
        completeness = format!("{:.2}", data_completeness),
        vix_stress,
        "evidence scoring complete"
    );

    ScenarioScoreSet {
        scores,
        probabilities,
        active,
        runner_up,
        lead,
        confidence,
        data_completeness,
        vix_stress,
        top_contributors: contributors,
    }
}

/// Highest-probability scenario in fixed evaluation order, optionally skipping
/// one (used for the runner-up scan). Strict comparison keeps the first max.
fn arg_max(probabilities: &HashMap<Scenario, f64>, skip: Option<Scenario>) -> Scenario {
    let mut best: Option<(Scenario, f64)> = None;
    for scenario in Scenario::ALL {
        if Some(scenario) == skip {
            continue;
        }
        let p = probabilities.get(&scenario).copied().unwrap_or(0.0);
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((scenario, p)),
        }
    }
    best.map(|(s, _)| s).unwrap_or(Scenario::Base)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndicatorState;

    fn defs_json(json: &str) -> HashMap<String, IndicatorDefinition> {
        serde_json::from_str(json).unwrap()
    }

    fn reading(key: &str, state: IndicatorState) -> IndicatorReading {
        IndicatorReading {
            indicator_key: key.to_string(),
            value: Some(1.0),
            delta: None,
            state,
        }
    }

    fn default_priors() -> HashMap<Scenario, f64> {
        [
            (Scenario::Bull, 0.2),
            (Scenario::Base, 0.6),
            (Scenario::Bear, 0.2),
        ]
        .into_iter()
        .collect()
    }

    // ---- softmax ---------------------------------------------------------

    #[test]
    fn softmax_probabilities_sum_to_one() {
        let scores: HashMap<Scenario, f64> = [
            (Scenario::Bull, 1.3),
            (Scenario::Base, -0.4),
            (Scenario::Bear, 2.7),
        ]
        .into_iter()
        .collect();
        let probs = softmax(&scores, 1.4);
        let sum: f64 = probs.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for p in probs.values() {
            assert!((0.0..=1.0).contains(p));
        }
    }

    #[test]
    fn softmax_is_monotonic() {
        let mut scores: HashMap<Scenario, f64> = [
            (Scenario::Bull, 0.5),
            (Scenario::Base, 0.5),
            (Scenario::Bear, 0.5),
        ]
        .into_iter()
        .collect();
        let before = softmax(&scores, 1.4);
        scores.insert(Scenario::Bull, 0.9);
        let after = softmax(&scores, 1.4);
        assert!(after[&Scenario::Bull] > before[&Scenario::Bull]);
    }

    #[test]
    fn softmax_empty_input() {
        let probs = softmax(&HashMap::new(), 1.4);
        assert!(probs.is_empty());
    }

    #[test]
    fn softmax_equal_scores_uniform() {
        let scores: HashMap<Scenario, f64> = Scenario::ALL.iter().map(|s| (*s, 7.2)).collect();
        let probs = softmax(&scores, 1.4);
        for p in probs.values() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn softmax_zero_temperature_is_clamped() {
        let scores: HashMap<Scenario, f64> =
            [(Scenario::Bull, 1.0), (Scenario::Base, 0.0)].into_iter().collect();
        let probs = softmax(&scores, 0.0);
        assert!(probs.values().all(|p| p.is_finite()));
        let sum: f64 = probs.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn softmax_extreme_scores_stay_finite() {
        let scores: HashMap<Scenario, f64> = [
            (Scenario::Bull, 5000.0),
            (Scenario::Base, -5000.0),
            (Scenario::Bear, 0.0),
        ]
        .into_iter()
        .collect();
        let probs = softmax(&scores, 1.0);
        assert!(probs.values().all(|p| p.is_finite()));
        let sum: f64 = probs.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    // ---- score_evidence --------------------------------------------------

    #[test]
    fn no_readings_falls_back_to_priors() {
        let set = score_evidence(&[], &HashMap::new(), 1.0, false, &default_priors(), 1.4);
        // Base has the largest prior, so it leads on priors alone.
        assert_eq!(set.active, Scenario::Base);
        let sum: f64 = set.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_prior_does_not_panic() {
        let priors: HashMap<Scenario, f64> =
            [(Scenario::Bull, 0.0), (Scenario::Base, 1.0), (Scenario::Bear, 0.0)]
                .into_iter()
                .collect();
        let set = score_evidence(&[], &HashMap::new(), 1.0, false, &priors, 1.4);
        assert!(set.scores.values().all(|s| s.is_finite()));
        assert_eq!(set.active, Scenario::Base);
    }

    #[test]
    fn tie_breaks_in_fixed_order() {
        // Uniform priors, no evidence: all probabilities equal, so the fixed
        // bull → base → bear order decides both active and runner-up.
        let priors: HashMap<Scenario, f64> = Scenario::ALL.iter().map(|s| (*s, 1.0)).collect();
        let set = score_evidence(&[], &HashMap::new(), 1.0, false, &priors, 1.4);
        assert_eq!(set.active, Scenario::Bull);
        assert_eq!(set.runner_up, Scenario::Base);
    }

    #[test]
    fn readings_without_weight_tables_are_skipped() {
        let defs = defs_json(r#"{ "bare": { "name": "No table" } }"#);
        let readings = vec![
            reading("bare", IndicatorState::Bullish),
            reading("never_defined", IndicatorState::Bearish),
        ];
        let baseline = score_evidence(&[], &defs, 1.0, false, &default_priors(), 1.4);
        let set = score_evidence(&readings, &defs, 1.0, false, &default_priors(), 1.4);
        for scenario in Scenario::ALL {
            assert!((set.scores[&scenario] - baseline.scores[&scenario]).abs() < 1e-12);
        }
        assert!(set.top_contributors.is_empty());
    }

    #[test]
    fn evidence_shifts_the_active_scenario() {
        let defs = defs_json(
            r#"{
                "breadth": { "name": "Breadth", "weights": {
                    "bearish": { "bear": 1.5, "base": -0.5 }
                }},
                "funding": { "name": "Funding", "weights": {
                    "bearish": { "bear": 1.5, "bull": -0.5 }
                }}
            }"#,
        );
        let readings = vec![
            reading("breadth", IndicatorState::Bearish),
            reading("funding", IndicatorState::Bearish),
        ];
        let set = score_evidence(&readings, &defs, 1.0, false, &default_priors(), 1.4);
        assert_eq!(set.active, Scenario::Bear);
    }

    #[test]
    fn confidence_tiers() {
        // Strong lead + full data → high.
        let defs = defs_json(
            r#"{ "mom": { "name": "Momentum", "weights": {
                "bullish": { "base": 3.0 }
            }}}"#,
        );
        let readings = vec![reading("mom", IndicatorState::Bullish)];
        let set = score_evidence(&readings, &defs, 1.0, false, &default_priors(), 1.4);
        assert!(set.lead >= 0.20);
        assert_eq!(set.confidence, ConfidenceTier::High);

        // Same lead, thin data → low (completeness gates both tiers).
        let set = score_evidence(&readings, &defs, 0.5, false, &default_priors(), 1.4);
        assert_eq!(set.confidence, ConfidenceTier::Low);

        // Medium band: lead >= 0.10 with completeness >= 0.75.
        let set = score_evidence(&readings, &defs, 0.80, false, &default_priors(), 1.4);
        assert_eq!(set.confidence, ConfidenceTier::Medium);
    }

    #[test]
    fn vix_stress_downgrades_one_tier() {
        let defs = defs_json(
            r#"{ "mom": { "name": "Momentum", "weights": {
                "bullish": { "base": 3.0 }
            }}}"#,
        );
        let readings = vec![reading("mom", IndicatorState::Bullish)];

        let calm = score_evidence(&readings, &defs, 1.0, false, &default_priors(), 1.4);
        assert_eq!(calm.confidence, ConfidenceTier::High);

        let stressed = score_evidence(&readings, &defs, 1.0, true, &default_priors(), 1.4);
        assert_eq!(stressed.confidence, ConfidenceTier::Medium);

        // Low stays low.
        let floor = score_evidence(&readings, &defs, 0.1, true, &default_priors(), 1.4);
        assert_eq!(floor.confidence, ConfidenceTier::Low);
    }

    #[test]
    fn top_contributors_ranked_by_absolute_pull() {
        let defs = defs_json(
            r#"{
                "big": { "name": "Big", "weights": {
                    "bullish": { "base": 2.0, "bull": -1.0 }
                }},
                "mid": { "name": "Mid", "weights": {
                    "bullish": { "base": 0.5 }
                }},
                "tiny": { "name": "Tiny", "weights": {
                    "bullish": { "base": 0.1 }
                }},
                "small": { "name": "Small", "weights": {
                    "bullish": { "base": 0.2 }
                }}
            }"#,
        );
        let readings = vec![
            reading("tiny", IndicatorState::Bullish),
            reading("big", IndicatorState::Bullish),
            reading("small", IndicatorState::Bullish),
            reading("mid", IndicatorState::Bullish),
        ];
        let set = score_evidence(&readings, &defs, 1.0, false, &default_priors(), 1.4);
        assert_eq!(set.active, Scenario::Base);
        assert_eq!(set.top_contributors.len(), 3);
        assert_eq!(set.top_contributors[0].indicator_key, "big");
        assert_eq!(set.top_contributors[1].indicator_key, "mid");
        assert_eq!(set.top_contributors[2].indicator_key, "small");
    }
}
