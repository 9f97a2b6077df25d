// =============================================================================
// Weekly Evaluation Pipeline
// =============================================================================
//
// The only place that sequences one week's computation:
//
//   1. Evidence scoring + band alignment (independent of each other)
//   2. Support delta for the freshly chosen active scenario
//   3. Tripwire classification + path-integrity composition
//
// Everything is a pure function of the arguments. The prior week arrives as
// an explicit snapshot reference — never read from live state — so backfills
// can evaluate many weeks in any order.
// =============================================================================

use tracing::info;

use crate::alignment::{evaluate_alignment, AlignmentResult};
use crate::forecast_config::ForecastConfig;
use crate::integrity::{build_explainer, compose_path_integrity, IntegrityInputs};
use crate::scoring::{score_evidence, support_delta};
use crate::snapshot::WeeklySnapshot;
use crate::tripwire::{classify_tripwires, TripwireSummary};
use crate::types::{ConfidenceTier, Scenario};
use crate::weekly::WeeklyInput;

/// Evaluate one week against the active forecast config.
pub fn evaluate_week(
    config: &ForecastConfig,
    input: &WeeklyInput,
    previous: Option<&WeeklySnapshot>,
) -> WeeklySnapshot {
    // ── 1. Evidence + alignment ──────────────────────────────────────────
    let completeness = input.data_completeness(config);
    let scores = score_evidence(
        &input.readings,
        &config.indicators,
        completeness,
        input.vix_stress,
        &config.priors,
        config.temperature,
    );

    let alignment = evaluate_alignment(config, input.week_ending, input.btc_close, input.spy_close);

    // ── 2. Support delta ─────────────────────────────────────────────────
    let delta = support_delta(&input.readings, &config.indicators, scores.active);

    // ── 3. Tripwires ─────────────────────────────────────────────────────
    let empty: Vec<String> = Vec::new();
    let plan = config.plan(scores.active);
    let checkpoints = plan.map(|p| p.checkpoints.as_slice()).unwrap_or(&empty);
    let invalidations = plan.map(|p| p.invalidations.as_slice()).unwrap_or(&empty);

    let (tripwires, summary) = classify_tripwires(
        Some(&alignment),
        scores.active,
        &input.readings,
        &config.indicators,
        checkpoints,
        invalidations,
    );

    // ── 4. Path integrity ────────────────────────────────────────────────
    let current = integrity_inputs(
        scores.active,
        Some(scores.confidence),
        &alignment,
        delta,
        summary,
    );
    let prior = previous.map(|prev| {
        integrity_inputs(
            prev.scores.active,
            Some(prev.scores.confidence),
            &prev.alignment,
            prev.support_delta,
            prev.tripwire_summary,
        )
    });
    let integrity = compose_path_integrity(&current, prior.as_ref());
    let explainer = build_explainer(&current, &integrity);

    info!(
        week_ending = %input.week_ending,
        active = %scores.active,
        confidence = %scores.confidence,
        support_delta = format!("{:+.3}", delta),
        score = integrity.score,
        grade = %integrity.grade,
        "weekly evaluation complete"
    );

    WeeklySnapshot::stamp(
        input.week_ending,
        config.version.clone(),
        scores,
        alignment,
        delta,
        tripwires,
        integrity,
        explainer,
    )
}

/// Flatten a week's alignment into the composer's numeric drift contract:
/// `Some(0.0)` in band, `Some(x)` out by `x` percent, `None` never computed.
fn integrity_inputs(
    scenario: Scenario,
    confidence: Option<ConfidenceTier>,
    alignment: &AlignmentResult,
    support_delta: f64,
    tripwires: TripwireSummary,
) -> IntegrityInputs {
    let cell = alignment.cell_for_active(scenario);
    let btc_drift = cell.and_then(|c| c.btc.as_ref()).map(|a| a.drift_value());
    let spy_drift = cell.and_then(|c| c.spy.as_ref()).map(|a| a.drift_value());

    IntegrityInputs {
        scenario,
        confidence,
        btc_drift,
        spy_drift,
        support_delta,
        tripwires,
    }
}
