// =============================================================================
// Tripwire Classifier — Weekly status for checkpoint/invalidation bullets
// =============================================================================
//
// Checkpoints and invalidations are analyst-authored text bullets; they are
// not individually verified. Each week derives three signals — big drift
// (either asset ≥ 2.0% outside its band), the bullish-minus-bearish reading
// count, and the support delta — and assigns one shared status to all
// checkpoints and one to all invalidations:
//
//   checkpoints:    risk        big drift OR support delta <= −0.5
//                   confirming  support delta >= 0.5 OR bull−bear >= 2
//                   watching    otherwise
//   invalidations:  risk        as above, OR both assets out of band
//                   confirming  support delta >= 0.5 AND both assets in band
//                   watching    otherwise (incl. the −0.5..0 zone)
//
// No snapshot at all is the explicit degenerate state: every bullet comes
// back `unknown` with reason "Not enough data." — never an error.
// =============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alignment::AlignmentResult;
use crate::forecast_config::IndicatorDefinition;
use crate::scoring::support_delta;
use crate::types::{Scenario, TripwireKind, TripwireStatus};
use crate::weekly::IndicatorReading;

/// Threshold on |drift| (percentage points) for the big-drift signal.
const BIG_DRIFT_PCT: f64 = 2.0;

/// Support-delta band: below −0.5 is risk, above +0.5 is confirming.
const SUPPORT_DELTA_GATE: f64 = 0.5;

const MAX_REASONS: usize = 2;
const MAX_EVIDENCE: usize = 2;

/// Weekly verdict for one tripwire bullet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripwireResult {
    pub kind: TripwireKind,
    pub text: String,
    pub status: TripwireStatus,

    /// Up to 2 short reasons behind the status.
    #[serde(default)]
    pub reasons: Vec<String>,

    /// Up to 2 largest-|delta| indicator movers this week.
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Status counts across the week's tripwires.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TripwireSummary {
    pub confirming: usize,
    pub watching: usize,
    pub risk: usize,
    pub unknown: usize,
}

impl TripwireSummary {
    pub fn from_results(results: &[TripwireResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.status {
                TripwireStatus::Confirming => summary.confirming += 1,
                TripwireStatus::Watching => summary.watching += 1,
                TripwireStatus::Risk => summary.risk += 1,
                TripwireStatus::Unknown => summary.unknown += 1,
            }
        }
        summary
    }
}

/// Classify every checkpoint and invalidation bullet for the week.
///
/// `alignment` is the week's computed alignment, or `None` when no snapshot
/// exists at all. The active scenario's cell is used, falling back to base.
pub fn classify_tripwires(
    alignment: Option<&AlignmentResult>,
    active: Scenario,
    readings: &[IndicatorReading],
    definitions: &HashMap<String, IndicatorDefinition>,
    checkpoints: &[String],
    invalidations: &[String],
) -> (Vec<TripwireResult>, TripwireSummary) {
    let Some(alignment) = alignment else {
        // Degenerate week: nothing computed yet.
        let results: Vec<TripwireResult> = checkpoints
            .iter()
            .map(|text| unknown_result(TripwireKind::Checkpoint, text))
            .chain(
                invalidations
                    .iter()
                    .map(|text| unknown_result(TripwireKind::Invalidation, text)),
            )
            .collect();
        let summary = TripwireSummary::from_results(&results);
        return (results, summary);
    };

    // ── Derived signals ──────────────────────────────────────────────────
    let cell = alignment.cell_for_active(active);

    let btc_drift = cell
        .and_then(|c| c.btc.as_ref())
        .map(|a| a.drift_value())
        .unwrap_or(0.0);
    let spy_drift = cell
        .and_then(|c| c.spy.as_ref())
        .map(|a| a.drift_value())
        .unwrap_or(0.0);
    let max_drift = btc_drift.abs().max(spy_drift.abs());
    let big_drift = max_drift >= BIG_DRIFT_PCT;

    let both_in = cell.map(|c| c.both_in_band()).unwrap_or(false);
    let both_out = cell.map(|c| c.both_out_of_band()).unwrap_or(false);

    let bull_bear_diff = bull_bear_diff(readings);
    let delta = support_delta(readings, definitions, active);

    debug!(
        active = %active,
        big_drift,
        max_drift = format!("{:.2}", max_drift),
        bull_bear_diff,
        support_delta = format!("{:.3}", delta),
        both_in,
        both_out,
        "tripwire signals derived"
    );

    // ── Shared weekly statuses ───────────────────────────────────────────
    let checkpoint_status = if big_drift || delta <= -SUPPORT_DELTA_GATE {
        TripwireStatus::Risk
    } else if delta >= SUPPORT_DELTA_GATE || bull_bear_diff >= 2 {
        TripwireStatus::Confirming
    } else {
        TripwireStatus::Watching
    };

    let invalidation_status = if big_drift || delta <= -SUPPORT_DELTA_GATE || both_out {
        TripwireStatus::Risk
    } else if delta >= SUPPORT_DELTA_GATE && both_in {
        TripwireStatus::Confirming
    } else {
        TripwireStatus::Watching
    };

    let evidence = top_movers(readings, definitions);

    let checkpoint_reasons = build_reasons(
        checkpoint_status,
        big_drift,
        max_drift,
        delta,
        bull_bear_diff,
        false,
    );
    let invalidation_reasons = build_reasons(
        invalidation_status,
        big_drift,
        max_drift,
        delta,
        bull_bear_diff,
        both_out,
    );

    let results: Vec<TripwireResult> = checkpoints
        .iter()
        .map(|text| TripwireResult {
            kind: TripwireKind::Checkpoint,
            text: text.clone(),
            status: checkpoint_status,
            reasons: checkpoint_reasons.clone(),
            evidence: evidence.clone(),
        })
        .chain(invalidations.iter().map(|text| TripwireResult {
            kind: TripwireKind::Invalidation,
            text: text.clone(),
            status: invalidation_status,
            reasons: invalidation_reasons.clone(),
            evidence: evidence.clone(),
        }))
        .collect();

    let summary = TripwireSummary::from_results(&results);
    (results, summary)
}

fn unknown_result(kind: TripwireKind, text: &str) -> TripwireResult {
    TripwireResult {
        kind,
        text: text.to_string(),
        status: TripwireStatus::Unknown,
        reasons: vec!["Not enough data.".to_string()],
        evidence: Vec::new(),
    }
}

fn bull_bear_diff(readings: &[IndicatorReading]) -> i64 {
    use crate::types::IndicatorState;
    let bullish = readings
        .iter()
        .filter(|r| r.state == IndicatorState::Bullish)
        .count() as i64;
    let bearish = readings
        .iter()
        .filter(|r| r.state == IndicatorState::Bearish)
        .count() as i64;
    bullish - bearish
}

/// Short reason strings behind a status, capped at two.
fn build_reasons(
    status: TripwireStatus,
    big_drift: bool,
    max_drift: f64,
    delta: f64,
    bull_bear_diff: i64,
    both_out: bool,
) -> Vec<String> {
    let mut reasons = Vec::new();

    match status {
        TripwireStatus::Risk => {
            if big_drift {
                reasons.push(format!(
                    "Price drifted {max_drift:.1}% outside the tracked band"
                ));
            }
            if delta <= -SUPPORT_DELTA_GATE {
                reasons.push(format!(
                    "Evidence support delta {delta:+.2} favours a rival scenario"
                ));
            }
            if both_out {
                reasons.push("Both assets closed outside their bands".to_string());
            }
        }
        TripwireStatus::Confirming => {
            if delta >= SUPPORT_DELTA_GATE {
                reasons.push(format!(
                    "Evidence support delta {delta:+.2} backs the active read"
                ));
            }
            if bull_bear_diff >= 2 {
                reasons.push(format!(
                    "Bullish readings outnumber bearish by {bull_bear_diff}"
                ));
            }
        }
        TripwireStatus::Watching => {
            reasons.push(format!(
                "Support delta {delta:+.2} inside the neutral zone"
            ));
        }
        TripwireStatus::Unknown => {
            reasons.push("Not enough data.".to_string());
        }
    }

    reasons.truncate(MAX_REASONS);
    reasons
}

/// Up to two largest-|delta| movers, named via the configured display name
/// with a humanized-key fallback.
fn top_movers(
    readings: &[IndicatorReading],
    definitions: &HashMap<String, IndicatorDefinition>,
) -> Vec<String> {
    let mut movers: Vec<(&IndicatorReading, f64)> = readings
        .iter()
        .filter_map(|r| r.delta.map(|d| (r, d)))
        .collect();
    movers.sort_by(|a, b| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    movers
        .into_iter()
        .take(MAX_EVIDENCE)
        .map(|(reading, delta)| {
            let name = definitions
                .get(&reading.indicator_key)
                .filter(|def| !def.name.is_empty())
                .map(|def| def.name.clone())
                .unwrap_or_else(|| humanize_key(&reading.indicator_key));
            format!("{name} {delta:+.2} w/w ({})", reading.state)
        })
        .collect()
}

/// "funding_rate" → "Funding Rate".
fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
