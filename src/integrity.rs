// =============================================================================
// Path Integrity Composer — One explainable 0–100 score per week
// =============================================================================
//
// Blends four independently bounded components:
//
//   alignment   0–40   40 minus 5 points per drift percent per asset (capped
//                      at 20 each); forced to exactly 20 when no drift could
//                      be computed at all ("pending", not a real reading)
//   evidence    0–30   piecewise-linear in the support delta, floored at the
//                      extremes
//   tripwires   0–20   14 + 1.5 per confirming − 4 per risk − 0.5 per
//                      watching; risk deliberately costs ~2.7× a confirming
//   confidence  0–10   high 10 / medium 7 / anything else 4
//
// The week-over-week delta is only computed when the prior week's support
// delta and tripwire summary are both supplied — the prior score is recomputed
// through the same component math (a plain helper call, nothing recursive) and
// never estimated.
//
// A companion explainer narrates each component with its literal point value
// and lists what would move the score, mentioning only the levers that are
// actually suppressing it this week.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tripwire::TripwireSummary;
use crate::types::{ConfidenceTier, Grade, Scenario};

const MAX_NOTES: usize = 5;

/// Drift (percentage points) at which the explainer starts calling out
/// band re-entry as a lever.
const BIG_DRIFT_PCT: f64 = 2.0;

/// One week's inputs to the composer, in already-consumed numeric form.
///
/// Drift values follow the alignment contract: `Some(0.0)` is in-band,
/// `Some(x)` is out-of-band by `x` percent, `None` means the cell was never
/// computed. Both `None` is the "pending" state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityInputs {
    pub scenario: Scenario,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceTier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btc_drift: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spy_drift: Option<f64>,

    pub support_delta: f64,

    pub tripwires: TripwireSummary,
}

/// The four bounded components, pre-rounding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntegrityComponents {
    pub alignment: f64,
    pub evidence: f64,
    pub tripwires: f64,
    pub confidence: f64,
}

/// Composite weekly path-integrity verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathIntegrity {
    /// 0–100, rounded.
    pub score: u32,
    pub grade: Grade,
    pub label: String,

    /// Score change vs. the prior week; `None` when prior inputs were not
    /// supplied — never interpolated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_wow: Option<f64>,

    pub components: IntegrityComponents,

    /// Up to 5 short notes on what shaped the score.
    #[serde(default)]
    pub notes: Vec<String>,
}

/// One labeled section of the explainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainerSection {
    pub title: String,
    pub points: f64,
    pub max_points: f64,
    pub bullets: Vec<String>,
}

/// Component-by-component narration of the composite score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityExplainer {
    pub sections: Vec<ExplainerSection>,

    /// Levers that would move the score, limited to the components currently
    /// suppressing it.
    pub what_would_change: Vec<String>,
}

// =============================================================================
// Composition
// =============================================================================

/// Compose the weekly path-integrity score.
pub fn compose_path_integrity(
    current: &IntegrityInputs,
    previous: Option<&IntegrityInputs>,
) -> PathIntegrity {
    let (components, notes) = component_scores(current);
    let score = total_score(&components);
    let grade = Grade::from_score(score);

    let delta_wow = previous.map(|prior| {
        let (prior_components, _) = component_scores(prior);
        score as f64 - total_score(&prior_components) as f64
    });

    debug!(
        scenario = %current.scenario,
        score,
        grade = %grade,
        alignment = format!("{:.1}", components.alignment),
        evidence = format!("{:.1}", components.evidence),
        tripwires = format!("{:.1}", components.tripwires),
        confidence = format!("{:.1}", components.confidence),
        delta_wow = ?delta_wow,
        "path integrity composed"
    );

    PathIntegrity {
        score,
        grade,
        label: grade.label().to_string(),
        delta_wow,
        components,
        notes,
    }
}

fn total_score(components: &IntegrityComponents) -> u32 {
    let sum = components.alignment + components.evidence + components.tripwires + components.confidence;
    sum.clamp(0.0, 100.0).round() as u32
}

fn component_scores(inputs: &IntegrityInputs) -> (IntegrityComponents, Vec<String>) {
    let mut notes = Vec::new();

    // ── Alignment (0–40) ─────────────────────────────────────────────────
    let alignment = match (inputs.btc_drift, inputs.spy_drift) {
        (None, None) => {
            notes.push("Alignment pending — band or price data incomplete".to_string());
            20.0
        }
        (btc, spy) => {
            let btc_penalty = (btc.unwrap_or(0.0).abs() * 5.0).min(20.0);
            let spy_penalty = (spy.unwrap_or(0.0).abs() * 5.0).min(20.0);
            (40.0 - btc_penalty - spy_penalty).clamp(0.0, 40.0)
        }
    };

    // ── Evidence (0–30) ──────────────────────────────────────────────────
    let evidence = evidence_points(inputs.support_delta);

    // ── Tripwires (0–20) ─────────────────────────────────────────────────
    let summary = &inputs.tripwires;
    let tripwires = (14.0 + 1.5 * summary.confirming as f64
        - 4.0 * summary.risk as f64
        - 0.5 * summary.watching as f64)
        .clamp(0.0, 20.0);

    // ── Confidence (0–10) ────────────────────────────────────────────────
    let confidence = confidence_points(inputs.confidence);

    // ── Notes ────────────────────────────────────────────────────────────
    let max_drift = inputs
        .btc_drift
        .unwrap_or(0.0)
        .abs()
        .max(inputs.spy_drift.unwrap_or(0.0).abs());
    if max_drift >= BIG_DRIFT_PCT {
        notes.push(format!("Price {max_drift:.1}% outside the published band"));
    }
    if inputs.support_delta < 0.0 {
        notes.push(format!(
            "Evidence leans away from the {} path ({:+.2})",
            inputs.scenario, inputs.support_delta
        ));
    }
    if summary.risk > 0 {
        notes.push(format!("{} tripwire(s) flashing risk", summary.risk));
    }
    if confidence <= 4.0 {
        notes.push("Confidence is low or unstated".to_string());
    }
    notes.truncate(MAX_NOTES);

    (
        IntegrityComponents {
            alignment,
            evidence,
            tripwires,
            confidence,
        },
        notes,
    )
}

/// Piecewise-linear evidence map. Saturates at 30 above +0.8 and rests at the
/// 6-point residual below −0.8.
fn evidence_points(x: f64) -> f64 {
    let raw = if x >= 0.8 {
        30.0
    } else if x >= 0.4 {
        24.0 + (x - 0.4) * 15.0
    } else if x >= 0.0 {
        18.0 + x * 15.0
    } else if x >= -0.4 {
        12.0 + x * 15.0
    } else if x >= -0.8 {
        6.0 + (x + 0.4) * 15.0
    } else {
        6.0
    };
    raw.clamp(0.0, 30.0)
}

fn confidence_points(tier: Option<ConfidenceTier>) -> f64 {
    match tier {
        Some(ConfidenceTier::High) => 10.0,
        Some(ConfidenceTier::Medium) => 7.0,
        _ => 4.0,
    }
}

// =============================================================================
// Explainer
// =============================================================================

/// Narrate each component of an already-composed score.
pub fn build_explainer(inputs: &IntegrityInputs, integrity: &PathIntegrity) -> IntegrityExplainer {
    let components = &integrity.components;
    let pending = inputs.btc_drift.is_none() && inputs.spy_drift.is_none();

    // ── Alignment section ────────────────────────────────────────────────
    let mut alignment_bullets = Vec::new();
    if pending {
        alignment_bullets.push("Band or drift data pending — scored neutral".to_string());
    } else {
        alignment_bullets.push(drift_bullet("BTC", inputs.btc_drift));
        alignment_bullets.push(drift_bullet("SPY", inputs.spy_drift));
    }

    // ── Evidence section ─────────────────────────────────────────────────
    let x = inputs.support_delta;
    let evidence_bullet = if x >= 0.8 {
        format!("Evidence strongly backs the {} read ({x:+.2})", inputs.scenario)
    } else if x >= 0.0 {
        format!("Evidence leans with the {} read ({x:+.2})", inputs.scenario)
    } else if x > -0.8 {
        format!("Evidence leans away from the {} read ({x:+.2})", inputs.scenario)
    } else {
        format!("Evidence firmly against the {} read ({x:+.2})", inputs.scenario)
    };

    // ── Tripwire section ─────────────────────────────────────────────────
    let summary = &inputs.tripwires;
    let tripwire_bullet = format!(
        "{} confirming / {} watching / {} risk",
        summary.confirming, summary.watching, summary.risk
    );

    // ── Confidence section ───────────────────────────────────────────────
    let confidence_bullet = match inputs.confidence {
        Some(tier) => format!("Stated confidence: {tier}"),
        None => "No stated confidence this week".to_string(),
    };

    let sections = vec![
        ExplainerSection {
            title: "Alignment".to_string(),
            points: components.alignment,
            max_points: 40.0,
            bullets: alignment_bullets,
        },
        ExplainerSection {
            title: "Evidence".to_string(),
            points: components.evidence,
            max_points: 30.0,
            bullets: vec![evidence_bullet],
        },
        ExplainerSection {
            title: "Tripwires".to_string(),
            points: components.tripwires,
            max_points: 20.0,
            bullets: vec![tripwire_bullet],
        },
        ExplainerSection {
            title: "Confidence".to_string(),
            points: components.confidence,
            max_points: 10.0,
            bullets: vec![confidence_bullet],
        },
    ];

    // ── What would change it ─────────────────────────────────────────────
    // Only levers attached to components that are currently losing points.
    let mut what_would_change = Vec::new();

    let max_drift = inputs
        .btc_drift
        .unwrap_or(0.0)
        .abs()
        .max(inputs.spy_drift.unwrap_or(0.0).abs());
    if max_drift >= BIG_DRIFT_PCT {
        what_would_change.push(format!(
            "A weekly close back inside the band would recover up to {:.0} alignment points",
            40.0 - components.alignment
        ));
    }
    if pending {
        what_would_change.push(
            "A computable band check would replace the neutral 20-point alignment placeholder"
                .to_string(),
        );
    }
    if components.evidence < 30.0 {
        what_would_change
            .push("Support delta at +0.8 or better would max the evidence component".to_string());
    }
    if summary.risk > 0 {
        what_would_change.push(format!(
            "Clearing {} risk tripwire(s) would recover up to {:.0} points",
            summary.risk,
            4.0 * summary.risk as f64
        ));
    }
    if components.confidence < 10.0 {
        what_would_change.push(
            "A wider probability lead on fuller data would lift the confidence component"
                .to_string(),
        );
    }

    IntegrityExplainer {
        sections,
        what_would_change,
    }
}

fn drift_bullet(asset: &str, drift: Option<f64>) -> String {
    match drift {
        None => format!("{asset}: no band check this week"),
        Some(d) if d == 0.0 => format!("{asset}: inside the published band"),
        Some(d) => format!("{asset}: {:.1}% outside the band", d.abs()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn summary(confirming: usize, watching: usize, risk: usize) -> TripwireSummary {
        TripwireSummary {
            confirming,
            watching,
            risk,
            unknown: 0,
        }
    }

    fn inputs(
        confidence: Option<ConfidenceTier>,
        btc_drift: Option<f64>,
        spy_drift: Option<f64>,
        support_delta: f64,
        tripwires: TripwireSummary,
    ) -> IntegrityInputs {
        IntegrityInputs {
            scenario: Scenario::Base,
            confidence,
            btc_drift,
            spy_drift,
            support_delta,
            tripwires,
        }
    }

    // ---- evidence_points -------------------------------------------------

    #[test]
    fn evidence_piecewise_values() {
        assert!((evidence_points(1.2) - 30.0).abs() < 1e-12);
        assert!((evidence_points(0.8) - 30.0).abs() < 1e-12);
        assert!((evidence_points(0.6) - 27.0).abs() < 1e-12);
        assert!((evidence_points(0.4) - 24.0).abs() < 1e-12);
        assert!((evidence_points(0.2) - 21.0).abs() < 1e-12);
        assert!((evidence_points(0.0) - 18.0).abs() < 1e-12);
        assert!((evidence_points(-0.2) - 9.0).abs() < 1e-12);
        assert!((evidence_points(-0.4) - 6.0).abs() < 1e-12);
        assert!((evidence_points(-1.5) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn evidence_stays_in_component_bounds() {
        for x in [-5.0, -0.79, -0.5, -0.1, 0.0, 0.3, 0.7, 0.8, 5.0] {
            let points = evidence_points(x);
            assert!((0.0..=30.0).contains(&points), "x={x} -> {points}");
        }
    }

    // ---- compose_path_integrity -----------------------------------------

    #[test]
    fn strong_week_scores_at_least_eighty() {
        let current = inputs(
            Some(ConfidenceTier::High),
            Some(0.0),
            Some(0.0),
            0.9,
            summary(3, 0, 0),
        );
        let integrity = compose_path_integrity(&current, None);
        assert!(integrity.score >= 80);
        assert!(matches!(integrity.grade, Grade::A | Grade::B));
        assert!((integrity.components.alignment - 40.0).abs() < 1e-9);
        assert!((integrity.components.evidence - 30.0).abs() < 1e-9);
        assert!((integrity.components.confidence - 10.0).abs() < 1e-9);
    }

    #[test]
    fn broken_week_scores_at_most_fifty() {
        let current = inputs(
            Some(ConfidenceTier::Low),
            Some(-2.5),
            Some(3.0),
            -0.9,
            summary(0, 0, 2),
        );
        let integrity = compose_path_integrity(&current, None);
        assert!(integrity.score <= 50);
        assert!(matches!(integrity.grade, Grade::D | Grade::F));
    }

    #[test]
    fn component_caps_hold_under_extremes() {
        let current = inputs(
            Some(ConfidenceTier::High),
            Some(-50.0),
            Some(50.0),
            10.0,
            summary(10, 0, 0),
        );
        let integrity = compose_path_integrity(&current, None);
        // Each drift penalty caps at 20, so alignment bottoms out at zero.
        assert!((integrity.components.alignment - 0.0).abs() < 1e-9);
        assert!((integrity.components.evidence - 30.0).abs() < 1e-9);
        assert!((integrity.components.tripwires - 20.0).abs() < 1e-9);
        assert!((integrity.components.confidence - 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_alignment_is_exactly_twenty_with_note() {
        let current = inputs(Some(ConfidenceTier::Medium), None, None, 0.0, summary(0, 0, 0));
        let integrity = compose_path_integrity(&current, None);
        assert!((integrity.components.alignment - 20.0).abs() < 1e-12);
        assert!(integrity
            .notes
            .iter()
            .any(|n| n.to_lowercase().contains("pending") || n.to_lowercase().contains("partial")));
    }

    #[test]
    fn one_sided_drift_is_computed_not_pending() {
        let current = inputs(
            Some(ConfidenceTier::Medium),
            Some(3.0),
            None,
            0.0,
            summary(0, 0, 0),
        );
        let integrity = compose_path_integrity(&current, None);
        // 40 − min(20, 3×5) with no penalty for the uncomputed asset.
        assert!((integrity.components.alignment - 25.0).abs() < 1e-9);
        assert!(!integrity
            .notes
            .iter()
            .any(|n| n.to_lowercase().contains("pending")));
    }

    #[test]
    fn delta_wow_requires_prior_inputs() {
        let current = inputs(
            Some(ConfidenceTier::High),
            Some(0.0),
            Some(0.0),
            0.9,
            summary(2, 1, 0),
        );
        let integrity = compose_path_integrity(&current, None);
        assert!(integrity.delta_wow.is_none());

        let prior = inputs(
            Some(ConfidenceTier::Medium),
            Some(0.0),
            Some(-1.0),
            0.2,
            summary(1, 2, 1),
        );
        let integrity = compose_path_integrity(&current, Some(&prior));
        let delta = integrity.delta_wow.unwrap();
        assert!(delta.is_finite());
        assert!(delta > 0.0);
    }

    #[test]
    fn tripwire_asymmetry() {
        let confirming_week = inputs(None, Some(0.0), Some(0.0), 0.0, summary(1, 0, 0));
        let risk_week = inputs(None, Some(0.0), Some(0.0), 0.0, summary(0, 0, 1));
        let up = compose_path_integrity(&confirming_week, None).components.tripwires - 14.0;
        let down = 14.0 - compose_path_integrity(&risk_week, None).components.tripwires;
        assert!((up - 1.5).abs() < 1e-12);
        assert!((down - 4.0).abs() < 1e-12);
    }

    #[test]
    fn notes_are_capped_at_five() {
        let current = inputs(None, None, None, -1.0, summary(0, 0, 3));
        let integrity = compose_path_integrity(&current, None);
        assert!(integrity.notes.len() <= 5);
    }

    // ---- build_explainer -------------------------------------------------

    #[test]
    fn explainer_carries_literal_points() {
        let current = inputs(
            Some(ConfidenceTier::High),
            Some(0.0),
            Some(0.0),
            0.9,
            summary(3, 0, 0),
        );
        let integrity = compose_path_integrity(&current, None);
        let explainer = build_explainer(&current, &integrity);
        assert_eq!(explainer.sections.len(), 4);
        assert_eq!(explainer.sections[0].title, "Alignment");
        assert!((explainer.sections[0].points - integrity.components.alignment).abs() < 1e-12);
        assert!((explainer.sections[1].points - 30.0).abs() < 1e-12);
    }

    #[test]
    fn big_drift_lever_only_when_drift_is_big() {
        let calm = inputs(
            Some(ConfidenceTier::High),
            Some(0.0),
            Some(-1.0),
            0.9,
            summary(0, 0, 0),
        );
        let integrity = compose_path_integrity(&calm, None);
        let explainer = build_explainer(&calm, &integrity);
        assert!(!explainer
            .what_would_change
            .iter()
            .any(|l| l.contains("back inside the band")));

        let drifted = inputs(
            Some(ConfidenceTier::High),
            Some(-2.4),
            Some(0.0),
            0.9,
            summary(0, 0, 0),
        );
        let integrity = compose_path_integrity(&drifted, None);
        let explainer = build_explainer(&drifted, &integrity);
        assert!(explainer
            .what_would_change
            .iter()
            .any(|l| l.contains("back inside the band")));
    }

    #[test]
    fn pending_alignment_surfaces_in_explainer() {
        let current = inputs(None, None, None, 0.0, summary(0, 0, 0));
        let integrity = compose_path_integrity(&current, None);
        let explainer = build_explainer(&current, &integrity);
        assert!(explainer.sections[0]
            .bullets
            .iter()
            .any(|b| b.contains("pending")));
        assert!(explainer
            .what_would_change
            .iter()
            .any(|l| l.contains("placeholder")));
    }
}
