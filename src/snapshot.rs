// =============================================================================
// Weekly Snapshot — Auditable record of one computed week
// =============================================================================
//
// Every weekly evaluation produces exactly one snapshot. Snapshots are never
// mutated: a recomputed week gets a fresh envelope (new id, new timestamp),
// and the config version pins which forecast document the numbers were
// computed against.
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::alignment::AlignmentResult;
use crate::integrity::{IntegrityExplainer, PathIntegrity};
use crate::scoring::ScenarioScoreSet;
use crate::tripwire::{TripwireResult, TripwireSummary};

/// Complete result set for one week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySnapshot {
    /// Unique identifier for this evaluation (UUID v4).
    pub id: String,

    pub week_ending: NaiveDate,

    /// Version of the forecast config this week was computed against.
    pub config_version: String,

    /// ISO 8601 timestamp of when this snapshot was created.
    pub created_at: String,

    pub scores: ScenarioScoreSet,

    pub alignment: AlignmentResult,

    pub support_delta: f64,

    pub tripwires: Vec<TripwireResult>,
    pub tripwire_summary: TripwireSummary,

    pub integrity: PathIntegrity,
    pub explainer: IntegrityExplainer,
}

impl WeeklySnapshot {
    /// Stamp a fresh envelope around a week's computed results. The tripwire
    /// summary is re-derived from the results so the two can never disagree.
    pub fn stamp(
        week_ending: NaiveDate,
        config_version: impl Into<String>,
        scores: ScenarioScoreSet,
        alignment: AlignmentResult,
        support_delta: f64,
        tripwires: Vec<TripwireResult>,
        integrity: PathIntegrity,
        explainer: IntegrityExplainer,
    ) -> Self {
        let tripwire_summary = TripwireSummary::from_results(&tripwires);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            week_ending,
            config_version: config_version.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            scores,
            alignment,
            support_delta,
            tripwires,
            tripwire_summary,
            integrity,
            explainer,
        }
    }
}
