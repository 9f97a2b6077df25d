// =============================================================================
// Scoring Module
// =============================================================================
//
// Evidence pipeline for the weekly evaluation:
// - Evidence scorer (prior-seeded log-odds → calibrated probabilities)
// - Support-delta reduction (active scenario vs. best rival)

pub mod evidence;
pub mod support;

pub use evidence::{score_evidence, softmax, Contributor, ScenarioScoreSet};
pub use support::{scenario_support, support_delta};
