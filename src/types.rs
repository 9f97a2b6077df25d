// =============================================================================
// Shared types used across the Pathline forecast engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// One named branch of the standing forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Bull,
    Base,
    Bear,
}

impl Scenario {
    /// Fixed evaluation order. Ties in probability or support are broken by
    /// this order (first max wins), so every scan over scenarios must use it.
    pub const ALL: [Scenario; 3] = [Scenario::Bull, Scenario::Base, Scenario::Bear];
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bull => write!(f, "Bull"),
            Self::Base => write!(f, "Base"),
            Self::Bear => write!(f, "Bear"),
        }
    }
}

/// Classified weekly state of a single indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorState {
    Bullish,
    Neutral,
    Bearish,
}

impl std::fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Neutral => write!(f, "neutral"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}

/// Stated confidence in the week's active scenario read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// One-tier downgrade applied under VIX stress. Low stays low.
    pub fn downgraded(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Whether a tripwire bullet confirms the path or would invalidate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripwireKind {
    Checkpoint,
    Invalidation,
}

/// Weekly-computed status of a tripwire bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripwireStatus {
    Confirming,
    Watching,
    Risk,
    Unknown,
}

impl std::fmt::Display for TripwireStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirming => write!(f, "confirming"),
            Self::Watching => write!(f, "watching"),
            Self::Risk => write!(f, "risk"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Letter grade for the composite path-integrity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Map a 0–100 composite score onto a grade.
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 85 => Self::A,
            s if s >= 70 => Self::B,
            s if s >= 55 => Self::C,
            s if s >= 40 => Self::D,
            _ => Self::F,
        }
    }

    /// Human-readable label paired with the grade.
    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "On-path",
            Self::B => "Mostly on-path",
            Self::C => "Wobbling",
            Self::D => "Off-path",
            Self::F => "Broken trend",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
            Self::D => write!(f, "D"),
            Self::F => write!(f, "F"),
        }
    }
}
