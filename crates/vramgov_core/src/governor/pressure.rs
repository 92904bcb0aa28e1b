//! Discrete memory pressure classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::budget::BudgetConfig;

/// Memory pressure level, ordered from idle to critical.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PressureLevel {
    /// Below the low threshold.
    #[default]
    None,
    /// At or above the low threshold.
    Low,
    /// At or above the medium threshold.
    Medium,
    /// At or above the high threshold. Triggers cleanup on entry.
    High,
    /// At or above the critical threshold. Triggers an emergency purge on entry.
    Critical,
}

impl PressureLevel {
    /// Classifies a usage ratio (`usage / cap`) against the configured thresholds.
    ///
    /// A ratio equal to a threshold maps to the higher level.
    #[must_use]
    pub fn classify(ratio: f64, config: &BudgetConfig) -> Self {
        if ratio >= config.critical_pressure_threshold {
            Self::Critical
        } else if ratio >= config.high_pressure_threshold {
            Self::High
        } else if ratio >= config.medium_pressure_threshold {
            Self::Medium
        } else if ratio >= config.low_pressure_threshold {
            Self::Low
        } else {
            Self::None
        }
    }

    /// Returns the display name of this level.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Returns true if this level should trigger a cleanup pass.
    #[must_use]
    pub fn requires_cleanup(self) -> bool {
        self >= Self::High
    }
}

impl fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
