//! Budget configuration and the device-tier lookup table.

use serde::{Deserialize, Serialize};

use super::tier::DeviceTier;
use crate::error::{GovernorError, GovernorResult};
use crate::MIB;

/// Memory budget for the governor.
///
/// # Invariants
///
/// `0 < low < medium < high < critical <= 1.0` and
/// `cleanup_threshold_bytes < emergency_threshold_bytes <= vram_cap_bytes`.
/// The governor assumes these hold; [`BudgetConfig::validate`] checks them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Hard VRAM ceiling in bytes.
    pub vram_cap_bytes: u64,
    /// Device tier this budget was chosen for.
    pub device_tier: DeviceTier,
    /// Usage ratio at which pressure becomes `Low`.
    pub low_pressure_threshold: f64,
    /// Usage ratio at which pressure becomes `Medium`.
    pub medium_pressure_threshold: f64,
    /// Usage ratio at which pressure becomes `High`.
    pub high_pressure_threshold: f64,
    /// Usage ratio at which pressure becomes `Critical`.
    pub critical_pressure_threshold: f64,
    /// Usage at or above which a cleanup pass runs on every update.
    pub cleanup_threshold_bytes: u64,
    /// Usage at or above which an emergency purge runs on every update.
    pub emergency_threshold_bytes: u64,
    /// Enables cleanup passes.
    pub enable_auto_cleanup: bool,
    /// Enables emergency purges.
    pub enable_emergency_purge: bool,
    /// Frames between periodic statistics lines.
    pub log_interval_frames: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self::recommended(DeviceTier::MidRange)
    }
}

/// One row of the device-tier table, in MiB and usage ratios.
struct TierRow {
    cap_mib: u64,
    cleanup_mib: u64,
    emergency_mib: u64,
    thresholds: [f64; 4],
}

const fn tier_row(tier: DeviceTier) -> TierRow {
    match tier {
        DeviceTier::LowEnd => TierRow {
            cap_mib: 1024,
            cleanup_mib: 870,
            emergency_mib: 970,
            thresholds: [0.50, 0.65, 0.80, 0.90],
        },
        DeviceTier::MidRange => TierRow {
            cap_mib: 1536,
            cleanup_mib: 1280,
            emergency_mib: 1460,
            thresholds: [0.60, 0.75, 0.85, 0.95],
        },
        DeviceTier::HighEnd => TierRow {
            cap_mib: 2048,
            cleanup_mib: 1740,
            emergency_mib: 1940,
            thresholds: [0.65, 0.80, 0.90, 0.95],
        },
        DeviceTier::Flagship => TierRow {
            cap_mib: 3072,
            cleanup_mib: 2600,
            emergency_mib: 2900,
            thresholds: [0.70, 0.85, 0.92, 0.95],
        },
    }
}

impl BudgetConfig {
    /// Returns the recommended budget for a device tier.
    #[must_use]
    pub const fn recommended(tier: DeviceTier) -> Self {
        let row = tier_row(tier);
        Self {
            vram_cap_bytes: row.cap_mib * MIB,
            device_tier: tier,
            low_pressure_threshold: row.thresholds[0],
            medium_pressure_threshold: row.thresholds[1],
            high_pressure_threshold: row.thresholds[2],
            critical_pressure_threshold: row.thresholds[3],
            cleanup_threshold_bytes: row.cleanup_mib * MIB,
            emergency_threshold_bytes: row.emergency_mib * MIB,
            enable_auto_cleanup: true,
            enable_emergency_purge: true,
            log_interval_frames: 300,
        }
    }

    /// Builds a budget with the given cap and byte thresholds, keeping the
    /// default pressure ratios.
    #[must_use]
    pub fn with_limits(cap_bytes: u64, cleanup_bytes: u64, emergency_bytes: u64) -> Self {
        Self {
            vram_cap_bytes: cap_bytes,
            cleanup_threshold_bytes: cleanup_bytes,
            emergency_threshold_bytes: emergency_bytes,
            ..Self::default()
        }
    }

    /// Checks the threshold ordering invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::InvalidConfig`] naming the first violated rule.
    pub fn validate(&self) -> GovernorResult<()> {
        if self.vram_cap_bytes == 0 {
            return Err(GovernorError::InvalidConfig(
                "vram_cap_bytes must be greater than zero".to_string(),
            ));
        }

        let ratios = [
            self.low_pressure_threshold,
            self.medium_pressure_threshold,
            self.high_pressure_threshold,
            self.critical_pressure_threshold,
        ];
        let ascending = ratios.windows(2).all(|pair| pair[0] < pair[1]);
        if !(ratios[0] > 0.0 && ascending && ratios[3] <= 1.0) {
            return Err(GovernorError::InvalidConfig(format!(
                "pressure thresholds must satisfy 0 < low < medium < high < critical <= 1, got {ratios:?}"
            )));
        }

        if self.cleanup_threshold_bytes >= self.emergency_threshold_bytes {
            return Err(GovernorError::InvalidConfig(format!(
                "cleanup threshold ({}) must be below emergency threshold ({})",
                self.cleanup_threshold_bytes, self.emergency_threshold_bytes
            )));
        }
        if self.emergency_threshold_bytes > self.vram_cap_bytes {
            return Err(GovernorError::InvalidConfig(format!(
                "emergency threshold ({}) exceeds cap ({})",
                self.emergency_threshold_bytes, self.vram_cap_bytes
            )));
        }
        if self.log_interval_frames == 0 {
            return Err(GovernorError::InvalidConfig(
                "log_interval_frames must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tier_is_valid() {
        for tier in DeviceTier::ALL {
            let config = BudgetConfig::recommended(tier);
            assert!(config.validate().is_ok(), "{tier:?} table row is invalid");
            assert_eq!(config.device_tier, tier);
        }
    }

    #[test]
    fn test_tier_table_values() {
        let low = BudgetConfig::recommended(DeviceTier::LowEnd);
        assert_eq!(low.vram_cap_bytes, 1024 * MIB);
        assert_eq!(low.cleanup_threshold_bytes, 870 * MIB);
        assert_eq!(low.emergency_threshold_bytes, 970 * MIB);

        let flagship = BudgetConfig::recommended(DeviceTier::Flagship);
        assert_eq!(flagship.vram_cap_bytes, 3072 * MIB);
        assert!((flagship.high_pressure_threshold - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_unordered_ratios() {
        let mut config = BudgetConfig::default();
        config.medium_pressure_threshold = config.high_pressure_threshold;
        assert!(matches!(config.validate(), Err(GovernorError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_byte_thresholds() {
        let config = BudgetConfig::with_limits(1000 * MIB, 960 * MIB, 950 * MIB);
        assert!(config.validate().is_err());

        let config = BudgetConfig::with_limits(1000 * MIB, 800 * MIB, 1001 * MIB);
        assert!(config.validate().is_err());

        let config = BudgetConfig::with_limits(1000 * MIB, 800 * MIB, 950 * MIB);
        assert!(config.validate().is_ok());
    }
}
