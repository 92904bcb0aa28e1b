//! # Governor Settings
//!
//! One TOML document configures all three components. Every section and
//! every field is optional; missing values fall back to the MidRange tier
//! defaults.
//!
//! ```toml
//! [budget]
//! vram_cap_bytes = 1073741824
//! cleanup_threshold_bytes = 912261120
//! emergency_threshold_bytes = 1017118720
//!
//! [eviction]
//! unused_frame_threshold = 90
//!
//! [pool]
//! initial_pool_size = 8
//! max_pool_size = 32
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GovernorError, GovernorResult};
use crate::eviction::EvictionConfig;
use crate::governor::{BudgetConfig, DeviceTier};
use crate::pool::PoolConfig;

/// Configuration for the governor, eviction policy and buffer pool.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorSettings {
    /// Governor budget.
    pub budget: BudgetConfig,
    /// Eviction policy thresholds.
    pub eviction: EvictionConfig,
    /// Buffer pool sizing.
    pub pool: PoolConfig,
}

impl GovernorSettings {
    /// Default settings with the recommended budget for `tier`.
    #[must_use]
    pub fn for_tier(tier: DeviceTier) -> Self {
        Self {
            budget: BudgetConfig::recommended(tier),
            ..Self::default()
        }
    }

    /// Parses and validates settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::Parse`] for malformed TOML and
    /// [`GovernorError::InvalidConfig`] if an invariant does not hold.
    pub fn from_toml_str(source: &str) -> GovernorResult<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads and validates settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::Io`] if the file cannot be read, otherwise
    /// the errors of [`GovernorSettings::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> GovernorResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| GovernorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::from_toml_str(&source)?;
        tracing::info!("Loaded governor settings from {}", path.display());
        Ok(settings)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`GovernorError::InvalidConfig`] found.
    pub fn validate(&self) -> GovernorResult<()> {
        self.budget.validate()?;
        self.eviction.validate()?;
        self.pool.validate()
    }
}
