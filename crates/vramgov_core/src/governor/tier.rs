//! Device memory tiers and the one-time system memory probe.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the kernel memory report.
pub const MEMINFO_PATH: &str = "/proc/meminfo";

/// Device class by total system memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceTier {
    /// Up to 3 GiB of system RAM.
    LowEnd,
    /// Up to 4.5 GiB of system RAM.
    #[default]
    MidRange,
    /// Up to 6.5 GiB of system RAM.
    HighEnd,
    /// More than 6.5 GiB of system RAM.
    Flagship,
}

impl DeviceTier {
    /// All tiers, smallest first.
    pub const ALL: [Self; 4] = [Self::LowEnd, Self::MidRange, Self::HighEnd, Self::Flagship];

    /// Classifies a device by its total system memory in KiB.
    #[must_use]
    pub const fn from_total_memory_kb(total_kb: u64) -> Self {
        let total_mb = total_kb / 1024;
        if total_mb <= 3072 {
            Self::LowEnd
        } else if total_mb <= 4608 {
            Self::MidRange
        } else if total_mb <= 6656 {
            Self::HighEnd
        } else {
            Self::Flagship
        }
    }

    /// Detects the tier of the running device from [`MEMINFO_PATH`].
    ///
    /// Falls back to [`DeviceTier::MidRange`] when the probe is unavailable.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_from(MEMINFO_PATH)
    }

    /// Detects the tier from a meminfo-formatted file.
    ///
    /// Falls back to [`DeviceTier::MidRange`] when the file cannot be read
    /// or carries no parsable `MemTotal` line.
    pub fn detect_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(
                    "Could not read {}: {}, defaulting to MidRange tier",
                    path.display(),
                    err
                );
                return Self::MidRange;
            }
        };

        match parse_mem_total_kb(&contents) {
            Some(total_kb) => {
                tracing::info!("Detected system RAM: {}MB", total_kb / 1024);
                Self::from_total_memory_kb(total_kb)
            }
            None => {
                tracing::warn!(
                    "No MemTotal entry in {}, defaulting to MidRange tier",
                    path.display()
                );
                Self::MidRange
            }
        }
    }
}

/// Extracts total memory in KiB from a `MemTotal: <number> kB` line.
#[must_use]
pub fn parse_mem_total_kb(meminfo: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let rest = line.strip_prefix("MemTotal:")?;
        let mut fields = rest.split_whitespace();
        let value = fields.next()?.parse().ok()?;
        match fields.next() {
            Some(unit) if unit.eq_ignore_ascii_case("kb") => Some(value),
            _ => None,
        }
    })
}
