//! Engine configuration: timing, difficulty and grid extent.
//!
//! Values are fixed for a session. Upgrade-driven inputs that change during
//! play live in [`crate::modifiers::Modifiers`] instead.

use serde::{Deserialize, Serialize};

/// Errors from [`EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick period must be positive and finite, got {0}")]
    TickPeriod(f64),
    #[error("offline threshold must be non-negative and finite, got {0}")]
    OfflineThreshold(f64),
    #[error("max multiplier must be positive and finite, got {0}")]
    MaxMultiplier(f64),
    #[error("overflow-to-heat ratio must lie in [0, 1], got {0}")]
    OverflowRatio(f64),
    #[error("grid extent must be at least 1x1, got {rows}x{cols}")]
    EmptyGrid { rows: u32, cols: u32 },
    #[error("active extent {rows}x{cols} exceeds allocated extent {max_rows}x{max_cols}")]
    ActiveExceedsMax {
        rows: u32,
        cols: u32,
        max_rows: u32,
        max_cols: u32,
    },
    #[error("base capacity must be non-negative and finite: {0}")]
    BaseCapacity(&'static str),
}

/// Session-wide engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Real-time duration of one tick at multiplier 1.0.
    pub tick_period_ms: f64,
    /// Idle gaps longer than this are banked for later catch-up.
    pub offline_threshold_ms: f64,
    /// Ceiling on the multiplier applied to a single frame.
    pub max_multiplier: f64,
    /// Fraction of overflowing power converted to heat (difficulty).
    pub overflow_to_heat_ratio: f64,
    pub max_rows: u32,
    pub max_cols: u32,
    pub active_rows: u32,
    pub active_cols: u32,
    pub base_max_power: f64,
    pub base_max_heat: f64,
    /// Ring buffer capacity per event kind.
    pub event_buffer_capacity: usize,
}

impl EngineConfig {
    pub const DEFAULT_TICK_PERIOD_MS: f64 = 1000.0;
    pub const DEFAULT_OFFLINE_THRESHOLD_MS: f64 = 30_000.0;
    pub const DEFAULT_MAX_MULTIPLIER: f64 = 10.0;

    /// Check every field. The engine refuses to start with an invalid config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_period_ms.is_finite() && self.tick_period_ms > 0.0) {
            return Err(ConfigError::TickPeriod(self.tick_period_ms));
        }
        if !(self.offline_threshold_ms.is_finite() && self.offline_threshold_ms >= 0.0) {
            return Err(ConfigError::OfflineThreshold(self.offline_threshold_ms));
        }
        if !(self.max_multiplier.is_finite() && self.max_multiplier > 0.0) {
            return Err(ConfigError::MaxMultiplier(self.max_multiplier));
        }
        if !(0.0..=1.0).contains(&self.overflow_to_heat_ratio) {
            return Err(ConfigError::OverflowRatio(self.overflow_to_heat_ratio));
        }
        if self.max_rows == 0 || self.max_cols == 0 {
            return Err(ConfigError::EmptyGrid {
                rows: self.max_rows,
                cols: self.max_cols,
            });
        }
        if self.active_rows > self.max_rows || self.active_cols > self.max_cols {
            return Err(ConfigError::ActiveExceedsMax {
                rows: self.active_rows,
                cols: self.active_cols,
                max_rows: self.max_rows,
                max_cols: self.max_cols,
            });
        }
        if !(self.base_max_power.is_finite() && self.base_max_power >= 0.0) {
            return Err(ConfigError::BaseCapacity("base_max_power"));
        }
        if !(self.base_max_heat.is_finite() && self.base_max_heat >= 0.0) {
            return Err(ConfigError::BaseCapacity("base_max_heat"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: Self::DEFAULT_TICK_PERIOD_MS,
            offline_threshold_ms: Self::DEFAULT_OFFLINE_THRESHOLD_MS,
            max_multiplier: Self::DEFAULT_MAX_MULTIPLIER,
            overflow_to_heat_ratio: 1.0,
            max_rows: 32,
            max_cols: 32,
            active_rows: 12,
            active_cols: 12,
            base_max_power: 100.0,
            base_max_heat: 1000.0,
            event_buffer_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_ratio_outside_unit_interval() {
        let config = EngineConfig {
            overflow_to_heat_ratio: 1.5,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::OverflowRatio(1.5)));
    }

    #[test]
    fn rejects_zero_tick_period() {
        let config = EngineConfig {
            tick_period_ms: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::TickPeriod(_))));
    }

    #[test]
    fn rejects_active_extent_larger_than_allocation() {
        let config = EngineConfig {
            max_rows: 4,
            max_cols: 4,
            active_rows: 5,
            active_cols: 2,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ActiveExceedsMax { .. })
        ));
    }
}
