//! The global reactor aggregate and its published display totals.

use serde::{Deserialize, Serialize};

use crate::component::Category;

/// Return `v` if it is finite, otherwise `fallback`.
#[inline]
pub fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

/// Sanitize a published total: non-finite values become zero.
#[inline]
pub(crate) fn sanitize(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        log::warn!("sanitized non-finite reactor total {v}");
        0.0
    }
}

// ---------------------------------------------------------------------------
// ReactorState
// ---------------------------------------------------------------------------

/// Reactor-wide state. Mutated only by the resolution routine, the
/// aggregator and the install/meltdown paths of the engine.
///
/// Heat has no ceiling. Power is capped at `max_power`; the excess of every
/// power increment is converted to heat (see [`crate::overflow`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorState {
    pub current_power: f64,
    pub current_heat: f64,
    pub max_power: f64,
    pub max_heat: f64,
    pub base_max_power: f64,
    pub base_max_heat: f64,
    /// Level-weighted global vent multiplier from capacitors and plating, in
    /// percent.
    pub vent_multiplier_pct: f64,
    /// Level-weighted global transfer multiplier, in percent.
    pub transfer_multiplier_pct: f64,
    pub melted_down: bool,
    /// Display totals from the most recent aggregator run.
    pub stats: ReactorStats,
}

impl ReactorState {
    pub fn new(base_max_power: f64, base_max_heat: f64) -> Self {
        Self {
            current_power: 0.0,
            current_heat: 0.0,
            max_power: base_max_power,
            max_heat: base_max_heat,
            base_max_power,
            base_max_heat,
            vent_multiplier_pct: 0.0,
            transfer_multiplier_pct: 0.0,
            melted_down: false,
            stats: ReactorStats::default(),
        }
    }

    /// Back to a fresh session: no power, no heat, not melted down.
    pub fn reset(&mut self) {
        *self = Self::new(self.base_max_power, self.base_max_heat);
    }

    /// Heat level at which the reactor melts down.
    pub fn meltdown_threshold(&self) -> f64 {
        2.0 * self.max_heat
    }

    pub fn is_past_meltdown(&self) -> bool {
        self.current_heat > self.meltdown_threshold()
    }
}

// ---------------------------------------------------------------------------
// ReactorStats
// ---------------------------------------------------------------------------

/// Totals published to the presentation collaborator after every
/// aggregator run. Every field is finite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactorStats {
    pub current_power: f64,
    pub max_power: f64,
    pub current_heat: f64,
    pub max_heat: f64,
    /// Summed working power of every active cell.
    pub power_per_tick: f64,
    /// Summed working heat of every active cell.
    pub heat_per_tick: f64,
    /// Heat held by every containment-capable tile.
    pub total_heat_contained: f64,
    /// Effective vent rate summed per category.
    pub vent_totals: [f64; Category::COUNT],
    /// Effective transfer rate summed per category.
    pub transfer_totals: [f64; Category::COUNT],
    /// Power sold per tick at the current auto-sell multiplier.
    pub cash_rate: f64,
    pub melted_down: bool,
}

impl ReactorStats {
    pub fn vent_total(&self, category: Category) -> f64 {
        self.vent_totals[category.index()]
    }

    pub fn transfer_total(&self, category: Category) -> f64 {
        self.transfer_totals[category.index()]
    }
}
