//! Upgrade-derived inputs read during resolution.
//!
//! The progression collaborator owns upgrade levels and writes the derived
//! values here whenever they change. The engine only reads them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Drain banked time into the multiplier while cells are active.
    pub time_flux: bool,
    /// Active venting level. Vents gain `level * adjacent capacitor levels`
    /// percent. Zero disables.
    pub active_venting: f64,
    /// Heat feedback level. Above 1000 core heat, cell power is scaled by
    /// `1 + level * log(heat) / log(1000) / 100`. Zero disables.
    pub heat_power_multiplier: f64,
    /// Global power multiplier. The part above 1.0 is applied as a separate
    /// power increment.
    pub power_multiplier: f64,
    pub auto_sell: bool,
    /// Fraction of max power sold per tick while auto-sell is on.
    pub auto_sell_multiplier: f64,
    /// Passive core heat dissipation of `max_heat / 10 000` per tick.
    pub heat_control: bool,
    /// Tick period after upgrades. `None` uses the configured period.
    pub tick_period_ms: Option<f64>,
}

impl Modifiers {
    /// Divisor of max heat for passive dissipation under heat control.
    pub const HEAT_CONTROL_DIVISOR: f64 = 10_000.0;
    /// Core heat above which heat feedback starts scaling power.
    pub const HEAT_FEEDBACK_FLOOR: f64 = 1000.0;
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            time_flux: false,
            active_venting: 0.0,
            heat_power_multiplier: 0.0,
            power_multiplier: 1.0,
            auto_sell: false,
            auto_sell_multiplier: 0.0,
            heat_control: false,
            tick_period_ms: None,
        }
    }
}
