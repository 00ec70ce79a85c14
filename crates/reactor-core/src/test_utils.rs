//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::component::{Category, ResolvedComponent, ValveKind};
use crate::config::EngineConfig;
use crate::engine::Engine;

// ===========================================================================
// Engines
// ===========================================================================

/// Default config with a fully active `rows` x `cols` grid.
pub fn grid_config(rows: u32, cols: u32) -> EngineConfig {
    EngineConfig {
        max_rows: rows,
        max_cols: cols,
        active_rows: rows,
        active_cols: cols,
        ..EngineConfig::default()
    }
}

/// A running engine over a fully active `rows` x `cols` grid with no-op
/// collaborators.
pub fn small_engine(rows: u32, cols: u32) -> Engine {
    Engine::new(grid_config(rows, cols)).expect("test grid config is valid")
}

// ===========================================================================
// Components
// ===========================================================================

fn part(name: &str, category: Category, cost: f64) -> ResolvedComponent {
    let mut c = ResolvedComponent::new(name, category);
    c.cost = cost;
    c
}

/// 1 power, 1 heat, 15 ticks.
pub fn uranium_cell() -> ResolvedComponent {
    let mut c = part("uranium_cell", Category::Cell, 10.0);
    c.base_power = 1.0;
    c.power = 1.0;
    c.base_heat = 1.0;
    c.heat = 1.0;
    c.base_ticks = 15.0;
    c.ticks = 15.0;
    c
}

/// +5% power to adjacent cells, 100 ticks.
pub fn neutron_reflector() -> ResolvedComponent {
    let mut c = part("neutron_reflector", Category::Reflector, 500.0);
    c.reflector_power_bonus = 5.0;
    c.base_ticks = 100.0;
    c.ticks = 100.0;
    c
}

/// Vents 4 per tick, holds 80.
pub fn basic_vent() -> ResolvedComponent {
    let mut c = part("vent", Category::Vent, 50.0);
    c.vent = 4.0;
    c.containment = 80.0;
    c
}

/// Transfers up to 80 per tick, holds 160.
pub fn heat_exchanger() -> ResolvedComponent {
    let mut c = part("heat_exchanger", Category::HeatExchanger, 160.0);
    c.transfer = 80.0;
    c.containment = 160.0;
    c
}

/// Pushes up to 100 core heat per neighbor per tick.
pub fn heat_outlet() -> ResolvedComponent {
    let mut c = part("heat_outlet", Category::HeatOutlet, 160.0);
    c.transfer = 100.0;
    c
}

/// Pulls up to 100 heat per neighbor per tick into the core.
pub fn heat_inlet() -> ResolvedComponent {
    let mut c = part("heat_inlet", Category::HeatInlet, 160.0);
    c.transfer = 100.0;
    c
}

/// Passive vessel holding 200.
pub fn coolant_cell() -> ResolvedComponent {
    let mut c = part("coolant_cell", Category::CoolantCell, 500.0);
    c.containment = 200.0;
    c
}

/// Check valve moving up to 20 per tick.
pub fn check_valve() -> ResolvedComponent {
    let mut c = part("check_valve", Category::Valve, 1000.0);
    c.transfer = 20.0;
    c.valve = ValveKind::Check;
    c
}

/// +100 max power, +1% global vent per level.
pub fn capacitor() -> ResolvedComponent {
    let mut c = part("capacitor", Category::Capacitor, 1000.0);
    c.reactor_power = 100.0;
    c.vent_bonus_pct = 1.0;
    c
}

/// +100 max heat, +1% global transfer per level.
pub fn reactor_plating() -> ResolvedComponent {
    let mut c = part("reactor_plating", Category::ReactorPlating, 1000.0);
    c.reactor_heat = 100.0;
    c.transfer_bonus_pct = 1.0;
    c
}

/// Converts heat above 50 into particles, holds 1000.
pub fn particle_accelerator() -> ResolvedComponent {
    let mut c = part("particle_accelerator", Category::ParticleAccelerator, 1e6);
    c.ep_heat_threshold = 50.0;
    c.containment = 1000.0;
    c
}
