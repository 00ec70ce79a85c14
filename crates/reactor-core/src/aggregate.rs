//! The reactor aggregator: recomputes every global total from the active
//! tiles.
//!
//! [`recompute`] runs in three passes:
//!
//! 1. **Reset** -- working power/heat of every active tile is re-seeded from
//!    its snapshot (lifespan-bearing components only, zero otherwise).
//! 2. **Accumulate** -- reflector and heat-feedback scaling of cells,
//!    contained heat, capacity bonuses and the level-weighted global
//!    vent/transfer percentages.
//! 3. **Finalize** -- per-category effective vent/transfer totals, max
//!    power/heat, cash rate, sanitization.
//!
//! The function is idempotent: running it twice in a row yields identical
//! state. It never touches `current_heat` and only lowers `current_power`
//! when capacity shrank below it.

use crate::component::{Category, ComponentCatalog};
use crate::grid::Grid;
use crate::modifiers::Modifiers;
use crate::reactor::{ReactorState, ReactorStats, finite_or, sanitize};

/// Recompute every aggregate total and refresh `reactor.stats`.
pub fn recompute(
    grid: &mut Grid,
    catalog: &ComponentCatalog,
    reactor: &mut ReactorState,
    modifiers: &Modifiers,
) {
    grid.refresh_adjacency(catalog);
    let active = grid.active_indices();

    // -- Reset --
    for &idx in &active {
        let (power, heat) = match grid.component_of(idx, catalog) {
            Some(c) if c.has_lifespan() => (c.working_power(), c.working_heat()),
            _ => (0.0, 0.0),
        };
        let tile = grid.tile_mut(idx);
        tile.power = power;
        tile.heat = heat;
    }

    // -- Accumulate --
    let mut power_per_tick = 0.0;
    let mut heat_per_tick = 0.0;
    let mut total_heat_contained = 0.0;
    let mut max_power_bonus = 0.0;
    let mut max_heat_bonus = 0.0;
    let mut vent_pct = 0.0;
    let mut transfer_pct = 0.0;

    let feedback = heat_feedback_factor(reactor.current_heat, modifiers.heat_power_multiplier);

    for &idx in &active {
        let Some(component) = grid.component_of(idx, catalog) else {
            continue;
        };
        let tile = grid.tile(idx);

        if component.category == Category::Cell && tile.ticks_remaining > 0.0 {
            let (power_bonus, heat_bonus) = reflector_bonuses(grid, catalog, idx);
            let power_factor = (1.0 + power_bonus / 100.0).max(0.0);
            let heat_factor = (1.0 + heat_bonus / 100.0).max(0.0);

            let power = finite_or(tile.power * power_factor * feedback, component.working_power());
            let heat = finite_or(tile.heat * heat_factor, component.working_heat());

            let tile = grid.tile_mut(idx);
            tile.power = power.max(0.0);
            tile.heat = heat.max(0.0);
            power_per_tick += tile.power;
            heat_per_tick += tile.heat;
        }

        if component.is_containment_capable() {
            total_heat_contained += grid.tile(idx).heat_contained;
        }

        max_power_bonus += finite_or(component.reactor_power, 0.0);
        max_heat_bonus += finite_or(component.reactor_heat, 0.0);
        if component.heat_bonus_feeds_power {
            max_power_bonus += finite_or(component.reactor_heat, 0.0);
        }

        if component.category.contributes_global_multipliers() {
            let level = f64::from(component.level);
            vent_pct += finite_or(component.vent_bonus_pct, 0.0) * level;
            transfer_pct += finite_or(component.transfer_bonus_pct, 0.0) * level;
        }
    }

    reactor.vent_multiplier_pct = sanitize(vent_pct);
    reactor.transfer_multiplier_pct = sanitize(transfer_pct);

    // -- Finalize --
    let mut vent_totals = [0.0; Category::COUNT];
    let mut transfer_totals = [0.0; Category::COUNT];
    for &idx in &active {
        let Some(component) = grid.component_of(idx, catalog) else {
            continue;
        };
        let cat = component.category.index();
        vent_totals[cat] += effective_vent_value(grid, catalog, reactor, modifiers, idx);
        transfer_totals[cat] += effective_transfer_value(grid, catalog, reactor, idx);
    }

    reactor.max_power = sanitize(reactor.base_max_power + max_power_bonus).max(0.0);
    reactor.max_heat = sanitize(reactor.base_max_heat + max_heat_bonus).max(0.0);
    reactor.current_power = sanitize(reactor.current_power).min(reactor.max_power);
    reactor.current_heat = sanitize(reactor.current_heat);

    let auto_sell_multiplier = finite_or(modifiers.auto_sell_multiplier, 0.0);
    reactor.stats = ReactorStats {
        current_power: reactor.current_power,
        max_power: reactor.max_power,
        current_heat: reactor.current_heat,
        max_heat: reactor.max_heat,
        power_per_tick: sanitize(power_per_tick),
        heat_per_tick: sanitize(heat_per_tick),
        total_heat_contained: sanitize(total_heat_contained),
        vent_totals: vent_totals.map(sanitize),
        transfer_totals: transfer_totals.map(sanitize),
        cash_rate: sanitize(reactor.max_power * auto_sell_multiplier),
        melted_down: reactor.melted_down,
    };
}

/// Power scale from core heat. 1.0 unless heat feedback is enabled and core
/// heat is above [`Modifiers::HEAT_FEEDBACK_FLOOR`].
pub fn heat_feedback_factor(current_heat: f64, level: f64) -> f64 {
    let enabled = level > 0.0 && current_heat > Modifiers::HEAT_FEEDBACK_FLOOR;
    if !enabled {
        return 1.0;
    }
    let factor = 1.0 + level * current_heat.ln() / Modifiers::HEAT_FEEDBACK_FLOOR.ln() / 100.0;
    finite_or(factor, 1.0)
}

/// Summed power and heat bonus percentages from the reflectors next to a
/// tile. A reflector with a lifespan only reflects while it has ticks left.
fn reflector_bonuses(grid: &Grid, catalog: &ComponentCatalog, idx: usize) -> (f64, f64) {
    let mut power = 0.0;
    let mut heat = 0.0;
    for &r in grid.tile(idx).adjacency().reflectors() {
        let Some(reflector) = grid.component_of(r, catalog) else {
            continue;
        };
        if reflector.has_lifespan() && grid.tile(r).ticks_remaining <= 0.0 {
            continue;
        }
        power += finite_or(reflector.reflector_power_bonus, 0.0);
        heat += finite_or(reflector.reflector_heat_bonus, 0.0);
    }
    (power, heat)
}

// ---------------------------------------------------------------------------
// Effective rates
// ---------------------------------------------------------------------------

/// Vent rate of a tile after the global vent percentage and, for vents, the
/// active-venting bonus from adjacent capacitors. Never negative.
pub fn effective_vent_value(
    grid: &Grid,
    catalog: &ComponentCatalog,
    reactor: &ReactorState,
    modifiers: &Modifiers,
    idx: usize,
) -> f64 {
    let Some(component) = grid.component_of(idx, catalog) else {
        return 0.0;
    };
    let base = finite_or(component.vent, 0.0);
    if base <= 0.0 {
        return 0.0;
    }

    let mut pct = reactor.vent_multiplier_pct;
    let active_venting = finite_or(modifiers.active_venting, 0.0);
    if active_venting > 0.0 && component.category == Category::Vent {
        let pos = grid.tile(idx).position;
        let capacitor_levels: f64 = grid
            .neighbors_in_range(pos, 1)
            .filter(|n| n.is_active())
            .filter_map(|n| n.component().and_then(|id| catalog.get(id)))
            .filter(|c| c.category == Category::Capacitor)
            .map(|c| f64::from(c.level))
            .sum();
        pct += active_venting * capacitor_levels;
    }

    finite_or(base * (1.0 + pct / 100.0), 0.0).max(0.0)
}

/// Transfer rate of a tile after the global transfer percentage. Never
/// negative.
pub fn effective_transfer_value(
    grid: &Grid,
    catalog: &ComponentCatalog,
    reactor: &ReactorState,
    idx: usize,
) -> f64 {
    let Some(component) = grid.component_of(idx, catalog) else {
        return 0.0;
    };
    let base = finite_or(component.transfer, 0.0);
    if base <= 0.0 {
        return 0.0;
    }
    finite_or(base * (1.0 + reactor.transfer_multiplier_pct / 100.0), 0.0).max(0.0)
}
