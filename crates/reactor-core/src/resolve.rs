//! The per-tick resolution routine.
//!
//! Every phase is an `Engine` method scaled by the tick multiplier `m`.
//! Fractional multipliers are applied as-is: a 0.016 tick generates 1.6% of
//! a full tick's power and heat and consumes 0.016 ticks of lifespan.
//!
//! Tiles are visited in row-major order. Heat moved by one tile is visible
//! to tiles visited after it within the same tick.

use crate::aggregate::{self, effective_transfer_value, effective_vent_value};
use crate::component::{Category, ValveKind};
use crate::engine::Engine;
use crate::event::Event;
use crate::grid::GridPosition;
use crate::hooks::{DepletionAction, TileHint};
use crate::modifiers::Modifiers;
use crate::overflow::apply_power_increment;
use crate::reactor::{finite_or, sanitize};

impl Engine {
    // -----------------------------------------------------------------------
    // Phase 1: Generate
    // -----------------------------------------------------------------------

    /// Cells add power and heat; lifespan-bearing components wear down.
    pub(crate) fn phase_generate(&mut self, m: f64) {
        self.grid.refresh_adjacency(&self.catalog);
        let ratio = self.config.overflow_to_heat_ratio;
        let power_multiplier = finite_or(self.modifiers.power_multiplier, 1.0);
        let mut depleted = Vec::new();

        for idx in self.grid.active_indices() {
            let Some(component) = self.grid.component_of(idx, &self.catalog) else {
                continue;
            };
            let tile = self.grid.tile(idx);
            if tile.ticks_remaining <= 0.0 {
                continue;
            }

            let wears = match component.category {
                Category::Cell => {
                    let base = tile.power * m;
                    let heat = finite_or(tile.heat * m, 0.0).max(0.0);
                    apply_power_increment(&mut self.reactor, base, ratio);
                    if power_multiplier > 1.0 {
                        let bonus = base * (power_multiplier - 1.0);
                        apply_power_increment(&mut self.reactor, bonus, ratio);
                    }
                    self.reactor.current_heat += heat;
                    true
                }
                Category::Reflector => tile.adjacency().cells().iter().any(|&c| {
                    let neighbor = self.grid.tile(c);
                    neighbor.is_active() && neighbor.ticks_remaining > 0.0
                }),
                Category::Capacitor
                | Category::Vent
                | Category::HeatExchanger
                | Category::HeatInlet
                | Category::HeatOutlet
                | Category::Valve
                | Category::CoolantCell
                | Category::ReactorPlating
                | Category::ParticleAccelerator => false,
            };

            if wears {
                let tile = self.grid.tile_mut(idx);
                tile.ticks_remaining = (tile.ticks_remaining - m).max(0.0);
                if tile.ticks_remaining <= 0.0 {
                    depleted.push(idx);
                }
            }
        }

        for idx in depleted {
            self.deplete(idx);
        }
    }

    /// Ask the progression collaborator what happens to a spent component.
    fn deplete(&mut self, idx: usize) {
        let pos = self.grid.tile(idx).position;
        let Some(id) = self.grid.tile(idx).component else {
            return;
        };
        let Some(component) = self.catalog.get(id) else {
            return;
        };

        let action = self.progression.on_depleted(pos, component);
        let replaced = action == DepletionAction::Replace;
        log::debug!(
            "{} at ({}, {}) depleted, {}",
            component.name,
            pos.row,
            pos.col,
            if replaced { "replaced" } else { "cleared" }
        );

        match action {
            DepletionAction::Replace => {
                let fresh = component.starting_ticks();
                self.grid.tile_mut(idx).ticks_remaining = fresh;
            }
            DepletionAction::Clear => self.clear_tile(idx),
        }
        self.presentation.tile_hint(pos, TileHint::Depleted);
        self.event_bus.emit(Event::ComponentDepleted {
            position: pos,
            component: id,
            replaced,
            tick: self.tick,
        });
    }

    // -----------------------------------------------------------------------
    // Phase 2: Transfer
    // -----------------------------------------------------------------------

    /// Category-specific heat movement. Neighbors may be overfilled here;
    /// explosions are resolved in the next phase.
    pub(crate) fn phase_transfer(&mut self, m: f64) {
        self.grid.refresh_adjacency(&self.catalog);

        for idx in self.grid.active_indices() {
            let Some(category) = self.grid.component_of(idx, &self.catalog).map(|c| c.category)
            else {
                continue;
            };
            match category {
                Category::HeatOutlet => self.transfer_outlet(idx, m),
                Category::HeatInlet => self.transfer_inlet(idx, m),
                Category::HeatExchanger => self.transfer_exchanger(idx, m),
                Category::Vent => self.transfer_vent(idx, m),
                Category::Valve => self.transfer_valve(idx, m),
                Category::ParticleAccelerator => self.convert_particles(idx, m),
                // Capacity and multiplier contributions live in the aggregator;
                // cells and coolant only generate or hold heat.
                Category::Cell
                | Category::Reflector
                | Category::Capacitor
                | Category::CoolantCell
                | Category::ReactorPlating => {}
            }
        }
    }

    /// Push core heat into each containment neighbor within range, up to the
    /// transfer rate per neighbor.
    fn transfer_outlet(&mut self, idx: usize, m: f64) {
        let rate = effective_transfer_value(&self.grid, &self.catalog, &self.reactor, idx) * m;
        if rate <= 0.0 {
            return;
        }
        let targets = self.grid.tile(idx).adjacency().containment().to_vec();
        for n in targets {
            let amount = rate.min(self.reactor.current_heat).max(0.0);
            if amount <= 0.0 {
                break;
            }
            self.reactor.current_heat -= amount;
            self.grid.tile_mut(n).heat_contained += amount;
        }
    }

    /// Pull heat from each containment neighbor within range into the core,
    /// up to the transfer rate per neighbor.
    fn transfer_inlet(&mut self, idx: usize, m: f64) {
        let rate = effective_transfer_value(&self.grid, &self.catalog, &self.reactor, idx) * m;
        if rate <= 0.0 {
            return;
        }
        let sources = self.grid.tile(idx).adjacency().containment().to_vec();
        for n in sources {
            let tile = self.grid.tile_mut(n);
            let amount = rate.min(tile.heat_contained).max(0.0);
            tile.heat_contained -= amount;
            self.reactor.current_heat += amount;
        }
    }

    /// Move heat toward strictly cooler containment neighbors. No receiver
    /// ever ends hotter than the exchanger.
    fn transfer_exchanger(&mut self, idx: usize, m: f64) {
        let rate = effective_transfer_value(&self.grid, &self.catalog, &self.reactor, idx) * m;
        if rate <= 0.0 {
            return;
        }
        let own = self.grid.tile(idx).heat_contained;
        let cooler: Vec<(usize, f64)> = self
            .grid
            .tile(idx)
            .adjacency()
            .containment()
            .iter()
            .map(|&n| (n, self.grid.tile(n).heat_contained))
            .filter(|&(_, heat)| heat < own)
            .collect();
        if cooler.is_empty() {
            return;
        }

        let heats: Vec<f64> = cooler.iter().map(|&(_, h)| h).collect();
        let level = exchange_level(own, &heats, rate);
        let mut given = 0.0;
        for &(n, heat) in &cooler {
            let amount = (level - heat).clamp(0.0, rate);
            self.grid.tile_mut(n).heat_contained += amount;
            given += amount;
        }
        self.grid.tile_mut(idx).heat_contained = (own - given).max(0.0);
    }

    /// Vent own heat only.
    fn transfer_vent(&mut self, idx: usize, m: f64) {
        let rate = effective_vent_value(
            &self.grid,
            &self.catalog,
            &self.reactor,
            &self.modifiers,
            idx,
        ) * m;
        let tile = self.grid.tile_mut(idx);
        tile.heat_contained = (tile.heat_contained - rate.max(0.0)).max(0.0);
    }

    /// Move heat from the tile behind the valve to the tile in front of it.
    fn transfer_valve(&mut self, idx: usize, m: f64) {
        let Some(valve) = self.grid.component_of(idx, &self.catalog) else {
            return;
        };
        let kind = valve.valve;
        let rate = effective_transfer_value(&self.grid, &self.catalog, &self.reactor, idx) * m;
        if rate <= 0.0 {
            return;
        }

        let tile = self.grid.tile(idx);
        let dir = tile.orientation;
        let (Some(input), Some(output)) = (
            self.containment_at(tile.position.step(dir.opposite(), 1)),
            self.containment_at(tile.position.step(dir, 1)),
        ) else {
            return;
        };

        let (input_idx, input_capacity) = input;
        let (output_idx, output_capacity) = output;
        let input_heat = self.grid.tile(input_idx).heat_contained;
        let output_heat = self.grid.tile(output_idx).heat_contained;

        let open = match kind {
            ValveKind::Check => true,
            ValveKind::Overflow => input_heat >= input_capacity * ValveKind::OVERFLOW_FILL,
            ValveKind::TopUp => output_heat < output_capacity * ValveKind::TOP_UP_FILL,
        };
        if !open {
            return;
        }

        let amount = rate.min(input_heat).max(0.0);
        self.grid.tile_mut(input_idx).heat_contained -= amount;
        self.grid.tile_mut(output_idx).heat_contained += amount;
    }

    /// Index and capacity of an active containment-capable tile.
    fn containment_at(&self, pos: Option<GridPosition>) -> Option<(usize, f64)> {
        let idx = self.grid.index_of(pos?)?;
        if !self.grid.tile(idx).is_active() {
            return None;
        }
        let component = self.grid.component_of(idx, &self.catalog)?;
        component
            .is_containment_capable()
            .then_some((idx, component.containment))
    }

    /// Convert heat above the threshold into exotic particles.
    fn convert_particles(&mut self, idx: usize, m: f64) {
        let Some(component) = self.grid.component_of(idx, &self.catalog) else {
            return;
        };
        let threshold = finite_or(component.ep_heat_threshold, 0.0);
        if threshold <= 0.0 {
            return;
        }
        let tile = self.grid.tile(idx);
        let excess = tile.heat_contained - threshold;
        if excess <= 0.0 {
            return;
        }

        let converted = excess.min(threshold * m);
        let particles = converted / threshold;
        let pos = tile.position;
        self.grid.tile_mut(idx).heat_contained -= converted;
        self.progression.on_particles(pos, particles);
        self.event_bus.emit(Event::ParticlesGenerated {
            position: pos,
            amount: particles,
            tick: self.tick,
        });
    }

    // -----------------------------------------------------------------------
    // Phase 3: Explode
    // -----------------------------------------------------------------------

    /// Clear every containment tile holding more heat than it can.
    pub(crate) fn phase_explode(&mut self) {
        let overfilled: Vec<usize> = self
            .grid
            .active_indices()
            .into_iter()
            .filter(|&idx| {
                self.grid
                    .component_of(idx, &self.catalog)
                    .is_some_and(|c| {
                        c.is_containment_capable()
                            && self.grid.tile(idx).heat_contained > c.containment
                    })
            })
            .collect();

        for idx in overfilled {
            self.explode(idx);
        }
    }

    fn explode(&mut self, idx: usize) {
        let tile = self.grid.tile(idx);
        let pos = tile.position;
        let heat = tile.heat_contained;
        let Some(id) = tile.component else {
            return;
        };
        let Some(component) = self.catalog.get(id) else {
            return;
        };

        let response = self.progression.on_exploded(pos, component);
        let refund = sanitize(
            finite_or(component.cost, 0.0).max(0.0)
                * finite_or(response.refund_ratio, 0.0).clamp(0.0, 1.0),
        );
        if refund > 0.0 {
            self.progression.on_refund(refund);
        }
        let vented = heat * finite_or(response.heat_vent_ratio, 0.0).clamp(0.0, 1.0);
        self.reactor.current_heat -= vented.min(self.reactor.current_heat).max(0.0);

        log::debug!(
            "{} at ({}, {}) exploded holding {heat} heat",
            component.name,
            pos.row,
            pos.col
        );
        self.clear_tile(idx);
        self.presentation.tile_hint(pos, TileHint::Exploded);
        self.event_bus.emit(Event::ComponentExploded {
            position: pos,
            component: id,
            heat,
            tick: self.tick,
        });
    }

    // -----------------------------------------------------------------------
    // Phase 4: Aggregate
    // -----------------------------------------------------------------------

    /// Fresh totals, then auto-sell and heat control against them.
    pub(crate) fn phase_aggregate(&mut self, m: f64) {
        crate::aggregate::recompute(
            &mut self.grid,
            &self.catalog,
            &mut self.reactor,
            &self.modifiers,
        );

        if self.modifiers.auto_sell {
            let sold = self
                .reactor
                .current_power
                .min(self.reactor.stats.cash_rate * m)
                .max(0.0);
            if sold > 0.0 {
                self.reactor.current_power -= sold;
                self.progression.on_power_sold(sold);
                self.event_bus.emit(Event::PowerSold {
                    amount: sold,
                    tick: self.tick,
                });
            }
        }

        if self.modifiers.heat_control {
            let dissipated = (self.reactor.max_heat / Modifiers::HEAT_CONTROL_DIVISOR * m)
                .min(self.reactor.current_heat)
                .max(0.0);
            self.reactor.current_heat -= dissipated;
        }

        self.reactor.stats.current_power = sanitize(self.reactor.current_power);
        self.reactor.stats.current_heat = sanitize(self.reactor.current_heat);
        self.presentation.publish(&self.reactor.stats);
    }

    // -----------------------------------------------------------------------
    // Phase 5: Meltdown
    // -----------------------------------------------------------------------

    /// Core heat above twice max heat wipes every active tile and stops the
    /// scheduler. Core heat is left at exactly `2 * max_heat + 1`, using the
    /// max heat at detection, and totals for the emptied grid are
    /// republished.
    pub(crate) fn phase_meltdown(&mut self) {
        if !self.reactor.is_past_meltdown() {
            return;
        }

        let heat = 2.0 * self.reactor.max_heat + 1.0;
        log::info!(
            "meltdown at tick {}: core heat {} exceeded {}",
            self.tick,
            self.reactor.current_heat,
            self.reactor.meltdown_threshold()
        );
        for idx in self.grid.active_indices() {
            let tile = self.grid.tile(idx);
            let position = tile.position;
            let Some(component) = tile.component else {
                continue;
            };
            self.clear_tile(idx);
            self.presentation.tile_hint(position, TileHint::Cleared);
            self.event_bus.emit(Event::ComponentCleared {
                position,
                component,
                refund: 0.0,
                tick: self.tick,
            });
        }

        self.reactor.melted_down = true;
        aggregate::recompute(
            &mut self.grid,
            &self.catalog,
            &mut self.reactor,
            &self.modifiers,
        );
        self.reactor.current_heat = heat;
        self.reactor.stats.current_heat = heat;
        self.presentation.publish(&self.reactor.stats);
        self.scheduler.stop();
        self.presentation.on_meltdown();
        self.event_bus.emit(Event::Meltdown {
            heat,
            tick: self.tick,
        });
    }
}

/// The common level a heat exchanger settles toward: the largest `level`
/// with `own - moved(level) >= level`, where each cooler neighbor receives
/// `clamp(level - heat, 0, rate)`. Every receiver then ends at or below the
/// exchanger's remaining heat.
pub fn exchange_level(own: f64, neighbor_heats: &[f64], rate: f64) -> f64 {
    let moved = |level: f64| -> f64 {
        neighbor_heats
            .iter()
            .map(|&h| (level - h).clamp(0.0, rate))
            .sum()
    };
    let mut lo = neighbor_heats.iter().copied().fold(own, f64::min);
    let mut hi = own;
    for _ in 0..64 {
        let mid = lo + (hi - lo) / 2.0;
        if own - moved(mid) >= mid {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}
