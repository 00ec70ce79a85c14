//! The simulation engine: owns the grid, the reactor aggregate and the
//! scheduler, and orchestrates the per-tick resolution pipeline.
//!
//! # Architecture
//!
//! The `Engine` is the single simulation context. It owns:
//! - A [`Grid`] of tiles (row-major arena, adjacency caches)
//! - The [`ComponentCatalog`] of resolved snapshots tiles refer to
//! - The [`ReactorState`] aggregate and the latest [`Modifiers`]
//! - A [`TickScheduler`] (running flag, banked time)
//! - An [`EventBus`] for typed reactor events
//! - Boxed [`Progression`] and [`Presentation`] collaborators
//!
//! # Tick Pipeline
//!
//! Each tick with multiplier `m` runs (see [`crate::resolve`]):
//! 1. **Generate** -- cells add power (overflow-checked) and heat; lifespans
//!    shrink by `m`; depleted components are replaced or cleared
//! 2. **Transfer** -- category-specific heat movement
//! 3. **Explode** -- overfilled containment is cleared
//! 4. **Aggregate** -- totals recomputed, auto-sell, heat control, publish
//! 5. **Meltdown** -- core heat above twice max heat ends the session
//! 6. **Bookkeeping** -- tick counter, state hash, event delivery

use slotmap::Key;

use crate::aggregate;
use crate::component::{Category, ComponentCatalog, ComponentId, ResolvedComponent};
use crate::config::{ConfigError, EngineConfig};
use crate::event::{Event, EventBus, EventKind, PassiveListener, Ticks};
use crate::grid::{Direction, Grid, GridPosition, Tile};
use crate::hooks::{NullPresentation, NullProgression, Presentation, Progression, TileHint};
use crate::modifiers::Modifiers;
use crate::reactor::{ReactorState, ReactorStats, finite_or, sanitize};
use crate::sim::{FrameOutcome, FrameParams, StateHash, TickScheduler};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a player action on a tile was refused. A refused action never
/// mutates anything, so callers can reverse an already-debited cost.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("position ({}, {}) is outside the grid", .0.row, .0.col)]
    OutOfBounds(GridPosition),
    #[error("tile ({}, {}) is outside the active area", .0.row, .0.col)]
    Inactive(GridPosition),
    #[error("tile ({}, {}) is already occupied", .0.row, .0.col)]
    Occupied(GridPosition),
    #[error("tile ({}, {}) is empty", .0.row, .0.col)]
    Empty(GridPosition),
    #[error("component {0:?} is not in the catalog")]
    UnknownComponent(ComponentId),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The reactor simulation engine.
#[derive(Debug)]
pub struct Engine {
    pub(crate) grid: Grid,
    pub(crate) catalog: ComponentCatalog,
    pub(crate) reactor: ReactorState,
    pub(crate) modifiers: Modifiers,
    pub(crate) config: EngineConfig,
    pub(crate) scheduler: TickScheduler,

    /// Typed event bus for reactor events.
    pub event_bus: EventBus,

    pub(crate) progression: Box<dyn Progression>,
    pub(crate) presentation: Box<dyn Presentation>,

    /// Ticks resolved since creation, regardless of multiplier.
    pub(crate) tick: Ticks,
    pub(crate) last_state_hash: u64,
}

impl Engine {
    /// Create an engine with no-op collaborators. The scheduler starts
    /// running.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_hooks(
            config,
            Box::new(NullProgression),
            Box::new(NullPresentation),
        )
    }

    /// Create an engine wired to the given collaborators.
    pub fn with_hooks(
        config: EngineConfig,
        progression: Box<dyn Progression>,
        presentation: Box<dyn Presentation>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut scheduler = TickScheduler::new();
        scheduler.start();

        let mut engine = Self {
            grid: Grid::new(
                config.max_rows,
                config.max_cols,
                config.active_rows,
                config.active_cols,
            ),
            catalog: ComponentCatalog::new(),
            reactor: ReactorState::new(config.base_max_power, config.base_max_heat),
            modifiers: Modifiers::default(),
            scheduler,
            event_bus: EventBus::new(config.event_buffer_capacity),
            progression,
            presentation,
            tick: 0,
            last_state_hash: 0,
            config,
        };
        engine.recompute();
        Ok(engine)
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tile(&self, pos: GridPosition) -> Option<&Tile> {
        self.grid.at(pos)
    }

    /// Mutable tile access for persistence restores (heat, lifespan).
    pub fn tile_mut(&mut self, pos: GridPosition) -> Option<&mut Tile> {
        self.grid.get_mut(pos.row, pos.col)
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    pub fn reactor(&self) -> &ReactorState {
        &self.reactor
    }

    /// Totals from the most recent aggregator run.
    pub fn stats(&self) -> &ReactorStats {
        &self.reactor.stats
    }

    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn current_tick(&self) -> Ticks {
        self.tick
    }

    pub fn is_melted_down(&self) -> bool {
        self.reactor.melted_down
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// The state hash computed at the end of the last tick.
    pub fn last_state_hash(&self) -> u64 {
        self.last_state_hash
    }

    // -----------------------------------------------------------------------
    // Content and upgrade inputs
    // -----------------------------------------------------------------------

    /// Publish a new resolved snapshot.
    pub fn register_component(&mut self, component: ResolvedComponent) -> ComponentId {
        self.catalog.insert(component)
    }

    /// Replace a snapshot after re-derivation and recompute totals. Returns
    /// false if the id is unknown.
    pub fn update_component(&mut self, id: ComponentId, component: ResolvedComponent) -> bool {
        if self.catalog.replace(id, component).is_none() {
            return false;
        }
        self.recompute();
        true
    }

    /// Replace the upgrade-derived inputs and recompute totals.
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
        self.recompute();
    }

    /// Restore the time bank (persistence).
    pub fn set_bank_ms(&mut self, bank_ms: f64) {
        self.scheduler.set_bank_ms(bank_ms);
    }

    /// Restore core power and heat (persistence). Non-finite or negative
    /// values become zero; power is capped at max power.
    pub fn restore_totals(&mut self, current_power: f64, current_heat: f64) {
        self.reactor.current_power = finite_or(current_power, 0.0)
            .max(0.0)
            .min(self.reactor.max_power);
        self.reactor.current_heat = finite_or(current_heat, 0.0).max(0.0);
        self.reactor.stats.current_power = self.reactor.current_power;
        self.reactor.stats.current_heat = self.reactor.current_heat;
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Install a component facing the default direction.
    pub fn install(&mut self, pos: GridPosition, id: ComponentId) -> Result<(), PlacementError> {
        self.install_oriented(pos, id, Direction::default())
    }

    /// Install a component. Fails without mutation if the tile is occupied,
    /// outside the active area, or the component is unknown.
    ///
    /// Installing while melted down clears the meltdown, zeroes core heat
    /// and restarts the scheduler.
    pub fn install_oriented(
        &mut self,
        pos: GridPosition,
        id: ComponentId,
        orientation: Direction,
    ) -> Result<(), PlacementError> {
        let idx = self.grid.index_of(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let Some(component) = self.catalog.get(id) else {
            return Err(PlacementError::UnknownComponent(id));
        };
        let tile = self.grid.tile(idx);
        if tile.is_occupied() {
            return Err(PlacementError::Occupied(pos));
        }
        if !tile.is_enabled() {
            return Err(PlacementError::Inactive(pos));
        }

        let starting_ticks = component.starting_ticks();
        let tile = self.grid.tile_mut(idx);
        tile.reset();
        tile.component = Some(id);
        tile.activated = true;
        tile.ticks_remaining = starting_ticks;
        tile.orientation = orientation;
        let bulk = tile.is_bulk_restore();
        self.grid.mark_structural_change();

        if self.reactor.melted_down {
            self.recover_from_meltdown();
        }

        if bulk {
            return Ok(());
        }

        if let Some(component) = self.catalog.get(id) {
            self.progression.on_placed(pos, component);
        }
        self.presentation.tile_hint(pos, TileHint::Installed);
        self.event_bus.emit(Event::ComponentPlaced {
            position: pos,
            component: id,
            tick: self.tick,
        });
        self.recompute();
        Ok(())
    }

    /// [`install`](Self::install) as a plain success flag.
    pub fn try_install(&mut self, pos: GridPosition, id: ComponentId) -> bool {
        self.install(pos, id).is_ok()
    }

    /// Remove a component. With `refund`, the prorated sell value is
    /// credited through the progression collaborator. Returns the amount
    /// credited.
    pub fn clear(&mut self, pos: GridPosition, refund: bool) -> Result<f64, PlacementError> {
        let idx = self.grid.index_of(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let id = self
            .grid
            .tile(idx)
            .component
            .ok_or(PlacementError::Empty(pos))?;

        let value = if refund { self.sell_value_at(idx) } else { 0.0 };
        if value > 0.0 {
            self.progression.on_refund(value);
        }

        let bulk = self.grid.tile(idx).is_bulk_restore();
        self.clear_tile(idx);
        self.presentation.tile_hint(pos, TileHint::Cleared);
        self.event_bus.emit(Event::ComponentCleared {
            position: pos,
            component: id,
            refund: value,
            tick: self.tick,
        });
        if !bulk {
            self.recompute();
        }
        Ok(value)
    }

    /// Clear with refund.
    pub fn sell(&mut self, pos: GridPosition) -> Result<f64, PlacementError> {
        self.clear(pos, true)
    }

    /// What [`sell`](Self::sell) would credit right now, or `None` for an
    /// empty or out-of-bounds tile.
    pub fn sell_value(&self, pos: GridPosition) -> Option<f64> {
        let idx = self.grid.index_of(pos)?;
        self.grid.tile(idx).component?;
        Some(self.sell_value_at(idx))
    }

    /// Turn an installed component (valves care about orientation).
    pub fn set_orientation(
        &mut self,
        pos: GridPosition,
        orientation: Direction,
    ) -> Result<(), PlacementError> {
        let idx = self.grid.index_of(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let tile = self.grid.tile_mut(idx);
        if tile.component.is_none() {
            return Err(PlacementError::Empty(pos));
        }
        tile.orientation = orientation;
        self.grid.mark_structural_change();
        Ok(())
    }

    /// Lifespan-bearing components sell prorated by remaining lifespan,
    /// containment-only components by remaining integrity, everything else
    /// at full cost.
    fn sell_value_at(&self, idx: usize) -> f64 {
        let Some(component) = self.grid.component_of(idx, &self.catalog) else {
            return 0.0;
        };
        let tile = self.grid.tile(idx);
        let cost = finite_or(component.cost, 0.0).max(0.0);
        let fraction = if component.has_lifespan() {
            let total = component.starting_ticks();
            if total > 0.0 {
                tile.ticks_remaining / total
            } else {
                0.0
            }
        } else if component.is_containment_capable() {
            1.0 - tile.heat_contained / component.containment
        } else {
            1.0
        };
        sanitize(cost * finite_or(fraction, 0.0).clamp(0.0, 1.0))
    }

    /// Reset a tile and bump the grid generation. No refund, no events.
    pub(crate) fn clear_tile(&mut self, idx: usize) {
        self.grid.tile_mut(idx).reset();
        self.grid.mark_structural_change();
    }

    // -----------------------------------------------------------------------
    // Bulk restore
    // -----------------------------------------------------------------------

    /// Suppress per-install side effects and recomputation while a
    /// persistence collaborator restores a layout.
    pub fn begin_bulk_restore(&mut self) {
        self.grid.set_bulk_restore(true);
    }

    /// End a bulk restore and run the deferred recompute.
    pub fn end_bulk_restore(&mut self) {
        self.grid.set_bulk_restore(false);
        self.recompute();
    }

    // -----------------------------------------------------------------------
    // Grid extent
    // -----------------------------------------------------------------------

    /// Grow (or shrink) the active rectangle. Components outside it stay
    /// installed but stop acting.
    pub fn set_active_extent(&mut self, rows: u32, cols: u32) {
        self.grid.recompute_active_bounds(rows, cols);
        log::debug!(
            "active extent now {}x{}",
            self.grid.active_rows(),
            self.grid.active_cols()
        );
        self.recompute();
    }

    // -----------------------------------------------------------------------
    // Aggregate
    // -----------------------------------------------------------------------

    /// Run the aggregator and publish the totals.
    pub fn recompute(&mut self) {
        aggregate::recompute(
            &mut self.grid,
            &self.catalog,
            &mut self.reactor,
            &self.modifiers,
        );
        self.presentation.publish(&self.reactor.stats);
    }

    /// Effective vent rate of the component at `pos`.
    pub fn effective_vent_value(&self, pos: GridPosition) -> Option<f64> {
        let idx = self.grid.index_of(pos)?;
        Some(aggregate::effective_vent_value(
            &self.grid,
            &self.catalog,
            &self.reactor,
            &self.modifiers,
            idx,
        ))
    }

    /// Effective transfer rate of the component at `pos`.
    pub fn effective_transfer_value(&self, pos: GridPosition) -> Option<f64> {
        let idx = self.grid.index_of(pos)?;
        Some(aggregate::effective_transfer_value(
            &self.grid,
            &self.catalog,
            &self.reactor,
            idx,
        ))
    }

    // -----------------------------------------------------------------------
    // Scheduler control
    // -----------------------------------------------------------------------

    /// Start the scheduler. Refused while melted down; returns whether the
    /// scheduler is running afterwards.
    pub fn start(&mut self) -> bool {
        if self.reactor.melted_down {
            log::warn!("refusing to start a melted-down reactor");
            return false;
        }
        self.scheduler.start();
        true
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// External pause request.
    pub fn pause(&mut self) {
        log::info!("paused at tick {}", self.tick);
        self.stop();
    }

    /// Undo [`pause`](Self::pause). Has no effect while melted down.
    pub fn resume(&mut self) -> bool {
        self.start()
    }

    /// Clear every tile without refund, zero power and heat, clear the
    /// meltdown and restart. The time bank survives.
    pub fn reboot(&mut self) {
        log::info!("rebooting reactor at tick {}", self.tick);
        for idx in 0..self.grid.len() {
            if self.grid.tile(idx).is_occupied() {
                self.clear_tile(idx);
            }
        }
        self.reactor.reset();
        self.scheduler.start();
        self.recompute();
    }

    fn recover_from_meltdown(&mut self) {
        log::info!("install recovered the reactor from meltdown");
        self.reactor.melted_down = false;
        self.reactor.current_heat = 0.0;
        if !self.scheduler.is_running() {
            self.scheduler.start();
        }
        self.event_bus
            .emit(Event::MeltdownRecovered { tick: self.tick });
    }

    // -----------------------------------------------------------------------
    // Frames and ticks
    // -----------------------------------------------------------------------

    /// Advance by one host frame. Decides the multiplier from the elapsed
    /// time and bank, then resolves at most one tick.
    pub fn frame(&mut self, timestamp_ms: f64) -> FrameOutcome {
        let params = self.frame_params();
        let ticking = self.has_ticking_cells();
        let outcome = self.scheduler.plan_frame(timestamp_ms, ticking, params);
        if let FrameOutcome::Ticked { multiplier } = outcome {
            self.run_tick(multiplier);
        }
        outcome
    }

    /// Resolve one tick with an explicit multiplier, bypassing the
    /// scheduler's timing. The multiplier is clamped to
    /// `[0, max_multiplier]`. Returns false (and does nothing) while melted
    /// down.
    pub fn step(&mut self, multiplier: f64) -> bool {
        if self.reactor.melted_down {
            return false;
        }
        let multiplier = finite_or(multiplier, 0.0).clamp(0.0, self.config.max_multiplier);
        self.run_tick(multiplier);
        true
    }

    /// Timing inputs for the current frame. The upgrade-derived tick period
    /// wins over the configured one when it is positive and finite.
    pub fn frame_params(&self) -> FrameParams {
        let tick_period_ms = self
            .modifiers
            .tick_period_ms
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(self.config.tick_period_ms);
        FrameParams {
            tick_period_ms,
            offline_threshold_ms: self.config.offline_threshold_ms,
            max_multiplier: self.config.max_multiplier,
            time_flux: self.modifiers.time_flux,
        }
    }

    /// Whether any active cell still has lifespan left.
    pub fn has_ticking_cells(&self) -> bool {
        self.grid.tiles().iter().any(|t| {
            t.is_active()
                && t.ticks_remaining > 0.0
                && t.component
                    .and_then(|id| self.catalog.get(id))
                    .is_some_and(|c| c.category == Category::Cell)
        })
    }

    fn run_tick(&mut self, multiplier: f64) {
        self.phase_generate(multiplier);
        self.phase_transfer(multiplier);
        self.phase_explode();
        self.phase_aggregate(multiplier);
        self.phase_meltdown();
        self.phase_bookkeeping();
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self) {
        self.tick += 1;
        self.last_state_hash = self.state_hash();
        self.event_bus.deliver();
    }

    /// Deterministic hash of power, heat and every tile's runtime state.
    pub fn state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.tick);
        hasher.write_f64(self.reactor.current_power);
        hasher.write_f64(self.reactor.current_heat);
        hasher.write_f64(self.reactor.max_power);
        hasher.write_f64(self.reactor.max_heat);
        hasher.write_u32(u32::from(self.reactor.melted_down));

        for tile in self.grid.tiles() {
            let Some(id) = tile.component else {
                continue;
            };
            hasher.write_u32(tile.position.row);
            hasher.write_u32(tile.position.col);
            hasher.write_u64(id.data().as_ffi());
            hasher.write_f64(tile.ticks_remaining);
            hasher.write_f64(tile.heat_contained);
            hasher.write_u32(tile.orientation as u32);
        }

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn new_rejects_invalid_config() {
        let config = EngineConfig {
            tick_period_ms: -1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(config), Err(ConfigError::TickPeriod(_))));
    }

    #[test]
    fn install_on_occupied_tile_fails_without_mutation() {
        let mut engine = small_engine(3, 3);
        let cell = engine.register_component(uranium_cell());
        let vent = engine.register_component(basic_vent());
        let pos = GridPosition::new(1, 1);

        engine.install(pos, cell).unwrap();
        engine.step(1.0);
        let ticks_before = engine.tile(pos).unwrap().ticks_remaining();
        let generation = engine.grid().generation();

        assert_eq!(engine.install(pos, vent), Err(PlacementError::Occupied(pos)));
        assert!(!engine.try_install(pos, vent));
        assert_eq!(engine.tile(pos).unwrap().component(), Some(cell));
        assert_eq!(engine.tile(pos).unwrap().ticks_remaining(), ticks_before);
        assert_eq!(engine.grid().generation(), generation);
    }

    #[test]
    fn install_outside_active_area_fails() {
        let config = EngineConfig {
            max_rows: 4,
            max_cols: 4,
            active_rows: 2,
            active_cols: 2,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(config).unwrap();
        let vent = engine.register_component(basic_vent());
        let inactive = GridPosition::new(3, 3);
        assert_eq!(
            engine.install(inactive, vent),
            Err(PlacementError::Inactive(inactive))
        );
        let outside = GridPosition::new(4, 0);
        assert_eq!(
            engine.install(outside, vent),
            Err(PlacementError::OutOfBounds(outside))
        );
    }

    #[test]
    fn install_seeds_lifespan_and_recomputes() {
        let mut engine = small_engine(2, 2);
        let cell = engine.register_component(uranium_cell());
        engine.install(GridPosition::new(0, 0), cell).unwrap();
        let tile = engine.tile(GridPosition::new(0, 0)).unwrap();
        assert_eq!(tile.ticks_remaining(), 15.0);
        assert!(tile.is_active());
        assert_eq!(engine.stats().power_per_tick, 1.0);
        assert_eq!(engine.event_bus.count(EventKind::ComponentPlaced), 1);
    }

    #[test]
    fn bulk_restore_defers_recompute() {
        let mut engine = small_engine(2, 2);
        let cell = engine.register_component(uranium_cell());
        engine.begin_bulk_restore();
        engine.install(GridPosition::new(0, 0), cell).unwrap();
        assert_eq!(engine.stats().power_per_tick, 0.0);
        assert_eq!(engine.event_bus.count(EventKind::ComponentPlaced), 0);
        engine.end_bulk_restore();
        assert_eq!(engine.stats().power_per_tick, 1.0);
    }

    #[test]
    fn sell_prorates_by_remaining_lifespan() {
        let mut engine = small_engine(2, 2);
        let mut part = uranium_cell();
        part.cost = 30.0;
        let cell = engine.register_component(part);
        let pos = GridPosition::new(0, 0);
        engine.install(pos, cell).unwrap();
        engine.step(5.0);
        // 10 of 15 ticks left.
        let refund = engine.sell(pos).unwrap();
        assert!((refund - 20.0).abs() < 1e-9);
        assert!(!engine.tile(pos).unwrap().is_occupied());
    }

    #[test]
    fn sell_prorates_containment_by_integrity() {
        let mut engine = small_engine(2, 2);
        let mut part = basic_vent();
        part.cost = 50.0;
        let vent = engine.register_component(part);
        let pos = GridPosition::new(0, 0);
        engine.install(pos, vent).unwrap();
        engine.tile_mut(pos).unwrap().set_heat_contained(20.0);
        // containment 80, 20 held: 75% integrity.
        assert_eq!(engine.sell_value(pos), Some(37.5));
    }

    #[test]
    fn clear_without_refund_credits_nothing() {
        let mut engine = small_engine(2, 2);
        let mut part = basic_vent();
        part.cost = 50.0;
        let vent = engine.register_component(part);
        let pos = GridPosition::new(0, 0);
        engine.install(pos, vent).unwrap();
        assert_eq!(engine.clear(pos, false), Ok(0.0));
        assert_eq!(engine.clear(pos, false), Err(PlacementError::Empty(pos)));
    }

    #[test]
    fn clear_invalidates_neighbor_adjacency() {
        let mut engine = small_engine(1, 3);
        let exchanger = engine.register_component(heat_exchanger());
        let vent = engine.register_component(basic_vent());
        engine.install(GridPosition::new(0, 0), exchanger).unwrap();
        engine.install(GridPosition::new(0, 1), vent).unwrap();
        let idx = engine.grid().index_of(GridPosition::new(0, 0)).unwrap();
        assert_eq!(engine.grid().tile(idx).adjacency().containment().len(), 1);

        engine.clear(GridPosition::new(0, 1), false).unwrap();
        assert!(engine.grid().tile(idx).adjacency().containment().is_empty());
    }

    #[test]
    fn pause_and_resume() {
        let mut engine = small_engine(2, 2);
        let cell = engine.register_component(uranium_cell());
        engine.install(GridPosition::new(0, 0), cell).unwrap();
        engine.frame(0.0);
        engine.pause();
        assert_eq!(engine.frame(1000.0), FrameOutcome::Stopped);
        assert!(engine.resume());
        assert!(matches!(
            engine.frame(2000.0),
            FrameOutcome::Ticked { .. }
        ));
    }

    #[test]
    fn start_refused_while_melted_down() {
        let mut engine = small_engine(2, 2);
        engine.reactor.current_heat = 5000.0;
        engine.step(1.0);
        assert!(engine.is_melted_down());
        assert!(!engine.start());
        assert!(!engine.step(1.0));
    }

    #[test]
    fn reboot_clears_everything_but_the_bank() {
        let mut engine = small_engine(2, 2);
        let cell = engine.register_component(uranium_cell());
        engine.install(GridPosition::new(0, 0), cell).unwrap();
        engine.set_bank_ms(1234.0);
        engine.step(1.0);
        engine.reboot();
        assert!(!engine.tile(GridPosition::new(0, 0)).unwrap().is_occupied());
        assert_eq!(engine.reactor().current_power, 0.0);
        assert_eq!(engine.scheduler().bank_ms(), 1234.0);
        assert!(engine.is_running());
    }

    #[test]
    fn reboot_after_meltdown_resets_the_reactor() {
        let mut engine = small_engine(1, 1);
        engine.reactor.current_heat = 5000.0;
        engine.step(1.0);
        assert!(engine.is_melted_down());

        engine.reboot();
        assert!(!engine.is_melted_down());
        assert!(!engine.stats().melted_down);
        assert_eq!(engine.reactor().current_heat, 0.0);
        assert_eq!(engine.reactor().max_heat, engine.reactor().base_max_heat);
        assert!(engine.is_running());
    }

    #[test]
    fn set_active_extent_disables_outer_tiles() {
        let mut engine = small_engine(3, 3);
        let cell = engine.register_component(uranium_cell());
        let pos = GridPosition::new(2, 2);
        engine.install(pos, cell).unwrap();
        engine.set_active_extent(2, 2);
        assert!(engine.tile(pos).unwrap().is_occupied());
        assert!(!engine.tile(pos).unwrap().is_active());
        assert_eq!(engine.stats().power_per_tick, 0.0);
        assert!(!engine.has_ticking_cells());
    }

    #[test]
    fn update_component_is_seen_by_installed_tiles() {
        let mut engine = small_engine(2, 2);
        let cell = engine.register_component(uranium_cell());
        engine.install(GridPosition::new(0, 0), cell).unwrap();
        let mut upgraded = uranium_cell();
        upgraded.power = 4.0;
        assert!(engine.update_component(cell, upgraded));
        assert_eq!(engine.stats().power_per_tick, 4.0);
    }

    #[test]
    fn orientation_change_is_structural() {
        let mut engine = small_engine(1, 3);
        let valve = engine.register_component(check_valve());
        let pos = GridPosition::new(0, 1);
        engine.install(pos, valve).unwrap();
        let generation = engine.grid().generation();
        engine.set_orientation(pos, Direction::West).unwrap();
        assert_eq!(engine.tile(pos).unwrap().orientation(), Direction::West);
        assert!(engine.grid().generation() > generation);
        assert_eq!(
            engine.set_orientation(GridPosition::new(0, 0), Direction::North),
            Err(PlacementError::Empty(GridPosition::new(0, 0)))
        );
    }

    #[test]
    fn identical_runs_hash_identically() {
        let run = || {
            let mut engine = small_engine(3, 3);
            let cell = engine.register_component(uranium_cell());
            let vent = engine.register_component(basic_vent());
            engine.install(GridPosition::new(1, 1), cell).unwrap();
            engine.install(GridPosition::new(1, 2), vent).unwrap();
            for _ in 0..5 {
                engine.step(0.5);
            }
            engine.state_hash()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn hash_changes_with_state() {
        let mut engine = small_engine(2, 2);
        let cell = engine.register_component(uranium_cell());
        engine.install(GridPosition::new(0, 0), cell).unwrap();
        let before = engine.state_hash();
        engine.step(1.0);
        assert_ne!(engine.state_hash(), before);
        assert_eq!(engine.last_state_hash(), engine.state_hash());
    }

    #[test]
    fn capacitor_category_is_not_ticking() {
        let mut engine = small_engine(1, 1);
        let cap = engine.register_component(capacitor());
        engine.install(GridPosition::new(0, 0), cap).unwrap();
        assert!(!engine.has_ticking_cells());
        assert_eq!(
            engine.catalog().get(cap).unwrap().category,
            Category::Capacitor
        );
    }
}
