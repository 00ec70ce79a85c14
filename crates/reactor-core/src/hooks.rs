//! Collaborator seams: progression (currency, refunds, lifecycle policy)
//! and presentation (display totals, per-tile visual hints).
//!
//! Both traits default every method to a no-op so hosts only implement the
//! parts they care about. The engine owns one boxed instance of each.

use crate::component::ResolvedComponent;
use crate::grid::GridPosition;
use crate::reactor::ReactorStats;

/// What to do with a component whose lifespan reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepletionAction {
    /// Remove the component without refund.
    Clear,
    /// Reinstall the same component with a fresh lifespan. The collaborator
    /// is responsible for charging for it.
    Replace,
}

/// How an explosion is softened by externally-owned upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExplosionResponse {
    /// Fraction of the component cost credited back.
    pub refund_ratio: f64,
    /// Fraction of the exploded tile's heat removed from core heat.
    pub heat_vent_ratio: f64,
}

/// Receives progression-relevant events and decides lifecycle policy.
pub trait Progression: std::fmt::Debug {
    /// A component was installed (not called during bulk restore).
    fn on_placed(&mut self, position: GridPosition, component: &ResolvedComponent) {
        let _ = (position, component);
    }

    /// A component's lifespan reached zero. Perpetual components are
    /// replaced by default, everything else is cleared.
    fn on_depleted(
        &mut self,
        position: GridPosition,
        component: &ResolvedComponent,
    ) -> DepletionAction {
        let _ = position;
        if component.perpetual {
            DepletionAction::Replace
        } else {
            DepletionAction::Clear
        }
    }

    /// A containment-capable component overfilled and is about to be cleared.
    fn on_exploded(
        &mut self,
        position: GridPosition,
        component: &ResolvedComponent,
    ) -> ExplosionResponse {
        let _ = (position, component);
        ExplosionResponse::default()
    }

    /// Money credited for a sale or an explosion refund.
    fn on_refund(&mut self, amount: f64) {
        let _ = amount;
    }

    /// Power sold by auto-sell.
    fn on_power_sold(&mut self, amount: f64) {
        let _ = amount;
    }

    /// Exotic particles produced by a particle accelerator.
    fn on_particles(&mut self, position: GridPosition, amount: f64) {
        let _ = (position, amount);
    }
}

/// A visual hint for a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileHint {
    Installed,
    Cleared,
    Depleted,
    Exploded,
}

/// Receives display totals and per-tile hints.
pub trait Presentation: std::fmt::Debug {
    /// Called after every aggregator run.
    fn publish(&mut self, stats: &ReactorStats) {
        let _ = stats;
    }

    fn tile_hint(&mut self, position: GridPosition, hint: TileHint) {
        let _ = (position, hint);
    }

    /// Called once when the reactor melts down.
    fn on_meltdown(&mut self) {}
}

/// Progression collaborator that accepts every default.
#[derive(Debug, Default)]
pub struct NullProgression;

impl Progression for NullProgression {}

/// Presentation collaborator that discards everything.
#[derive(Debug, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {}
