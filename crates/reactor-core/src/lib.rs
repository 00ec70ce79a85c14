//! Reactor Core -- the simulation engine for grid-based reactor games.
//!
//! A fixed grid of tiles holds components (fuel cells, vents, exchangers,
//! valves, ...). Once per host frame the scheduler turns elapsed real time
//! into a tick multiplier and the engine resolves one tick: cells generate
//! power and heat, heat moves between tiles by category-specific rules,
//! overfilled tiles explode and an overheated core melts down.
//!
//! # Tick Pipeline
//!
//! Each resolved tick runs the following phases:
//!
//! 1. **Generate** -- Cells add power (with overflow-to-heat conversion) and
//!    heat; lifespans shrink; depleted components are replaced or cleared.
//! 2. **Transfer** -- Outlets, inlets, exchangers, vents, valves and particle
//!    accelerators move heat.
//! 3. **Explode** -- Tiles holding more heat than their containment are
//!    cleared.
//! 4. **Aggregate** -- Global totals are recomputed; auto-sell and heat
//!    control apply.
//! 5. **Meltdown** -- Core heat above twice max heat wipes the grid and
//!    stops the scheduler.
//! 6. **Bookkeeping** -- Tick counter, state hash, event delivery.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- The simulation context and player-action API.
//! - [`grid::Grid`] -- Tile arena, cardinal adjacency and adjacency caches.
//! - [`component::ComponentCatalog`] -- Resolved component snapshots.
//! - [`sim::TickScheduler`] -- Frame pacing and banked time.
//! - [`reactor::ReactorState`] -- Global power/heat aggregate.
//! - [`hooks::Progression`] / [`hooks::Presentation`] -- Collaborator seams.
//! - [`event::EventBus`] -- Typed reactor events with ring buffers.

pub mod aggregate;
pub mod component;
pub mod config;
pub mod engine;
pub mod event;
pub mod grid;
pub mod hooks;
pub mod modifiers;
pub mod overflow;
pub mod reactor;
pub mod resolve;
pub mod sim;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
