//! The reactor grid: tile storage, cardinal adjacency queries, and the
//! per-tile adjacency cache.
//!
//! Tiles live in a row-major arena allocated once for the maximum extent and
//! are addressed by index. Only the active sub-rectangle is `enabled`.
//!
//! # Cache validity
//!
//! Every structural change (install, clear, orientation change, bounds
//! change) bumps the grid-wide generation. Each tile's [`Adjacency`] is
//! stamped with the generation and the [`ComponentCatalog`] revision it was
//! built against, and is rebuilt lazily once either stamp moves. No caller
//! ever has to remember which neighbors to invalidate.

use serde::{Deserialize, Serialize};

use crate::component::{Category, ComponentCatalog, ComponentId, ResolvedComponent};

// ---------------------------------------------------------------------------
// Positions and directions
// ---------------------------------------------------------------------------

/// A tile position. Row 0 is the top edge, column 0 the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: u32,
    pub col: u32,
}

impl GridPosition {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The position `distance` tiles away in `dir`, or `None` if that would
    /// leave the non-negative quadrant.
    pub fn step(self, dir: Direction, distance: u32) -> Option<GridPosition> {
        let (dr, dc) = dir.offset();
        let d = i64::from(distance);
        let row = i64::from(self.row) + i64::from(dr) * d;
        let col = i64::from(self.col) + i64::from(dc) * d;
        Some(GridPosition::new(
            u32::try_from(row).ok()?,
            u32::try_from(col).ok()?,
        ))
    }
}

/// Cardinal directions. Valves use them as their orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    North,
    #[default]
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// `(row, col)` offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}

// ---------------------------------------------------------------------------
// Adjacency cache
// ---------------------------------------------------------------------------

/// Cached neighbor classifications for one tile, as tile indices.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    /// `(grid generation, catalog revision)` the lists were built against.
    stamp: Option<(u64, u64)>,
    containment: Vec<usize>,
    cells: Vec<usize>,
    reflectors: Vec<usize>,
}

impl Adjacency {
    /// Containment-capable neighbors within the component's range.
    pub fn containment(&self) -> &[usize] {
        &self.containment
    }

    /// Range-1 neighbors holding a cell component.
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Range-1 neighbors holding a reflector.
    pub fn reflectors(&self) -> &[usize] {
        &self.reflectors
    }

    fn is_current(&self, stamp: (u64, u64)) -> bool {
        self.stamp == Some(stamp)
    }

    fn invalidate(&mut self) {
        self.stamp = None;
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// Per-position runtime state.
#[derive(Debug, Clone)]
pub struct Tile {
    pub position: GridPosition,
    pub(crate) component: Option<ComponentId>,
    /// Installed and eligible to act this tick.
    pub(crate) activated: bool,
    /// Inside the current active bounds.
    pub(crate) enabled: bool,
    pub(crate) ticks_remaining: f64,
    pub(crate) heat_contained: f64,
    pub(crate) orientation: Direction,
    /// Working power output, re-seeded by every aggregator run.
    pub(crate) power: f64,
    /// Working heat output, re-seeded by every aggregator run.
    pub(crate) heat: f64,
    /// Set by a persistence collaborator while batch-restoring.
    pub(crate) bulk_restore: bool,
    pub(crate) adjacency: Adjacency,
}

impl Tile {
    fn new(position: GridPosition, enabled: bool) -> Self {
        Self {
            position,
            component: None,
            activated: false,
            enabled,
            ticks_remaining: 0.0,
            heat_contained: 0.0,
            orientation: Direction::default(),
            power: 0.0,
            heat: 0.0,
            bulk_restore: false,
            adjacency: Adjacency::default(),
        }
    }

    pub fn component(&self) -> Option<ComponentId> {
        self.component
    }

    pub fn is_occupied(&self) -> bool {
        self.component.is_some()
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Occupied, activated and inside the active bounds.
    pub fn is_active(&self) -> bool {
        self.enabled && self.activated && self.component.is_some()
    }

    pub fn ticks_remaining(&self) -> f64 {
        self.ticks_remaining
    }

    pub fn heat_contained(&self) -> f64 {
        self.heat_contained
    }

    pub fn orientation(&self) -> Direction {
        self.orientation
    }

    /// Working power output as of the last aggregator run.
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Working heat output as of the last aggregator run.
    pub fn heat(&self) -> f64 {
        self.heat
    }

    pub fn is_bulk_restore(&self) -> bool {
        self.bulk_restore
    }

    /// The cached neighbor lists. Only meaningful after the engine refreshed
    /// adjacency for the current generation.
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Restore contained heat (persistence). Non-finite or negative values
    /// become zero.
    pub fn set_heat_contained(&mut self, heat: f64) {
        self.heat_contained = crate::reactor::finite_or(heat, 0.0).max(0.0);
    }

    /// Restore remaining lifespan (persistence). Non-finite or negative
    /// values become zero.
    pub fn set_ticks_remaining(&mut self, ticks: f64) {
        self.ticks_remaining = crate::reactor::finite_or(ticks, 0.0).max(0.0);
    }

    /// Reset every mutable field back to an empty tile. Keeps position,
    /// bounds and the bulk-restore flag.
    pub(crate) fn reset(&mut self) {
        self.component = None;
        self.activated = false;
        self.ticks_remaining = 0.0;
        self.heat_contained = 0.0;
        self.orientation = Direction::default();
        self.power = 0.0;
        self.heat = 0.0;
        self.adjacency.invalidate();
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Storage for every tile of the maximum extent, plus the active bounds.
#[derive(Debug, Clone)]
pub struct Grid {
    max_rows: u32,
    max_cols: u32,
    active_rows: u32,
    active_cols: u32,
    tiles: Vec<Tile>,
    generation: u64,
}

impl Grid {
    /// Allocate every tile of a `max_rows` x `max_cols` grid. The active
    /// rectangle is clamped to the allocated extent.
    pub fn new(max_rows: u32, max_cols: u32, active_rows: u32, active_cols: u32) -> Self {
        let active_rows = active_rows.min(max_rows);
        let active_cols = active_cols.min(max_cols);
        let mut tiles = Vec::with_capacity(max_rows as usize * max_cols as usize);
        for row in 0..max_rows {
            for col in 0..max_cols {
                let enabled = row < active_rows && col < active_cols;
                tiles.push(Tile::new(GridPosition::new(row, col), enabled));
            }
        }
        Self {
            max_rows,
            max_cols,
            active_rows,
            active_cols,
            tiles,
            generation: 0,
        }
    }

    pub fn max_rows(&self) -> u32 {
        self.max_rows
    }

    pub fn max_cols(&self) -> u32 {
        self.max_cols
    }

    pub fn active_rows(&self) -> u32 {
        self.active_rows
    }

    pub fn active_cols(&self) -> u32 {
        self.active_cols
    }

    /// Structural generation. Bumped on every install, clear and bounds change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record a structural change. All adjacency caches become stale.
    pub fn mark_structural_change(&mut self) {
        self.generation += 1;
    }

    // -- Point queries --

    /// Arena index of a position, or `None` outside the allocated extent.
    pub fn index_of(&self, pos: GridPosition) -> Option<usize> {
        if pos.row < self.max_rows && pos.col < self.max_cols {
            Some(pos.row as usize * self.max_cols as usize + pos.col as usize)
        } else {
            None
        }
    }

    /// The tile at `(row, col)`, or `None` outside the allocated extent.
    pub fn get(&self, row: u32, col: u32) -> Option<&Tile> {
        self.at(GridPosition::new(row, col))
    }

    pub fn get_mut(&mut self, row: u32, col: u32) -> Option<&mut Tile> {
        let idx = self.index_of(GridPosition::new(row, col))?;
        self.tiles.get_mut(idx)
    }

    pub fn at(&self, pos: GridPosition) -> Option<&Tile> {
        self.index_of(pos).and_then(|i| self.tiles.get(i))
    }

    pub fn tile(&self, idx: usize) -> &Tile {
        &self.tiles[idx]
    }

    pub(crate) fn tile_mut(&mut self, idx: usize) -> &mut Tile {
        &mut self.tiles[idx]
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Indices of every active tile, in row-major order.
    pub fn active_indices(&self) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_active())
            .map(|(i, _)| i)
            .collect()
    }

    // -- Adjacency --

    /// Tiles along the four cardinal rays from `pos`, nearest first, up to
    /// `n` tiles away. Diagonals are never included. Each ray stops at the
    /// edge of the allocated extent.
    pub fn neighbors_in_range(
        &self,
        pos: GridPosition,
        n: u32,
    ) -> impl Iterator<Item = &Tile> + '_ {
        let n = n.min(self.max_rows.max(self.max_cols));
        Direction::all().into_iter().flat_map(move |dir| {
            (1..=n).map_while(move |d| pos.step(dir, d).and_then(|p| self.at(p)))
        })
    }

    /// Update every tile's `enabled` flag for a new active extent. The extent
    /// is clamped to the allocated size.
    pub fn recompute_active_bounds(&mut self, rows: u32, cols: u32) {
        self.active_rows = rows.min(self.max_rows);
        self.active_cols = cols.min(self.max_cols);
        let (rows, cols) = (self.active_rows, self.active_cols);
        for tile in &mut self.tiles {
            tile.enabled = tile.position.row < rows && tile.position.col < cols;
        }
        self.mark_structural_change();
    }

    /// Set or clear the bulk-restore suppression flag on every tile.
    pub fn set_bulk_restore(&mut self, on: bool) {
        for tile in &mut self.tiles {
            tile.bulk_restore = on;
        }
    }

    /// Rebuild the adjacency cache of one tile if it is stale.
    pub fn ensure_adjacency(&mut self, idx: usize, catalog: &ComponentCatalog) {
        let stamp = (self.generation, catalog.revision());
        if self.tiles[idx].adjacency.is_current(stamp) {
            return;
        }

        let pos = self.tiles[idx].position;
        let range = self.tiles[idx]
            .component
            .and_then(|id| catalog.get(id))
            .map(|c| c.range.max(1));

        let mut containment = Vec::new();
        let mut cells = Vec::new();
        let mut reflectors = Vec::new();

        if let Some(range) = range {
            for neighbor in self.neighbors_in_range(pos, range) {
                if !neighbor.is_active() {
                    continue;
                }
                let Some(component) = neighbor.component.and_then(|id| catalog.get(id)) else {
                    continue;
                };
                let Some(n_idx) = self.index_of(neighbor.position) else {
                    continue;
                };
                if component.is_containment_capable() {
                    containment.push(n_idx);
                }
                if pos.manhattan_distance(&neighbor.position) == 1 {
                    match component.category {
                        Category::Cell => cells.push(n_idx),
                        Category::Reflector => reflectors.push(n_idx),
                        _ => {}
                    }
                }
            }
        }

        let adjacency = &mut self.tiles[idx].adjacency;
        adjacency.containment = containment;
        adjacency.cells = cells;
        adjacency.reflectors = reflectors;
        adjacency.stamp = Some(stamp);
    }

    /// Rebuild every stale adjacency cache of an active tile.
    pub fn refresh_adjacency(&mut self, catalog: &ComponentCatalog) {
        for idx in 0..self.tiles.len() {
            if self.tiles[idx].is_active() {
                self.ensure_adjacency(idx, catalog);
            }
        }
    }

    /// The resolved component installed on a tile, if any.
    pub fn component_of<'c>(
        &self,
        idx: usize,
        catalog: &'c ComponentCatalog,
    ) -> Option<&'c ResolvedComponent> {
        self.tiles[idx].component.and_then(|id| catalog.get(id))
    }
}
