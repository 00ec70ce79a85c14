//! Component categories and resolved per-component statistics.
//!
//! The engine never derives statistics itself. The content collaborator
//! resolves each part definition (plus upgrade levels) into a
//! [`ResolvedComponent`] snapshot and stores it in the [`ComponentCatalog`].
//! Tiles only reference snapshots by [`ComponentId`], so re-deriving a
//! snapshot after an upgrade is picked up by every tile on the next read.

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Identifies a resolved component snapshot in the [`ComponentCatalog`].
    pub struct ComponentId;
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The closed set of component categories. Every category-specific rule in
/// the engine matches on this enum exhaustively.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cell,
    Reflector,
    Capacitor,
    Vent,
    HeatExchanger,
    HeatInlet,
    HeatOutlet,
    Valve,
    CoolantCell,
    ReactorPlating,
    ParticleAccelerator,
}

impl Category {
    /// Number of categories.
    pub const COUNT: usize = 11;

    /// All categories in declaration order.
    pub fn all() -> [Category; Self::COUNT] {
        [
            Category::Cell,
            Category::Reflector,
            Category::Capacitor,
            Category::Vent,
            Category::HeatExchanger,
            Category::HeatInlet,
            Category::HeatOutlet,
            Category::Valve,
            Category::CoolantCell,
            Category::ReactorPlating,
            Category::ParticleAccelerator,
        ]
    }

    /// Stable index for per-category arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Capacitors and platings contribute the level-weighted global
    /// vent/transfer percentage multipliers.
    pub fn contributes_global_multipliers(self) -> bool {
        matches!(self, Category::Capacitor | Category::ReactorPlating)
    }
}

/// Transfer rule of a valve. A valve always moves heat from the tile behind
/// it to the tile in front of it (see [`crate::grid::Direction`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValveKind {
    /// Moves heat only while the input is at least 80% full.
    Overflow,
    /// Moves heat only while the output is below 20% full.
    TopUp,
    /// Always moves heat forward, never back.
    #[default]
    Check,
}

impl ValveKind {
    pub const OVERFLOW_FILL: f64 = 0.8;
    pub const TOP_UP_FILL: f64 = 0.2;
}

// ---------------------------------------------------------------------------
// ResolvedComponent
// ---------------------------------------------------------------------------

/// An immutable-per-tick snapshot of a component's statistics, already
/// adjusted for every upgrade the content collaborator knows about.
///
/// Rates are per tick. Percentages are expressed in whole percent
/// (`25.0` means +25%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedComponent {
    pub name: String,
    pub category: Category,
    pub level: u32,
    /// Purchase price, used to prorate sell values and explosion refunds.
    pub cost: f64,

    /// Unmodified power output, the fallback when `power` is non-finite.
    pub base_power: f64,
    /// Unmodified heat output, the fallback when `heat` is non-finite.
    pub base_heat: f64,
    /// Unmodified lifespan in ticks. Zero for components that never deplete.
    pub base_ticks: f64,

    pub power: f64,
    pub heat: f64,
    /// Lifespan in ticks a fresh install starts with.
    pub ticks: f64,
    pub containment: f64,
    pub vent: f64,
    pub transfer: f64,
    /// Adjacency range for containment neighbors (1 = direct neighbors).
    pub range: u32,
    /// Percent power bonus a reflector grants each adjacent cell.
    pub reflector_power_bonus: f64,
    /// Percent heat bonus a reflector grants each adjacent cell.
    pub reflector_heat_bonus: f64,
    /// Flat bonus added to the reactor's max power.
    pub reactor_power: f64,
    /// Flat bonus added to the reactor's max heat.
    pub reactor_heat: f64,
    /// Global vent multiplier contribution per level, in percent.
    pub vent_bonus_pct: f64,
    /// Global transfer multiplier contribution per level, in percent.
    pub transfer_bonus_pct: f64,
    /// Heat a particle accelerator must hold before it converts heat.
    pub ep_heat_threshold: f64,

    pub perpetual: bool,
    /// Set on the one plating variant whose `reactor_heat` also raises max
    /// power.
    pub heat_bonus_feeds_power: bool,
    /// Only meaningful for [`Category::Valve`].
    pub valve: ValveKind,
}

impl ResolvedComponent {
    /// A level-1 snapshot with every statistic zeroed and range 1.
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            level: 1,
            cost: 0.0,
            base_power: 0.0,
            base_heat: 0.0,
            base_ticks: 0.0,
            power: 0.0,
            heat: 0.0,
            ticks: 0.0,
            containment: 0.0,
            vent: 0.0,
            transfer: 0.0,
            range: 1,
            reflector_power_bonus: 0.0,
            reflector_heat_bonus: 0.0,
            reactor_power: 0.0,
            reactor_heat: 0.0,
            vent_bonus_pct: 0.0,
            transfer_bonus_pct: 0.0,
            ep_heat_threshold: 0.0,
            perpetual: false,
            heat_bonus_feeds_power: false,
            valve: ValveKind::default(),
        }
    }

    /// Whether this component can hold heat (and therefore explode).
    pub fn is_containment_capable(&self) -> bool {
        self.containment > 0.0
    }

    /// Whether this component has a finite lifespan.
    pub fn has_lifespan(&self) -> bool {
        self.base_ticks > 0.0 || self.ticks > 0.0
    }

    /// Lifespan a fresh install starts with, falling back to the base stat.
    pub fn starting_ticks(&self) -> f64 {
        if self.ticks.is_finite() && self.ticks > 0.0 {
            self.ticks
        } else if self.base_ticks.is_finite() {
            self.base_ticks.max(0.0)
        } else {
            0.0
        }
    }

    /// Working power output, falling back to `base_power` when non-finite.
    pub fn working_power(&self) -> f64 {
        crate::reactor::finite_or(self.power, crate::reactor::finite_or(self.base_power, 0.0))
    }

    /// Working heat output, falling back to `base_heat` when non-finite.
    pub fn working_heat(&self) -> f64 {
        crate::reactor::finite_or(self.heat, crate::reactor::finite_or(self.base_heat, 0.0))
    }
}

// ---------------------------------------------------------------------------
// ComponentCatalog
// ---------------------------------------------------------------------------

/// Owns the latest resolved snapshot for every component the content
/// collaborator has published. Tiles reference entries by [`ComponentId`].
///
/// Every mutation bumps [`revision`](ComponentCatalog::revision); adjacency
/// caches are stamped with it so a range upgrade never leaves stale neighbor
/// lists behind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentCatalog {
    components: SlotMap<ComponentId, ResolvedComponent>,
    revision: u64,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new snapshot and return its id.
    pub fn insert(&mut self, component: ResolvedComponent) -> ComponentId {
        self.revision += 1;
        self.components.insert(component)
    }

    /// Replace a snapshot after re-derivation. Returns the previous snapshot,
    /// or `None` (and stores nothing) if the id is unknown.
    pub fn replace(
        &mut self,
        id: ComponentId,
        component: ResolvedComponent,
    ) -> Option<ResolvedComponent> {
        let slot = self.components.get_mut(id)?;
        self.revision += 1;
        Some(std::mem::replace(slot, component))
    }

    /// Withdraw a snapshot. Tiles still referencing it become inert.
    pub fn remove(&mut self, id: ComponentId) -> Option<ResolvedComponent> {
        let removed = self.components.remove(id);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    pub fn get(&self, id: ComponentId) -> Option<&ResolvedComponent> {
        self.components.get(id)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(id)
    }

    /// Find the first snapshot with the given name.
    pub fn find(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &ResolvedComponent)> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Monotonic counter bumped by every insert, replace and remove.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
