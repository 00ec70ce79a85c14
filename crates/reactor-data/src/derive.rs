//! Derivation of resolved component snapshots from part definitions and
//! upgrade levels.
//!
//! Upgrades stack in one fixed order. Every step only touches the categories
//! it names:
//!
//! 1. Copy the part's statistics. `base_power`, `base_heat` and `base_ticks`
//!    keep the unmodified values.
//! 2. Linear category upgrades, each `x (1 + level)`: cell power, reflector
//!    bonuses, vent rate, transfer rate, containment, capacitor power,
//!    plating heat, accelerator threshold.
//! 3. Cell tiers on top of step 2: `infused_cells` (linear, power) then
//!    `unleashed_cells` (doubling, power and heat).
//! 4. Lifespans: cells double per `cell_lifespan` level, reflectors scale
//!    linearly with `reflector_lifespan`.
//! 5. Additive range for exchangers, inlets and outlets.
//! 6. Perpetual flags are OR-ed with the part's own flag.
//!
//! The engine treats the result as opaque. After any upgrade purchase the
//! host calls [`PartRegistry::apply_upgrades`] to publish fresh snapshots.

use crate::loader::{DataLoadError, load_parts};
use crate::schema::{PartData, UpgradeLevels};
use reactor_core::component::{Category, ComponentId, ResolvedComponent};
use reactor_core::engine::Engine;
use std::collections::HashMap;
use std::path::Path;

fn linear(level: u32) -> f64 {
    1.0 + f64::from(level)
}

fn doubling(level: u32) -> f64 {
    2f64.powi(level.min(i32::MAX as u32) as i32)
}

/// Resolve one part under the given upgrade levels.
pub fn derive_component(part: &PartData, upgrades: &UpgradeLevels) -> ResolvedComponent {
    let mut c = ResolvedComponent::new(part.name.clone(), part.category);
    c.level = part.level;
    c.cost = part.cost;

    // 1. Unmodified statistics.
    c.base_power = part.power;
    c.base_heat = part.heat;
    c.base_ticks = part.ticks;
    c.power = part.power;
    c.heat = part.heat;
    c.ticks = part.ticks;
    c.containment = part.containment;
    c.vent = part.vent;
    c.transfer = part.transfer;
    c.range = part.range;
    c.reflector_power_bonus = part.reflector_power_bonus;
    c.reflector_heat_bonus = part.reflector_heat_bonus;
    c.reactor_power = part.reactor_power;
    c.reactor_heat = part.reactor_heat;
    c.vent_bonus_pct = part.vent_bonus_pct;
    c.transfer_bonus_pct = part.transfer_bonus_pct;
    c.ep_heat_threshold = part.ep_heat_threshold;
    c.heat_bonus_feeds_power = part.heat_bonus_feeds_power;
    c.valve = part.valve;

    // 2. Linear category upgrades.
    match part.category {
        Category::Cell => c.power *= linear(upgrades.cell_power),
        Category::Reflector => {
            c.reflector_power_bonus *= linear(upgrades.reflector_power);
            c.reflector_heat_bonus *= linear(upgrades.reflector_power);
        }
        Category::Vent => c.vent *= linear(upgrades.vent_rate),
        Category::HeatExchanger | Category::HeatInlet | Category::HeatOutlet | Category::Valve => {
            c.transfer *= linear(upgrades.heat_transfer)
        }
        Category::Capacitor => c.reactor_power *= linear(upgrades.capacitor_power),
        Category::ReactorPlating => c.reactor_heat *= linear(upgrades.plating_heat),
        Category::ParticleAccelerator => {
            c.ep_heat_threshold *= linear(upgrades.accelerator_threshold)
        }
        Category::CoolantCell => {}
    }
    if c.containment > 0.0 {
        c.containment *= linear(upgrades.containment);
    }

    // 3. Cell tiers.
    if part.category == Category::Cell {
        c.power *= linear(upgrades.infused_cells);
        let unleashed = doubling(upgrades.unleashed_cells);
        c.power *= unleashed;
        c.heat *= unleashed;
    }

    // 4. Lifespans.
    match part.category {
        Category::Cell => c.ticks *= doubling(upgrades.cell_lifespan),
        Category::Reflector => c.ticks *= linear(upgrades.reflector_lifespan),
        _ => {}
    }

    // 5. Range.
    if matches!(
        part.category,
        Category::HeatExchanger | Category::HeatInlet | Category::HeatOutlet
    ) {
        c.range = c.range.saturating_add(upgrades.transfer_range);
    }

    // 6. Perpetual.
    c.perpetual = part.perpetual
        || match part.category {
            Category::Cell => upgrades.cell_perpetual,
            Category::Reflector => upgrades.reflector_perpetual,
            _ => false,
        };

    c
}

// ===========================================================================
// PartRegistry
// ===========================================================================

/// Maps part names to the catalog ids they were published under, so upgrade
/// purchases can re-derive snapshots in place.
#[derive(Debug, Clone, Default)]
pub struct PartRegistry {
    parts: Vec<(PartData, ComponentId)>,
    by_name: HashMap<String, usize>,
}

impl PartRegistry {
    /// Derive every part and register it with the engine. A later part with
    /// a name already seen replaces the earlier one's snapshot.
    pub fn register(engine: &mut Engine, parts: Vec<PartData>, upgrades: &UpgradeLevels) -> Self {
        let mut registry = Self::default();
        for part in parts {
            let component = derive_component(&part, upgrades);
            match registry.by_name.get(&part.name) {
                Some(&i) => {
                    let id = registry.parts[i].1;
                    engine.update_component(id, component);
                    registry.parts[i].0 = part;
                }
                None => {
                    let id = engine.register_component(component);
                    registry.by_name.insert(part.name.clone(), registry.parts.len());
                    registry.parts.push((part, id));
                }
            }
        }
        log::debug!("registered {} parts", registry.parts.len());
        registry
    }

    /// Load a part table and register it.
    pub fn from_file(
        engine: &mut Engine,
        path: &Path,
        upgrades: &UpgradeLevels,
    ) -> Result<Self, DataLoadError> {
        Ok(Self::register(engine, load_parts(path)?, upgrades))
    }

    /// Catalog id of a part by name.
    pub fn id(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).map(|&i| self.parts[i].1)
    }

    pub fn part(&self, name: &str) -> Option<&PartData> {
        self.by_name.get(name).map(|&i| &self.parts[i].0)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Re-derive every part under new upgrade levels and publish the
    /// snapshots. Returns how many were replaced.
    pub fn apply_upgrades(&self, engine: &mut Engine, upgrades: &UpgradeLevels) -> usize {
        self.parts
            .iter()
            .filter(|(part, id)| engine.update_component(*id, derive_component(part, upgrades)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactor_core::grid::GridPosition;
    use reactor_core::test_utils::small_engine;

    fn part(name: &str, category: Category) -> PartData {
        PartData {
            name: name.to_string(),
            category,
            level: 1,
            cost: 0.0,
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
            valve: Default::default(),
        }
    }

    fn cell() -> PartData {
        PartData {
            power: 1.0,
            heat: 1.0,
            ticks: 15.0,
            cost: 10.0,
            ..part("uranium_cell", Category::Cell)
        }
    }

    #[test]
    fn no_upgrades_copies_part() {
        let c = derive_component(&cell(), &UpgradeLevels::default());
        assert_eq!(c.power, 1.0);
        assert_eq!(c.heat, 1.0);
        assert_eq!(c.ticks, 15.0);
        assert_eq!(c.base_ticks, 15.0);
        assert_eq!(c.cost, 10.0);
        assert!(!c.perpetual);
    }

    #[test]
    fn cell_power_stacks_in_order() {
        let upgrades = UpgradeLevels {
            cell_power: 1,
            infused_cells: 2,
            unleashed_cells: 1,
            ..Default::default()
        };
        let c = derive_component(&cell(), &upgrades);
        // 1 * 2 * 3 * 2
        assert_eq!(c.power, 12.0);
        assert_eq!(c.heat, 2.0);
        assert_eq!(c.base_power, 1.0);
        assert_eq!(c.base_heat, 1.0);
    }

    #[test]
    fn lifespan_doubles_for_cells_and_scales_for_reflectors() {
        let upgrades = UpgradeLevels {
            cell_lifespan: 3,
            reflector_lifespan: 1,
            ..Default::default()
        };
        assert_eq!(derive_component(&cell(), &upgrades).ticks, 120.0);

        let reflector = PartData {
            ticks: 100.0,
            reflector_power_bonus: 5.0,
            ..part("neutron_reflector", Category::Reflector)
        };
        assert_eq!(derive_component(&reflector, &upgrades).ticks, 200.0);
    }

    #[test]
    fn upgrades_stay_in_their_category() {
        let upgrades = UpgradeLevels {
            vent_rate: 1,
            heat_transfer: 3,
            ..Default::default()
        };
        let vent = PartData {
            vent: 4.0,
            transfer: 10.0,
            ..part("vent", Category::Vent)
        };
        let c = derive_component(&vent, &upgrades);
        assert_eq!(c.vent, 8.0);
        assert_eq!(c.transfer, 10.0);
    }

    #[test]
    fn containment_scales_only_heat_holders() {
        let upgrades = UpgradeLevels {
            containment: 1,
            ..Default::default()
        };
        let coolant = PartData {
            containment: 200.0,
            ..part("coolant_cell", Category::CoolantCell)
        };
        assert_eq!(derive_component(&coolant, &upgrades).containment, 400.0);
        assert_eq!(derive_component(&cell(), &upgrades).containment, 0.0);
    }

    #[test]
    fn range_is_additive_for_transfer_parts() {
        let upgrades = UpgradeLevels {
            transfer_range: 2,
            ..Default::default()
        };
        let exchanger = part("heat_exchanger", Category::HeatExchanger);
        assert_eq!(derive_component(&exchanger, &upgrades).range, 3);
        let vent = part("vent", Category::Vent);
        assert_eq!(derive_component(&vent, &upgrades).range, 1);
    }

    #[test]
    fn perpetual_from_part_or_upgrade() {
        let upgrades = UpgradeLevels {
            cell_perpetual: true,
            ..Default::default()
        };
        assert!(derive_component(&cell(), &upgrades).perpetual);

        let reflector = PartData {
            perpetual: true,
            ..part("thermal_reflector", Category::Reflector)
        };
        assert!(derive_component(&reflector, &UpgradeLevels::default()).perpetual);
    }

    // -----------------------------------------------------------------------
    // PartRegistry
    // -----------------------------------------------------------------------

    #[test]
    fn registry_publishes_and_reapplies() {
        let mut engine = small_engine(2, 2);
        let vent = PartData {
            vent: 4.0,
            containment: 80.0,
            ..part("vent", Category::Vent)
        };
        let registry =
            PartRegistry::register(&mut engine, vec![cell(), vent], &UpgradeLevels::default());
        assert_eq!(registry.len(), 2);

        let cell_id = registry.id("uranium_cell").unwrap();
        engine.install(GridPosition::new(0, 0), cell_id).unwrap();
        assert_eq!(engine.catalog().get(cell_id).unwrap().power, 1.0);

        let upgrades = UpgradeLevels {
            cell_power: 1,
            ..Default::default()
        };
        assert_eq!(registry.apply_upgrades(&mut engine, &upgrades), 2);
        assert_eq!(engine.catalog().get(cell_id).unwrap().power, 2.0);
        assert!(registry.id("missing").is_none());
    }

    #[test]
    fn registry_later_duplicate_replaces_snapshot() {
        let mut engine = small_engine(1, 1);
        let stronger = PartData {
            power: 5.0,
            ..cell()
        };
        let registry =
            PartRegistry::register(&mut engine, vec![cell(), stronger], &UpgradeLevels::default());
        assert_eq!(registry.len(), 1);
        let id = registry.id("uranium_cell").unwrap();
        assert_eq!(engine.catalog().get(id).unwrap().power, 5.0);
        assert_eq!(registry.part("uranium_cell").unwrap().power, 5.0);
    }
}
