//! Serde data file structs for reactor content.
//!
//! These structs define the on-disk format for part definitions and upgrade
//! levels. They are deserialized from RON, JSON, or TOML data files and then
//! turned into engine snapshots by [`crate::derive`].

use reactor_core::component::{Category, ValveKind};
use serde::Deserialize;

fn default_level() -> u32 {
    1
}

fn default_range() -> u32 {
    1
}

// ===========================================================================
// Parts
// ===========================================================================

/// A part definition in a data file: the unmodified statistics of one
/// component type at one tier.
///
/// Only `name` and `category` are required; every statistic defaults to
/// zero, `level` and `range` to one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PartData {
    pub name: String,
    pub category: Category,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub cost: f64,

    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub heat: f64,
    /// Lifespan in ticks. Zero means the part never depletes.
    #[serde(default)]
    pub ticks: f64,
    #[serde(default)]
    pub containment: f64,
    #[serde(default)]
    pub vent: f64,
    #[serde(default)]
    pub transfer: f64,
    #[serde(default = "default_range")]
    pub range: u32,

    #[serde(default)]
    pub reflector_power_bonus: f64,
    #[serde(default)]
    pub reflector_heat_bonus: f64,
    #[serde(default)]
    pub reactor_power: f64,
    #[serde(default)]
    pub reactor_heat: f64,
    #[serde(default)]
    pub vent_bonus_pct: f64,
    #[serde(default)]
    pub transfer_bonus_pct: f64,
    #[serde(default)]
    pub ep_heat_threshold: f64,

    #[serde(default)]
    pub perpetual: bool,
    #[serde(default)]
    pub heat_bonus_feeds_power: bool,
    #[serde(default)]
    pub valve: ValveKind,
}

// ===========================================================================
// Upgrades
// ===========================================================================

/// Purchased upgrade levels, as tracked by the progression layer.
///
/// "Linear" upgrades scale a statistic by `1 + level`; "doubling" upgrades
/// scale it by `2^level`. See [`crate::derive`] for the order they apply in.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpgradeLevels {
    /// Linear, cell power.
    pub cell_power: u32,
    /// Doubling, cell lifespan.
    pub cell_lifespan: u32,
    pub cell_perpetual: bool,
    /// Linear, cell power. Stacks after `cell_power`.
    pub infused_cells: u32,
    /// Doubling, cell power and heat.
    pub unleashed_cells: u32,

    /// Linear, reflector power and heat bonus.
    pub reflector_power: u32,
    /// Linear, reflector lifespan.
    pub reflector_lifespan: u32,
    pub reflector_perpetual: bool,

    /// Linear, vent rate.
    pub vent_rate: u32,
    /// Linear, transfer rate of exchangers, inlets, outlets and valves.
    pub heat_transfer: u32,
    /// Linear, containment of every heat-holding part.
    pub containment: u32,
    /// Additive, range of exchangers, inlets and outlets.
    pub transfer_range: u32,

    /// Linear, capacitor max power bonus.
    pub capacitor_power: u32,
    /// Linear, plating max heat bonus.
    pub plating_heat: u32,
    /// Linear, particle accelerator heat threshold.
    pub accelerator_threshold: u32,
}
