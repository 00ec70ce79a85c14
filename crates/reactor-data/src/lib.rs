//! Content adapter for the reactor engine.
//!
//! Part definitions, upgrade levels and engine configuration live in RON,
//! JSON or TOML files. [`loader`] reads them, [`schema`] defines their
//! on-disk shape and [`derive`] turns a part plus the current upgrade levels
//! into the [`ResolvedComponent`](reactor_core::component::ResolvedComponent)
//! snapshot the engine reads.

pub mod derive;
pub mod loader;
pub mod schema;

pub use derive::{PartRegistry, derive_component};
pub use loader::{Content, DataLoadError, load_config, load_content, load_parts, load_upgrades};
