//! Shared value types for the excavator target-acquisition engine.
//!
//! Every other crate in the workspace speaks in these types. They carry no
//! behaviour beyond geometry and simple container queries.
//!
//! # Modules
//!
//! - [`geometry`] -- Cell positions, region partitions, continuous vectors,
//!   and view rotations.
//! - [`enums`] -- The cell and item palettes with their physical properties.
//! - [`structs`] -- Target sets, inventories, and loose item entities.

pub mod enums;
pub mod geometry;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CellType, ItemType, ParseCellTypeError};
pub use geometry::{Position, REGION_SIZE, RegionCoord, Rotation, Vec3};
pub use structs::{Entity, Inventory, ItemEntity, ItemStack, TargetSet};
