//! World snapshot, region cache, and world-facing scans for the excavator
//! engine.
//!
//! This crate models everything the excavation logic reads from the world:
//! the live cell and entity view, the persistent index of previously seen
//! cells, and the pure helpers built on top of them.
//!
//! # Modules
//!
//! - [`world`] -- The [`World`] read trait and the in-memory [`VoxelWorld`].
//! - [`cache`] -- The [`PersistentCache`] trait and the in-memory
//!   [`RegionIndex`].
//! - [`mining`] -- Mining cost estimation and the plausibility filter.
//! - [`drops`] -- Dropped-resource scanning over loaded item entities.
//! - [`scanner`] -- Brute-force radius scanning of loaded regions.
//! - [`raycast`] -- Voxel ray casting and aim solutions.
//! - [`error`] -- Error types for in-memory world mutation.

pub mod cache;
pub mod drops;
pub mod error;
pub mod mining;
pub mod raycast;
pub mod scanner;
pub mod world;

// Re-export primary types at crate root.
pub use cache::{ADJACENT_REGIONS, PersistentCache, RegionIndex};
pub use drops::scan_dropped_resources;
pub use error::WorldError;
pub use mining::{BreakPolicy, avoid_breaking, is_plausible, mining_cost};
pub use raycast::{RayHit, looking_at, raycast, reachable};
pub use scanner::scan_region_radius;
pub use world::{VoxelWorld, World};
