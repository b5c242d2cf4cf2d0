//! Persistent index of previously observed cells.
//!
//! The cache answers "where have I seen this cell type before" without
//! touching the live world. It only records the cell types it tracks, and
//! what it holds can be stale: a recorded cell may since have been broken.
//! Callers re-validate results against the live world before trusting them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use excavator_types::{CellType, Position, REGION_SIZE, RegionCoord};
use tracing::debug;

use crate::world::World;

/// Region-adjacency bound meaning "same, directly adjacent, or diagonally
/// adjacent region".
pub const ADJACENT_REGIONS: i64 = 2;

/// Lookup of previously observed cell locations.
pub trait PersistentCache: Send + Sync {
    /// Whether occurrences of `cell` are indexed at all.
    fn tracks(&self, cell: CellType) -> bool;

    /// Up to `max` recorded positions of `cell` in regions whose squared
    /// region distance from the region of column `(origin_x, origin_z)` is
    /// at most `max_region_distance_sq`, nearest regions first.
    fn locations_of(
        &self,
        cell: CellType,
        max: usize,
        origin_x: i32,
        origin_z: i32,
        max_region_distance_sq: i64,
    ) -> Vec<Position>;
}

type CellIndex = BTreeMap<CellType, BTreeMap<RegionCoord, BTreeSet<Position>>>;

/// In-memory [`PersistentCache`] keyed by cell type and region.
#[derive(Debug, Default)]
pub struct RegionIndex {
    index: RwLock<CellIndex>,
}

impl RegionIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `cell` was observed at `pos`. Untracked cells are
    /// ignored, and any previous record at `pos` is replaced.
    pub fn record(&self, pos: Position, cell: CellType) {
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        for regions in index.values_mut() {
            if let Some(positions) = regions.get_mut(&pos.region()) {
                positions.remove(&pos);
            }
        }
        if cell.is_tracked() {
            index
                .entry(cell)
                .or_default()
                .entry(pos.region())
                .or_default()
                .insert(pos);
        }
    }

    /// Re-index a whole loaded region from the live world, replacing
    /// everything previously recorded for it. Returns the number of tracked
    /// cells found.
    pub fn observe_region(&self, world: &dyn World, region: RegionCoord) -> usize {
        let (min_y, max_y) = world.height_bounds();
        let mut found: BTreeMap<CellType, BTreeSet<Position>> = BTreeMap::new();
        for dx in 0..REGION_SIZE {
            for dz in 0..REGION_SIZE {
                for y in min_y..max_y {
                    let pos = Position::new(
                        region.min_x().saturating_add(dx),
                        y,
                        region.min_z().saturating_add(dz),
                    );
                    let cell = world.cell_at(pos);
                    if cell.is_tracked() {
                        found.entry(cell).or_default().insert(pos);
                    }
                }
            }
        }

        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        for regions in index.values_mut() {
            regions.remove(&region);
        }
        let total = found.values().map(BTreeSet::len).sum();
        for (cell, positions) in found {
            index.entry(cell).or_default().insert(region, positions);
        }
        debug!(region_x = region.x, region_z = region.z, total, "Region indexed");
        total
    }
}

impl PersistentCache for RegionIndex {
    fn tracks(&self, cell: CellType) -> bool {
        cell.is_tracked()
    }

    fn locations_of(
        &self,
        cell: CellType,
        max: usize,
        origin_x: i32,
        origin_z: i32,
        max_region_distance_sq: i64,
    ) -> Vec<Position> {
        let origin = RegionCoord::containing(origin_x, origin_z);
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        let Some(regions) = index.get(&cell) else {
            return Vec::new();
        };

        let mut nearby: Vec<(&RegionCoord, &BTreeSet<Position>)> = regions
            .iter()
            .filter(|(region, _)| region.distance_sq(origin) <= max_region_distance_sq)
            .collect();
        nearby.sort_by_key(|(region, _)| region.distance_sq(origin));

        let mut result = Vec::new();
        for (_, positions) in nearby {
            if result.len() >= max {
                break;
            }
            result.extend(positions.iter().copied());
        }
        result.truncate(max);
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::world::VoxelWorld;

    #[test]
    fn untracked_cells_are_not_recorded() {
        let index = RegionIndex::new();
        index.record(Position::new(0, 60, 0), CellType::Sand);
        assert!(!index.tracks(CellType::Sand));
        assert!(index.locations_of(CellType::Sand, 10, 0, 0, 2).is_empty());
    }

    #[test]
    fn lookup_respects_region_adjacency() {
        let index = RegionIndex::new();
        index.record(Position::new(1, 12, 1), CellType::IronOre);
        index.record(Position::new(17, 12, 17), CellType::IronOre);
        index.record(Position::new(40, 12, 1), CellType::IronOre);

        let found = index.locations_of(CellType::IronOre, 10, 0, 0, ADJACENT_REGIONS);
        assert_eq!(found, vec![Position::new(1, 12, 1), Position::new(17, 12, 17)]);
    }

    #[test]
    fn lookup_is_capped() {
        let index = RegionIndex::new();
        for y in 0..20 {
            index.record(Position::new(3, y, 3), CellType::CoalOre);
        }
        assert_eq!(index.locations_of(CellType::CoalOre, 5, 0, 0, 2).len(), 5);
    }

    #[test]
    fn re_recording_replaces_the_old_entry() {
        let index = RegionIndex::new();
        let pos = Position::new(5, 20, 5);
        index.record(pos, CellType::GoldOre);
        index.record(pos, CellType::Air);
        assert!(index.locations_of(CellType::GoldOre, 10, 0, 0, 2).is_empty());
    }

    #[test]
    fn observing_a_region_indexes_tracked_cells() {
        let world = VoxelWorld::new(0, 32).unwrap();
        let region = RegionCoord::new(0, 0);
        world.load_region(region);
        world.set_cell(Position::new(2, 5, 2), CellType::DiamondOre).unwrap();
        world.set_cell(Position::new(3, 5, 2), CellType::Sand).unwrap();

        let index = RegionIndex::new();
        assert_eq!(index.observe_region(&world, region), 1);
        assert_eq!(
            index.locations_of(CellType::DiamondOre, 10, 0, 0, 2),
            vec![Position::new(2, 5, 2)]
        );
    }
}
