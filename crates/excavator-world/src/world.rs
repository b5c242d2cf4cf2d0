//! The live world snapshot: cell lookup, region load state, and entities.
//!
//! [`World`] is the read-only view the excavation logic consumes. It is
//! `Send + Sync` because the periodic world search reads it from a
//! background worker while the control loop keeps running.
//!
//! [`VoxelWorld`] is an in-memory implementation backed by dense 16x16
//! region columns. It is used by the demo engine and by tests, and supports
//! the handful of mutations those need (placing and breaking cells,
//! spawning and collecting item entities).

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use excavator_types::{CellType, Entity, ItemEntity, Position, REGION_SIZE, RegionCoord, Vec3};

use crate::error::WorldError;

/// Read access to the currently loaded world.
pub trait World: Send + Sync {
    /// The cell at `pos`. Unloaded or out-of-range cells read as air.
    fn cell_at(&self, pos: Position) -> CellType;

    /// Whether the region containing column `(x, z)` is loaded.
    fn is_region_loaded(&self, x: i32, z: i32) -> bool;

    /// Every loaded region.
    fn loaded_regions(&self) -> Vec<RegionCoord>;

    /// Every entity in loaded regions.
    fn loaded_entities(&self) -> Vec<Entity>;

    /// Vertical extent as `(min_y, max_y)`, `max_y` exclusive.
    fn height_bounds(&self) -> (i32, i32);
}

// ---------------------------------------------------------------------------
// In-memory world
// ---------------------------------------------------------------------------

/// Dense storage for one loaded region.
#[derive(Debug, Clone)]
struct RegionColumn {
    cells: Vec<CellType>,
}

impl RegionColumn {
    fn new(height: usize) -> Self {
        let size = REGION_SIZE.unsigned_abs() as usize;
        Self {
            cells: vec![CellType::Air; size.saturating_mul(size).saturating_mul(height)],
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    regions: BTreeMap<RegionCoord, RegionColumn>,
    entities: Vec<Entity>,
}

/// An in-memory voxel world with explicit region loading.
#[derive(Debug)]
pub struct VoxelWorld {
    min_y: i32,
    height: i32,
    inner: RwLock<Inner>,
}

impl VoxelWorld {
    /// Create an empty world spanning `min_y..min_y + height`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidHeight`] when `height` is not positive.
    pub fn new(min_y: i32, height: i32) -> Result<Self, WorldError> {
        if height <= 0 {
            return Err(WorldError::InvalidHeight(height));
        }
        Ok(Self {
            min_y,
            height,
            inner: RwLock::new(Inner::default()),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index of `pos` inside its region column, or `None` when out of range.
    fn index_of(&self, pos: Position) -> Option<usize> {
        let local_y = usize::try_from(pos.y.checked_sub(self.min_y)?).ok()?;
        if local_y >= self.height.unsigned_abs() as usize {
            return None;
        }
        let size = REGION_SIZE.unsigned_abs() as usize;
        let local_x = pos.x.rem_euclid(REGION_SIZE).unsigned_abs() as usize;
        let local_z = pos.z.rem_euclid(REGION_SIZE).unsigned_abs() as usize;
        local_y
            .checked_mul(size)?
            .checked_add(local_z)?
            .checked_mul(size)?
            .checked_add(local_x)
    }

    /// Load a region, filling it with air. Loading an already loaded region
    /// is a no-op.
    pub fn load_region(&self, region: RegionCoord) {
        let height = self.height.unsigned_abs() as usize;
        self.write()
            .regions
            .entry(region)
            .or_insert_with(|| RegionColumn::new(height));
    }

    /// Unload a region, discarding its cells and entities.
    pub fn unload_region(&self, region: RegionCoord) {
        let mut inner = self.write();
        inner.regions.remove(&region);
        inner
            .entities
            .retain(|entity| Position::containing(entity_position(entity)).region() != region);
    }

    /// Set the cell at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] when `pos` is outside the height
    /// range, or [`WorldError::RegionNotLoaded`] when its region is not
    /// loaded.
    pub fn set_cell(&self, pos: Position, cell: CellType) -> Result<(), WorldError> {
        let index = self.index_of(pos).ok_or(WorldError::OutOfBounds {
            position: pos,
            min_y: self.min_y,
            max_y: self.min_y.saturating_add(self.height),
        })?;
        let mut inner = self.write();
        let column = inner
            .regions
            .get_mut(&pos.region())
            .ok_or(WorldError::RegionNotLoaded(pos.region()))?;
        if let Some(slot) = column.cells.get_mut(index) {
            *slot = cell;
        }
        Ok(())
    }

    /// Fill the axis-aligned box between two corners (inclusive) with `cell`.
    ///
    /// # Errors
    ///
    /// Fails on the first cell that [`Self::set_cell`] rejects.
    pub fn fill(&self, from: Position, to: Position, cell: CellType) -> Result<(), WorldError> {
        for x in from.x.min(to.x)..=from.x.max(to.x) {
            for y in from.y.min(to.y)..=from.y.max(to.y) {
                for z in from.z.min(to.z)..=from.z.max(to.z) {
                    self.set_cell(Position::new(x, y, z), cell)?;
                }
            }
        }
        Ok(())
    }

    /// Add an entity to the world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RegionNotLoaded`] when the entity's region is
    /// not loaded.
    pub fn spawn_entity(&self, entity: Entity) -> Result<(), WorldError> {
        let region = Position::containing(entity_position(&entity)).region();
        let mut inner = self.write();
        if !inner.regions.contains_key(&region) {
            return Err(WorldError::RegionNotLoaded(region));
        }
        inner.entities.push(entity);
        Ok(())
    }

    /// Break the cell at `pos`: replace it with air and drop its item as an
    /// entity at the cell centre. Returns the cell that was there.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::set_cell`] failures.
    pub fn break_cell(&self, pos: Position) -> Result<CellType, WorldError> {
        let previous = self.cell_at(pos);
        self.set_cell(pos, CellType::Air)?;
        if let Some(item) = previous.drop_item() {
            self.spawn_entity(Entity::Item(ItemEntity {
                position: pos.center(),
                item,
                count: 1,
            }))?;
        }
        Ok(previous)
    }

    /// Remove and return every item entity within `radius` of `point`.
    pub fn collect_items_near(&self, point: Vec3, radius: f64) -> Vec<ItemEntity> {
        let radius_sq = radius * radius;
        let mut inner = self.write();
        let mut collected = Vec::new();
        inner.entities.retain(|entity| match entity {
            Entity::Item(item) if item.position.distance_sq(point) <= radius_sq => {
                collected.push(*item);
                false
            }
            _ => true,
        });
        collected
    }
}

const fn entity_position(entity: &Entity) -> Vec3 {
    match entity {
        Entity::Item(item) => item.position,
        Entity::Other { position } => *position,
    }
}

impl World for VoxelWorld {
    fn cell_at(&self, pos: Position) -> CellType {
        let Some(index) = self.index_of(pos) else {
            return CellType::Air;
        };
        self.read()
            .regions
            .get(&pos.region())
            .and_then(|column| column.cells.get(index).copied())
            .unwrap_or(CellType::Air)
    }

    fn is_region_loaded(&self, x: i32, z: i32) -> bool {
        self.read()
            .regions
            .contains_key(&RegionCoord::containing(x, z))
    }

    fn loaded_regions(&self) -> Vec<RegionCoord> {
        self.read().regions.keys().copied().collect()
    }

    fn loaded_entities(&self) -> Vec<Entity> {
        self.read().entities.clone()
    }

    fn height_bounds(&self) -> (i32, i32) {
        (self.min_y, self.min_y.saturating_add(self.height))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use excavator_types::ItemType;

    use super::*;

    fn make_world() -> VoxelWorld {
        let world = VoxelWorld::new(0, 128).unwrap();
        world.load_region(RegionCoord::new(0, 0));
        world.load_region(RegionCoord::new(-1, 0));
        world
    }

    #[test]
    fn zero_height_is_rejected() {
        assert_eq!(VoxelWorld::new(0, 0).unwrap_err(), WorldError::InvalidHeight(0));
    }

    #[test]
    fn set_and_read_back_cells() {
        let world = make_world();
        let pos = Position::new(-3, 63, 7);
        world.set_cell(pos, CellType::Sand).unwrap();
        assert_eq!(world.cell_at(pos), CellType::Sand);
        assert_eq!(world.cell_at(pos.up()), CellType::Air);
    }

    #[test]
    fn unloaded_regions_read_as_air_and_reject_writes() {
        let world = make_world();
        let far = Position::new(100, 63, 100);
        assert_eq!(world.cell_at(far), CellType::Air);
        assert!(!world.is_region_loaded(far.x, far.z));
        assert_eq!(
            world.set_cell(far, CellType::Sand),
            Err(WorldError::RegionNotLoaded(far.region()))
        );
    }

    #[test]
    fn writes_outside_height_are_rejected() {
        let world = make_world();
        let err = world.set_cell(Position::new(0, 128, 0), CellType::Stone).unwrap_err();
        assert!(matches!(err, WorldError::OutOfBounds { .. }));
    }

    #[test]
    fn breaking_spawns_the_drop() {
        let world = make_world();
        let pos = Position::new(1, 63, 1);
        world.set_cell(pos, CellType::CoalOre).unwrap();
        assert_eq!(world.break_cell(pos).unwrap(), CellType::CoalOre);
        assert_eq!(world.cell_at(pos), CellType::Air);
        let entities = world.loaded_entities();
        assert_eq!(entities.len(), 1);
        let item = entities.first().and_then(Entity::as_item).unwrap();
        assert_eq!(item.item, ItemType::Coal);
        assert_eq!(item.cell(), pos);
    }

    #[test]
    fn collecting_removes_only_nearby_items() {
        let world = make_world();
        for x in [1, 10] {
            world
                .spawn_entity(Entity::Item(ItemEntity {
                    position: Vec3::new(f64::from(x) + 0.5, 64.0, 0.5),
                    item: ItemType::Sand,
                    count: 1,
                }))
                .unwrap();
        }
        let picked = world.collect_items_near(Vec3::new(0.5, 64.0, 0.5), 2.0);
        assert_eq!(picked.len(), 1);
        assert_eq!(world.loaded_entities().len(), 1);
    }

    #[test]
    fn unloading_drops_cells_and_entities() {
        let world = make_world();
        let pos = Position::new(2, 10, 2);
        world.set_cell(pos, CellType::Stone).unwrap();
        world.break_cell(pos).unwrap();
        world.unload_region(RegionCoord::new(0, 0));
        assert!(world.loaded_entities().is_empty());
        assert_eq!(world.loaded_regions(), vec![RegionCoord::new(-1, 0)]);
    }
}
