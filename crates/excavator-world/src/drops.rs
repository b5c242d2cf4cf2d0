//! Dropped-resource scanning.
//!
//! Loose items lying in the world are as good as the cells they came from:
//! walking over them collects them. This module finds the ones that match
//! a target set, either as a target's natural drop or as its raw item form.

use excavator_types::{Position, TargetSet};

use crate::world::World;

/// Positions of loaded item entities carrying a resource item of `targets`.
///
/// Returns an empty list when `enabled` is `false`. Read-only.
pub fn scan_dropped_resources(targets: &TargetSet, world: &dyn World, enabled: bool) -> Vec<Position> {
    if !enabled {
        return Vec::new();
    }
    let wanted = targets.resource_items();
    world
        .loaded_entities()
        .iter()
        .filter_map(|entity| entity.as_item())
        .filter(|item| wanted.contains(&item.item))
        .map(|item| item.cell())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use excavator_types::{CellType, Entity, ItemEntity, ItemType, RegionCoord, Vec3};

    use super::*;
    use crate::world::VoxelWorld;

    fn make_world_with_items(items: &[(ItemType, Vec3)]) -> VoxelWorld {
        let world = VoxelWorld::new(0, 128).unwrap();
        world.load_region(RegionCoord::new(0, 0));
        for &(item, position) in items {
            world
                .spawn_entity(Entity::Item(ItemEntity {
                    position,
                    item,
                    count: 1,
                }))
                .unwrap();
        }
        world
            .spawn_entity(Entity::Other {
                position: Vec3::new(8.0, 64.0, 8.0),
            })
            .unwrap();
        world
    }

    #[test]
    fn matches_drops_and_raw_forms_only() {
        let world = make_world_with_items(&[
            (ItemType::Coal, Vec3::new(1.5, 64.2, 1.5)),
            (ItemType::CoalOre, Vec3::new(2.5, 64.2, 1.5)),
            (ItemType::Dirt, Vec3::new(3.5, 64.2, 1.5)),
        ]);
        let targets = TargetSet::new([CellType::CoalOre]).unwrap();
        let found = scan_dropped_resources(&targets, &world, true);
        assert_eq!(found, vec![Position::new(1, 64, 1), Position::new(2, 64, 1)]);
    }

    #[test]
    fn disabled_scan_returns_nothing() {
        let world = make_world_with_items(&[(ItemType::Sand, Vec3::new(1.5, 64.0, 1.5))]);
        let targets = TargetSet::new([CellType::Sand]).unwrap();
        assert!(scan_dropped_resources(&targets, &world, false).is_empty());
    }
}
