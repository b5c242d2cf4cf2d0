//! Seeded desert world generation for the demo run.
//!
//! The terrain is a bedrock floor, a stone body with scattered ore, and a
//! sand layer shaped into dunes. Gravel patches, small water pools and a
//! few loose sand items sit on the surface. The same seed always produces
//! the same world.

use excavator_types::{
    CellType, Entity, ItemEntity, ItemType, Position, REGION_SIZE, RegionCoord, Vec3,
};
use excavator_world::{VoxelWorld, World, WorldError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Lowest cell of the world.
pub const MIN_Y: i32 = 0;

/// Number of cells from [`MIN_Y`] upward.
pub const HEIGHT: i32 = 128;

/// Surface height where no dune rises.
const BASE_SURFACE: i32 = 60;

/// Top of the stone body before jitter.
const STONE_TOP: i32 = 54;

/// Lowest ore cell.
const ORE_MIN_Y: i32 = 5;

/// Highest ore origin, leaving room for the cell stacked on top.
const ORE_MAX_Y: i32 = STONE_TOP - 4;

/// Tallest a dune may rise above the base surface.
const MAX_DUNE_HEIGHT: i32 = 5;

const DUNES_PER_REGION: u32 = 2;
const ORES_PER_REGION: u32 = 6;
const GRAVEL_PATCHES_PER_REGION: u32 = 1;
const POOLS: u32 = 2;
const LOOSE_ITEMS: u32 = 3;

/// A generated world and where the agent starts.
pub struct Desert {
    /// The generated world.
    pub world: VoxelWorld,
    /// Feet position of the agent at spawn.
    pub spawn: Position,
}

#[derive(Debug, Clone, Copy)]
struct Dune {
    x: i32,
    z: i32,
    radius: i32,
}

/// Generate a desert spanning `region_radius` regions in every direction
/// from the origin region.
///
/// # Errors
///
/// Returns [`WorldError`] if a generated cell falls outside the world,
/// which indicates inconsistent generation constants.
pub fn generate(seed: u64, region_radius: i32) -> Result<Desert, WorldError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let world = VoxelWorld::new(MIN_Y, HEIGHT)?;
    let radius = region_radius.max(0);
    let min = radius.saturating_mul(REGION_SIZE).saturating_neg();
    let max = radius.saturating_add(1).saturating_mul(REGION_SIZE).saturating_sub(1);

    let mut regions = 0_u32;
    for rx in radius.saturating_neg()..=radius {
        for rz in radius.saturating_neg()..=radius {
            world.load_region(RegionCoord::new(rx, rz));
            regions = regions.saturating_add(1);
        }
    }

    let dunes: Vec<Dune> = (0..regions.saturating_mul(DUNES_PER_REGION))
        .map(|_| Dune {
            x: rng.random_range(min..=max),
            z: rng.random_range(min..=max),
            radius: rng.random_range(3..=8),
        })
        .collect();

    for x in min..=max {
        for z in min..=max {
            let stone_top = STONE_TOP.saturating_add(rng.random_range(0..=2));
            let surface = surface_at(&dunes, x, z);
            let bedrock = Position::new(x, MIN_Y, z);
            world.set_cell(bedrock, CellType::Bedrock)?;
            world.fill(bedrock.up(), Position::new(x, stone_top, z), CellType::Stone)?;
            world.fill(
                Position::new(x, stone_top.saturating_add(1), z),
                Position::new(x, surface, z),
                CellType::Sand,
            )?;
        }
    }

    // Each ore vein also takes the cell east of its origin, so origins stop
    // one column short of the edge.
    let mut ores = 0_u32;
    for _ in 0..regions.saturating_mul(ORES_PER_REGION) {
        let pos = Position::new(
            rng.random_range(min..max),
            rng.random_range(ORE_MIN_Y..=ORE_MAX_Y),
            rng.random_range(min..=max),
        );
        let ore = match rng.random_range(0..10) {
            0 => CellType::DiamondOre,
            1..=2 => CellType::GoldOre,
            3..=5 => CellType::IronOre,
            _ => CellType::CoalOre,
        };
        for cell in [pos, pos.offset(1, 0, 0), pos.offset(0, 1, 0)] {
            world.set_cell(cell, ore)?;
            ores = ores.saturating_add(1);
        }
    }

    for _ in 0..regions.saturating_mul(GRAVEL_PATCHES_PER_REGION) {
        let cx = rng.random_range(min..=max);
        let cz = rng.random_range(min..=max);
        let r = rng.random_range(1..=2);
        for x in cx.saturating_sub(r).max(min)..=cx.saturating_add(r).min(max) {
            for z in cz.saturating_sub(r).max(min)..=cz.saturating_add(r).min(max) {
                world.set_cell(Position::new(x, surface_at(&dunes, x, z), z), CellType::Gravel)?;
            }
        }
    }

    for _ in 0..POOLS {
        let x = rng.random_range(min..max);
        let z = rng.random_range(min..max);
        for (dx, dz) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let (px, pz) = (x.saturating_add(dx), z.saturating_add(dz));
            let column_top = surface_at(&dunes, px, pz);
            world.set_cell(Position::new(px, column_top, pz), CellType::Water)?;
        }
    }

    for _ in 0..LOOSE_ITEMS {
        let x = rng.random_range(min..=max);
        let z = rng.random_range(min..=max);
        let ground = surface_at(&dunes, x, z).saturating_add(1);
        world.spawn_entity(Entity::Item(ItemEntity {
            position: Vec3::new(f64::from(x) + 0.5, f64::from(ground) + 0.125, f64::from(z) + 0.5),
            item: ItemType::Sand,
            count: rng.random_range(1..=4),
        }))?;
    }

    let spawn = Position::new(0, surface_at(&dunes, 0, 0).saturating_add(1), 0);
    world.fill(spawn, spawn.up(), CellType::Air)?;
    if world.cell_at(spawn.down()).is_liquid() {
        world.set_cell(spawn.down(), CellType::Sand)?;
    }

    debug!(dunes = dunes.len(), ores, "Terrain features placed");
    info!(seed, regions, min, max, %spawn, "Desert generated");
    Ok(Desert { world, spawn })
}

/// Surface height of column `(x, z)`: the base surface plus the tallest
/// dune covering the column.
fn surface_at(dunes: &[Dune], x: i32, z: i32) -> i32 {
    let rise = dunes
        .iter()
        .map(|dune| {
            let dx = x.saturating_sub(dune.x).saturating_abs();
            let dz = z.saturating_sub(dune.z).saturating_abs();
            dune.radius.saturating_sub(dx.max(dz))
        })
        .max()
        .unwrap_or(0)
        .clamp(0, MAX_DUNE_HEIGHT);
    BASE_SURFACE.saturating_add(rise)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_world() {
        let a = generate(7, 0).unwrap();
        let b = generate(7, 0).unwrap();
        assert_eq!(a.spawn, b.spawn);
        for x in 0..REGION_SIZE {
            for z in 0..REGION_SIZE {
                for y in 50..70 {
                    let pos = Position::new(x, y, z);
                    assert_eq!(a.world.cell_at(pos), b.world.cell_at(pos));
                }
            }
        }
    }

    #[test]
    fn spawn_is_standable() {
        let desert = generate(42, 1).unwrap();
        let world = &desert.world;
        assert!(world.cell_at(desert.spawn).is_air());
        assert!(world.cell_at(desert.spawn.up()).is_air());
        assert!(world.cell_at(desert.spawn.down()).is_solid());
    }

    #[test]
    fn columns_have_bedrock_stone_and_sand() {
        let desert = generate(3, 0).unwrap();
        let world = &desert.world;
        let column = Position::new(5, MIN_Y, 5);
        assert_eq!(world.cell_at(column), CellType::Bedrock);
        assert!(world.cell_at(column.up_by(10)).is_solid());
        assert!(
            (BASE_SURFACE - 2..=BASE_SURFACE)
                .any(|y| world.cell_at(Position::new(5, y, 5)) == CellType::Sand)
        );
        assert!(world.cell_at(Position::new(5, BASE_SURFACE + MAX_DUNE_HEIGHT + 1, 5)).is_air());
    }

    #[test]
    fn loose_sand_is_placed() {
        let desert = generate(11, 1).unwrap();
        let items = desert
            .world
            .loaded_entities()
            .iter()
            .filter_map(Entity::as_item)
            .filter(|item| item.item == ItemType::Sand)
            .count();
        assert_eq!(items, LOOSE_ITEMS as usize);
    }

    #[test]
    fn every_seed_and_radius_generates() {
        for seed in [0, 1, 7, 42, 1_234, 99_999, u64::MAX] {
            for radius in 0..=2 {
                let desert = generate(seed, radius).unwrap();
                let world = &desert.world;
                assert!(world.cell_at(desert.spawn).is_air());
                assert!(world.cell_at(desert.spawn.down()).is_solid());
                let side = usize::try_from(2 * radius + 1).unwrap();
                assert_eq!(world.loaded_regions().len(), side * side);
            }
        }
    }

    #[test]
    fn ore_veins_are_placed_in_the_stone_body() {
        for seed in 0..20 {
            let desert = generate(seed, 0).unwrap();
            let world = &desert.world;
            let ores = (0..REGION_SIZE)
                .flat_map(|x| (0..REGION_SIZE).map(move |z| (x, z)))
                .flat_map(|(x, z)| (ORE_MIN_Y..=ORE_MAX_Y + 1).map(move |y| Position::new(x, y, z)))
                .filter(|pos| {
                    matches!(
                        world.cell_at(*pos),
                        CellType::CoalOre | CellType::IronOre | CellType::GoldOre | CellType::DiamondOre
                    )
                })
                .count();
            assert!(ores > 0);
        }
    }

    #[test]
    fn dunes_rise_toward_their_centre() {
        let dunes = [Dune { x: 0, z: 0, radius: 4 }];
        assert_eq!(surface_at(&dunes, 0, 0), BASE_SURFACE + 4);
        assert_eq!(surface_at(&dunes, 2, -1), BASE_SURFACE + 2);
        assert_eq!(surface_at(&dunes, 9, 9), BASE_SURFACE);
        let tall = [Dune { x: 0, z: 0, radius: 9 }];
        assert_eq!(surface_at(&tall, 0, 0), BASE_SURFACE + MAX_DUNE_HEIGHT);
    }
}
