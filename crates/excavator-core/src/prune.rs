//! Candidate filtering, ranking, and capping.
//!
//! Every list of candidate positions passes through [`prune`] before the
//! controller keeps it: duplicates, stale cells, blacklisted cells, and
//! cells that could never be broken are dropped, and what remains is
//! ordered nearest first and capped.

use std::collections::BTreeSet;

use excavator_types::{Position, TargetSet};
use excavator_world::{World, is_plausible, scan_dropped_resources};

use crate::search::SearchContext;

/// Filter, sort, and cap candidate positions.
///
/// A position survives when it is not blacklisted, is plausible to break,
/// and either lies in an unloaded region, still holds a target cell, or is
/// occupied by a dropped resource item. Survivors are sorted by squared
/// distance to the context origin, keeping first-seen order among ties, and
/// truncated to `max_size`. Applying the result to itself changes nothing.
pub fn prune(
    ctx: &SearchContext<'_>,
    positions: impl IntoIterator<Item = Position>,
    targets: &TargetSet,
    max_size: usize,
    blacklist: &BTreeSet<Position>,
) -> Vec<Position> {
    let dropped = scan_dropped_resources(targets, ctx.world, ctx.settings.scan_dropped_items);

    let mut seen = BTreeSet::new();
    let mut kept: Vec<Position> = positions
        .into_iter()
        .filter(|pos| seen.insert(*pos))
        .filter(|pos| !blacklist.contains(pos))
        .filter(|pos| still_a_candidate(ctx.world, *pos, targets, &dropped))
        .filter(|pos| is_plausible(ctx.world, *pos, &ctx.settings.break_policy))
        .collect();

    kept.sort_by_key(|pos| pos.distance_sq(ctx.origin));
    kept.truncate(max_size);
    kept
}

fn still_a_candidate(world: &dyn World, pos: Position, targets: &TargetSet, dropped: &[Position]) -> bool {
    !world.is_region_loaded(pos.x, pos.z) || targets.contains(world.cell_at(pos)) || dropped.contains(&pos)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use excavator_types::{CellType, Entity, ItemEntity, ItemType, RegionCoord};
    use excavator_world::{RegionIndex, VoxelWorld};

    use super::*;
    use crate::search::SearchSettings;

    fn make_world() -> VoxelWorld {
        let world = VoxelWorld::new(0, 128).unwrap();
        world.load_region(RegionCoord::new(0, 0));
        world
    }

    fn sand() -> TargetSet {
        TargetSet::new([CellType::Sand]).unwrap()
    }

    fn run(world: &VoxelWorld, positions: Vec<Position>, max: usize, blacklist: &BTreeSet<Position>) -> Vec<Position> {
        let cache = RegionIndex::new();
        let settings = SearchSettings::default();
        let ctx = SearchContext::new(world, &cache, &settings, Position::new(0, 64, 0));
        prune(&ctx, positions, &sand(), max, blacklist)
    }

    #[test]
    fn keeps_live_targets_sorted_by_distance() {
        let world = make_world();
        let near = Position::new(1, 63, 1);
        let far = Position::new(8, 63, 8);
        world.set_cell(near, CellType::Sand).unwrap();
        world.set_cell(far, CellType::Sand).unwrap();

        let result = run(&world, vec![far, near], 10, &BTreeSet::new());
        assert_eq!(result, vec![near, far]);
    }

    #[test]
    fn drops_stale_duplicate_and_blacklisted_positions() {
        let world = make_world();
        let live = Position::new(2, 63, 2);
        let banned = Position::new(3, 63, 3);
        let gone = Position::new(4, 63, 4);
        world.set_cell(live, CellType::Sand).unwrap();
        world.set_cell(banned, CellType::Sand).unwrap();

        let blacklist = BTreeSet::from([banned]);
        let result = run(&world, vec![live, gone, banned, live], 10, &blacklist);
        assert_eq!(result, vec![live]);
    }

    #[test]
    fn unloaded_positions_are_kept() {
        let world = make_world();
        let remote = Position::new(500, 63, 500);
        assert_eq!(run(&world, vec![remote], 10, &BTreeSet::new()), vec![remote]);
    }

    #[test]
    fn dropped_item_cells_are_kept() {
        let world = make_world();
        world
            .spawn_entity(Entity::Item(ItemEntity {
                position: Position::new(5, 64, 5).center(),
                item: ItemType::Sand,
                count: 1,
            }))
            .unwrap();
        assert_eq!(
            run(&world, vec![Position::new(5, 64, 5)], 10, &BTreeSet::new()),
            vec![Position::new(5, 64, 5)]
        );
    }

    #[test]
    fn sandwiched_cells_are_excluded() {
        let world = make_world();
        let pos = Position::new(6, 5, 6);
        world.set_cell(pos, CellType::Sand).unwrap();
        world.set_cell(pos.up(), CellType::Bedrock).unwrap();
        world.set_cell(pos.down(), CellType::Bedrock).unwrap();
        assert!(run(&world, vec![pos], 10, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn result_is_capped_and_idempotent() {
        let world = make_world();
        world
            .fill(Position::new(0, 60, 0), Position::new(4, 60, 4), CellType::Sand)
            .unwrap();
        let all: Vec<Position> = (0..5)
            .flat_map(|x| (0..5).map(move |z| Position::new(x, 60, z)))
            .collect();

        let once = run(&world, all, 7, &BTreeSet::new());
        assert_eq!(once.len(), 7);
        assert_eq!(once.first(), Some(&Position::new(0, 60, 0)));
        let twice = run(&world, once.clone(), 7, &BTreeSet::new());
        assert_eq!(once, twice);
    }
}
