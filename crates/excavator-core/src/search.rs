//! World search: the cheap cache lookup first, the brute-force scan when
//! the cache is not enough.
//!
//! [`search_world`] borrows everything it reads through a
//! [`SearchContext`]. [`RescanRequest`] owns the same inputs so the search
//! can be shipped to a worker thread and its result sent back.

use std::collections::BTreeSet;
use std::sync::Arc;

use excavator_types::{CellType, Position, TargetSet};
use excavator_world::{
    ADJACENT_REGIONS, BreakPolicy, PersistentCache, World, scan_dropped_resources, scan_region_radius,
};
use tracing::debug;

use crate::prune::prune;

/// Search-relevant settings, detached from the rest of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// Maximum cache hits requested per target type.
    pub max_cached_scan_count: usize,
    /// Brute-force scan whenever the cache yields fewer than the requested
    /// number of candidates.
    pub extend_search_on_shortfall: bool,
    /// Linear radius of the brute-force scan.
    pub search_radius: u32,
    /// Whether dropped resource items count as candidates.
    pub scan_dropped_items: bool,
    /// What may be broken.
    pub break_policy: BreakPolicy,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_cached_scan_count: 10,
            extend_search_on_shortfall: false,
            search_radius: 32,
            scan_dropped_items: true,
            break_policy: BreakPolicy::default(),
        }
    }
}

/// Everything a search or prune reads, borrowed.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    /// The live world.
    pub world: &'a dyn World,
    /// The persistent index of previously seen cells.
    pub cache: &'a dyn PersistentCache,
    /// Search settings.
    pub settings: &'a SearchSettings,
    /// The agent's feet; distances are measured from here.
    pub origin: Position,
}

impl<'a> SearchContext<'a> {
    /// Bundle the search inputs.
    pub const fn new(
        world: &'a dyn World,
        cache: &'a dyn PersistentCache,
        settings: &'a SearchSettings,
        origin: Position,
    ) -> Self {
        Self {
            world,
            cache,
            settings,
            origin,
        }
    }
}

/// Find up to `max_size` candidate positions for `targets`.
///
/// Target types the cache tracks are looked up in the cache first. The
/// brute-force scan runs for untracked types, or for every type when the
/// pruned cache hits are empty or, with shortfall extension enabled, fewer
/// than `max_size`. `already_known` is merged in before the final prune.
pub fn search_world(
    ctx: &SearchContext<'_>,
    targets: &TargetSet,
    max_size: usize,
    already_known: &[Position],
    blacklist: &BTreeSet<Position>,
) -> Vec<Position> {
    let mut locations = Vec::new();
    let mut untracked: Vec<CellType> = Vec::new();
    for &cell in targets.cells() {
        if ctx.cache.tracks(cell) {
            locations.extend(ctx.cache.locations_of(
                cell,
                ctx.settings.max_cached_scan_count,
                ctx.origin.x,
                ctx.origin.z,
                ADJACENT_REGIONS,
            ));
        } else {
            untracked.push(cell);
        }
    }
    let cached = locations.len();
    let mut locations = prune(ctx, locations, targets, max_size, blacklist);

    let shortfall = ctx.settings.extend_search_on_shortfall && locations.len() < max_size;
    if locations.is_empty() || shortfall {
        untracked = targets.cells().to_vec();
    }
    if !untracked.is_empty() {
        let scanned = scan_region_radius(
            ctx.world,
            &untracked,
            ctx.origin,
            max_size,
            ctx.settings.search_radius,
        );
        debug!(
            cached,
            scanned = scanned.len(),
            untracked = untracked.len(),
            "Cache lookup extended with a world scan"
        );
        locations.extend(scanned);
    }

    locations.extend_from_slice(already_known);
    prune(ctx, locations, targets, max_size, blacklist)
}

/// An owned world search, ready to run on any thread.
pub struct RescanRequest {
    /// The live world.
    pub world: Arc<dyn World>,
    /// The persistent cell index.
    pub cache: Arc<dyn PersistentCache>,
    /// Search settings captured when the request was made.
    pub settings: SearchSettings,
    /// Agent feet when the request was made.
    pub origin: Position,
    /// What to look for.
    pub targets: TargetSet,
    /// Result cap.
    pub max_size: usize,
    /// Candidates already held, merged into the result.
    pub already_known: Vec<Position>,
    /// Positions to exclude.
    pub blacklist: BTreeSet<Position>,
}

impl RescanRequest {
    /// Run the search and merge in dropped resources.
    pub fn run(self) -> Vec<Position> {
        let ctx = SearchContext::new(
            self.world.as_ref(),
            self.cache.as_ref(),
            &self.settings,
            self.origin,
        );
        let mut locations = search_world(
            &ctx,
            &self.targets,
            self.max_size,
            &self.already_known,
            &self.blacklist,
        );
        locations.extend(scan_dropped_resources(
            &self.targets,
            ctx.world,
            self.settings.scan_dropped_items,
        ));
        prune(&ctx, locations, &self.targets, self.max_size, &self.blacklist)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use excavator_types::RegionCoord;
    use excavator_world::{RegionIndex, VoxelWorld};

    use super::*;

    fn make_world() -> VoxelWorld {
        let world = VoxelWorld::new(0, 80).unwrap();
        for x in -1..=1 {
            for z in -1..=1 {
                world.load_region(RegionCoord::new(x, z));
            }
        }
        world
    }

    fn run_search(
        world: &VoxelWorld,
        cache: &RegionIndex,
        settings: &SearchSettings,
        targets: &TargetSet,
        max: usize,
    ) -> Vec<Position> {
        let ctx = SearchContext::new(world, cache, settings, Position::new(0, 64, 0));
        search_world(&ctx, targets, max, &[], &BTreeSet::new())
    }

    #[test]
    fn untracked_targets_are_found_by_scanning() {
        let world = make_world();
        let cache = RegionIndex::new();
        world.set_cell(Position::new(4, 60, 4), CellType::Sand).unwrap();
        let targets = TargetSet::new([CellType::Sand]).unwrap();

        let found = run_search(&world, &cache, &SearchSettings::default(), &targets, 64);
        assert_eq!(found, vec![Position::new(4, 60, 4)]);
    }

    #[test]
    fn cache_hits_skip_the_scan() {
        let world = make_world();
        let cache = RegionIndex::new();
        let seen = Position::new(2, 20, 2);
        let unseen = Position::new(3, 20, 3);
        world.set_cell(seen, CellType::IronOre).unwrap();
        cache.record(seen, CellType::IronOre);
        world.set_cell(unseen, CellType::IronOre).unwrap();
        let targets = TargetSet::new([CellType::IronOre]).unwrap();

        let found = run_search(&world, &cache, &SearchSettings::default(), &targets, 64);
        assert_eq!(found, vec![seen]);
    }

    #[test]
    fn shortfall_extension_adds_scan_results() {
        let world = make_world();
        let cache = RegionIndex::new();
        let seen = Position::new(2, 20, 2);
        let unseen = Position::new(3, 20, 3);
        world.set_cell(seen, CellType::IronOre).unwrap();
        cache.record(seen, CellType::IronOre);
        world.set_cell(unseen, CellType::IronOre).unwrap();
        let targets = TargetSet::new([CellType::IronOre]).unwrap();
        let settings = SearchSettings {
            extend_search_on_shortfall: true,
            ..SearchSettings::default()
        };

        let mut found = run_search(&world, &cache, &settings, &targets, 64);
        found.sort();
        assert_eq!(found, vec![seen, unseen]);
    }

    #[test]
    fn stale_cache_falls_back_to_scanning() {
        let world = make_world();
        let cache = RegionIndex::new();
        cache.record(Position::new(2, 20, 2), CellType::IronOre);
        let real = Position::new(-5, 30, 7);
        world.set_cell(real, CellType::IronOre).unwrap();
        let targets = TargetSet::new([CellType::IronOre]).unwrap();

        let found = run_search(&world, &cache, &SearchSettings::default(), &targets, 64);
        assert_eq!(found, vec![real]);
    }

    #[test]
    fn already_known_positions_are_merged() {
        let world = make_world();
        let cache = RegionIndex::new();
        let known = Position::new(1, 50, 1);
        let scanned = Position::new(9, 50, 9);
        world.set_cell(known, CellType::Gravel).unwrap();
        world.set_cell(scanned, CellType::Gravel).unwrap();
        let targets = TargetSet::new([CellType::Gravel]).unwrap();
        let settings = SearchSettings::default();
        let ctx = SearchContext::new(&world, &cache, &settings, Position::new(0, 64, 0));

        let found = search_world(&ctx, &targets, 64, &[known], &BTreeSet::new());
        assert_eq!(found, vec![known, scanned]);
    }

    #[test]
    fn rescan_request_includes_dropped_items() {
        let world = make_world();
        let drop_at = Position::new(6, 64, 6);
        world
            .spawn_entity(excavator_types::Entity::Item(excavator_types::ItemEntity {
                position: drop_at.center(),
                item: excavator_types::ItemType::Sand,
                count: 2,
            }))
            .unwrap();
        let request = RescanRequest {
            world: Arc::new(world),
            cache: Arc::new(RegionIndex::new()),
            settings: SearchSettings::default(),
            origin: Position::new(0, 64, 0),
            targets: TargetSet::new([CellType::Sand]).unwrap(),
            max_size: 64,
            already_known: Vec::new(),
            blacklist: BTreeSet::new(),
        };
        assert_eq!(request.run(), vec![drop_at]);
    }
}
