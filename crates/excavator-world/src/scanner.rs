//! Brute-force scanning of the loaded world volume.
//!
//! Where the persistent cache is cheap but stale, this scan is authoritative
//! but expensive: it reads every cell of every loaded region near the
//! agent. It is meant to run off the control thread.

use excavator_types::{CellType, Position, REGION_SIZE, RegionCoord};
use tracing::debug;

use crate::world::World;

/// Find up to `max` cells whose type is in `targets`, scanning loaded
/// regions whose nearest column is within `radius` cells (linear, not
/// squared) of `origin`.
///
/// Regions are visited in rings of growing distance from the origin's
/// region; scanning stops after the ring in which `max` matches were
/// reached. Results are sorted nearest first.
pub fn scan_region_radius(
    world: &dyn World,
    targets: &[CellType],
    origin: Position,
    max: usize,
    radius: u32,
) -> Vec<Position> {
    if targets.is_empty() || max == 0 {
        return Vec::new();
    }
    let (min_y, max_y) = world.height_bounds();
    let center = origin.region();
    let radius = i64::from(radius);
    let max_ring = i32::try_from(radius.saturating_div(i64::from(REGION_SIZE)))
        .unwrap_or(i32::MAX)
        .saturating_add(1);

    let mut found = Vec::new();
    let mut scanned_regions = 0_usize;
    for ring in 0..=max_ring {
        for region in ring_regions(center, ring) {
            if !world.is_region_loaded(region.min_x(), region.min_z()) {
                continue;
            }
            if column_distance_sq(region, origin) > radius.saturating_mul(radius) {
                continue;
            }
            scanned_regions = scanned_regions.saturating_add(1);
            scan_region(world, region, targets, min_y, max_y, &mut found);
        }
        if found.len() >= max {
            break;
        }
    }

    found.sort_by_key(|pos: &Position| pos.distance_sq(origin));
    found.truncate(max);
    debug!(
        scanned_regions,
        matches = found.len(),
        "Brute-force region scan finished"
    );
    found
}

/// Regions at Chebyshev distance exactly `ring` from `center`.
fn ring_regions(center: RegionCoord, ring: i32) -> Vec<RegionCoord> {
    if ring == 0 {
        return vec![center];
    }
    let mut regions = Vec::new();
    let low = ring.saturating_neg();
    for dx in low..=ring {
        for dz in low..=ring {
            if dx.saturating_abs() == ring || dz.saturating_abs() == ring {
                regions.push(RegionCoord::new(
                    center.x.saturating_add(dx),
                    center.z.saturating_add(dz),
                ));
            }
        }
    }
    regions
}

/// Squared horizontal distance from `origin` to the nearest column of
/// `region`.
fn column_distance_sq(region: RegionCoord, origin: Position) -> i64 {
    let axis = |value: i32, min: i32| -> i64 {
        let min = i64::from(min);
        let max = min.saturating_add(i64::from(REGION_SIZE)).saturating_sub(1);
        let value = i64::from(value);
        if value < min {
            min.saturating_sub(value)
        } else if value > max {
            value.saturating_sub(max)
        } else {
            0
        }
    };
    let dx = axis(origin.x, region.min_x());
    let dz = axis(origin.z, region.min_z());
    dx.saturating_mul(dx).saturating_add(dz.saturating_mul(dz))
}

fn scan_region(
    world: &dyn World,
    region: RegionCoord,
    targets: &[CellType],
    min_y: i32,
    max_y: i32,
    found: &mut Vec<Position>,
) {
    for dx in 0..REGION_SIZE {
        for dz in 0..REGION_SIZE {
            for y in min_y..max_y {
                let pos = Position::new(
                    region.min_x().saturating_add(dx),
                    y,
                    region.min_z().saturating_add(dz),
                );
                if targets.contains(&world.cell_at(pos)) {
                    found.push(pos);
                }
            }
        }
    }
}
