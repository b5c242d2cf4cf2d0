//! Voxel ray casting and aim solutions.
//!
//! Rays walk the grid cell by cell (Amanatides-Woo traversal) and stop at
//! the first solid cell. An aim solution for a target cell is a rotation
//! from the agent's eye whose ray hits that cell first, within reach.

use excavator_types::{Position, Rotation, Vec3};

use crate::world::World;

/// How far inside a face the face-centre aim points sit.
const FACE_INSET: f64 = 0.45;

/// The first solid cell a ray runs into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The cell that was hit.
    pub cell: Position,
    /// Distance travelled from the ray origin to the cell boundary.
    pub distance: f64,
}

/// Cast a ray from `origin` along `direction` and return the first solid
/// cell entered within `max_distance`.
pub fn raycast(world: &dyn World, origin: Vec3, direction: Vec3, max_distance: f64) -> Option<RayHit> {
    let length = direction.length();
    if length <= f64::EPSILON {
        return None;
    }
    let dir = direction.scale(1.0 / length);

    let mut cell = Position::containing(origin);
    if world.cell_at(cell).is_solid() {
        return Some(RayHit { cell, distance: 0.0 });
    }

    let axis = |d: f64, o: f64, c: i32| -> (i32, f64, f64) {
        if d > 0.0 {
            (1, (f64::from(c) + 1.0 - o) / d, 1.0 / d)
        } else if d < 0.0 {
            (-1, (o - f64::from(c)) / -d, -1.0 / d)
        } else {
            (0, f64::INFINITY, f64::INFINITY)
        }
    };
    let (step_x, mut t_max_x, t_delta_x) = axis(dir.x, origin.x, cell.x);
    let (step_y, mut t_max_y, t_delta_y) = axis(dir.y, origin.y, cell.y);
    let (step_z, mut t_max_z, t_delta_z) = axis(dir.z, origin.z, cell.z);

    let max_steps = ((max_distance.max(0.0) * 3.0).ceil() as usize).saturating_add(3);
    for _ in 0..max_steps {
        let distance;
        if t_max_x <= t_max_y && t_max_x <= t_max_z {
            distance = t_max_x;
            cell = cell.offset(step_x, 0, 0);
            t_max_x += t_delta_x;
        } else if t_max_y <= t_max_z {
            distance = t_max_y;
            cell = cell.offset(0, step_y, 0);
            t_max_y += t_delta_y;
        } else {
            distance = t_max_z;
            cell = cell.offset(0, 0, step_z);
            t_max_z += t_delta_z;
        }
        if distance > max_distance {
            return None;
        }
        if world.cell_at(cell).is_solid() {
            return Some(RayHit { cell, distance });
        }
    }
    None
}

/// The cell the agent is looking at, if any solid cell is within reach.
pub fn looking_at(world: &dyn World, eye: Vec3, rotation: Rotation, reach: f64) -> Option<Position> {
    raycast(world, eye, rotation.direction(), reach).map(|hit| hit.cell)
}

/// A rotation from `eye` whose ray hits `target` first within `reach`.
///
/// Tries the cell centre, then the centre of each face.
pub fn reachable(world: &dyn World, eye: Vec3, target: Position, reach: f64) -> Option<Rotation> {
    let center = target.center();
    let aim_points = [
        center,
        center.offset(0.0, FACE_INSET, 0.0),
        center.offset(0.0, -FACE_INSET, 0.0),
        center.offset(FACE_INSET, 0.0, 0.0),
        center.offset(-FACE_INSET, 0.0, 0.0),
        center.offset(0.0, 0.0, FACE_INSET),
        center.offset(0.0, 0.0, -FACE_INSET),
    ];
    aim_points.into_iter().find_map(|point| {
        let rotation = Rotation::looking_at(eye, point);
        let hit = raycast(world, eye, rotation.direction(), reach)?;
        (hit.cell == target).then_some(rotation)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use excavator_types::{CellType, RegionCoord};

    use super::*;
    use crate::world::VoxelWorld;

    fn make_world() -> VoxelWorld {
        let world = VoxelWorld::new(0, 128).unwrap();
        world.load_region(RegionCoord::new(0, 0));
        world.load_region(RegionCoord::new(-1, 0));
        world.load_region(RegionCoord::new(0, -1));
        world.load_region(RegionCoord::new(-1, -1));
        world
    }

    #[test]
    fn ray_hits_the_first_solid_cell() {
        let world = make_world();
        world.set_cell(Position::new(0, 64, 3), CellType::Stone).unwrap();
        world.set_cell(Position::new(0, 64, 5), CellType::Stone).unwrap();
        let hit = raycast(&world, Vec3::new(0.5, 64.5, 0.5), Vec3::new(0.0, 0.0, 1.0), 10.0).unwrap();
        assert_eq!(hit.cell, Position::new(0, 64, 3));
        assert!((hit.distance - 2.5).abs() < 1e-9);
    }

    #[test]
    fn ray_stops_at_max_distance() {
        let world = make_world();
        world.set_cell(Position::new(0, 64, 8), CellType::Stone).unwrap();
        assert!(raycast(&world, Vec3::new(0.5, 64.5, 0.5), Vec3::new(0.0, 0.0, 1.0), 4.5).is_none());
    }

    #[test]
    fn negative_directions_traverse_correctly() {
        let world = make_world();
        world.set_cell(Position::new(-3, 62, -2), CellType::Sand).unwrap();
        let eye = Vec3::new(0.5, 65.62, 0.5);
        let target = Position::new(-3, 62, -2).center();
        let direction = Vec3::new(target.x - eye.x, target.y - eye.y, target.z - eye.z);
        let hit = raycast(&world, eye, direction, 10.0).unwrap();
        assert_eq!(hit.cell, Position::new(-3, 62, -2));
    }

    #[test]
    fn reachable_cell_yields_rotation_that_looks_at_it() {
        let world = make_world();
        let target = Position::new(1, 63, 1);
        world.set_cell(target, CellType::Sand).unwrap();
        let eye = Vec3::new(0.5, 65.62, 0.5);
        let rotation = reachable(&world, eye, target, 4.5).unwrap();
        assert_eq!(looking_at(&world, eye, rotation, 4.5), Some(target));
    }

    #[test]
    fn occluded_cell_is_not_reachable() {
        let world = make_world();
        let target = Position::new(0, 64, 3);
        world.set_cell(target, CellType::Sand).unwrap();
        world
            .fill(Position::new(-1, 63, 2), Position::new(1, 66, 2), CellType::Glass)
            .unwrap();
        let eye = Vec3::new(0.5, 64.62, 0.5);
        assert!(reachable(&world, eye, target, 4.5).is_none());
    }

    #[test]
    fn far_cell_is_not_reachable() {
        let world = make_world();
        let target = Position::new(0, 64, 9);
        world.set_cell(target, CellType::Sand).unwrap();
        assert!(reachable(&world, Vec3::new(0.5, 64.62, 0.5), target, 4.5).is_none());
    }
}
