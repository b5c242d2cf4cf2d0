//! Integer cell positions, region partitions, and floating point vectors.
//!
//! [`Position`] addresses a single cell of the voxel world. Regions are the
//! fixed 16x16 column partitions the world loads and indexes by; a
//! [`RegionCoord`] names one of them. [`Vec3`] and [`Rotation`] cover the
//! continuous side of the agent: eye position and view direction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width and depth of one region, in cells.
pub const REGION_SIZE: i32 = 16;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// An integer cell coordinate in world space.
///
/// Equality, ordering, and hashing are by coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl Position {
    /// Create a position from its three coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The cell directly above.
    pub const fn up(self) -> Self {
        self.up_by(1)
    }

    /// The cell `n` cells above.
    pub const fn up_by(self, n: i32) -> Self {
        Self::new(self.x, self.y.saturating_add(n), self.z)
    }

    /// The cell directly below.
    pub const fn down(self) -> Self {
        Self::new(self.x, self.y.saturating_sub(1), self.z)
    }

    /// The cell displaced by the given offsets.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// Squared Euclidean distance between two cells.
    pub fn distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(self.x).saturating_sub(i64::from(other.x));
        let dy = i64::from(self.y).saturating_sub(i64::from(other.y));
        let dz = i64::from(self.z).saturating_sub(i64::from(other.z));
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }

    /// The region containing this cell's column.
    pub const fn region(self) -> RegionCoord {
        RegionCoord::containing(self.x, self.z)
    }

    /// The geometric centre of the cell.
    pub fn center(self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    /// The cell containing a continuous point.
    pub fn containing(point: Vec3) -> Self {
        Self::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// Coordinate of a 16x16 column partition of the world.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct RegionCoord {
    /// Region index along x.
    pub x: i32,
    /// Region index along z.
    pub z: i32,
}

impl RegionCoord {
    /// Create a region coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The region containing the column at cell coordinates `(x, z)`.
    pub const fn containing(x: i32, z: i32) -> Self {
        Self::new(x.div_euclid(REGION_SIZE), z.div_euclid(REGION_SIZE))
    }

    /// Squared distance between two regions, in region units.
    ///
    /// A value of 2 or less means the regions are identical, directly
    /// adjacent, or diagonally adjacent.
    pub fn distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(self.x).saturating_sub(i64::from(other.x));
        let dz = i64::from(self.z).saturating_sub(i64::from(other.z));
        dx.saturating_mul(dx).saturating_add(dz.saturating_mul(dz))
    }

    /// Minimum x cell coordinate covered by this region.
    pub const fn min_x(self) -> i32 {
        self.x.saturating_mul(REGION_SIZE)
    }

    /// Minimum z cell coordinate covered by this region.
    pub const fn min_z(self) -> i32 {
        self.z.saturating_mul(REGION_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Continuous space
// ---------------------------------------------------------------------------

/// A point or direction in continuous world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// East-west component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
    /// North-south component.
    pub z: f64,
}

impl Vec3 {
    /// Create a vector from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Scale every component by `factor`.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.z.mul_add(self.z, self.x.mul_add(self.x, self.y * self.y)).sqrt()
    }

    /// The point displaced by the given offsets.
    pub fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Squared distance to another point.
    pub fn distance_sq(self, other: Self) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        dz.mul_add(dz, dx.mul_add(dx, dy * dy))
    }
}

/// A view direction as yaw and pitch, in degrees.
///
/// Yaw 0 faces +z and grows clockwise seen from above (toward -x); pitch is
/// positive when looking down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    /// Horizontal angle in degrees.
    pub yaw: f32,
    /// Vertical angle in degrees, clamped to [-90, 90].
    pub pitch: f32,
}

impl Rotation {
    /// Tolerance below which two rotations are treated as the same aim.
    pub const CLOSE_TOLERANCE: f32 = 0.01;

    /// Create a rotation.
    pub const fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    /// The rotation that looks from `from` toward `to`.
    pub fn looking_at(from: Vec3, to: Vec3) -> Self {
        let (dx, dy, dz) = (to.x - from.x, to.y - from.y, to.z - from.z);
        let horizontal = dx.hypot(dz);
        let yaw = (-dx).atan2(dz).to_degrees();
        let pitch = (-dy).atan2(horizontal).to_degrees();
        Self::new(yaw as f32, pitch as f32)
    }

    /// Unit vector pointing along this rotation.
    pub fn direction(self) -> Vec3 {
        let yaw = f64::from(self.yaw).to_radians();
        let pitch = f64::from(self.pitch).to_radians();
        Vec3::new(
            -yaw.sin() * pitch.cos(),
            -pitch.sin(),
            yaw.cos() * pitch.cos(),
        )
    }

    /// Whether both angles are within [`Self::CLOSE_TOLERANCE`] of `other`,
    /// accounting for yaw wrap-around.
    pub fn is_really_close_to(self, other: Self) -> bool {
        let yaw_diff = (self.yaw - other.yaw).rem_euclid(360.0);
        let yaw_diff = yaw_diff.min(360.0 - yaw_diff);
        yaw_diff < Self::CLOSE_TOLERANCE && (self.pitch - other.pitch).abs() < Self::CLOSE_TOLERANCE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_and_offsets() {
        let p = Position::new(1, 63, 1);
        assert_eq!(p.up(), Position::new(1, 64, 1));
        assert_eq!(p.up_by(2), Position::new(1, 65, 1));
        assert_eq!(p.down(), Position::new(1, 62, 1));
        assert_eq!(p.offset(-1, 0, 3), Position::new(0, 63, 4));
    }

    #[test]
    fn squared_distance_is_symmetric() {
        let a = Position::new(0, 64, 0);
        let b = Position::new(1, 63, 1);
        assert_eq!(a.distance_sq(b), 3);
        assert_eq!(b.distance_sq(a), 3);
    }

    #[test]
    fn negative_coordinates_map_to_negative_regions() {
        assert_eq!(Position::new(-1, 0, 15).region(), RegionCoord::new(-1, 0));
        assert_eq!(Position::new(16, 0, -16).region(), RegionCoord::new(1, -1));
        assert_eq!(Position::new(-17, 0, 0).region(), RegionCoord::new(-2, 0));
    }

    #[test]
    fn distances_saturate_at_the_coordinate_extremes() {
        let low = Position::new(i32::MIN, i32::MIN, i32::MIN);
        let high = Position::new(i32::MAX, i32::MAX, i32::MAX);
        assert_eq!(low.distance_sq(high), i64::MAX);
        assert_eq!(low.offset(-1, 0, 0), low);
    }

    #[test]
    fn point_offsets_move_each_axis() {
        let center = Position::new(2, 63, -4).center();
        let face = center.offset(0.0, 0.45, -0.45);
        assert!(face.distance_sq(Vec3::new(2.5, 63.95, -3.95)) < 1e-12);
        assert!((center.distance_sq(face) - 0.405).abs() < 1e-9);
    }

    #[test]
    fn diagonal_regions_are_within_two() {
        let origin = RegionCoord::new(0, 0);
        assert_eq!(origin.distance_sq(RegionCoord::new(1, 1)), 2);
        assert_eq!(origin.distance_sq(RegionCoord::new(2, 0)), 4);
    }

    #[test]
    fn containing_floors_negative_points() {
        let p = Position::containing(Vec3::new(-0.25, 64.9, 3.5));
        assert_eq!(p, Position::new(-1, 64, 3));
    }

    #[test]
    fn looking_straight_down_has_positive_pitch() {
        let rot = Rotation::looking_at(Vec3::new(0.5, 65.62, 0.5), Vec3::new(0.5, 63.5, 0.5));
        assert!((rot.pitch - 90.0).abs() < 0.001);
    }

    #[test]
    fn direction_round_trips_through_looking_at() {
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(3.0, -1.0, 4.0);
        let rot = Rotation::looking_at(from, to);
        let dir = rot.direction();
        let expected = to.scale(1.0 / to.length());
        assert!(dir.distance_sq(expected) < 1e-6);
    }

    #[test]
    fn yaw_wraps_when_comparing() {
        let a = Rotation::new(179.999, 10.0);
        let b = Rotation::new(-179.999, 10.0);
        assert!(a.is_really_close_to(b));
        assert!(!a.is_really_close_to(Rotation::new(170.0, 10.0)));
    }

    #[test]
    fn position_serializes_as_struct() {
        let json = serde_json::to_string(&Position::new(1, 2, 3)).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"z":3}"#);
    }
}
