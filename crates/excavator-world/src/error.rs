//! Error types for the `excavator-world` crate.
//!
//! Only mutations of the in-memory world can fail; every read query on the
//! [`World`](crate::World) trait is infallible and answers air for cells it
//! does not know.

use excavator_types::{Position, RegionCoord};

/// Errors that can occur when mutating an in-memory world.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The region holding the position has not been loaded.
    #[error("region ({}, {}) is not loaded", .0.x, .0.z)]
    RegionNotLoaded(RegionCoord),

    /// The position lies outside the world's vertical bounds.
    #[error("position {position} is outside the height range {min_y}..{max_y}")]
    OutOfBounds {
        /// The rejected position.
        position: Position,
        /// Lowest valid y coordinate.
        min_y: i32,
        /// One past the highest valid y coordinate.
        max_y: i32,
    },

    /// A world was requested with no vertical extent.
    #[error("world height must be positive, got {0}")]
    InvalidHeight(i32),
}
