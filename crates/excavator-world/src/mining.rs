//! Mining cost estimation and the plausibility filter.
//!
//! A cell is worth pursuing only if breaking it is possible at all. The cost
//! model here is deliberately coarse: hardness times a constant. What
//! matters to excavation is the infinite case, which marks cells the agent
//! must never try to break.

use excavator_types::{CellType, Position};
use serde::{Deserialize, Serialize};

use crate::world::World;

/// Ticks of digging per point of hardness.
const TICKS_PER_HARDNESS: f64 = 30.0;

/// Rules restricting which cells may be broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPolicy {
    /// Whether breaking is permitted at all.
    pub allow_break: bool,
    /// Cell types that must never be broken.
    pub avoid_breaking: Vec<CellType>,
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            allow_break: true,
            avoid_breaking: Vec::new(),
        }
    }
}

/// Whether breaking the cell at `pos` would be dangerous or forbidden
/// regardless of cost: the cell is a liquid or on the avoid list, or a
/// liquid sits directly above it or beside it and would flow in.
pub fn avoid_breaking(world: &dyn World, pos: Position, policy: &BreakPolicy) -> bool {
    let cell = world.cell_at(pos);
    if cell.is_liquid() || policy.avoid_breaking.contains(&cell) {
        return true;
    }
    [
        pos.up(),
        pos.offset(1, 0, 0),
        pos.offset(-1, 0, 0),
        pos.offset(0, 0, 1),
        pos.offset(0, 0, -1),
    ]
    .into_iter()
    .any(|neighbour| world.cell_at(neighbour).is_liquid())
}

/// Estimated ticks to break the cell at `pos`, or `None` when the cost is
/// infinite.
pub fn mining_cost(world: &dyn World, pos: Position, policy: &BreakPolicy) -> Option<f64> {
    let cell = world.cell_at(pos);
    if cell.is_air() {
        return Some(0.0);
    }
    if !policy.allow_break || avoid_breaking(world, pos, policy) {
        return None;
    }
    cell.hardness()
        .map(|hardness| f64::from(hardness).mul_add(TICKS_PER_HARDNESS, 1.0))
}

/// Whether `pos` is theoretically excavatable.
///
/// Fails when the mining cost is infinite, or when the cells directly above
/// and directly below are both indestructible.
pub fn is_plausible(world: &dyn World, pos: Position, policy: &BreakPolicy) -> bool {
    if mining_cost(world, pos, policy).is_none() {
        return false;
    }
    !(world.cell_at(pos.up()).is_indestructible() && world.cell_at(pos.down()).is_indestructible())
}
