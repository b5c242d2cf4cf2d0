//! Goal synthesis from the working set.

use excavator_types::Position;
use excavator_world::World;

use crate::goal::Goal;

/// The goal for a single candidate.
///
/// Dropped items are walked onto. A cell with open air two high above it is
/// approached from the top, which keeps loose overburden from caving onto
/// the agent. Anything else only has to be within breaking reach.
pub fn goal_for_candidate(world: &dyn World, pos: Position, dropped: &[Position]) -> Goal {
    if dropped.contains(&pos) {
        return Goal::ReachCell(pos);
    }
    if world.cell_at(pos.up()).is_air() && world.cell_at(pos.up_by(2)).is_air() {
        return Goal::Composite(vec![Goal::BreakFromAbove(pos), Goal::StandAbove(pos)]);
    }
    Goal::BreakCell(pos)
}

/// One composite goal over every candidate, or `None` when there are no
/// candidates.
pub fn formulate(world: &dyn World, candidates: &[Position], dropped: &[Position]) -> Option<Goal> {
    if candidates.is_empty() {
        return None;
    }
    Some(Goal::Composite(
        candidates
            .iter()
            .map(|pos| goal_for_candidate(world, *pos, dropped))
            .collect(),
    ))
}
