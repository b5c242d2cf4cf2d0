//! Pathing goals handed to the path planner.
//!
//! A goal is a predicate over agent feet positions plus a cost-to-go
//! estimate the planner uses to order its search. Excavation produces one
//! goal per candidate and combines them with [`Goal::Composite`].

use std::fmt;

use excavator_types::Position;
use serde::Serialize;

/// Estimated cost of one horizontal cell of travel.
const COST_PER_CELL: f64 = 3.563;

/// Estimated cost of climbing one cell.
const COST_PER_ASCENT: f64 = 6.5;

/// Estimated cost of dropping one cell.
const COST_PER_DESCENT: f64 = 1.5;

/// A predicate over feet positions that the planner paths toward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Stand with feet exactly at the cell.
    ReachCell(Position),
    /// Get close enough to break the cell: feet or head in or next to it.
    BreakCell(Position),
    /// Break the cell from its own level or from on top of it, never from
    /// below and never from inside it.
    BreakFromAbove(Position),
    /// Get next to the cell above the target without rising past it and
    /// without standing in the target or the cell above it.
    StandAbove(Position),
    /// Move away from an origin. Never satisfied.
    RunAway {
        /// The point to move away from.
        origin: Position,
        /// Distance at which the run is considered underway.
        radius: u32,
    },
    /// Satisfied when any member is.
    Composite(Vec<Goal>),
}

impl Goal {
    /// Whether an agent with feet at `pos` satisfies this goal.
    pub fn is_in_goal(&self, pos: Position) -> bool {
        match self {
            Self::ReachCell(target) => pos == *target,
            Self::BreakCell(target) => within_breaking_reach(*target, pos),
            Self::BreakFromAbove(target) => {
                pos != *target && pos.y >= target.y && within_breaking_reach(*target, pos)
            }
            Self::StandAbove(target) => {
                let above = target.up();
                pos != *target && pos != above && pos.y <= above.y && within_breaking_reach(above, pos)
            }
            Self::RunAway { .. } => false,
            Self::Composite(members) => members.iter().any(|goal| goal.is_in_goal(pos)),
        }
    }

    /// Estimated cost to reach this goal from `pos`. Lower is closer.
    pub fn heuristic(&self, pos: Position) -> f64 {
        match self {
            Self::ReachCell(target) | Self::BreakCell(target) => travel_estimate(pos, *target),
            Self::BreakFromAbove(target) | Self::StandAbove(target) => travel_estimate(pos, target.up()),
            Self::RunAway { origin, .. } => -horizontal_estimate(pos, *origin),
            Self::Composite(members) => members
                .iter()
                .map(|goal| goal.heuristic(pos))
                .fold(f64::MAX, f64::min),
        }
    }

    /// The members of a composite goal, or the goal itself otherwise.
    pub fn members(&self) -> &[Self] {
        match self {
            Self::Composite(members) => members,
            other => std::slice::from_ref(other),
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReachCell(pos) => write!(f, "ReachCell{pos}"),
            Self::BreakCell(pos) => write!(f, "BreakCell{pos}"),
            Self::BreakFromAbove(pos) => write!(f, "BreakFromAbove{pos}"),
            Self::StandAbove(pos) => write!(f, "StandAbove{pos}"),
            Self::RunAway { origin, radius } => write!(f, "RunAway{origin} radius {radius}"),
            Self::Composite(members) => write!(f, "Composite({} goals)", members.len()),
        }
    }
}

/// Feet at `pos` put the agent's feet or head in or next to `target`:
/// Manhattan distance at most one, with the vertical offset shifted by one
/// when the feet are below the target.
fn within_breaking_reach(target: Position, pos: Position) -> bool {
    let dx = pos.x.abs_diff(target.x);
    let dz = pos.z.abs_diff(target.z);
    let dy = if pos.y < target.y {
        pos.y.abs_diff(target.y).saturating_sub(1)
    } else {
        pos.y.abs_diff(target.y)
    };
    dx.saturating_add(dy).saturating_add(dz) <= 1
}

fn horizontal_estimate(pos: Position, target: Position) -> f64 {
    let dx = (f64::from(pos.x) - f64::from(target.x)).abs();
    let dz = (f64::from(pos.z) - f64::from(target.z)).abs();
    let (straight, diagonal) = if dx < dz { (dz - dx, dx) } else { (dx - dz, dz) };
    diagonal.mul_add(std::f64::consts::SQRT_2, straight) * COST_PER_CELL
}

fn travel_estimate(pos: Position, target: Position) -> f64 {
    let dy = f64::from(target.y) - f64::from(pos.y);
    let vertical = if dy > 0.0 {
        dy * COST_PER_ASCENT
    } else {
        -dy * COST_PER_DESCENT
    };
    horizontal_estimate(pos, target) + vertical
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn break_cell_accepts_adjacent_and_above() {
        let target = Position::new(0, 64, 0);
        let goal = Goal::BreakCell(target);
        assert!(goal.is_in_goal(Position::new(1, 64, 0)));
        assert!(goal.is_in_goal(Position::new(0, 65, 0)));
        assert!(goal.is_in_goal(Position::new(0, 63, 0)));
        assert!(goal.is_in_goal(Position::new(0, 62, 0)));
        assert!(!goal.is_in_goal(Position::new(0, 66, 0)));
        assert!(!goal.is_in_goal(Position::new(1, 65, 0)));
        assert!(!goal.is_in_goal(Position::new(1, 64, 1)));
    }

    #[test]
    fn break_from_above_rejects_below_and_inside() {
        let target = Position::new(3, 10, 3);
        let goal = Goal::BreakFromAbove(target);
        assert!(goal.is_in_goal(Position::new(3, 11, 3)));
        assert!(goal.is_in_goal(Position::new(4, 10, 3)));
        assert!(!goal.is_in_goal(target));
        assert!(!goal.is_in_goal(Position::new(3, 9, 3)));
        assert!(!goal.is_in_goal(Position::new(3, 12, 3)));
    }

    #[test]
    fn stand_above_excludes_the_cell_and_the_one_over_it() {
        let target = Position::new(0, 10, 0);
        let goal = Goal::StandAbove(target);
        assert!(!goal.is_in_goal(target));
        assert!(!goal.is_in_goal(target.up()));
        assert!(!goal.is_in_goal(target.up_by(2)));
        assert!(goal.is_in_goal(Position::new(1, 11, 0)));
        assert!(goal.is_in_goal(Position::new(0, 10, 1)));
        assert!(!goal.is_in_goal(Position::new(1, 12, 0)));
    }

    #[test]
    fn run_away_is_never_satisfied() {
        let goal = Goal::RunAway {
            origin: Position::new(0, 64, 0),
            radius: 64,
        };
        assert!(!goal.is_in_goal(Position::new(500, 64, 500)));
        assert!(goal.heuristic(Position::new(100, 64, 0)) < goal.heuristic(Position::new(10, 64, 0)));
    }

    #[test]
    fn composite_is_any_member() {
        let goal = Goal::Composite(vec![
            Goal::ReachCell(Position::new(5, 5, 5)),
            Goal::ReachCell(Position::new(9, 9, 9)),
        ]);
        assert!(goal.is_in_goal(Position::new(9, 9, 9)));
        assert!(!goal.is_in_goal(Position::new(7, 7, 7)));
        assert_eq!(goal.members().len(), 2);
    }

    #[test]
    fn composite_heuristic_is_the_closest_member() {
        let near = Goal::ReachCell(Position::new(2, 64, 0));
        let far = Goal::ReachCell(Position::new(20, 64, 0));
        let origin = Position::new(0, 64, 0);
        let goal = Goal::Composite(vec![far, near.clone()]);
        assert!((goal.heuristic(origin) - near.heuristic(origin)).abs() < 1e-9);
    }

    #[test]
    fn empty_composite_is_infinitely_far() {
        let goal = Goal::Composite(Vec::new());
        assert!(!goal.is_in_goal(Position::new(0, 0, 0)));
        assert!(goal.heuristic(Position::new(0, 0, 0)) >= f64::MAX);
    }

    #[test]
    fn heuristic_is_zero_at_the_target() {
        let pos = Position::new(4, 20, -4);
        assert!(Goal::ReachCell(pos).heuristic(pos).abs() < 1e-9);
    }

    #[test]
    fn display_names_the_variant() {
        assert_eq!(Goal::BreakCell(Position::new(1, 2, 3)).to_string(), "BreakCell(1, 2, 3)");
    }
}
