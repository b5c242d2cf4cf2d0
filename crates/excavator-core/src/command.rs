//! What the controller tells the pathing layer each tick, and what the
//! pathing layer reports back.

use serde::Serialize;

use crate::goal::Goal;

/// How the pathing layer should treat the command's goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Stop moving; the controller is acting directly this tick.
    RequestPause,
    /// Adopt the goal, keeping the current path only if it still leads
    /// there.
    RevalidateGoalAndPath,
}

/// The controller's instruction for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathingCommand {
    /// Goal to path toward, absent for a pause.
    pub goal: Option<Goal>,
    /// How to apply it.
    pub kind: CommandKind,
}

impl PathingCommand {
    /// Hold still for this tick.
    pub const fn pause() -> Self {
        Self {
            goal: None,
            kind: CommandKind::RequestPause,
        }
    }

    /// Path toward `goal`, revalidating the current path.
    pub const fn revalidate(goal: Goal) -> Self {
        Self {
            goal: Some(goal),
            kind: CommandKind::RevalidateGoalAndPath,
        }
    }
}

/// Planner state reported to the controller at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathStatus {
    /// The last path calculation found no route to the goal.
    pub calc_failed: bool,
    /// The current path can be interrupted without leaving the agent in a
    /// dangerous spot.
    pub safe_to_cancel: bool,
}

impl PathStatus {
    /// A settled planner: nothing failed and interruption is safe.
    pub const fn idle() -> Self {
        Self {
            calc_failed: false,
            safe_to_cancel: true,
        }
    }

    /// The last calculation failed.
    pub const fn failed() -> Self {
        Self {
            calc_failed: true,
            safe_to_cancel: true,
        }
    }
}
