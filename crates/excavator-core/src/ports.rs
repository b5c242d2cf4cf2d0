//! Collaborator ports the controller talks through.
//!
//! The controller never touches an agent, a renderer, or a planner
//! directly. It reads the agent through [`AgentView`], acts through
//! [`Actuator`], and reports through [`MessageSink`]. Return-home goes to a
//! [`GoalSink`] fed from [`Waypoints`]. [`Environment`] bundles all of them
//! together with the world, the cache, and the background executor.

use std::sync::Arc;

use excavator_types::{CellType, Inventory, Position, Rotation, Vec3};
use excavator_world::{PersistentCache, World, looking_at};
use tracing::info;

use crate::executor::SearchExecutor;
use crate::goal::Goal;

/// Inputs the controller can force on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    /// Crouch.
    Sneak,
    /// Primary action: break the looked-at cell.
    ClickLeft,
}

/// Read-only view of the controlled agent.
pub trait AgentView {
    /// The cell the agent's feet occupy.
    fn feet(&self) -> Position;

    /// Eye position, the origin of every reach and visibility check.
    fn eye_position(&self) -> Vec3;

    /// Current view direction.
    fn rotation(&self) -> Rotation;

    /// Whether the agent stands on solid ground.
    fn on_ground(&self) -> bool;

    /// Whether the agent is crouching.
    fn is_sneaking(&self) -> bool;

    /// How far the agent can reach to break a cell.
    fn reach_distance(&self) -> f64;

    /// Snapshot of the main inventory.
    fn inventory(&self) -> Inventory;

    /// The solid cell the agent is currently looking at within reach.
    fn looking_at(&self, world: &dyn World) -> Option<Position> {
        looking_at(world, self.eye_position(), self.rotation(), self.reach_distance())
    }
}

/// Direct control over the agent.
pub trait Actuator {
    /// Turn to face `rotation`.
    fn look(&mut self, rotation: Rotation);

    /// Force `input` on or off.
    fn set_input(&mut self, input: Input, active: bool);

    /// Release every forced input.
    fn clear_inputs(&mut self);

    /// Switch to the fastest tool for breaking `cell`.
    fn select_best_tool(&mut self, cell: CellType);
}

/// The always-available goal interface used for return-home.
pub trait GoalSink {
    /// Replace the current goal and start pathing toward it.
    fn set_goal_and_path(&mut self, goal: Goal);
}

/// Stored reference points.
pub trait Waypoints {
    /// The most recently recorded home, if any.
    fn most_recent_home(&self) -> Option<Position>;
}

/// Chat-style status output for the operator.
pub trait MessageSink {
    /// Report `message`.
    fn report(&mut self, message: &str);
}

/// A [`MessageSink`] that writes every message to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMessages;

impl MessageSink for LogMessages {
    fn report(&mut self, message: &str) {
        info!(target: "excavator::chat", "{message}");
    }
}

/// A [`Waypoints`] store holding at most one fixed home.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedHome(pub Option<Position>);

impl Waypoints for FixedHome {
    fn most_recent_home(&self) -> Option<Position> {
        self.0
    }
}

/// Everything the controller reads from and acts on.
pub struct Environment {
    /// The live world.
    pub world: Arc<dyn World>,
    /// The persistent index of previously seen cells.
    pub cache: Arc<dyn PersistentCache>,
    /// The controlled agent.
    pub agent: Box<dyn AgentView>,
    /// Direct agent control.
    pub actuator: Box<dyn Actuator>,
    /// Goal interface for return-home.
    pub goals: Box<dyn GoalSink>,
    /// Home waypoint lookup.
    pub waypoints: Box<dyn Waypoints>,
    /// Operator output.
    pub messages: Box<dyn MessageSink>,
    /// Where background world searches run.
    pub executor: Box<dyn SearchExecutor>,
}
