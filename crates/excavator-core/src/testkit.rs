//! Recording fakes for every collaborator port.
//!
//! Each fake is cheap to clone and clones share state, so a test can hand
//! one copy to the [`Environment`](crate::ports::Environment) and keep
//! another to inspect or steer afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use excavator_types::{CellType, Inventory, Position, Rotation, Vec3};

use crate::goal::Goal;
use crate::ports::{Actuator, AgentView, GoalSink, Input, MessageSink};

/// Eye height above the feet cell's floor.
pub const EYE_HEIGHT: f64 = 1.62;

/// Default reach distance.
pub const DEFAULT_REACH: f64 = 4.5;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct AgentState {
    feet: Position,
    rotation: Rotation,
    on_ground: bool,
    sneaking: bool,
    reach: f64,
    inventory: Inventory,
}

/// An [`AgentView`] whose every reading is set by the test.
#[derive(Debug, Clone)]
pub struct FakeAgent {
    state: Arc<Mutex<AgentState>>,
}

impl FakeAgent {
    /// A grounded agent at `feet` with an empty inventory.
    pub fn new(feet: Position) -> Self {
        Self {
            state: Arc::new(Mutex::new(AgentState {
                feet,
                rotation: Rotation::new(0.0, 0.0),
                on_ground: true,
                sneaking: false,
                reach: DEFAULT_REACH,
                inventory: Inventory::empty(),
            })),
        }
    }

    /// Move the agent.
    pub fn set_feet(&self, feet: Position) {
        lock(&self.state).feet = feet;
    }

    /// Turn the agent.
    pub fn set_rotation(&self, rotation: Rotation) {
        lock(&self.state).rotation = rotation;
    }

    /// Put the agent on the ground or in the air.
    pub fn set_on_ground(&self, on_ground: bool) {
        lock(&self.state).on_ground = on_ground;
    }

    /// Make the agent crouch or stand.
    pub fn set_sneaking(&self, sneaking: bool) {
        lock(&self.state).sneaking = sneaking;
    }

    /// Replace the inventory.
    pub fn set_inventory(&self, inventory: Inventory) {
        lock(&self.state).inventory = inventory;
    }
}

impl AgentView for FakeAgent {
    fn feet(&self) -> Position {
        lock(&self.state).feet
    }

    fn eye_position(&self) -> Vec3 {
        let feet = lock(&self.state).feet;
        Vec3::new(
            f64::from(feet.x) + 0.5,
            f64::from(feet.y) + EYE_HEIGHT,
            f64::from(feet.z) + 0.5,
        )
    }

    fn rotation(&self) -> Rotation {
        lock(&self.state).rotation
    }

    fn on_ground(&self) -> bool {
        lock(&self.state).on_ground
    }

    fn is_sneaking(&self) -> bool {
        lock(&self.state).sneaking
    }

    fn reach_distance(&self) -> f64 {
        lock(&self.state).reach
    }

    fn inventory(&self) -> Inventory {
        lock(&self.state).inventory.clone()
    }
}

// ---------------------------------------------------------------------------
// Actuator
// ---------------------------------------------------------------------------

/// One call made on a [`RecordingActuator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCall {
    /// [`Actuator::look`].
    Look(Rotation),
    /// [`Actuator::set_input`].
    SetInput(Input, bool),
    /// [`Actuator::clear_inputs`].
    ClearInputs,
    /// [`Actuator::select_best_tool`].
    SelectTool(CellType),
}

/// An [`Actuator`] that records every call and optionally turns a
/// [`FakeAgent`] when asked to look.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    calls: Arc<Mutex<Vec<ActuatorCall>>>,
    steers: Option<FakeAgent>,
}

impl RecordingActuator {
    /// A recorder that moves nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that applies look calls to `agent`.
    pub fn steering(agent: FakeAgent) -> Self {
        Self {
            calls: Arc::default(),
            steers: Some(agent),
        }
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<ActuatorCall> {
        lock(&self.calls).clone()
    }

    /// Whether `input` is forced on after replaying the calls so far.
    pub fn is_forced(&self, input: Input) -> bool {
        lock(&self.calls).iter().fold(false, |on, call| match call {
            ActuatorCall::SetInput(which, active) if *which == input => *active,
            ActuatorCall::ClearInputs => false,
            _ => on,
        })
    }

    /// Forget recorded calls.
    pub fn reset(&self) {
        lock(&self.calls).clear();
    }
}

impl Actuator for RecordingActuator {
    fn look(&mut self, rotation: Rotation) {
        lock(&self.calls).push(ActuatorCall::Look(rotation));
        if let Some(agent) = &self.steers {
            agent.set_rotation(rotation);
        }
    }

    fn set_input(&mut self, input: Input, active: bool) {
        lock(&self.calls).push(ActuatorCall::SetInput(input, active));
    }

    fn clear_inputs(&mut self) {
        lock(&self.calls).push(ActuatorCall::ClearInputs);
    }

    fn select_best_tool(&mut self, cell: CellType) {
        lock(&self.calls).push(ActuatorCall::SelectTool(cell));
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// A [`MessageSink`] that keeps every message.
#[derive(Debug, Clone, Default)]
pub struct RecordingMessages {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingMessages {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message so far, in order.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    /// Whether any message contains `needle`, ignoring ASCII case.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        lock(&self.messages)
            .iter()
            .any(|message| message.to_ascii_lowercase().contains(&needle))
    }
}

impl MessageSink for RecordingMessages {
    fn report(&mut self, message: &str) {
        lock(&self.messages).push(message.to_owned());
    }
}

/// A [`GoalSink`] that keeps every goal it was given.
#[derive(Debug, Clone, Default)]
pub struct RecordingGoalSink {
    goals: Arc<Mutex<Vec<Goal>>>,
}

impl RecordingGoalSink {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every goal so far, in order.
    pub fn goals(&self) -> Vec<Goal> {
        lock(&self.goals).clone()
    }
}

impl GoalSink for RecordingGoalSink {
    fn set_goal_and_path(&mut self, goal: Goal) {
        lock(&self.goals).push(goal);
    }
}
