//! A minimal simulated agent for the demo run.
//!
//! [`SimAgent`] and [`SimActuator`] share one [`Body`]. Breaking is
//! instant: forcing the primary action breaks the looked-at cell on the
//! spot. A held sneak input changes the pose when the walker advances a
//! tick, and clearing inputs releases it. [`Walker`] stands in for a path
//! planner. Each tick it takes one
//! greedy step that lowers the goal heuristic, digging through whatever
//! breakable cell is in the way, and it reports a path failure after a run
//! of ticks without progress.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use excavator_core::{
    Actuator, AgentView, CommandKind, Goal, GoalSink, Input, PathStatus, PathingCommand,
};
use excavator_types::{CellType, Entity, Inventory, Position, Rotation, Vec3};
use excavator_world::{VoxelWorld, World, WorldError, looking_at};
use tracing::{debug, trace, warn};

/// Eye height above the feet cell's floor.
pub const EYE_HEIGHT: f64 = 1.62;

/// Reach distance for breaking cells.
pub const REACH: f64 = 4.5;

/// Items within this distance of the feet cell's centre are picked up.
const PICKUP_RADIUS: f64 = 2.0;

const HORIZONTAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// Physical state of the simulated agent.
#[derive(Debug, Clone)]
pub struct Body {
    /// Cell the feet occupy.
    pub feet: Position,
    /// View direction.
    pub rotation: Rotation,
    /// Whether the agent is crouching.
    pub sneaking: bool,
    /// Whether the sneak input is held. The pose follows on the next tick.
    pub sneak_held: bool,
    /// Carried items.
    pub inventory: Inventory,
    /// Items picked up so far.
    pub collected: u32,
    /// Cells broken so far, by the actuator or while walking.
    pub broken: u32,
}

impl Body {
    fn eye(&self) -> Vec3 {
        Vec3::new(
            f64::from(self.feet.x) + 0.5,
            f64::from(self.feet.y) + EYE_HEIGHT,
            f64::from(self.feet.z) + 0.5,
        )
    }
}

/// Shared handles to the simulated agent and its world.
#[derive(Clone)]
pub struct Sim {
    body: Arc<Mutex<Body>>,
    world: Arc<VoxelWorld>,
    home_goal: Arc<Mutex<Option<Goal>>>,
}

impl Sim {
    /// An agent standing at `spawn` with an empty inventory.
    pub fn new(world: Arc<VoxelWorld>, spawn: Position) -> Self {
        Self {
            body: Arc::new(Mutex::new(Body {
                feet: spawn,
                rotation: Rotation::new(0.0, 0.0),
                sneaking: false,
                sneak_held: false,
                inventory: Inventory::empty(),
                collected: 0,
                broken: 0,
            })),
            world,
            home_goal: Arc::default(),
        }
    }

    /// Snapshot of the body.
    pub fn body(&self) -> Body {
        lock(&self.body).clone()
    }

    /// The read side, for the controller.
    pub fn agent(&self) -> SimAgent {
        SimAgent { sim: self.clone() }
    }

    /// The control side, for the controller.
    pub fn actuator(&self) -> SimActuator {
        SimActuator { sim: self.clone() }
    }

    /// Where the controller sends its return-home goal.
    pub fn goal_sink(&self) -> SimGoalSink {
        SimGoalSink { sim: self.clone() }
    }

    /// A walker that reports failure after `stuck_limit` ticks without
    /// progress.
    pub fn walker(&self, stuck_limit: u32) -> Walker {
        Walker {
            sim: self.clone(),
            goal: None,
            stuck: 0,
            stuck_limit: stuck_limit.max(1),
            failed: false,
        }
    }

    /// Take the goal handed over through [`SimGoalSink`], if any.
    pub fn take_home_goal(&self) -> Option<Goal> {
        lock(&self.home_goal).take()
    }

    /// Break `pos`, let the falling column above it settle, and count it.
    fn break_cell(&self, pos: Position) -> Result<CellType, WorldError> {
        let broken = self.world.break_cell(pos)?;
        settle_column(&self.world, pos)?;
        let mut body = lock(&self.body);
        body.broken = body.broken.saturating_add(1);
        Ok(broken)
    }

    /// Bring the pose in line with the held inputs.
    fn apply_inputs(&self) {
        let mut body = lock(&self.body);
        body.sneaking = body.sneak_held;
    }

    /// Drop the agent until it stands on something solid.
    fn fall(&self) {
        let (min_y, _) = self.world.height_bounds();
        let mut body = lock(&self.body);
        while body.feet.y > min_y.saturating_add(1) && !self.world.cell_at(body.feet.down()).is_solid() {
            body.feet = body.feet.down();
        }
    }

    /// Collect items near the agent into the inventory. Anything that does
    /// not fit goes back on the ground.
    fn pick_up(&self) {
        let mut body = lock(&self.body);
        let items = self.world.collect_items_near(body.feet.center(), PICKUP_RADIUS);
        for mut item in items {
            let leftover = body.inventory.insert(item.item, item.count);
            body.collected = body.collected.saturating_add(item.count.saturating_sub(leftover));
            if leftover > 0 {
                item.count = leftover;
                if let Err(e) = self.world.spawn_entity(Entity::Item(item)) {
                    warn!(error = %e, "Failed to return item to the ground");
                }
            }
        }
    }
}

/// Move every falling cell stacked above `pos` down until the column rests.
fn settle_column(world: &VoxelWorld, pos: Position) -> Result<(), WorldError> {
    let (_, max_y) = world.height_bounds();
    let mut gap = pos;
    while gap.y < max_y && world.cell_at(gap).is_air() {
        let above = world.cell_at(gap.up());
        if !above.is_falling() {
            break;
        }
        world.set_cell(gap, above)?;
        world.set_cell(gap.up(), CellType::Air)?;
        gap = gap.up();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// [`AgentView`] over the simulated body.
pub struct SimAgent {
    sim: Sim,
}

impl AgentView for SimAgent {
    fn feet(&self) -> Position {
        lock(&self.sim.body).feet
    }

    fn eye_position(&self) -> Vec3 {
        lock(&self.sim.body).eye()
    }

    fn rotation(&self) -> Rotation {
        lock(&self.sim.body).rotation
    }

    fn on_ground(&self) -> bool {
        let feet = lock(&self.sim.body).feet;
        self.sim.world.cell_at(feet.down()).is_solid()
    }

    fn is_sneaking(&self) -> bool {
        lock(&self.sim.body).sneaking
    }

    fn reach_distance(&self) -> f64 {
        REACH
    }

    fn inventory(&self) -> Inventory {
        lock(&self.sim.body).inventory.clone()
    }
}

/// [`Actuator`] over the simulated body. The primary action breaks
/// instantly.
pub struct SimActuator {
    sim: Sim,
}

impl Actuator for SimActuator {
    fn look(&mut self, rotation: Rotation) {
        lock(&self.sim.body).rotation = rotation;
    }

    fn set_input(&mut self, input: Input, active: bool) {
        match input {
            Input::Sneak => lock(&self.sim.body).sneak_held = active,
            Input::ClickLeft if active => {
                let (eye, rotation) = {
                    let body = lock(&self.sim.body);
                    (body.eye(), body.rotation)
                };
                let Some(target) = looking_at(self.sim.world.as_ref(), eye, rotation, REACH) else {
                    return;
                };
                match self.sim.break_cell(target) {
                    Ok(cell) => debug!(position = %target, %cell, "Cell broken"),
                    Err(e) => warn!(position = %target, error = %e, "Break failed"),
                }
            }
            Input::ClickLeft => {}
        }
    }

    fn clear_inputs(&mut self) {
        lock(&self.sim.body).sneak_held = false;
        trace!("Inputs cleared");
    }

    fn select_best_tool(&mut self, cell: CellType) {
        trace!(%cell, "Tool selected");
    }
}

/// [`GoalSink`] that parks the goal until the engine picks it up with
/// [`Sim::take_home_goal`].
pub struct SimGoalSink {
    sim: Sim,
}

impl GoalSink for SimGoalSink {
    fn set_goal_and_path(&mut self, goal: Goal) {
        debug!(%goal, "Goal handed to the walker");
        *lock(&self.sim.home_goal) = Some(goal);
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// What one walker step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Did not move: no goal, or the controller asked for a pause.
    Idle,
    /// Already inside the goal.
    Arrived,
    /// Moved one cell.
    Moved,
    /// Broke a cell in the way.
    Dug,
    /// Nothing brings the agent closer.
    Stuck,
}

/// A greedy one-step-per-tick stand-in for a path planner.
pub struct Walker {
    sim: Sim,
    goal: Option<Goal>,
    stuck: u32,
    stuck_limit: u32,
    failed: bool,
}

impl Walker {
    /// Status for the controller's next tick.
    pub const fn status(&self) -> PathStatus {
        PathStatus {
            calc_failed: self.failed,
            safe_to_cancel: true,
        }
    }

    /// Replace the goal.
    pub fn set_goal(&mut self, goal: Goal) {
        if self.goal.as_ref() != Some(&goal) {
            self.goal = Some(goal);
            self.stuck = 0;
        }
    }

    /// Act on one controller command.
    pub fn follow(&mut self, command: &PathingCommand) -> Step {
        self.failed = false;
        let step = match command.kind {
            CommandKind::RequestPause => {
                self.stuck = 0;
                Step::Idle
            }
            CommandKind::RevalidateGoalAndPath => {
                if let Some(goal) = &command.goal {
                    self.set_goal(goal.clone());
                }
                self.step()
            }
        };
        self.sim.apply_inputs();
        self.sim.fall();
        self.sim.pick_up();
        step
    }

    /// Take one step toward the goal.
    pub fn step(&mut self) -> Step {
        let Some(goal) = &self.goal else {
            return Step::Idle;
        };
        let feet = lock(&self.sim.body).feet;
        if goal.is_in_goal(feet) {
            self.stuck = 0;
            return Step::Arrived;
        }

        let here = goal.heuristic(feet);
        let world = self.sim.world.as_ref();
        let best = moves(feet)
            .into_iter()
            .filter_map(|dest| {
                let blocking = blocking_cells(world, feet, dest)?;
                Some((dest, blocking, goal.heuristic(dest)))
            })
            .filter(|(_, _, estimate)| *estimate < here)
            .min_by(|a, b| a.2.total_cmp(&b.2));

        let Some((dest, blocking, _)) = best else {
            self.stuck = self.stuck.saturating_add(1);
            if self.stuck >= self.stuck_limit {
                debug!(%feet, goal = %goal, "Walker stuck, reporting failure");
                self.failed = true;
                self.stuck = 0;
            }
            return Step::Stuck;
        };
        self.stuck = 0;

        if let Some(&cell) = blocking.first() {
            if let Err(e) = self.sim.break_cell(cell) {
                warn!(position = %cell, error = %e, "Failed to dig");
            }
            return Step::Dug;
        }
        lock(&self.sim.body).feet = dest;
        self.sim.fall();
        Step::Moved
    }
}

/// Candidate destinations: level, up and down a step in each horizontal
/// direction, and straight down.
fn moves(feet: Position) -> Vec<Position> {
    let mut moves: Vec<Position> = HORIZONTAL
        .iter()
        .flat_map(|&(dx, dz)| {
            [
                feet.offset(dx, 0, dz),
                feet.offset(dx, 1, dz),
                feet.offset(dx, -1, dz),
            ]
        })
        .collect();
    moves.push(feet.down());
    moves
}

/// Cells that must be broken before the agent can occupy `dest`, highest
/// first, or `None` when one of them cannot be broken.
fn blocking_cells(world: &dyn World, feet: Position, dest: Position) -> Option<Vec<Position>> {
    let mut space = if dest == feet.down() {
        vec![dest]
    } else {
        vec![dest.up(), dest]
    };
    if dest.y > feet.y {
        space.insert(0, feet.up_by(2));
    }
    let mut blocking = Vec::new();
    for pos in space {
        let cell = world.cell_at(pos);
        if cell.is_air() {
            continue;
        }
        if cell.is_liquid() || cell.hardness().is_none() {
            return None;
        }
        blocking.push(pos);
    }
    Some(blocking)
}
