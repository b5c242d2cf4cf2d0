//! The excavation controller.
//!
//! One [`ExcavationController`] drives one agent. A session starts with
//! [`ExcavationController::start`] and runs one step per world tick through
//! [`ExcavationController::on_tick`], which either breaks a nearby candidate
//! directly (asking the planner to pause) or hands the planner a composite
//! goal over the working set. Every terminating condition goes through a
//! single cancel path that records a [`CancelReason`].
//!
//! # Tick order
//!
//! 1. Inventory capacity (when enabled): narrow targets or cancel.
//! 2. Desired quantity reached: cancel with success.
//! 3. Path calculation failed: blacklist the nearest candidate or cancel.
//! 4. Breaking disabled: cancel.
//! 5. Background rescan: apply a finished result, dispatch a new one.
//! 6. Local scan around the agent.
//! 7. Direct break of the nearest candidate on the highest reachable layer.
//! 8. Otherwise formulate a goal, or fall back to running away.
//! 9. No goal at all: cancel.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use excavator_types::{CellType, ParseCellTypeError, Position, TargetSet};
use excavator_world::{avoid_breaking, reachable, scan_dropped_resources};
use serde::Serialize;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::command::{PathStatus, PathingCommand};
use crate::config::ExcavationConfig;
use crate::formulate::formulate;
use crate::goal::Goal;
use crate::ports::{Environment, Input};
use crate::prune::prune;
use crate::search::{RescanRequest, SearchContext};

/// Horizontal half-width of the local scan around the agent's feet.
const LOCAL_SCAN_HORIZONTAL: i32 = 10;

/// Cells scanned below the agent's feet.
const LOCAL_SCAN_BELOW: i32 = 1;

/// Cells scanned above the agent's feet.
const LOCAL_SCAN_ABOVE: i32 = 8;

/// Reach used to decide whether a scanned cell is visible. Covers the
/// scan volume's corners from anywhere inside the agent's cell.
const VISIBILITY_RANGE: f64 = 20.0;

/// Squared distance within which a cell counts as diagonally adjacent to a
/// known candidate.
const DIAGONAL_DISTANCE_SQ: i64 = 2;

/// Radius of the exploration goal.
const RUN_AWAY_RADIUS: u32 = 1;

static EMPTY_BLACKLIST: BTreeSet<Position> = BTreeSet::new();

// ---------------------------------------------------------------------------
// Errors and cancel reasons
// ---------------------------------------------------------------------------

/// Errors returned by controller entry points that validate input.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A target name did not match any cell type.
    #[error("cannot start excavation: {source}")]
    UnknownCellType {
        /// The underlying parse error.
        #[from]
        source: ParseCellTypeError,
    },
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// No target drop has room left in the inventory.
    InventoryFull,
    /// The desired quantity is held.
    QuantitySatisfied,
    /// No path to the candidates and blacklisting is off.
    Unreachable,
    /// Breaking is disabled by configuration.
    BreakingDisabled,
    /// A world search found nothing.
    NoLocationsKnown,
    /// No goal could be produced.
    NoGoal,
    /// Control was taken away externally.
    LostControl,
    /// A new session replaced this one.
    Superseded,
}

impl CancelReason {
    /// Whether ending for this reason sends the agent home.
    pub const fn returns_home(self) -> bool {
        matches!(
            self,
            Self::InventoryFull
                | Self::Unreachable
                | Self::BreakingDisabled
                | Self::NoLocationsKnown
                | Self::NoGoal
        )
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InventoryFull => "inventory full",
            Self::QuantitySatisfied => "quantity satisfied",
            Self::Unreachable => "unreachable",
            Self::BreakingDisabled => "breaking disabled",
            Self::NoLocationsKnown => "no locations known",
            Self::NoGoal => "no goal",
            Self::LostControl => "lost control",
            Self::Superseded => "superseded",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Whether the controller is running a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Nothing to do.
    Idle,
    /// Excavating.
    Active(ActiveSession),
}

/// State of a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    targets: TargetSet,
    desired_quantity: u32,
    generation: u64,
    tick_count: u64,
    working_set: Vec<Position>,
    blacklist: BTreeSet<Position>,
    start_position: Option<Position>,
}

impl ActiveSession {
    const fn new(targets: TargetSet, desired_quantity: u32, generation: u64) -> Self {
        Self {
            targets,
            desired_quantity,
            generation,
            tick_count: 0,
            working_set: Vec::new(),
            blacklist: BTreeSet::new(),
            start_position: None,
        }
    }

    /// Cell types being excavated.
    pub const fn targets(&self) -> &TargetSet {
        &self.targets
    }

    /// Items of the first target to collect, or zero for no limit.
    pub const fn desired_quantity(&self) -> u32 {
        self.desired_quantity
    }

    /// Generation this session was started with.
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// A background search waiting for its result.
struct PendingRescan {
    generation: u64,
    receiver: oneshot::Receiver<Vec<Position>>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Finds target cells, keeps the working set, and tells the planner where
/// to go.
pub struct ExcavationController {
    config: ExcavationConfig,
    env: Environment,
    session: Session,
    generation: u64,
    pending: Option<PendingRescan>,
    last_cancel: Option<CancelReason>,
}

impl ExcavationController {
    /// An idle controller.
    pub const fn new(config: ExcavationConfig, env: Environment) -> Self {
        Self {
            config,
            env,
            session: Session::Idle,
            generation: 0,
            pending: None,
            last_cancel: None,
        }
    }

    /// Replace the configuration. Takes effect on the next tick.
    pub fn set_config(&mut self, config: ExcavationConfig) {
        debug!("Excavation config replaced");
        self.config = config;
    }

    /// The current configuration.
    pub const fn config(&self) -> &ExcavationConfig {
        &self.config
    }

    /// The collaborators this controller works through.
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    /// The current session.
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Whether a session is running.
    pub const fn is_active(&self) -> bool {
        matches!(self.session, Session::Active(_))
    }

    /// Human-readable name, including the targets while active.
    pub fn display_name(&self) -> String {
        match &self.session {
            Session::Active(session) => format!("Excavate {}", session.targets),
            Session::Idle => "Excavate".to_owned(),
        }
    }

    /// Current candidates, nearest first. Empty when idle.
    pub fn working_set(&self) -> &[Position] {
        match &self.session {
            Session::Active(session) => &session.working_set,
            Session::Idle => &[],
        }
    }

    /// Positions excluded for this session. Empty when idle.
    pub fn blacklist(&self) -> &BTreeSet<Position> {
        match &self.session {
            Session::Active(session) => &session.blacklist,
            Session::Idle => &EMPTY_BLACKLIST,
        }
    }

    /// Why the most recent session ended, if one has.
    pub const fn last_cancel_reason(&self) -> Option<CancelReason> {
        self.last_cancel
    }

    /// Whether a background search has been dispatched and not yet
    /// consumed.
    pub const fn rescan_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start a session for `targets`, or stop when `targets` is `None`.
    ///
    /// `quantity` is the number of the first target's drop to collect;
    /// zero means no limit. Any running session is replaced. Unless world
    /// searches are disabled, the working set is seeded synchronously.
    pub fn start(&mut self, targets: Option<TargetSet>, quantity: u32) {
        self.end_session(CancelReason::Superseded);
        let Some(targets) = targets else {
            return;
        };
        if !self.config.allow_break {
            self.env
                .messages
                .report("Unable to excavate when breaking is disabled!");
            self.last_cancel = Some(CancelReason::BreakingDisabled);
            return;
        }

        info!(
            targets = %targets,
            quantity,
            generation = self.generation,
            "Excavation started"
        );
        self.session = Session::Active(ActiveSession::new(targets, quantity, self.generation));

        if self.config.legit_mine {
            return;
        }
        if let Some(request) = self.rescan_request() {
            self.apply_rescan(request.run());
        }
    }

    /// Start a session from cell-type names.
    ///
    /// An empty list stops the controller. Nothing changes when any name
    /// fails to parse.
    pub fn start_by_name(&mut self, names: &[&str], quantity: u32) -> Result<(), ControllerError> {
        let cells = names
            .iter()
            .map(|name| name.parse::<CellType>())
            .collect::<Result<Vec<_>, _>>()?;
        self.start(TargetSet::new(cells), quantity);
        Ok(())
    }

    /// Control was revoked: drop the session immediately.
    pub fn on_lost_control(&mut self) {
        self.end_session(CancelReason::LostControl);
    }

    fn end_session(&mut self, reason: CancelReason) {
        if self.is_active() {
            info!(%reason, "Excavation session ended");
            self.last_cancel = Some(reason);
        }
        self.session = Session::Idle;
        self.generation = self.generation.wrapping_add(1);
        self.pending = None;
    }

    /// The single exit for every condition that ends a session from inside
    /// a tick.
    fn cancel(&mut self, reason: CancelReason, message: &str) {
        if reason.returns_home() {
            warn!(%reason, "Excavation cancelled");
        } else {
            info!(%reason, "Excavation finished");
        }
        self.env.messages.report(message);
        if reason.returns_home() {
            self.return_home();
        }
        self.end_session(reason);
    }

    fn return_home(&mut self) {
        if !self.config.return_home_on_cancel {
            return;
        }
        match self.env.waypoints.most_recent_home() {
            Some(home) => {
                info!(%home, "Returning home");
                self.env.goals.set_goal_and_path(Goal::ReachCell(home));
            }
            None => self
                .env
                .messages
                .report("No recent home waypoint found, can't return"),
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the session by one tick.
    ///
    /// Returns `None` when idle or when the session ended during this tick.
    pub fn on_tick(&mut self, status: PathStatus) -> Option<PathingCommand> {
        if !self.is_active() {
            return None;
        }
        if self.config.check_inventory && !self.check_inventory() {
            return None;
        }
        if self.quantity_satisfied() {
            return None;
        }
        if status.calc_failed && !self.handle_calc_failure() {
            return None;
        }
        if !self.config.allow_break {
            self.cancel(
                CancelReason::BreakingDisabled,
                "Unable to excavate when breaking is disabled",
            );
            return None;
        }
        if !self.update_rescan() {
            return None;
        }
        self.add_nearby_targets();

        if let Some(command) = self.try_direct_break(status) {
            return Some(command);
        }

        let command = self.update_goal();
        if command.is_none() {
            let message = self.session_message(|targets| format!("No {targets} in range, canceling"));
            self.cancel(CancelReason::NoGoal, &message);
        }
        command
    }

    fn session_message(&self, render: impl FnOnce(&TargetSet) -> String) -> String {
        match &self.session {
            Session::Active(session) => render(&session.targets),
            Session::Idle => String::new(),
        }
    }

    /// Narrow the targets to those whose drop still fits. Returns `false`
    /// after cancelling when nothing fits.
    fn check_inventory(&mut self) -> bool {
        let inventory = self.env.agent.inventory();
        if inventory.has_empty_slot() {
            return true;
        }
        let Session::Active(session) = &mut self.session else {
            return false;
        };
        let fits = session.targets.retained(|cell| {
            cell.drop_item()
                .is_some_and(|item| inventory.has_partial_stack_of(item))
        });
        match fits {
            Some(narrowed) => {
                if narrowed != session.targets {
                    info!(from = %session.targets, to = %narrowed, "Inventory full for some targets");
                    session.targets = narrowed;
                }
                true
            }
            None => {
                self.cancel(CancelReason::InventoryFull, "Inventory full, cancelling excavation");
                false
            }
        }
    }

    /// Cancel with success once enough of the first target's drop is held.
    fn quantity_satisfied(&mut self) -> bool {
        let Session::Active(session) = &self.session else {
            return false;
        };
        if session.desired_quantity == 0 {
            return false;
        }
        let desired = session.desired_quantity;
        let Some(item) = session.targets.primary().and_then(CellType::drop_item) else {
            return false;
        };
        let held = self.env.agent.inventory().count_of(item);
        if held < desired {
            return false;
        }
        self.cancel(CancelReason::QuantitySatisfied, &format!("Have {held} valid items"));
        true
    }

    /// Blacklist the nearest candidate, or cancel. Returns `false` after
    /// cancelling.
    fn handle_calc_failure(&mut self) -> bool {
        let feet = self.env.agent.feet();
        let Session::Active(session) = &mut self.session else {
            return false;
        };
        if !self.config.blacklist_closest_on_failure || session.working_set.is_empty() {
            let message = format!("Unable to find any path to {}, canceling excavation", session.targets);
            self.cancel(CancelReason::Unreachable, &message);
            return false;
        }

        self.env.messages.report(&format!(
            "Unable to find any path to {}, blacklisting presumably unreachable closest instance...",
            session.targets
        ));
        if let Some(closest) = session
            .working_set
            .iter()
            .copied()
            .min_by_key(|pos| pos.distance_sq(feet))
        {
            warn!(position = %closest, "Blacklisting unreachable candidate");
            session.blacklist.insert(closest);
            session.working_set.retain(|pos| *pos != closest);
        }
        true
    }

    /// Apply a finished background search and dispatch the next one when
    /// due. Returns `false` after cancelling.
    fn update_rescan(&mut self) -> bool {
        let applied = self
            .poll_rescan()
            .is_none_or(|locations| self.apply_rescan(locations));
        if !applied {
            return false;
        }

        let interval = self.config.goal_update_interval;
        let Session::Active(session) = &mut self.session else {
            return false;
        };
        if interval == 0 {
            return true;
        }
        let due = session.tick_count.checked_rem(interval) == Some(0);
        session.tick_count = session.tick_count.wrapping_add(1);
        if due && !self.config.legit_mine {
            self.dispatch_rescan();
        }
        true
    }

    /// Replace the working set with a search result. An empty result ends
    /// the session; returns `false` in that case.
    fn apply_rescan(&mut self, locations: Vec<Position>) -> bool {
        let Session::Active(session) = &mut self.session else {
            return false;
        };
        if locations.is_empty() {
            let message = format!("No locations for {} known, cancelling", session.targets);
            self.cancel(CancelReason::NoLocationsKnown, &message);
            return false;
        }
        debug!(candidates = locations.len(), "Working set replaced by world search");
        session.working_set = locations;
        true
    }

    fn poll_rescan(&mut self) -> Option<Vec<Position>> {
        let mut pending = self.pending.take()?;
        match pending.receiver.try_recv() {
            Ok(locations) => {
                let current = match &self.session {
                    Session::Active(session) => Some(session.generation),
                    Session::Idle => None,
                };
                if current == Some(pending.generation) {
                    Some(locations)
                } else {
                    debug!(
                        stale = pending.generation,
                        current = self.generation,
                        "Discarding stale rescan result"
                    );
                    None
                }
            }
            Err(TryRecvError::Empty) => {
                self.pending = Some(pending);
                None
            }
            Err(TryRecvError::Closed) => {
                warn!(
                    generation = pending.generation,
                    "Background rescan ended without a result"
                );
                None
            }
        }
    }

    fn dispatch_rescan(&mut self) {
        if self.pending.is_some() {
            debug!("Rescan already in flight");
            return;
        }
        let Some(request) = self.rescan_request() else {
            return;
        };
        let (sender, receiver) = oneshot::channel();
        let generation = self.generation;
        self.env.executor.execute(Box::new(move || {
            if sender.send(request.run()).is_err() {
                debug!(generation, "Rescan finished after its session ended, result dropped");
            }
        }));
        debug!(generation, "Rescan dispatched");
        self.pending = Some(PendingRescan {
            generation: self.generation,
            receiver,
        });
    }

    fn rescan_request(&self) -> Option<RescanRequest> {
        let Session::Active(session) = &self.session else {
            return None;
        };
        Some(RescanRequest {
            world: Arc::clone(&self.env.world),
            cache: Arc::clone(&self.env.cache),
            settings: self.config.search_settings(),
            origin: self.env.agent.feet(),
            targets: session.targets.clone(),
            max_size: self.config.max_working_set,
            already_known: session.working_set.clone(),
            blacklist: session.blacklist.clone(),
        })
    }

    /// Add target cells and dropped items near the agent that are visible,
    /// or diagonally next to a known candidate when that is enabled.
    fn add_nearby_targets(&mut self) {
        let settings = self.config.search_settings();
        let include_diagonals = self.config.include_diagonals;
        let max_size = self.config.max_working_set;
        let feet = self.env.agent.feet();
        let eye = self.env.agent.eye_position();
        let world = self.env.world.as_ref();
        let cache = self.env.cache.as_ref();
        let Session::Active(session) = &mut self.session else {
            return;
        };

        let mut known = std::mem::take(&mut session.working_set);
        known.extend(scan_dropped_resources(
            &session.targets,
            world,
            settings.scan_dropped_items,
        ));

        let before = known.len();
        for x in feet.x.saturating_sub(LOCAL_SCAN_HORIZONTAL)..=feet.x.saturating_add(LOCAL_SCAN_HORIZONTAL) {
            for y in feet.y.saturating_sub(LOCAL_SCAN_BELOW)..=feet.y.saturating_add(LOCAL_SCAN_ABOVE) {
                for z in feet.z.saturating_sub(LOCAL_SCAN_HORIZONTAL)..=feet.z.saturating_add(LOCAL_SCAN_HORIZONTAL) {
                    let pos = Position::new(x, y, z);
                    if !session.targets.contains(world.cell_at(pos)) || known.contains(&pos) {
                        continue;
                    }
                    let beside_known = include_diagonals
                        && known
                            .iter()
                            .any(|other| other.distance_sq(pos) <= DIAGONAL_DISTANCE_SQ);
                    if beside_known || reachable(world, eye, pos, VISIBILITY_RANGE).is_some() {
                        known.push(pos);
                    }
                }
            }
        }

        let ctx = SearchContext::new(world, cache, &settings, feet);
        session.working_set = prune(&ctx, known, &session.targets, max_size, &session.blacklist);
        debug!(
            scanned_in = before,
            kept = session.working_set.len(),
            "Local scan merged"
        );
    }

    /// Break the best candidate in reach without pathing. Returns the pause
    /// command when the agent is acting this tick.
    fn try_direct_break(&mut self, status: PathStatus) -> Option<PathingCommand> {
        let policy = self.config.break_policy();
        let world = self.env.world.as_ref();
        let agent = self.env.agent.as_ref();
        let Session::Active(session) = &self.session else {
            return None;
        };

        let feet = agent.feet();
        let eye = agent.eye_position();
        let reach = agent.reach_distance();
        let reach_sq = reach * reach;
        let eligible = |pos: Position| {
            !world.cell_at(pos).is_air()
                && !world.cell_at(pos.up()).is_falling()
                && eye.distance_sq(pos.center()) <= reach_sq
        };

        let layer = session
            .working_set
            .iter()
            .copied()
            .filter(|pos| eligible(*pos))
            .map(|pos| pos.y)
            .max()
            .unwrap_or_else(|| feet.y.saturating_sub(1));
        let target = session
            .working_set
            .iter()
            .copied()
            .filter(|pos| pos.y >= layer && eligible(*pos))
            .min_by(|a, b| {
                eye.distance_sq(a.center())
                    .total_cmp(&eye.distance_sq(b.center()))
            });

        self.env.actuator.clear_inputs();
        let target = target?;
        if !agent.on_ground() || avoid_breaking(world, target, &policy) {
            return None;
        }
        let rotation = reachable(world, eye, target, reach)?;
        if !status.safe_to_cancel {
            return None;
        }

        let cell = world.cell_at(target);
        debug!(layer, position = %target, %cell, "Breaking candidate in reach");
        self.env.actuator.look(rotation);
        self.env.actuator.select_best_tool(cell);
        if agent.is_sneaking() {
            self.env.actuator.set_input(Input::Sneak, true);
        }
        if agent.looking_at(world) == Some(target) || agent.rotation().is_really_close_to(rotation) {
            self.env.actuator.set_input(Input::ClickLeft, true);
        }
        Some(PathingCommand::pause())
    }

    /// Formulate a goal over the working set, or the exploration fallback
    /// when it is empty.
    fn update_goal(&mut self) -> Option<PathingCommand> {
        let settings = self.config.search_settings();
        let max_size = self.config.max_working_set;
        let explore = self.config.legit_mine || self.config.explore_when_empty;
        let feet = self.env.agent.feet();
        let world = self.env.world.as_ref();
        let cache = self.env.cache.as_ref();
        let Session::Active(session) = &mut self.session else {
            return None;
        };

        if !session.working_set.is_empty() {
            let dropped = scan_dropped_resources(&session.targets, world, settings.scan_dropped_items);
            let ctx = SearchContext::new(world, cache, &settings, feet);
            let pruned = prune(
                &ctx,
                session.working_set.iter().copied(),
                &session.targets,
                max_size,
                &session.blacklist,
            );
            let goal = formulate(world, &pruned, &dropped);
            session.working_set = pruned;
            if let Some(goal) = goal {
                debug!(members = goal.members().len(), "Goal formulated");
                return Some(PathingCommand::revalidate(goal));
            }
        }

        if !explore {
            return None;
        }
        let origin = *session.start_position.get_or_insert(feet);
        debug!(%origin, "No candidates, exploring");
        Some(PathingCommand::revalidate(Goal::RunAway {
            origin,
            radius: RUN_AWAY_RADIUS,
        }))
    }
}
