//! Target acquisition and goal synthesis for the excavator engine.
//!
//! This crate turns a set of target cell types into a stream of pathing
//! commands. It keeps a bounded working set of candidate positions, fed by
//! world searches and a local scan around the agent, and either breaks the
//! best candidate in reach or hands the planner a composite goal.
//!
//! # Modules
//!
//! - [`config`] -- Typed excavation settings loaded from YAML.
//! - [`goal`] -- The closed set of pathing goals and their acceptance tests.
//! - [`command`] -- Per-tick commands to and status from the planner.
//! - [`prune`] -- Candidate filtering, ranking, and capping.
//! - [`search`] -- Cache lookup plus brute-force world search.
//! - [`formulate`] -- Per-candidate goal synthesis.
//! - [`ports`] -- Collaborator traits and the [`Environment`] bundle.
//! - [`executor`] -- Where background searches run.
//! - [`controller`] -- The [`ExcavationController`] state machine.
//! - [`testkit`] -- Recording fakes for every collaborator port.

pub mod command;
pub mod config;
pub mod controller;
pub mod executor;
pub mod formulate;
pub mod goal;
pub mod ports;
pub mod prune;
pub mod search;
pub mod testkit;

// Re-export primary types at crate root.
pub use command::{CommandKind, PathStatus, PathingCommand};
pub use config::{ConfigError, ExcavationConfig};
pub use controller::{ActiveSession, CancelReason, ControllerError, ExcavationController, Session};
pub use executor::{InlineExecutor, QueuedExecutor, SearchExecutor, SearchTask, TokioSearchExecutor};
pub use formulate::{formulate, goal_for_candidate};
pub use goal::Goal;
pub use ports::{
    Actuator, AgentView, Environment, FixedHome, GoalSink, Input, LogMessages, MessageSink, Waypoints,
};
pub use prune::prune;
pub use search::{RescanRequest, SearchContext, SearchSettings, search_world};
