//! Demo binary for the excavator.
//!
//! Wires the excavation controller to a simulated agent in a generated
//! desert and runs it tick by tick until the session ends or the tick
//! budget runs out. A JSON summary of the run is logged at the end.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `excavator-config.yaml` (or `EXCAVATOR_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Generate the desert world
//! 4. Index tracked cells of every loaded region into the persistent cache
//! 5. Wire the controller to the simulated agent
//! 6. Run the tick loop
//! 7. Walk home if the controller asked for it
//! 8. Log the summary

mod config;
mod desert;
mod error;
mod sim;

use std::sync::Arc;
use std::time::Duration;

use excavator_core::{
    CancelReason, Environment, ExcavationController, FixedHome, LogMessages, TokioSearchExecutor,
};
use excavator_types::Position;
use excavator_world::{RegionIndex, World};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigSource, EngineConfig, LoggingConfig};
use crate::error::EngineError;
use crate::sim::{Sim, Step};

/// End-of-run report.
#[derive(Debug, Serialize)]
struct RunSummary {
    ticks: u64,
    cancel_reason: Option<CancelReason>,
    collected: u32,
    broken: u32,
    final_position: Position,
    walked_home: bool,
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, world generation, or the run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = config::load(&config::config_path()).map_err(EngineError::from)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "Configuration loaded"),
        ConfigSource::Defaults(path) => {
            warn!(path = %path.display(), "Config file not found, using defaults");
        }
    }

    run(config).await?;
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config: EngineConfig) -> Result<(), EngineError> {
    let demo = config.demo.clone();
    info!(
        seed = demo.seed,
        region_radius = demo.region_radius,
        quantity = demo.quantity,
        max_ticks = demo.max_ticks,
        "excavator-engine starting"
    );

    // 3. Generate the world.
    let desert = desert::generate(demo.seed, demo.region_radius)?;
    let world = Arc::new(desert.world);

    // 4. Index tracked cells.
    let cache = RegionIndex::new();
    let indexed: usize = world
        .loaded_regions()
        .into_iter()
        .map(|region| cache.observe_region(world.as_ref(), region))
        .sum();
    info!(indexed, "Persistent cache primed");

    // 5. Wire the controller.
    let sim = Sim::new(Arc::clone(&world), desert.spawn);
    let mut walker = sim.walker(demo.stuck_ticks);
    let shared_world: Arc<dyn World> = world.clone();
    let env = Environment {
        world: shared_world,
        cache: Arc::new(cache),
        agent: Box::new(sim.agent()),
        actuator: Box::new(sim.actuator()),
        goals: Box::new(sim.goal_sink()),
        waypoints: Box::new(FixedHome(Some(desert.spawn))),
        messages: Box::new(LogMessages),
        executor: Box::new(TokioSearchExecutor::new(tokio::runtime::Handle::current())),
    };
    let mut controller = ExcavationController::new(config.excavation, env);
    if demo.targets.is_empty() {
        warn!("No targets configured, nothing to do");
    }
    let names: Vec<&str> = demo.targets.iter().map(|cell| cell.name()).collect();
    controller.start_by_name(&names, demo.quantity)?;

    // 6. Tick loop.
    let pause = Duration::from_millis(demo.tick_interval_ms);
    let mut ticks = 0_u64;
    while ticks < demo.max_ticks {
        let Some(command) = controller.on_tick(walker.status()) else {
            break;
        };
        ticks = ticks.saturating_add(1);
        walker.follow(&command);
        idle(pause).await;
    }
    if controller.is_active() {
        warn!(ticks, "Tick budget exhausted");
        controller.on_lost_control();
    }

    // 7. Walk home.
    let walked_home = match sim.take_home_goal() {
        Some(goal) => {
            info!(%goal, "Walking home");
            walker.set_goal(goal);
            let mut arrived = false;
            while ticks < demo.max_ticks && !walker.status().calc_failed {
                ticks = ticks.saturating_add(1);
                if walker.step() == Step::Arrived {
                    arrived = true;
                    break;
                }
                idle(pause).await;
            }
            arrived
        }
        None => false,
    };

    // 8. Summary.
    let body = sim.body();
    let summary = RunSummary {
        ticks,
        cancel_reason: controller.last_cancel_reason(),
        collected: body.collected,
        broken: body.broken,
        final_position: body.feet,
        walked_home,
    };
    let json = serde_json::to_string(&summary)?;
    info!(summary = %json, "excavator-engine run complete");
    Ok(())
}

/// Give background searches a chance to finish between ticks.
async fn idle(pause: Duration) {
    if pause.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(pause).await;
    }
}
