//! Exact N-Body Gravity Simulation
//!
//! Integrates every pairwise interaction each tick and records the
//! trajectory as gzip batch files for offline playback.

mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use nbody_physics::ParticleStore;
use nbody_simulation::{Simulation, Strategy};
use nbody_trajectory::{DirectorySink, FrameEmitter};
use settings::Settings;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(version, about = "Exact O(N²) gravity simulation")]
struct Args {
    /// Settings file, created with defaults if missing
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// Directory for the batch files, relative to the current directory
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Override the force strategy (naive, symmetric, gpu)
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Override the number of frames to record
    #[arg(long)]
    frames: Option<u64>,
}

fn output_dir(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().context("failed to resolve the current directory")?;
    Ok(cwd.join(path))
}

fn main() -> Result<()> {
    // Initialize logger (RUST_LOG=debug for per-tick output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = Settings::load_or_create(&args.settings)?;
    if let Some(strategy) = args.strategy {
        settings.simulation.strategy = strategy;
    }
    if let Some(frames) = args.frames {
        settings.frames_total = frames;
    }

    let particles = settings.initial.particles(settings.simulation.law.g);
    let store = ParticleStore::new(particles).context("invalid initial state")?;

    let output = output_dir(args.output)?;
    let sink = DirectorySink::new(&output)
        .with_context(|| format!("failed to prepare {}", output.display()))?;
    log::info!("Writing trajectory to {}", output.display());

    let mut emitter = FrameEmitter::new(sink, store.len(), settings.trajectory_config())
        .context("invalid trajectory settings")?;
    let mut simulation = Simulation::from_params(store, &settings.simulation)
        .context("failed to start the simulation")?;

    let start = Instant::now();
    let batches = simulation
        .run(settings.frames_total, &mut emitter)
        .context("simulation aborted")?;

    let elapsed = start.elapsed().as_secs_f32();
    log::info!(
        "Finished: {} frames in {} batch files, {:.2}s ({:.4}s per frame)",
        simulation.tick(),
        batches.len(),
        elapsed,
        elapsed / simulation.tick().max(1) as f32
    );
    Ok(())
}
