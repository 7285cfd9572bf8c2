//! Run context and the per-tick phase sequence
//!
//! Everything a tick touches is built once and owned here, then handed to
//! each phase by reference. Phases run strictly in order; each one fans out
//! over the worker pool and joins before the next starts.

use crate::accumulate::{
    AnyAccumulator, ForceAccumulator, ForceTable, NaiveAccumulator, SymmetricAccumulator,
};
use crate::error::Phase;
use crate::gpu::{GpuContext, GpuForceReducer};
use crate::integrate::Integrator;
use crate::params::{SimulationParams, Strategy};
use crate::SimulationError;
use nbody_physics::ParticleStore;
use nbody_trajectory::{BatchSink, BatchSummary, FrameEmitter};
use std::sync::Arc;

/// Fixed-size worker pool shared by every CPU phase. `threads == 0` uses one per logical CPU.
pub fn build_pool(threads: usize) -> Result<Arc<rayon::ThreadPool>, SimulationError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("nbody-worker-{i}"))
        .build()?;
    log::info!("Worker pool: {} threads", pool.current_num_threads());
    Ok(Arc::new(pool))
}

fn cpu_accumulator(
    strategy: Strategy,
    params: &SimulationParams,
    particle_count: usize,
    pool: &Arc<rayon::ThreadPool>,
) -> Result<AnyAccumulator, SimulationError> {
    match strategy {
        Strategy::Naive => Ok(NaiveAccumulator::new(pool.clone(), params.law).into()),
        Strategy::Symmetric => Ok(SymmetricAccumulator::new(
            pool.clone(),
            particle_count,
            params.law,
            params.chunk_size,
        )
        .into()),
        Strategy::Gpu => Err(SimulationError::config(
            "gpu is not a CPU strategy and cannot serve as a fallback",
        )),
    }
}

fn gpu_accumulator(
    params: &SimulationParams,
    particle_count: usize,
) -> Result<GpuForceReducer, SimulationError> {
    let context = GpuContext::new()?;
    GpuForceReducer::new(context, particle_count, params.law, params.tile_size)
}

/// Build the configured strategy once, before the first tick.
///
/// An accelerator failure is fatal unless `gpu_fallback` names a CPU strategy.
pub fn select_accumulator(
    params: &SimulationParams,
    particle_count: usize,
    pool: &Arc<rayon::ThreadPool>,
) -> Result<AnyAccumulator, SimulationError> {
    params.validate()?;

    match params.strategy {
        Strategy::Gpu => match gpu_accumulator(params, particle_count) {
            Ok(reducer) => Ok(reducer.into()),
            Err(err) => match params.gpu_fallback {
                Some(fallback) => {
                    log::warn!(
                        "GPU unavailable ({}), falling back to the {} strategy",
                        err,
                        fallback.name()
                    );
                    cpu_accumulator(fallback, params, particle_count, pool)
                }
                None => Err(err),
            },
        },
        cpu => cpu_accumulator(cpu, params, particle_count, pool),
    }
}

/// One simulation run: state, scratch tables, strategy and pool.
pub struct Simulation<A: ForceAccumulator> {
    store: ParticleStore,
    forces: ForceTable,
    accumulator: A,
    integrator: Integrator,
    pool: Arc<rayon::ThreadPool>,
    tick: u64,
    frame: Vec<[f32; 3]>,
}

impl Simulation<AnyAccumulator> {
    /// Validate `params`, start the pool and pick the strategy.
    pub fn from_params(
        store: ParticleStore,
        params: &SimulationParams,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        let pool = build_pool(params.threads)?;
        let accumulator = select_accumulator(params, store.len(), &pool)?;
        Simulation::new(store, accumulator, pool, params)
    }
}

impl<A: ForceAccumulator> Simulation<A> {
    pub fn new(
        store: ParticleStore,
        accumulator: A,
        pool: Arc<rayon::ThreadPool>,
        params: &SimulationParams,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        log::info!(
            "Simulating {} particles with the {} strategy (dt = {}, G = {}, softening = {})",
            store.len(),
            accumulator.name(),
            params.dt,
            params.law.g,
            params.law.softening
        );

        Ok(Self {
            forces: ForceTable::new(store.len()),
            frame: Vec::with_capacity(store.len()),
            store,
            accumulator,
            integrator: Integrator::new(params.dt, params.integration),
            pool,
            tick: 0,
        })
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    /// Net forces computed by the most recent tick
    pub fn forces(&self) -> &ForceTable {
        &self.forces
    }

    pub fn accumulator(&self) -> &A {
        &self.accumulator
    }

    /// Completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Accumulate forces, then integrate. Either both phases land or the tick fails.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        let tick = self.tick;

        self.forces.reset();
        self.accumulator
            .accumulate(&self.store, &mut self.forces)
            .map_err(|e| e.at(tick, Phase::ForceAccumulation))?;

        self.integrator
            .apply(&self.pool, &mut self.store, &self.forces)
            .map_err(|e| e.at(tick, Phase::Integration))?;

        self.tick += 1;
        log::debug!("Tick {} done", tick);
        Ok(())
    }

    /// Step `ticks` times, recording one frame per tick, then flush the last batch.
    pub fn run<S: BatchSink>(
        &mut self,
        ticks: u64,
        emitter: &mut FrameEmitter<S>,
    ) -> Result<Vec<BatchSummary>, SimulationError> {
        if emitter.particle_count() != self.store.len() {
            return Err(SimulationError::config(format!(
                "emitter expects {} particles, simulation has {}",
                emitter.particle_count(),
                self.store.len()
            )));
        }

        let mut batches = Vec::new();
        for _ in 0..ticks {
            self.step()?;

            let tick = self.tick - 1;
            self.store.positions_into(&mut self.frame);
            let closed = emitter
                .push_frame(&self.frame)
                .map_err(|e| SimulationError::from(e).at(tick, Phase::FrameEmission))?;
            if let Some(summary) = closed {
                log_batch(&summary);
                batches.push(summary);
            }
        }

        let last = self.tick.saturating_sub(1);
        let closed = emitter
            .close()
            .map_err(|e| SimulationError::from(e).at(last, Phase::FrameEmission))?;
        if let Some(summary) = closed {
            log_batch(&summary);
            batches.push(summary);
        }
        Ok(batches)
    }
}

fn log_batch(summary: &BatchSummary) {
    log::info!(
        "Batch {:04} written: frames {}..{}",
        summary.index,
        summary.first_frame,
        summary.first_frame + summary.frame_count as u64
    );
}
