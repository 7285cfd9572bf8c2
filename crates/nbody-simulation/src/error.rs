use nbody_physics::StoreError;
use nbody_trajectory::TrajectoryError;
use std::fmt;
use thiserror::Error;

/// Phase of a tick, used to locate failures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    ForceAccumulation,
    Integration,
    FrameEmission,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::ForceAccumulation => "force accumulation",
            Phase::Integration => "integration",
            Phase::FrameEmission => "frame emission",
        })
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid initial state: {0}")]
    InitialState(#[from] StoreError),

    #[error("accelerator unavailable: {0}")]
    Device(String),

    #[error("accelerator readback failed: {0}")]
    Readback(String),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error("tick {tick}: {phase} failed")]
    Tick {
        tick: u64,
        phase: Phase,
        #[source]
        source: Box<SimulationError>,
    },
}

impl SimulationError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        SimulationError::Config(message.into())
    }

    /// Attach the tick and phase that failed.
    pub fn at(self, tick: u64, phase: Phase) -> Self {
        SimulationError::Tick {
            tick,
            phase,
            source: Box::new(self),
        }
    }

    /// Tick and phase of a failure raised inside the run loop
    pub fn location(&self) -> Option<(u64, Phase)> {
        match self {
            SimulationError::Tick { tick, phase, .. } => Some((*tick, *phase)),
            _ => None,
        }
    }
}
