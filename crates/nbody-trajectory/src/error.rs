use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while writing or decoding batch files
#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("stream ended before the batch header was complete")]
    MissingHeader,

    #[error("invalid batch header (frame_count={frame_count}, particle_count={particle_count})")]
    InvalidHeader {
        frame_count: i32,
        particle_count: i32,
    },

    #[error("stream ended inside frame {frame}")]
    Truncated { frame: usize },

    #[error("batch has data after its last frame")]
    TrailingData,

    #[error("frame has {actual} positions, trajectory expects {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("{path:?} holds {actual} particles per frame, trajectory has {expected}")]
    ParticleCountMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("{0} particles do not fit the 32-bit header field")]
    ParticleCount(usize),

    #[error("frames_per_file must be at least 1")]
    ZeroCapacity,

    #[error("frames_per_file {0} does not fit the 32-bit header field")]
    FrameCapacity(usize),

    #[error("{particle_count} particles per frame do not fit in memory")]
    FrameTooLarge { particle_count: usize },

    #[error("{dir:?} already holds {count} batch files from an earlier run")]
    ExistingBatches { dir: PathBuf, count: usize },

    #[error("compression level {0} is outside 0-9")]
    CompressionLevel(u32),

    #[error("batch index {0} exceeds the four-digit file naming scheme")]
    BatchIndex(usize),
}
