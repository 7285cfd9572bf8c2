//! Frame emission with batch rotation

use crate::format::write_batch;
use crate::sink::BatchSink;
use crate::TrajectoryError;
use flate2::Compression;

/// How a trajectory is cut into batch files
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrajectoryConfig {
    /// Frames per batch file; only the last file of a run may hold fewer
    pub frames_per_file: usize,
    /// gzip level, 0-9
    pub compression_level: u32,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            frames_per_file: 100,
            compression_level: Compression::fast().level(),
        }
    }
}

/// A batch file that has been written and closed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSummary {
    pub index: usize,
    /// Trajectory-wide index of the first frame in this batch
    pub first_frame: u64,
    pub frame_count: usize,
}

/// Appends frames to the open batch and rotates to a new one at capacity.
///
/// The header's frame count precedes the frames, so the frames of the open
/// batch are staged and the batch is encoded in one pass when it closes.
/// Call [`FrameEmitter::close`] at the end of a run to write the final,
/// possibly partial, batch.
pub struct FrameEmitter<S: BatchSink> {
    sink: S,
    particle_count: usize,
    config: TrajectoryConfig,
    staged: Vec<[f32; 3]>,
    staged_frames: usize,
    next_batch: usize,
    frames_emitted: u64,
}

impl<S: BatchSink> FrameEmitter<S> {
    pub fn new(
        sink: S,
        particle_count: usize,
        config: TrajectoryConfig,
    ) -> Result<Self, TrajectoryError> {
        if config.frames_per_file == 0 {
            return Err(TrajectoryError::ZeroCapacity);
        }
        if config.compression_level > 9 {
            return Err(TrajectoryError::CompressionLevel(config.compression_level));
        }
        if particle_count == 0 || i32::try_from(particle_count).is_err() {
            return Err(TrajectoryError::ParticleCount(particle_count));
        }
        if i32::try_from(config.frames_per_file).is_err() {
            return Err(TrajectoryError::FrameCapacity(config.frames_per_file));
        }

        Ok(Self {
            sink,
            particle_count,
            config,
            staged: Vec::with_capacity(config.frames_per_file.min(1024) * particle_count),
            staged_frames: 0,
            next_batch: 0,
            frames_emitted: 0,
        })
    }

    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    pub fn config(&self) -> TrajectoryConfig {
        self.config
    }

    /// Frames accepted so far, including staged ones
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    pub fn batches_written(&self) -> usize {
        self.next_batch
    }

    /// Append one frame. Returns the summary of the batch this frame closed, if any.
    pub fn push_frame(
        &mut self,
        positions: &[[f32; 3]],
    ) -> Result<Option<BatchSummary>, TrajectoryError> {
        if positions.len() != self.particle_count {
            return Err(TrajectoryError::FrameSize {
                expected: self.particle_count,
                actual: positions.len(),
            });
        }

        self.staged.extend_from_slice(positions);
        self.staged_frames += 1;
        self.frames_emitted += 1;

        if self.staged_frames == self.config.frames_per_file {
            self.write_staged().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Write the staged partial batch, if any frames are pending.
    pub fn close(&mut self) -> Result<Option<BatchSummary>, TrajectoryError> {
        if self.staged_frames == 0 {
            return Ok(None);
        }
        self.write_staged().map(Some)
    }

    /// Give the sink back. Staged frames that were not closed are dropped.
    pub fn into_sink(self) -> S {
        if self.staged_frames > 0 {
            log::warn!(
                "Dropping {} staged frames that were never written",
                self.staged_frames
            );
        }
        self.sink
    }

    fn write_staged(&mut self) -> Result<BatchSummary, TrajectoryError> {
        let index = self.next_batch;
        let summary = BatchSummary {
            index,
            first_frame: self.frames_emitted - self.staged_frames as u64,
            frame_count: self.staged_frames,
        };

        let writer = self.sink.create(index)?;
        let writer = write_batch(
            writer,
            self.particle_count,
            &self.staged,
            Compression::new(self.config.compression_level),
        )?;
        self.sink.commit(index, writer)?;

        log::debug!(
            "Batch {} closed with {} frames",
            summary.index,
            summary.frame_count
        );

        self.staged.clear();
        self.staged_frames = 0;
        self.next_batch += 1;
        Ok(summary)
    }
}
