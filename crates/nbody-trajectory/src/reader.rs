//! Sequential playback of a trajectory directory

use crate::format::{is_batch_file, BatchReader};
use crate::TrajectoryError;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reads frames across all batch files of one trajectory, in name order.
///
/// End of stream inside one file moves on to the next file; running out of
/// files is the end of the trajectory. There is no index, so the reader can
/// only move forward.
pub struct TrajectoryReader {
    files: Vec<PathBuf>,
    next_file: usize,
    current: Option<BatchReader<BufReader<File>>>,
    particle_count: Option<usize>,
    frames_read: u64,
}

impl TrajectoryReader {
    /// Collect every `*.bin.gz` file in `dir`, sorted by file name.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if is_batch_file(&path) && path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Self::from_files(files)
    }

    /// Read the given files in the given order.
    pub fn from_files(files: Vec<PathBuf>) -> Result<Self, TrajectoryError> {
        let mut reader = Self {
            files,
            next_file: 0,
            current: None,
            particle_count: None,
            frames_read: 0,
        };
        reader.advance_file()?;
        Ok(reader)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Particles per frame, `None` for an empty trajectory
    pub fn particle_count(&self) -> Option<usize> {
        self.particle_count
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Decode the next frame. Returns `false` at the end of the trajectory.
    pub fn next_frame(&mut self, frame: &mut Vec<[f32; 3]>) -> Result<bool, TrajectoryError> {
        loop {
            let Some(batch) = self.current.as_mut() else {
                return Ok(false);
            };
            if batch.read_frame(frame)? {
                self.frames_read += 1;
                return Ok(true);
            }
            self.advance_file()?;
        }
    }

    /// Discard up to `count` frames. Returns how many were skipped.
    pub fn skip(&mut self, count: u64) -> Result<u64, TrajectoryError> {
        let mut scratch = Vec::new();
        let mut skipped = 0;
        while skipped < count && self.next_frame(&mut scratch)? {
            skipped += 1;
        }
        Ok(skipped)
    }

    fn advance_file(&mut self) -> Result<(), TrajectoryError> {
        self.current = None;
        let Some(path) = self.files.get(self.next_file) else {
            return Ok(());
        };
        self.next_file += 1;

        let batch = BatchReader::open(path)?;
        let count = batch.header().particle_count();
        match self.particle_count {
            None => self.particle_count = Some(count),
            Some(expected) if expected != count => {
                return Err(TrajectoryError::ParticleCountMismatch {
                    path: path.clone(),
                    expected,
                    actual: count,
                });
            }
            Some(_) => {}
        }
        log::debug!(
            "Reading {} ({} frames)",
            path.display(),
            batch.header().frame_count()
        );
        self.current = Some(batch);
        Ok(())
    }
}

impl Iterator for TrajectoryReader {
    type Item = Result<Vec<[f32; 3]>, TrajectoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut frame = Vec::new();
        match self.next_frame(&mut frame) {
            Ok(true) => Some(Ok(frame)),
            Ok(false) => None,
            Err(e) => {
                // Stop after the first error
                self.current = None;
                self.next_file = self.files.len();
                Some(Err(e))
            }
        }
    }
}
