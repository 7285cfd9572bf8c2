//! Destinations for encoded batches

use crate::format::{batch_file_name, is_batch_file};
use crate::TrajectoryError;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A plain sequential byte sink, one stream per batch index.
///
/// `create` is called when a batch is about to be written and `commit`
/// once its compressed stream has been finished.
pub trait BatchSink {
    type Writer: Write;

    fn create(&mut self, batch_index: usize) -> Result<Self::Writer, TrajectoryError>;

    fn commit(&mut self, batch_index: usize, writer: Self::Writer) -> Result<(), TrajectoryError>;
}

/// Writes `batch_NNNN.bin.gz` files into one directory
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Create the directory (and parents) if needed.
    ///
    /// A directory that already holds batch files is refused: a reader would
    /// splice the earlier run's files into this one.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TrajectoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut count = 0;
        for entry in fs::read_dir(&dir)? {
            if is_batch_file(&entry?.path()) {
                count += 1;
            }
        }
        if count > 0 {
            return Err(TrajectoryError::ExistingBatches { dir, count });
        }

        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files committed so far, in batch order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl BatchSink for DirectorySink {
    type Writer = BufWriter<File>;

    fn create(&mut self, batch_index: usize) -> Result<Self::Writer, TrajectoryError> {
        let path = self.dir.join(batch_file_name(batch_index)?);
        log::debug!("Creating {}", path.display());
        Ok(BufWriter::new(File::create(path)?))
    }

    fn commit(&mut self, batch_index: usize, writer: Self::Writer) -> Result<(), TrajectoryError> {
        let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        self.written.push(self.dir.join(batch_file_name(batch_index)?));
        Ok(())
    }
}

/// Keeps every batch in memory, indexed by batch number
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Vec<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[Vec<u8>] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<Vec<u8>> {
        self.batches
    }
}

impl BatchSink for MemorySink {
    type Writer = Vec<u8>;

    fn create(&mut self, _batch_index: usize) -> Result<Self::Writer, TrajectoryError> {
        Ok(Vec::new())
    }

    fn commit(&mut self, batch_index: usize, writer: Self::Writer) -> Result<(), TrajectoryError> {
        debug_assert_eq!(batch_index, self.batches.len());
        self.batches.push(writer);
        Ok(())
    }
}
