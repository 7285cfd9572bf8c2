//! Batch file wire format
//!
//! One batch is a gzip stream holding, little-endian:
//!
//! ```text
//! frame_count:    i32
//! particle_count: i32
//! frame_count × particle_count × (x: f32, y: f32, z: f32)
//! ```
//!
//! Frames follow each other with no delimiter and positions are in particle
//! index order.

use crate::TrajectoryError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

/// Size of the header in bytes
pub const HEADER_LEN: usize = 8;

/// Size of one encoded position
pub const POSITION_LEN: usize = 12;

/// Suffix shared by every batch file
pub const BATCH_SUFFIX: &str = ".bin.gz";

/// Highest index the zero-padded name can represent while keeping
/// lexicographic order equal to creation order
pub const MAX_BATCH_INDEX: usize = 9999;

/// File name for batch `index`: `batch_0000.bin.gz`, `batch_0001.bin.gz`, ...
pub fn batch_file_name(index: usize) -> Result<String, TrajectoryError> {
    if index > MAX_BATCH_INDEX {
        return Err(TrajectoryError::BatchIndex(index));
    }
    Ok(format!("batch_{index:04}{BATCH_SUFFIX}"))
}

/// Whether a directory entry takes part in a trajectory
pub fn is_batch_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(BATCH_SUFFIX))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchHeader {
    pub frame_count: i32,
    pub particle_count: i32,
}

impl BatchHeader {
    pub fn new(frame_count: usize, particle_count: usize) -> Result<Self, TrajectoryError> {
        let particle_count = i32::try_from(particle_count)
            .map_err(|_| TrajectoryError::ParticleCount(particle_count))?;
        // Frame counts are bounded by frames_per_file, which is checked by the emitter.
        let frame_count =
            i32::try_from(frame_count).map_err(|_| TrajectoryError::FrameCapacity(frame_count))?;
        Ok(Self {
            frame_count,
            particle_count,
        })
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.frame_count.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.particle_count.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; HEADER_LEN]) -> Result<Self, TrajectoryError> {
        let frame_count = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let particle_count = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if frame_count < 0 || particle_count < 0 {
            return Err(TrajectoryError::InvalidHeader {
                frame_count,
                particle_count,
            });
        }
        Ok(Self {
            frame_count,
            particle_count,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count as usize
    }

    pub fn particle_count(&self) -> usize {
        self.particle_count as usize
    }
}

fn write_positions<W: Write>(out: &mut W, positions: &[[f32; 3]]) -> io::Result<()> {
    if cfg!(target_endian = "little") {
        out.write_all(bytemuck::cast_slice(positions))
    } else {
        for component in positions.iter().flatten() {
            out.write_all(&component.to_le_bytes())?;
        }
        Ok(())
    }
}

/// Encode one complete batch into `writer`.
///
/// `positions` holds the frames back to back, so its length must be a
/// multiple of `particle_count`. Returns the writer once the gzip trailer
/// has been written.
pub fn write_batch<W: Write>(
    writer: W,
    particle_count: usize,
    positions: &[[f32; 3]],
    compression: Compression,
) -> Result<W, TrajectoryError> {
    if particle_count == 0 || positions.len() % particle_count != 0 {
        return Err(TrajectoryError::FrameSize {
            expected: particle_count,
            actual: positions.len(),
        });
    }
    let header = BatchHeader::new(positions.len() / particle_count, particle_count)?;

    let mut encoder = GzEncoder::new(writer, compression);
    encoder.write_all(&header.to_bytes())?;
    write_positions(&mut encoder, positions)?;
    Ok(encoder.finish()?)
}

/// Sequential decoder for one batch stream
pub struct BatchReader<R: Read> {
    decoder: GzDecoder<R>,
    header: BatchHeader,
    frames_read: usize,
    frame_len: usize,
    scratch: Vec<u8>,
}

impl BatchReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> BatchReader<R> {
    /// Wrap a compressed stream and read its header.
    pub fn new(reader: R) -> Result<Self, TrajectoryError> {
        let mut decoder = GzDecoder::new(reader);
        let mut bytes = [0u8; HEADER_LEN];
        decoder.read_exact(&mut bytes).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => TrajectoryError::MissingHeader,
            _ => TrajectoryError::Io(e),
        })?;
        let header = BatchHeader::from_bytes(bytes)?;
        let frame_len = header
            .particle_count()
            .checked_mul(POSITION_LEN)
            .ok_or(TrajectoryError::FrameTooLarge {
                particle_count: header.particle_count(),
            })?;

        // The scratch buffer grows with the data actually read, never with the header alone.
        Ok(Self {
            decoder,
            header,
            frames_read: 0,
            frame_len,
            scratch: Vec::new(),
        })
    }

    pub fn header(&self) -> BatchHeader {
        self.header
    }

    pub fn frames_remaining(&self) -> usize {
        self.header.frame_count() - self.frames_read
    }

    /// Decode the next frame into `frame`.
    ///
    /// Returns `false` once all `frame_count` frames have been read; at that
    /// point the stream must be exhausted.
    pub fn read_frame(&mut self, frame: &mut Vec<[f32; 3]>) -> Result<bool, TrajectoryError> {
        if self.frames_remaining() == 0 {
            let mut probe = [0u8; 1];
            if self.decoder.read(&mut probe)? != 0 {
                return Err(TrajectoryError::TrailingData);
            }
            return Ok(false);
        }

        let index = self.frames_read;
        self.scratch.clear();
        let read = (&mut self.decoder)
            .take(self.frame_len as u64)
            .read_to_end(&mut self.scratch)?;
        if read < self.frame_len {
            return Err(TrajectoryError::Truncated { frame: index });
        }

        frame.clear();
        frame.extend(self.scratch.chunks_exact(POSITION_LEN).map(|p| {
            let c = |i: usize| f32::from_le_bytes([p[i], p[i + 1], p[i + 2], p[i + 3]]);
            [c(0), c(4), c(8)]
        }));
        self.frames_read += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_layout() {
        let header = BatchHeader::new(3, 258).unwrap();
        assert_eq!(header.to_bytes(), [3, 0, 0, 0, 2, 1, 0, 0]);
        assert_eq!(BatchHeader::from_bytes(header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn negative_header_fields_are_rejected() {
        let mut bytes = BatchHeader::new(1, 1).unwrap().to_bytes();
        bytes[0..4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            BatchHeader::from_bytes(bytes),
            Err(TrajectoryError::InvalidHeader { frame_count: -1, .. })
        ));
    }

    #[test]
    fn payload_is_little_endian_triples() {
        let positions = [[1.0f32, -2.0, 0.5], [3.25, 0.0, -0.0]];
        let compressed = write_batch(Vec::new(), 2, &positions, Compression::fast()).unwrap();

        let mut raw = Vec::new();
        GzDecoder::new(Cursor::new(compressed))
            .read_to_end(&mut raw)
            .unwrap();

        assert_eq!(raw.len(), HEADER_LEN + 2 * POSITION_LEN);
        assert_eq!(&raw[0..4], &1i32.to_le_bytes());
        assert_eq!(&raw[4..8], &2i32.to_le_bytes());
        assert_eq!(&raw[8..12], &1.0f32.to_le_bytes());
        assert_eq!(&raw[28..32], &(-0.0f32).to_le_bytes());
    }

    #[test]
    fn round_trip_is_bit_exact() {
        let frames = 5;
        let particles = 7;
        let positions: Vec<[f32; 3]> = (0..frames * particles)
            .map(|i| {
                let x = i as f32;
                [x * 0.1 + 1e-7, -x / 3.0, f32::MIN_POSITIVE * x]
            })
            .collect();

        let bytes = write_batch(Vec::new(), particles, &positions, Compression::best()).unwrap();
        let mut reader = BatchReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header(), BatchHeader::new(frames, particles).unwrap());

        let mut decoded = Vec::new();
        let mut frame = Vec::new();
        while reader.read_frame(&mut frame).unwrap() {
            assert_eq!(frame.len(), particles);
            decoded.extend_from_slice(&frame);
        }

        assert_eq!(decoded.len(), positions.len());
        for (a, b) in decoded.iter().zip(&positions) {
            for k in 0..3 {
                assert_eq!(a[k].to_bits(), b[k].to_bits());
            }
        }
    }

    #[test]
    fn truncated_stream_is_reported() {
        // Header promises two frames, only one is present
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder
            .write_all(&BatchHeader::new(2, 1).unwrap().to_bytes())
            .unwrap();
        write_positions(&mut encoder, &[[1.0, 2.0, 3.0]]).unwrap();
        let bytes = encoder.finish().unwrap();

        let mut reader = BatchReader::new(Cursor::new(bytes)).unwrap();
        let mut frame = Vec::new();
        assert!(reader.read_frame(&mut frame).unwrap());
        assert!(matches!(
            reader.read_frame(&mut frame),
            Err(TrajectoryError::Truncated { frame: 1 })
        ));
    }

    #[test]
    fn oversized_header_fails_without_allocating_it() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder
            .write_all(&BatchHeader::new(1, i32::MAX as usize).unwrap().to_bytes())
            .unwrap();
        write_positions(&mut encoder, &[[1.0, 2.0, 3.0]]).unwrap();
        let bytes = encoder.finish().unwrap();

        let mut reader = BatchReader::new(Cursor::new(bytes)).unwrap();
        let mut frame = Vec::new();
        assert!(matches!(
            reader.read_frame(&mut frame),
            Err(TrajectoryError::Truncated { frame: 0 })
        ));
        assert!(frame.is_empty());
    }

    #[test]
    fn batch_names_sort_chronologically() {
        let names: Vec<String> = [0, 9, 10, 99, 100, 9999]
            .iter()
            .map(|&i| batch_file_name(i).unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "batch_0000.bin.gz");
        assert!(batch_file_name(10_000).is_err());
    }
}
