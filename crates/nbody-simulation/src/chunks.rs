//! Disjoint range hand-out over an index space
//!
//! A single atomic cursor is the only shared state: every successful
//! claim advances it past a range nobody else can receive, which is what
//! lets workers write into one buffer without locks. The cursor never moves
//! beyond `len`, so an exhausted manager stays exhausted.

use std::marker::PhantomData;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out contiguous, non-overlapping ranges of `0..len`.
#[derive(Debug)]
pub struct ChunkManager {
    cursor: AtomicUsize,
    len: usize,
    chunk_size: usize,
}

impl ChunkManager {
    /// `chunk_size` of 0 is treated as 1.
    pub fn new(len: usize, chunk_size: usize) -> Self {
        Self {
            cursor: AtomicUsize::new(0),
            len,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks one full pass produces
    pub fn chunk_count(&self) -> usize {
        self.len.div_ceil(self.chunk_size)
    }

    /// Claim the next range, or `None` once the index space is exhausted.
    pub fn next_chunk(&self) -> Option<Range<usize>> {
        // Relaxed is enough: the cursor orders nothing but itself.
        let start = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |start| {
                (start < self.len).then(|| self.end_of(start))
            })
            .ok()?;
        Some(start..self.end_of(start))
    }

    fn end_of(&self, start: usize) -> usize {
        start.saturating_add(self.chunk_size).min(self.len)
    }

    /// Rewind for the next tick. Needs exclusive access, so no claim can be outstanding.
    pub fn reset(&mut self) {
        *self.cursor.get_mut() = 0;
    }

    /// Bind the manager to `cells` for one phase, rewinding the cursor first.
    ///
    /// # Panics
    ///
    /// If `cells.len()` differs from the managed length.
    pub fn split<'a, T: Send>(&'a mut self, cells: &'a mut [T]) -> ChunkedSlice<'a, T> {
        assert_eq!(
            cells.len(),
            self.len,
            "chunked buffer must cover the managed index space"
        );
        self.reset();
        ChunkedSlice {
            manager: self,
            ptr: cells.as_mut_ptr(),
            _cells: PhantomData,
        }
    }
}

/// One exclusively borrowed buffer, handed out chunk by chunk.
pub struct ChunkedSlice<'a, T> {
    manager: &'a ChunkManager,
    ptr: *mut T,
    _cells: PhantomData<&'a mut [T]>,
}

// Safety: the buffer is only reachable through `next_chunk`, which gives each
// range out at most once, so threads never alias a cell. `T: Send` because
// cells are written from whichever worker claimed them.
unsafe impl<T: Send> Sync for ChunkedSlice<'_, T> {}
unsafe impl<T: Send> Send for ChunkedSlice<'_, T> {}

impl<'a, T> ChunkedSlice<'a, T> {
    /// Claim the next range together with exclusive access to its cells.
    pub fn next_chunk(&self) -> Option<(Range<usize>, &'a mut [T])> {
        let range = self.manager.next_chunk()?;
        // Safety: `range` lies inside the buffer (the manager clamps to `len`,
        // which `split` checked against the buffer) and the atomic cursor never
        // returns overlapping ranges while this borrow is alive.
        let cells = unsafe {
            std::slice::from_raw_parts_mut(self.ptr.add(range.start), range.end - range.start)
        };
        Some((range, cells))
    }
}
