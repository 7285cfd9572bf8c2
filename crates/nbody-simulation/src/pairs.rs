//! Unordered particle pairs in canonical nested-loop order

/// All pairs `(i, j)` with `i < j`, outer `i` ascending, inner `j` ascending.
///
/// Built once per run; the particle count never changes.
#[derive(Clone, Debug)]
pub struct PairIndex {
    particle_count: usize,
    pairs: Vec<(u32, u32)>,
    row_offsets: Vec<usize>,
}

impl PairIndex {
    pub fn new(particle_count: usize) -> Self {
        let len = pair_count(particle_count);
        let mut pairs = Vec::with_capacity(len);
        let mut row_offsets = Vec::with_capacity(particle_count);

        for i in 0..particle_count {
            row_offsets.push(pairs.len());
            for j in i + 1..particle_count {
                pairs.push((i as u32, j as u32));
            }
        }
        debug_assert_eq!(pairs.len(), len);

        Self {
            particle_count,
            pairs,
            row_offsets,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(u32, u32)] {
        &self.pairs
    }

    #[inline]
    pub fn pair(&self, index: usize) -> (usize, usize) {
        let (i, j) = self.pairs[index];
        (i as usize, j as usize)
    }

    /// Position of `(i, j)` in the list. Requires `i < j < particle_count`.
    #[inline]
    pub fn index_of(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < j && j < self.particle_count);
        self.row_offsets[i] + (j - i - 1)
    }
}

/// n(n-1)/2
pub fn pair_count(particle_count: usize) -> usize {
    particle_count * particle_count.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order() {
        let index = PairIndex::new(4);
        assert_eq!(
            index.pairs(),
            &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
    }

    #[test]
    fn index_of_inverts_pair() {
        let index = PairIndex::new(37);
        assert_eq!(index.len(), 37 * 36 / 2);
        for p in 0..index.len() {
            let (i, j) = index.pair(p);
            assert!(i < j);
            assert_eq!(index.index_of(i, j), p);
        }
    }

    #[test]
    fn degenerate_counts() {
        assert!(PairIndex::new(0).is_empty());
        assert!(PairIndex::new(1).is_empty());
        assert_eq!(PairIndex::new(2).len(), 1);
    }
}
