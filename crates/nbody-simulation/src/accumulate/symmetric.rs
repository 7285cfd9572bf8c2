//! Symmetric pair-table strategy
//!
//! Each unordered pair is evaluated once during a lock-free fill, workers
//! claiming pair ranges from the [`ChunkManager`]. A second pass, parallel
//! over particles, folds the table into net forces with the mirrored sign
//! for the lower triangle.

use super::{check_table, ForceAccumulator, ForceTable};
use crate::chunks::ChunkManager;
use crate::pairs::PairIndex;
use crate::SimulationError;
use glam::Vec3;
use nbody_physics::{ForceLaw, ParticleStore};
use rayon::prelude::*;
use std::sync::Arc;

/// Forces of every pair `(i, j)`, `i < j`, stored once.
///
/// The lower triangle is the negated upper triangle, never recomputed.
#[derive(Clone, Debug)]
pub struct PairForceTable {
    pairs: PairIndex,
    cells: Vec<Vec3>,
}

impl PairForceTable {
    pub fn new(particle_count: usize) -> Self {
        let pairs = PairIndex::new(particle_count);
        let cells = vec![Vec3::ZERO; pairs.len()];
        Self { pairs, cells }
    }

    pub fn pairs(&self) -> &PairIndex {
        &self.pairs
    }

    pub fn particle_count(&self) -> usize {
        self.pairs.particle_count()
    }

    /// Force on `i` exerted by `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Vec3 {
        use std::cmp::Ordering::*;
        match i.cmp(&j) {
            Less => self.cells[self.pairs.index_of(i, j)],
            Greater => -self.cells[self.pairs.index_of(j, i)],
            Equal => Vec3::ZERO,
        }
    }

    /// Net force on `i`, partners visited in ascending index order.
    fn row_sum(&self, i: usize) -> Vec3 {
        let n = self.particle_count();
        let mut sum = Vec3::ZERO;
        for j in 0..i {
            sum -= self.cells[self.pairs.index_of(j, i)];
        }
        for j in i + 1..n {
            sum += self.cells[self.pairs.index_of(i, j)];
        }
        sum
    }
}

pub struct SymmetricAccumulator {
    table: PairForceTable,
    chunks: ChunkManager,
    pool: Arc<rayon::ThreadPool>,
    law: ForceLaw,
}

impl SymmetricAccumulator {
    pub fn new(
        pool: Arc<rayon::ThreadPool>,
        particle_count: usize,
        law: ForceLaw,
        chunk_size: usize,
    ) -> Self {
        let table = PairForceTable::new(particle_count);
        let chunks = ChunkManager::new(table.pairs.len(), chunk_size);
        log::debug!(
            "Pair table: {} pairs in {} chunks of {}",
            table.pairs.len(),
            chunks.chunk_count(),
            chunks.chunk_size()
        );
        Self {
            table,
            chunks,
            pool,
            law,
        }
    }

    /// Pair forces from the most recent tick
    pub fn pair_table(&self) -> &PairForceTable {
        &self.table
    }

    fn fill(&mut self, store: &ParticleStore) {
        let Self {
            table,
            chunks,
            pool,
            law,
        } = self;
        let law = *law;
        let particles = store.particles();
        let pairs = &table.pairs;
        let cells = chunks.split(&mut table.cells);

        pool.broadcast(|_| {
            while let Some((range, slice)) = cells.next_chunk() {
                for (cell, p) in slice.iter_mut().zip(range) {
                    let (i, j) = pairs.pair(p);
                    *cell = law.force(&particles[i], &particles[j]);
                }
            }
        });
    }

    fn reduce(&self, forces: &mut ForceTable) {
        let table = &self.table;
        self.pool.install(|| {
            forces
                .as_mut_slice()
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, net)| *net = table.row_sum(i));
        });
    }
}

impl ForceAccumulator for SymmetricAccumulator {
    fn name(&self) -> &'static str {
        "symmetric"
    }

    fn accumulate(
        &mut self,
        store: &ParticleStore,
        forces: &mut ForceTable,
    ) -> Result<(), SimulationError> {
        check_table(store, forces)?;
        if store.len() != self.table.particle_count() {
            return Err(SimulationError::config(format!(
                "pair table built for {} particles, store holds {}",
                self.table.particle_count(),
                store.len()
            )));
        }

        self.fill(store);
        self.reduce(forces);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbody_physics::Particle;

    fn store(n: usize) -> ParticleStore {
        ParticleStore::new(
            (0..n)
                .map(|i| {
                    let t = i as f32 * 0.7;
                    Particle::at_rest(
                        Vec3::new(t.cos() * 4.0, t.sin() * 4.0, t * 0.1),
                        1.0 + (i % 3) as f32,
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn pool(threads: usize) -> Arc<rayon::ThreadPool> {
        Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn every_pair_is_filled() {
        let law = ForceLaw::new(1.0, 1e-3);
        let store = store(23);
        let mut acc = SymmetricAccumulator::new(pool(4), store.len(), law, 5);
        let mut forces = ForceTable::new(store.len());
        acc.accumulate(&store, &mut forces).unwrap();

        let table = acc.pair_table();
        let particles = store.particles();
        for &(i, j) in table.pairs().pairs() {
            let (i, j) = (i as usize, j as usize);
            assert_eq!(table.get(i, j), law.force(&particles[i], &particles[j]));
            assert_eq!(table.get(j, i), -table.get(i, j));
        }
        assert_eq!(table.get(3, 3), Vec3::ZERO);
    }

    #[test]
    fn thread_count_does_not_change_the_result() {
        let law = ForceLaw::new(0.3, 1e-2);
        let store = store(40);

        let run = |threads| {
            let mut acc = SymmetricAccumulator::new(pool(threads), store.len(), law, 7);
            let mut forces = ForceTable::new(store.len());
            acc.accumulate(&store, &mut forces).unwrap();
            forces.as_slice().to_vec()
        };
        assert_eq!(run(1), run(6));
    }

    #[test]
    fn single_particle_feels_nothing() {
        let store = store(1);
        let mut acc = SymmetricAccumulator::new(pool(2), 1, ForceLaw::default(), 16);
        let mut forces = ForceTable::new(1);
        acc.accumulate(&store, &mut forces).unwrap();
        assert_eq!(forces.get(0), Vec3::ZERO);
    }

    #[test]
    fn mismatched_store_is_rejected() {
        let mut acc = SymmetricAccumulator::new(pool(1), 4, ForceLaw::default(), 16);
        let store = store(5);
        let mut forces = ForceTable::new(5);
        assert!(matches!(
            acc.accumulate(&store, &mut forces),
            Err(SimulationError::Config(_))
        ));
    }
}
