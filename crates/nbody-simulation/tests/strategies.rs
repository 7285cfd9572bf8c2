use glam::Vec3;
use nbody_physics::{Distribution, ForceLaw, ParticleStore};
use nbody_simulation::{
    build_pool, AnyAccumulator, ForceAccumulator, ForceTable, GpuContext, GpuForceReducer,
    NaiveAccumulator, SymmetricAccumulator,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cloud(count: usize, seed: u64) -> ParticleStore {
    let particles = Distribution::Sphere {
        count,
        radius: 10.0,
        mass_min: 0.5,
        mass_max: 5.0,
        seed,
    }
    .generate(1.0);
    ParticleStore::new(particles).unwrap()
}

fn forces_with(acc: &mut impl ForceAccumulator, store: &ParticleStore) -> Vec<Vec3> {
    let mut forces = ForceTable::new(store.len());
    acc.accumulate(store, &mut forces).unwrap();
    forces.as_slice().to_vec()
}

/// Largest per-particle deviation, relative to the largest net force
fn relative_error(a: &[Vec3], b: &[Vec3]) -> f32 {
    let scale = a.iter().map(|f| f.length()).fold(0.0f32, f32::max);
    let worst = a
        .iter()
        .zip(b)
        .map(|(x, y)| (*x - *y).length())
        .fold(0.0f32, f32::max);
    worst / scale
}

#[test]
fn cpu_strategies_agree() {
    let law = ForceLaw::new(1.0, 1e-2);
    let store = cloud(300, 7);
    let pool = build_pool(4).unwrap();

    let naive = forces_with(&mut NaiveAccumulator::new(pool.clone(), law), &store);
    let symmetric = forces_with(
        &mut SymmetricAccumulator::new(pool, store.len(), law, 97),
        &store,
    );

    let err = relative_error(&naive, &symmetric);
    assert!(err < 1e-4, "relative error {err}");
}

#[test]
fn gpu_agrees_with_cpu() {
    init_logger();
    let context = match GpuContext::new() {
        Ok(context) => context,
        Err(err) => {
            log::warn!("Skipping GPU comparison: {}", err);
            return;
        }
    };

    let law = ForceLaw::new(1.0, 1e-2);
    // not a multiple of the tile size, so the last tile is partial
    let store = cloud(301, 11);
    let pool = build_pool(2).unwrap();

    let naive = forces_with(&mut NaiveAccumulator::new(pool, law), &store);
    let mut gpu = GpuForceReducer::new(context, store.len(), law, 64).unwrap();
    let on_device = forces_with(&mut gpu, &store);

    let err = relative_error(&naive, &on_device);
    assert!(err < 1e-4, "relative error {err}");
}

#[test]
fn pair_table_mirrors_bit_exactly() {
    let law = ForceLaw::new(0.7, 1e-3);
    let store = cloud(64, 3);
    let mut acc = SymmetricAccumulator::new(build_pool(3).unwrap(), store.len(), law, 10);
    forces_with(&mut acc, &store);

    let table = acc.pair_table();
    for i in 0..store.len() {
        for j in 0..store.len() {
            let ij = table.get(i, j).to_array().map(f32::to_bits);
            let ji = (-table.get(j, i)).to_array().map(f32::to_bits);
            assert_eq!(ij, ji, "pair ({i}, {j})");
        }
    }
}

#[test]
fn enum_dispatch_matches_direct_call() {
    let law = ForceLaw::default();
    let store = cloud(40, 5);
    let pool = build_pool(2).unwrap();

    let direct = forces_with(&mut NaiveAccumulator::new(pool.clone(), law), &store);
    let mut any: AnyAccumulator = NaiveAccumulator::new(pool, law).into();
    assert_eq!(any.name(), "naive");
    assert_eq!(forces_with(&mut any, &store), direct);
}
