//! Deterministic utilities for reproducible training
//!
//! Every random draw in the trainer comes from an RNG seeded by an explicit
//! seed. Independent work units (trees, CV shuffles, the holdout split) get
//! their own stream derived from `(seed, stream)`, so results do not depend
//! on the order in which rayon schedules them.
//!
//! The generator is ChaCha8 rather than `StdRng`, whose algorithm may change
//! between rand releases. A saved model must stay reproducible from its seed.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Stream id for the train/test permutation
pub const SPLIT_STREAM: u64 = 0x5350_4c49_5400_0000;

/// Stream id for the cross-validation fold permutation
pub const FOLD_STREAM: u64 = 0x464f_4c44_0000_0000;

/// Mix a base seed and a stream id into an independent seed
///
/// xxhash64-style avalanche over two words.
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    const PRIME1: u64 = 0x9E37_79B1_85EB_CA87;
    const PRIME2: u64 = 0xC2B2_AE3D_27D4_EB4F;
    const PRIME3: u64 = 0x1656_67B1_9E37_79F9;
    const PRIME5: u64 = 0x85EB_CA77_C2B2_AE63;

    let mut h = seed.wrapping_add(PRIME5);
    for word in [seed, stream] {
        h = h.wrapping_add(word.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;
    h
}

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Seeded permutation of `0..n`
pub fn permutation(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut seeded_rng(seed));
    indices
}

/// `n` draws with replacement from `0..n`
pub fn bootstrap_indices(n: usize, seed: u64) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let mut rng = seeded_rng(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}
