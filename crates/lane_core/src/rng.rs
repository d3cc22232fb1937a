//! Seeded random streams.
//!
//! Every consumer of randomness (spawn jitter, each deck, the AI) owns its
//! own PCG stream derived from the match seed and a label, so adding a draw
//! in one place never shifts the sequence seen by another.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::math::Fixed;

/// Generator used throughout the simulation.
pub type MatchRng = Pcg64Mcg;

/// Derive a sub-seed from a base seed and a label.
#[must_use]
pub fn derive_seed(base: u64, label: &str) -> u64 {
    // FNV-1a over the label, folded into the base with a splitmix finaliser.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in label.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let mut z = base ^ hash;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Generator for the stream named `label`.
#[must_use]
pub fn stream(base: u64, label: &str) -> MatchRng {
    Pcg64Mcg::seed_from_u64(derive_seed(base, label))
}

/// Uniform value in `[0, 1)`.
pub fn unit<R: Rng>(rng: &mut R) -> Fixed {
    Fixed::from_bits(rng.gen_range(0..Fixed::ONE.to_bits()))
}

/// Uniform value in `[-magnitude, magnitude)`.
pub fn symmetric<R: Rng>(rng: &mut R, magnitude: Fixed) -> Fixed {
    if magnitude <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    (unit(rng) * Fixed::from_num(2) - Fixed::ONE) * magnitude
}

/// Uniform value in `[low, high)`.
pub fn between<R: Rng>(rng: &mut R, low: Fixed, high: Fixed) -> Fixed {
    low + unit(rng) * (high - low)
}
