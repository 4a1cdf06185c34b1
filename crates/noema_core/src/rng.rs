//! Seedable randomness for reproducible runs.
//!
//! The same call sites work in replay mode (seeded) and in live mode
//! (ambient thread RNG) without branching.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// A source of uniform draws in [0, 1).
#[derive(Debug)]
pub enum RandomSource {
    /// Deterministic stream derived from a seed string.
    Seeded(Box<StdRng>),
    /// The platform's thread-local generator, used as-is.
    Ambient,
}

impl RandomSource {
    /// Next value in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        match self {
            RandomSource::Seeded(rng) => rng.gen::<f64>(),
            RandomSource::Ambient => rand::thread_rng().gen::<f64>(),
        }
    }

    /// Uniform index in `0..len`. Returns 0 for an empty range.
    pub fn pick_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self, RandomSource::Ambient)
    }
}

/// Build a random source. A seed gives an identical sequence on every run.
pub fn create_rng(seed: Option<&str>) -> RandomSource {
    match seed {
        Some(seed) => {
            let digest = Sha256::digest(seed.as_bytes());
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&digest);
            RandomSource::Seeded(Box::new(StdRng::from_seed(bytes)))
        }
        None => RandomSource::Ambient,
    }
}
