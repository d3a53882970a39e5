//! Explicit randomness threaded through every evaluation.
//!
//! No global random state is read. A caller hands a [`PrngKey`] to an update,
//! the update expands it into a [`PrngSequence`] and draws one fresh key per
//! function-approximator evaluation. Identical keys give identical results.
use rand::{rngs::SmallRng, RngCore, SeedableRng};
use rand_xoshiro::SplitMix64;
use serde::{Deserialize, Serialize};

/// A seed for one random draw site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct PrngKey(pub u64);

impl PrngKey {
    /// Returns a random number generator seeded with this key.
    pub fn rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(self.0)
    }

    /// Splits the key into `n` independent keys.
    pub fn split(&self, n: usize) -> Vec<PrngKey> {
        PrngSequence::new(*self).take(n).collect()
    }
}

/// Deterministic stream of keys derived from a parent key.
pub struct PrngSequence {
    gen: SplitMix64,
}

impl PrngSequence {
    /// Creates a sequence from a parent key.
    pub fn new(key: PrngKey) -> Self {
        Self {
            gen: SplitMix64::seed_from_u64(key.0),
        }
    }

    /// Returns the next key.
    pub fn next_key(&mut self) -> PrngKey {
        PrngKey(self.gen.next_u64())
    }
}

impl Iterator for PrngSequence {
    type Item = PrngKey;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_key())
    }
}
