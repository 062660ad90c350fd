//! Deterministic randomness for the market simulator.
//!
//! A master seed generates deterministic sub-seeds for each `(symbol, model)`
//! pair. Sub-seeds are derived via BLAKE3 hashing, so a comparison across many
//! runs draws the same market noise regardless of the order the runs execute in.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Source of Gaussian draws used to perturb the synthetic market price.
///
/// Injected into the simulator so tests can substitute a fixed sequence.
pub trait GaussianSource {
    fn next_gaussian(&mut self, mean: f64, std: f64) -> f64;
}

/// `StdRng` + `rand_distr::Normal`, seeded from a `u64`.
#[derive(Debug, Clone)]
pub struct SeededGaussian {
    rng: StdRng,
}

impl SeededGaussian {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl GaussianSource for SeededGaussian {
    fn next_gaussian(&mut self, mean: f64, std: f64) -> f64 {
        // Normal::new only fails on a negative or non-finite std.
        match Normal::new(mean, std) {
            Ok(dist) if std > 0.0 => dist.sample(&mut self.rng),
            _ => mean,
        }
    }
}

/// Replays a fixed list of standard-normal draws `z`, cycling when exhausted,
/// and returns `mean + z * std`.
#[derive(Debug, Clone)]
pub struct FixedGaussian {
    draws: Vec<f64>,
    cursor: usize,
}

impl FixedGaussian {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, cursor: 0 }
    }

    /// Always returns `mean`.
    pub fn zero() -> Self {
        Self::new(Vec::new())
    }
}

impl GaussianSource for FixedGaussian {
    fn next_gaussian(&mut self, mean: f64, std: f64) -> f64 {
        if self.draws.is_empty() {
            return mean;
        }
        let z = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        mean + z * std
    }
}

/// Deterministic RNG hierarchy.
///
/// The master seed is expanded into per-(symbol, model) sub-seeds using
/// BLAKE3. Because derivation is hash-based (not order-dependent), the same
/// master seed produces identical sub-seeds regardless of the order in which
/// runs are processed.
#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (symbol, model).
    pub fn sub_seed(&self, symbol: &str, model: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        // Separator so ("ab", "c") and ("a", "bc") differ.
        hasher.update(&[0u8]);
        hasher.update(model.as_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    /// Gaussian source seeded for one (symbol, model) run.
    pub fn gaussian_for(&self, symbol: &str, model: &str) -> SeededGaussian {
        SeededGaussian::new(self.sub_seed(symbol, model))
    }
}
