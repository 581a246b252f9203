//! Pluggable randomness for the simulated chain state.
//!
//! Every probabilistic number in the app (prices, balances, tx outcomes,
//! fabricated hashes) is drawn through the [`Entropy`] trait so tests can
//! inject deterministic sequences instead of relying on `rand` directly.

use rand::{Rng, RngCore};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

/// Source of randomness for simulated values
pub trait Entropy: Send + Sync {
    /// Uniform draw in `[0, 1)`
    fn next_f64(&self) -> f64;

    /// Fill `buf` with random bytes (fabricated hashes, addresses)
    fn fill_bytes(&self, buf: &mut [u8]);

    /// Uniform draw in `[min, max)`
    fn range(&self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// True with probability `p`
    fn chance(&self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Thread-local RNG backed entropy, the production source
#[derive(Debug, Default)]
pub struct ThreadEntropy;

impl Entropy for ThreadEntropy {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn fill_bytes(&self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

/// Deterministic entropy for tests: `next_f64` pops a scripted queue
/// (0.5 once exhausted), `fill_bytes` emits an incrementing byte stream so
/// fabricated hashes are unique but reproducible.
#[derive(Debug, Default)]
pub struct ScriptedEntropy {
    values: Mutex<VecDeque<f64>>,
    byte_counter: AtomicU8,
}

impl ScriptedEntropy {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            byte_counter: AtomicU8::new(0),
        }
    }

    pub fn push(&self, value: f64) {
        self.values.lock().unwrap().push_back(value);
    }
}

impl Entropy for ScriptedEntropy {
    fn next_f64(&self) -> f64 {
        self.values.lock().unwrap().pop_front().unwrap_or(0.5)
    }

    fn fill_bytes(&self, buf: &mut [u8]) {
        let base = self.byte_counter.fetch_add(1, Ordering::Relaxed);
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = base.wrapping_add(i as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_entropy_in_unit_range() {
        let entropy = ThreadEntropy;
        for _ in 0..100 {
            let v = entropy.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_range_respects_bounds() {
        let entropy = ThreadEntropy;
        for _ in 0..100 {
            let v = entropy.range(1800.0, 2200.0);
            assert!((1800.0..2200.0).contains(&v));
        }
    }

    #[test]
    fn test_scripted_sequence_then_default() {
        let entropy = ScriptedEntropy::new([0.1, 0.9]);
        assert_eq!(entropy.next_f64(), 0.1);
        assert_eq!(entropy.next_f64(), 0.9);
        assert_eq!(entropy.next_f64(), 0.5);
    }

    #[test]
    fn test_scripted_chance() {
        let entropy = ScriptedEntropy::new([0.05, 0.95]);
        assert!(entropy.chance(0.9));
        assert!(!entropy.chance(0.9));
    }

    #[test]
    fn test_scripted_bytes_differ_per_call() {
        let entropy = ScriptedEntropy::default();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        entropy.fill_bytes(&mut a);
        entropy.fill_bytes(&mut b);
        assert_ne!(a, b);
    }
}
