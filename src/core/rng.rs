//! Deterministic random number generation.
//!
//! ## Key Features
//!
//! - **Abstract**: the engine only consumes [`RandomSource`], a stream of
//!   uniform doubles in `[0, 1)`.
//! - **Deterministic**: [`GameRng`] seeded from the same string produces
//!   the identical sequence.
//! - **Serializable**: O(1) state capture and restore via [`RngSnapshot`].
//!
//! ## Usage
//!
//! ```
//! use rust_rules::core::{GameRng, RandomSource};
//!
//! let mut rng = GameRng::new("campaign-7");
//! let first = rng.next_f64();
//! assert!((0.0..1.0).contains(&first));
//!
//! // Capture, draw, restore: the restored stream replays the same draws.
//! let snapshot = rng.snapshot();
//! let expected = rng.next_f64();
//! rng.restore(&snapshot);
//! assert_eq!(rng.next_f64(), expected);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::error::EvalError;

/// A source of uniform doubles in `[0, 1)` with a persistable seed.
pub trait RandomSource {
    /// Draw the next value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Capture the current position of the stream.
    fn snapshot(&self) -> RngSnapshot;

    /// Rewind or fast-forward the stream to a captured position.
    fn restore(&mut self, snapshot: &RngSnapshot);
}

/// Serializable RNG position for save/replay.
///
/// For [`GameRng`] the position is the ChaCha8 word position, which keeps
/// the snapshot O(1) regardless of how many values were drawn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngSnapshot {
    /// Seed string the stream was created from.
    pub seed: String,
    /// Position within the stream.
    pub position: u128,
}

/// Deterministic RNG seeded from a string.
///
/// Uses ChaCha8 for speed while keeping good statistical quality. The seed
/// string is folded into a `u64` with 64-bit FNV-1a, which does not depend
/// on the target's word size, so saves replay identically everywhere.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: String,
}

impl GameRng {
    /// Create a new RNG from a seed string.
    #[must_use]
    pub fn new(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        Self {
            inner: ChaCha8Rng::seed_from_u64(hash_seed(&seed)),
            seed,
        }
    }

    /// The seed string this stream was created from.
    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Restore from a saved snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &RngSnapshot) -> Self {
        let mut rng = Self::new(snapshot.seed.clone());
        rng.inner.set_word_pos(snapshot.position);
        rng
    }
}

impl RandomSource for GameRng {
    fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    fn snapshot(&self) -> RngSnapshot {
        RngSnapshot {
            seed: self.seed.clone(),
            position: self.inner.get_word_pos(),
        }
    }

    fn restore(&mut self, snapshot: &RngSnapshot) {
        *self = Self::from_snapshot(snapshot);
    }
}

fn hash_seed(seed: &str) -> u64 {
    seed.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Draw once from `rng` and validate the draw lies in `[0, 1)`.
pub fn draw(rng: &mut dyn RandomSource) -> Result<f64, EvalError> {
    let value = rng.next_f64();
    if (0.0..1.0).contains(&value) {
        Ok(value)
    } else {
        Err(EvalError::RandomOutOfRange(value))
    }
}

/// Probability gate: `p >= 1` passes without drawing, otherwise passes iff
/// a draw lands below `max(p, 0)`.
pub fn gate(rng: &mut dyn RandomSource, probability: f64) -> Result<bool, EvalError> {
    if probability >= 1.0 {
        return Ok(true);
    }
    Ok(draw(rng)? < probability.max(0.0))
}

/// Choose an index with weighted probability.
///
/// Weights must be finite and non-negative with a positive sum. The chosen
/// index is the smallest one whose cumulative interval contains
/// `draw * sum`. Zero-weight entries have empty intervals and are never
/// chosen.
pub fn weighted_sample(weights: &[f64], rng: &mut dyn RandomSource) -> Result<usize, EvalError> {
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(EvalError::InvalidWeights(format!(
            "weight {bad} is negative or not finite"
        )));
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(EvalError::InvalidWeights(format!(
            "weights must have a positive sum, got {total}"
        )));
    }

    let target = draw(rng)? * total;
    let mut cumulative = 0.0;
    for (index, &weight) in weights.iter().enumerate() {
        cumulative += weight;
        if target < cumulative {
            return Ok(index);
        }
    }

    // Floating point edge case - return the last non-zero weight
    Ok(weights
        .iter()
        .rposition(|w| *w > 0.0)
        .unwrap_or(weights.len() - 1))
}

/// A scripted source returning a fixed sequence, cycling when exhausted.
///
/// Useful for pinning random branches in tests and replays.
#[derive(Clone, Debug, Default)]
pub struct SequenceRng {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRng {
    /// Create a source that yields `values` in order, cycling.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            cursor: 0,
        }
    }
}

impl RandomSource for SequenceRng {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }

    fn snapshot(&self) -> RngSnapshot {
        RngSnapshot {
            seed: "sequence".to_string(),
            position: self.cursor as u128,
        }
    }

    fn restore(&mut self, snapshot: &RngSnapshot) {
        self.cursor = snapshot.position as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = GameRng::new("seed");
        let mut rng2 = GameRng::new("seed");

        for _ in 0..100 {
            assert_eq!(rng1.next_f64(), rng2.next_f64());
        }
    }

    #[test]
    fn test_different_seeds() {
        let mut rng1 = GameRng::new("one");
        let mut rng2 = GameRng::new("two");

        let seq1: Vec<_> = (0..10).map(|_| rng1.next_f64()).collect();
        let seq2: Vec<_> = (0..10).map(|_| rng2.next_f64()).collect();

        assert_ne!(seq1, seq2);
    }

    #[test]
    fn test_seed_hash_is_word_size_independent() {
        // Reference FNV-1a 64 vectors
        assert_eq!(hash_seed(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(hash_seed("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(hash_seed("foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_unit_interval() {
        let mut rng = GameRng::new("range");
        for _ in 0..1000 {
            let value = rng.next_f64();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_snapshot_restore() {
        let mut rng = GameRng::new("save");

        for _ in 0..100 {
            rng.next_f64();
        }

        let snapshot = rng.snapshot();
        let expected: Vec<_> = (0..10).map(|_| rng.next_f64()).collect();

        let mut restored = GameRng::from_snapshot(&snapshot);
        let actual: Vec<_> = (0..10).map(|_| restored.next_f64()).collect();

        assert_eq!(expected, actual);
        assert_eq!(restored.seed(), "save");
    }

    #[test]
    fn test_snapshot_serde() {
        let snapshot = RngSnapshot {
            seed: "abc".to_string(),
            position: 12345,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let deserialized: RngSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, deserialized);
    }

    #[test]
    fn test_weighted_sample_boundaries() {
        assert_eq!(weighted_sample(&[1.0, 1.0, 2.0], &mut SequenceRng::new([0.0])).unwrap(), 0);
        assert_eq!(weighted_sample(&[1.0, 1.0, 2.0], &mut SequenceRng::new([0.99])).unwrap(), 2);
        // 0.25 * 4 = 1.0 lies at the start of the second interval
        assert_eq!(weighted_sample(&[1.0, 1.0, 2.0], &mut SequenceRng::new([0.25])).unwrap(), 1);
    }

    #[test]
    fn test_weighted_sample_skips_zero_weights() {
        let weights = [0.0, 3.0, 0.0];
        for draw in [0.0, 0.5, 0.999] {
            assert_eq!(weighted_sample(&weights, &mut SequenceRng::new([draw])).unwrap(), 1);
        }
    }

    #[test]
    fn test_weighted_sample_rejects_bad_input() {
        assert!(matches!(
            weighted_sample(&[1.0, -1.0], &mut SequenceRng::new([0.1])),
            Err(EvalError::InvalidWeights(_))
        ));
        assert!(matches!(
            weighted_sample(&[0.0, 0.0], &mut SequenceRng::new([0.1])),
            Err(EvalError::InvalidWeights(_))
        ));
        assert!(matches!(
            weighted_sample(&[], &mut SequenceRng::new([0.1])),
            Err(EvalError::InvalidWeights(_))
        ));
        assert!(matches!(
            weighted_sample(&[1.0], &mut SequenceRng::new([1.0])),
            Err(EvalError::RandomOutOfRange(_))
        ));
        assert!(matches!(
            weighted_sample(&[1.0], &mut SequenceRng::new([-0.5])),
            Err(EvalError::RandomOutOfRange(_))
        ));
    }

    #[test]
    fn test_gate() {
        let mut rng = SequenceRng::new([0.5]);
        assert!(gate(&mut rng, 1.0).unwrap());
        // A certain gate never consumes a draw
        assert_eq!(rng.snapshot().position, 0);

        assert!(gate(&mut rng, 0.6).unwrap());
        assert!(!gate(&mut rng, 0.5).unwrap());
        assert!(!gate(&mut rng, -3.0).unwrap());
    }

    #[test]
    fn test_sequence_rng_cycles() {
        let mut rng = SequenceRng::new([0.1, 0.2]);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.next_f64(), 0.2);
        assert_eq!(rng.next_f64(), 0.1);
    }
}
