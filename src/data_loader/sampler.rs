//! src/data_loader/sampler.rs
//! Samplers produce the ordered sequence of row indices visited in one epoch.
//!
//! Three implementations are provided:
//!  * `SequentialSampler` – yields 0..end in order.
//!  * `SubsetSampler`     – yields an explicit index list in its given order.
//!  * `ShuffleSampler`    – yields a deterministic seeded permutation of
//!                          0..len, or of an explicit restriction set.
//!
//! A sampler covers exactly one epoch. Randomized epochs get a fresh
//! sampler each, seeded per epoch by the loader, so replays are exact and
//! no global mutable random state is involved.

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};

/// Trait for index producers.
pub trait Sampler: Send {
    /// Return the next index to visit, or `None` when the epoch is exhausted.
    fn next_index(&mut self) -> Option<usize>;
    /// Remaining items hint.
    fn remaining(&self) -> Option<usize> {
        None
    }
}

impl Sampler for Box<dyn Sampler + Send> {
    fn next_index(&mut self) -> Option<usize> {
        (**self).next_index()
    }

    fn remaining(&self) -> Option<usize> {
        (**self).remaining()
    }
}

/// Yields `0, 1, 2, …, end-1` once.
#[derive(Debug, Clone)]
pub struct SequentialSampler {
    curr: usize,
    end: usize,
}

impl SequentialSampler {
    /// Create a sequential sampler over `[0, end)`.
    pub fn new(end: usize) -> Self {
        Self { curr: 0, end }
    }
}

impl Sampler for SequentialSampler {
    fn next_index(&mut self) -> Option<usize> {
        if self.curr < self.end {
            let i = self.curr;
            self.curr += 1;
            Some(i)
        } else {
            None
        }
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.end.saturating_sub(self.curr))
    }
}

/// Yields an explicit index list in its given order.
#[derive(Debug, Clone)]
pub struct SubsetSampler {
    indices: Vec<usize>,
    pos: usize,
}

impl SubsetSampler {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices, pos: 0 }
    }
}

impl Sampler for SubsetSampler {
    fn next_index(&mut self) -> Option<usize> {
        if self.pos < self.indices.len() {
            let i = self.indices[self.pos];
            self.pos += 1;
            Some(i)
        } else {
            None
        }
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.indices.len().saturating_sub(self.pos))
    }
}

/// Yields a deterministic seeded permutation, either of `0..len` or of an
/// explicit restriction set.
#[derive(Debug, Clone)]
pub struct ShuffleSampler {
    indices: Vec<usize>,
    pos: usize,
}

impl ShuffleSampler {
    /// Shuffled permutation of `0..len` using `seed`.
    pub fn new(len: usize, seed: u64) -> Self {
        Self::over((0..len).collect(), seed)
    }

    /// Shuffled permutation of an explicit index set using `seed`.
    pub fn over(mut indices: Vec<usize>, seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        // Fisher–Yates over the restriction set.
        for i in (1..indices.len()).rev() {
            let j = (rng.next_u64() as usize) % (i + 1);
            indices.swap(i, j);
        }

        Self { indices, pos: 0 }
    }
}

impl Sampler for ShuffleSampler {
    fn next_index(&mut self) -> Option<usize> {
        if self.pos < self.indices.len() {
            let i = self.indices[self.pos];
            self.pos += 1;
            Some(i)
        } else {
            None
        }
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.indices.len().saturating_sub(self.pos))
    }
}
