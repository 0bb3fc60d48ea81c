// src/data_loader/options.rs
//
// Configuration surface for the loader. Builder helpers are provided so
// callers can write a fluent style:
//
// let opts = LoaderOptions::default()
//     .with_batch_size(128)
//     .drop_last(true)
//     .shuffle(true, 42)
//     .num_workers(8)
//     .prefetch(4)
//     .with_timeout(Duration::from_secs(30));

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::constants::{AUTO_WORKER_COUNT, DEFAULT_BATCH_SIZE, DEFAULT_PREFETCH_DEPTH};

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Number of samples per batch.
    pub batch_size: usize,
    /// Whether to drop the final, possibly incomplete batch.
    pub drop_last: bool,
    /// If true, visit indices in a shuffled order (deterministic with `seed`).
    pub shuffle: bool,
    /// Base RNG seed used when `shuffle == true`; the per-epoch seed is
    /// derived from it. Ignored otherwise.
    pub seed: u64,
    /// Number of parallel workers. `0` means synchronous, in-stream
    /// execution with no worker tasks.
    pub num_workers: usize,
    /// Max number of in-flight batches buffered ahead of the consumer.
    pub prefetch: usize,
    /// Restrict sampling to an explicit row-index subset.
    pub subset: Option<Arc<Vec<usize>>>,
    /// Per-item fetch bound; a stalled fetch fails its batch with a
    /// timeout error. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Cooperative stop flag checked between items and between batches.
    pub cancellation_token: Option<CancellationToken>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            drop_last: false,
            shuffle: false,
            seed: 0,
            num_workers: 0,
            prefetch: DEFAULT_PREFETCH_DEPTH,
            subset: None,
            timeout: None,
            cancellation_token: None,
        }
    }
}

impl LoaderOptions {
    /// Builder-style helper: change the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Builder-style helper: set `drop_last`.
    pub fn drop_last(mut self, yes: bool) -> Self {
        self.drop_last = yes;
        self
    }

    /// Enable/disable shuffling and set the base seed.
    ///
    /// When `on` is false, the seed is left unchanged but ignored.
    pub fn shuffle(mut self, on: bool, seed: u64) -> Self {
        self.shuffle = on;
        if on {
            self.seed = seed;
        }
        self
    }

    /// Set the number of worker tasks used for fetching/decoding.
    ///
    /// `0` runs the whole epoch synchronously on the consumer's task.
    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    /// Use one worker per visible CPU.
    pub fn num_workers_auto(mut self) -> Self {
        self.num_workers = *AUTO_WORKER_COUNT;
        self
    }

    /// Set the number of batches allowed in flight ahead of the consumer.
    pub fn prefetch(mut self, depth: usize) -> Self {
        self.prefetch = depth;
        self
    }

    /// Restrict sampling to an explicit row-index subset.
    pub fn with_subset(mut self, indices: Vec<usize>) -> Self {
        self.subset = Some(Arc::new(indices));
        self
    }

    /// Bound each item fetch; a stall surfaces as a failed batch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cooperative cancellation token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Explicitly run without a cancellation token.
    pub fn without_cancellation(mut self) -> Self {
        self.cancellation_token = None;
        self
    }
}
