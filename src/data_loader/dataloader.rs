//! User-facing `DataLoader`: wires a sampler, the batch planner and the
//! prefetching pool into one restartable per-epoch stream.
//!
//! ```ignore
//! # use fsdlio::{DataLoader, LoaderOptions};
//! # async fn demo<D: fsdlio::Dataset<Item = fsdlio::Sample>>(ds: D) -> anyhow::Result<()> {
//! let loader = DataLoader::new(ds, LoaderOptions::default().with_batch_size(64))?;
//! for epoch in 0..3 {
//!     let mut batches = loader.epoch_stream(epoch);
//!     while let Some(batch) = batches.next().await {
//!         let batch = batch?; // LoadedBatch
//!         // training step ...
//!     }
//! }
//! # Ok(()) }
//! ```

use std::sync::Arc;

use crate::data_loader::batch::BatchPlanner;
use crate::data_loader::dataset::{Dataset, DatasetError, DynBatchStream, Sample};
use crate::data_loader::options::LoaderOptions;
use crate::data_loader::pool_loader::PoolLoader;
use crate::data_loader::sampler::{
    Sampler, SequentialSampler, ShuffleSampler, SubsetSampler,
};

/// High-level loader producing order-preserving batch streams from a
/// map-style dataset.
pub struct DataLoader<D>
where
    D: Dataset<Item = Sample>,
{
    dataset: Arc<D>,
    opts: LoaderOptions,
    planner: BatchPlanner,
}

impl<D> DataLoader<D>
where
    D: Dataset<Item = Sample>,
{
    /// Create a new loader. All configuration errors surface here, before
    /// any I/O happens.
    pub fn new(dataset: D, opts: LoaderOptions) -> Result<Self, DatasetError> {
        let planner = BatchPlanner::new(opts.batch_size, opts.drop_last)?;
        if opts.num_workers > 0 && opts.prefetch == 0 {
            return Err(DatasetError::Config(
                "prefetch depth must be at least 1 when workers are enabled".to_string(),
            ));
        }
        let dataset = Arc::new(dataset);
        if let (Some(subset), Some(len)) = (&opts.subset, dataset.len()) {
            if let Some(&bad) = subset.iter().find(|&&i| i >= len) {
                return Err(DatasetError::Config(format!(
                    "subset index {bad} out of range for dataset of length {len}"
                )));
            }
        }
        Ok(Self { dataset, opts, planner })
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.opts
    }

    /// Stream one epoch's batches, in submission order.
    ///
    /// Each call restarts the traversal; when shuffling, the permutation
    /// is redrawn per epoch from `seed + epoch`, so the same `(seed,
    /// epoch)` pair always replays the same order.
    pub fn epoch_stream(&self, epoch: u64) -> DynBatchStream {
        let sampler = self.make_sampler(epoch);
        let batches = self.planner.plan(sampler);
        PoolLoader::new(Arc::clone(&self.dataset), self.opts.clone()).stream_batches(batches)
    }

    /// Convenience for single-epoch consumption.
    pub fn stream(&self) -> DynBatchStream {
        self.epoch_stream(0)
    }

    fn make_sampler(&self, epoch: u64) -> Box<dyn Sampler + Send> {
        let len = self.dataset.len().unwrap_or(0);
        let epoch_seed = self.opts.seed.wrapping_add(epoch);
        match (&self.opts.subset, self.opts.shuffle) {
            (Some(subset), true) => Box::new(ShuffleSampler::over((**subset).clone(), epoch_seed)),
            (Some(subset), false) => Box::new(SubsetSampler::new((**subset).clone())),
            (None, true) => Box::new(ShuffleSampler::new(len, epoch_seed)),
            (None, false) => Box::new(SequentialSampler::new(len)),
        }
    }
}

impl<D> std::fmt::Debug for DataLoader<D>
where
    D: Dataset<Item = Sample>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLoader")
            .field("batch_size", &self.opts.batch_size)
            .field("num_workers", &self.opts.num_workers)
            .field("shuffle", &self.opts.shuffle)
            .finish()
    }
}
