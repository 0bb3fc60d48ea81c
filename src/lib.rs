// src/lib.rs
//
// Crate root: public re-exports for the fsdlio loading engine.

pub mod constants;
pub mod data_loader;
pub mod manifest;
pub mod partition;

// ===== Re-exports expected at the crate root =====
// Types:
pub use crate::data_loader::batch::{BatchPlanner, IndexBatch};
pub use crate::data_loader::dataloader::DataLoader;
pub use crate::data_loader::dataset::{
    BatchLoadError, Dataset, DatasetError, DynBatchStream, LoadedBatch, Sample, Tensor,
};
pub use crate::data_loader::fs_dataset::FileManifestDataset;
pub use crate::data_loader::options::LoaderOptions;
pub use crate::data_loader::pool_loader::PoolLoader;
pub use crate::data_loader::sampler::{
    Sampler, SequentialSampler, ShuffleSampler, SubsetSampler,
};
pub use crate::data_loader::transform::{
    FixedLength, FnTransform, ItemDecoder, Normalize, RawU8Decoder, Transform,
    TransformPipeline,
};
// Module alias so tests can use `fsdlio::dataset::DynBatchStream`:
pub use crate::data_loader::dataset;

// Manifest / partition surface:
pub use crate::manifest::{LabelRecord, LabelTable, ManifestError};
pub use crate::partition::{PartitionError, PartitionPlanner, PartitionSpec, SubsetTables};
