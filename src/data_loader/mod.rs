// src/data_loader/mod.rs

//! Public API surface for the fsdlio data_loader layer.

pub mod batch;
pub mod collate;
pub mod dataloader;
pub mod dataset;
pub mod fs_dataset;
pub mod options;
pub mod pool_loader;
pub mod sampler;
pub mod transform;

// Re-export the key types at this level:
pub use batch::{BatchPlanner, IndexBatch};
pub use collate::collate;
pub use dataloader::DataLoader;
pub use dataset::{
    BatchLoadError, Dataset, DatasetError, DynBatchStream, LoadedBatch, Sample, Tensor,
};
pub use fs_dataset::FileManifestDataset;
pub use options::LoaderOptions;
pub use pool_loader::PoolLoader;
pub use sampler::{Sampler, SequentialSampler, ShuffleSampler, SubsetSampler};
pub use transform::{
    FixedLength, FnTransform, ItemDecoder, Normalize, RawU8Decoder, Transform, TransformPipeline,
};
