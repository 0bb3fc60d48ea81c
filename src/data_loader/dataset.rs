//! Core dataset abstractions for fsdlio's data-loader layer.
//!
//! A [`Dataset`] is the minimum surface the loader needs: a length and an
//! index-addressed fetch. Per-item I/O and decoding are deferred until
//! `get` is called, so a dataset over a million-item corpus costs nothing
//! to construct.

use std::pin::Pin;
use std::time::Duration;

use anyhow::Error as AnyError;
use async_trait::async_trait;
use futures_core::stream::Stream;
use ndarray::{Array1, ArrayD};
use thiserror::Error;

/// Fixed-shape numeric item produced by the transform pipeline.
pub type Tensor = ArrayD<f32>;

/// One realized dataset item: the transformed tensor plus its label.
#[derive(Debug, Clone)]
pub struct Sample {
    pub tensor: Tensor,
    pub label: i64,
}

/// A fully realized batch: item tensors stacked along a new leading axis
/// and the parallel label vector, in submission order.
#[derive(Debug, Clone)]
pub struct LoadedBatch {
    /// Sequence number assigned by the batch planner for this epoch.
    pub seq: u64,
    /// Shape `(batch, *item_shape)`.
    pub data: Tensor,
    pub labels: Array1<i64>,
}

impl LoadedBatch {
    /// Number of items in the batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Item-level error type for dataset & loader operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("invalid loader configuration: {0}")]
    Config(String),

    #[error("index out of range: {0}")]
    IndexOutOfRange(usize),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("shape mismatch in batch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("item fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Backend(#[from] AnyError),
}

impl From<String> for DatasetError {
    fn from(s: String) -> Self {
        DatasetError::Backend(AnyError::msg(s))
    }
}

impl From<&str> for DatasetError {
    fn from(s: &str) -> Self {
        DatasetError::Backend(AnyError::msg(s.to_string()))
    }
}

/// A whole-batch failure, surfaced to the consumer at exactly the failed
/// batch's turn in the delivery order.
#[derive(Error, Debug)]
#[error("batch {seq} failed to load: {source}")]
pub struct BatchLoadError {
    /// Sequence number of the batch that failed.
    pub seq: u64,
    #[source]
    pub source: DatasetError,
}

/// A boxed, pinned, sendable stream of per-epoch batch results.
pub type DynBatchStream =
    Pin<Box<dyn Stream<Item = Result<LoadedBatch, BatchLoadError>> + Send + 'static>>;

/// A logical collection of samples addressed by a dense row index.
///
/// Implementors own whatever backing references they need (manifest, root
/// directory, remote handle) but hold no per-item state: repeated `get`
/// calls with the same index re-fetch from the backing store, which keeps
/// memory bounded for large corpora.
#[async_trait]
pub trait Dataset: Send + Sync + 'static {
    /// Concrete Rust type produced for each item.
    type Item: Send + 'static;

    /// Total number of items if known a priori; otherwise `None`.
    fn len(&self) -> Option<usize>;

    /// Retrieve an item by zero-based index.
    async fn get(&self, index: usize) -> Result<Self::Item, DatasetError>;

    /// Convenience helper.
    fn is_empty(&self) -> bool {
        self.len().map(|n| n == 0).unwrap_or(false)
    }
}
