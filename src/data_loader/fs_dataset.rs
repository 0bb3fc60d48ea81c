// src/data_loader/fs_dataset.rs
//
// Map-style dataset over a manifest plus a root directory: row index ->
// relative path -> file bytes -> transform pipeline -> Sample.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::data_loader::dataset::{Dataset, DatasetError, Sample};
use crate::data_loader::transform::TransformPipeline;
use crate::manifest::LabelTable;

/// Index-addressable dataset backed by a [`LabelTable`] and a filesystem
/// root. Constructed once per subset, usually with a subset-specific
/// transform pipeline; holds no per-item state.
#[derive(Clone)]
pub struct FileManifestDataset {
    table: Arc<LabelTable>,
    root: PathBuf,
    label_column: usize,
    pipeline: Arc<TransformPipeline>,
}

impl FileManifestDataset {
    /// Bind a manifest to a root directory, labeling items from the first
    /// label column.
    pub fn new(
        table: Arc<LabelTable>,
        root: impl Into<PathBuf>,
        pipeline: TransformPipeline,
    ) -> Self {
        Self {
            table,
            root: root.into(),
            label_column: 0,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Label items from a named column instead of the first one.
    pub fn with_label_column(mut self, name: &str) -> Result<Self, DatasetError> {
        let col = self
            .table
            .label_column(name)
            .ok_or_else(|| DatasetError::Config(format!("unknown label column '{name}'")))?;
        self.label_column = col;
        Ok(self)
    }

    pub fn table(&self) -> &LabelTable {
        &self.table
    }
}

#[async_trait]
impl Dataset for FileManifestDataset {
    type Item = Sample;

    fn len(&self) -> Option<usize> {
        Some(self.table.len())
    }

    async fn get(&self, index: usize) -> Result<Self::Item, DatasetError> {
        let record = self
            .table
            .record(index)
            .ok_or(DatasetError::IndexOutOfRange(index))?;

        let path = self.root.join(&record.path);
        let raw = match tokio::fs::read(&path).await {
            Ok(buf) => Bytes::from(buf),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DatasetError::ItemNotFound(path.display().to_string()));
            }
            Err(e) => {
                return Err(DatasetError::Backend(anyhow::Error::new(e).context(
                    format!("reading {}", path.display()),
                )));
            }
        };

        let tensor = self.pipeline.run(raw)?;
        let label = record
            .labels
            .get(self.label_column)
            .copied()
            .ok_or_else(|| {
                DatasetError::Config(format!(
                    "label column {} missing on row {}",
                    self.label_column, index
                ))
            })?;

        Ok(Sample { tensor, label })
    }
}

impl std::fmt::Debug for FileManifestDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileManifestDataset")
            .field("root", &self.root)
            .field("rows", &self.table.len())
            .field("label_column", &self.label_column)
            .finish()
    }
}
