// src/data_loader/transform.rs
//
// Transform pipeline: an ordered list of pure, stateless stages that turn a
// raw item payload into a fixed-shape tensor. The loader treats every stage
// as opaque; stages are bound to a dataset at construction and shared
// read-only across all workers.

use std::sync::Arc;

use bytes::Bytes;
use ndarray::{Array, ArrayD};

use crate::data_loader::dataset::{DatasetError, Tensor};

/// First stage of every pipeline: raw bytes to an in-memory tensor.
pub trait ItemDecoder: Send + Sync + 'static {
    fn decode(&self, raw: Bytes) -> Result<Tensor, DatasetError>;
}

/// A pure tensor-to-tensor stage.
pub trait Transform: Send + Sync + 'static {
    fn apply(&self, tensor: Tensor) -> Result<Tensor, DatasetError>;
}

/// Decoder + ordered transform stages, applied left to right.
#[derive(Clone)]
pub struct TransformPipeline {
    decoder: Arc<dyn ItemDecoder>,
    stages: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new(decoder: Arc<dyn ItemDecoder>) -> Self {
        Self { decoder, stages: Vec::new() }
    }

    /// Append a stage to the end of the pipeline.
    pub fn then(mut self, stage: Arc<dyn Transform>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Run the full pipeline on one raw item.
    pub fn run(&self, raw: Bytes) -> Result<Tensor, DatasetError> {
        let mut tensor = self.decoder.decode(raw)?;
        for stage in &self.stages {
            tensor = stage.apply(tensor)?;
        }
        Ok(tensor)
    }
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

/// Interprets the payload as raw `u8` values, one tensor element per byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawU8Decoder;

impl ItemDecoder for RawU8Decoder {
    fn decode(&self, raw: Bytes) -> Result<Tensor, DatasetError> {
        if raw.is_empty() {
            return Err(DatasetError::Decode("empty item payload".to_string()));
        }
        let values: Vec<f32> = raw.iter().map(|&b| b as f32).collect();
        Ok(Array::from_vec(values).into_dyn())
    }
}

/// Truncates or zero-pads a 1-D tensor to a fixed length, so items of
/// uneven size can be stacked into one batch tensor.
#[derive(Debug, Clone, Copy)]
pub struct FixedLength {
    pub len: usize,
}

impl Transform for FixedLength {
    fn apply(&self, tensor: Tensor) -> Result<Tensor, DatasetError> {
        let mut values = tensor.into_raw_vec();
        values.resize(self.len, 0.0);
        Ok(Array::from_vec(values).into_dyn())
    }
}

/// Elementwise affine map `x * scale + shift`.
#[derive(Debug, Clone, Copy)]
pub struct Normalize {
    pub scale: f32,
    pub shift: f32,
}

impl Transform for Normalize {
    fn apply(&self, tensor: Tensor) -> Result<Tensor, DatasetError> {
        Ok(tensor.mapv(|x| x * self.scale + self.shift))
    }
}

/// Adapter so plain closures can act as pipeline stages.
pub struct FnTransform<F>(pub F);

impl<F> Transform for FnTransform<F>
where
    F: Fn(ArrayD<f32>) -> Result<ArrayD<f32>, DatasetError> + Send + Sync + 'static,
{
    fn apply(&self, tensor: Tensor) -> Result<Tensor, DatasetError> {
        (self.0)(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_applies_stages_in_order() {
        let pipeline = TransformPipeline::new(Arc::new(RawU8Decoder))
            .then(Arc::new(FixedLength { len: 4 }))
            .then(Arc::new(Normalize { scale: 2.0, shift: 1.0 }));

        let out = pipeline.run(Bytes::from_static(&[1, 2])).unwrap();
        assert_eq!(out.shape(), &[4]);
        assert_eq!(out.as_slice().unwrap(), &[3.0, 5.0, 1.0, 1.0]);
    }

    #[test]
    fn empty_payload_is_a_decode_error() {
        let pipeline = TransformPipeline::new(Arc::new(RawU8Decoder));
        let err = pipeline.run(Bytes::new()).unwrap_err();
        assert!(matches!(err, DatasetError::Decode(_)));
    }

    #[test]
    fn fn_transform_wraps_closures() {
        let pipeline = TransformPipeline::new(Arc::new(RawU8Decoder))
            .then(Arc::new(FnTransform(|t: ArrayD<f32>| Ok(t.mapv(|x| -x)))));
        let out = pipeline.run(Bytes::from_static(&[3])).unwrap();
        assert_eq!(out.as_slice().unwrap(), &[-3.0]);
    }
}
