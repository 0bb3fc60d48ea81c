// src/data_loader/collate.rs
//
// Collation: merge one batch's item results into a single stacked tensor
// pair, preserving input order.

use ndarray::{Array1, Axis, stack};

use crate::data_loader::dataset::{DatasetError, LoadedBatch, Sample};

/// Stack a batch of samples along a new leading axis.
///
/// Item order is preserved: row `i` of the output corresponds to
/// `samples[i]`. All item tensors must share an identical shape.
pub fn collate(seq: u64, samples: Vec<Sample>) -> Result<LoadedBatch, DatasetError> {
    let first_shape: Vec<usize> = match samples.first() {
        Some(s) => s.tensor.shape().to_vec(),
        None => {
            return Err(DatasetError::Config(
                "cannot collate an empty batch".to_string(),
            ));
        }
    };

    for sample in &samples {
        if sample.tensor.shape() != first_shape.as_slice() {
            return Err(DatasetError::ShapeMismatch {
                expected: first_shape,
                got: sample.tensor.shape().to_vec(),
            });
        }
    }

    let views: Vec<_> = samples.iter().map(|s| s.tensor.view()).collect();
    let data = stack(Axis(0), &views).map_err(|e| {
        DatasetError::Decode(format!("stacking batch {seq}: {e}"))
    })?;
    let labels = Array1::from_iter(samples.iter().map(|s| s.label));

    Ok(LoadedBatch { seq, data, labels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, arr1};

    fn sample(values: &[f32], label: i64) -> Sample {
        Sample {
            tensor: Array::from_vec(values.to_vec()).into_dyn(),
            label,
        }
    }

    #[test]
    fn stacks_in_order() {
        let batch = collate(3, vec![sample(&[1.0, 2.0], 0), sample(&[3.0, 4.0], 2)]).unwrap();
        assert_eq!(batch.seq, 3);
        assert_eq!(batch.data.shape(), &[2, 2]);
        assert_eq!(batch.data.as_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(batch.labels, arr1(&[0, 2]));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let err = collate(0, vec![sample(&[1.0], 0), sample(&[1.0, 2.0], 1)]).unwrap_err();
        match err {
            DatasetError::ShapeMismatch { expected, got } => {
                assert_eq!(expected, vec![1]);
                assert_eq!(got, vec![2]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(collate(0, vec![]), Err(DatasetError::Config(_))));
    }
}
