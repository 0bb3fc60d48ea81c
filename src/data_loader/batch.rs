// src/data_loader/batch.rs
//
// Batch planning: group a sampler's index sequence into fixed-size,
// sequence-numbered index batches.

use crate::data_loader::dataset::DatasetError;
use crate::data_loader::sampler::Sampler;

/// An ordered group of row indices plus its submission sequence number.
/// Sequence numbers increase monotonically over one epoch and drive the
/// loader's in-order delivery guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBatch {
    pub seq: u64,
    pub indices: Vec<usize>,
}

/// Groups index sequences into consecutive windows of `batch_size`.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlanner {
    batch_size: usize,
    drop_last: bool,
}

impl BatchPlanner {
    /// Fails with a `Config` error when `batch_size` is zero.
    pub fn new(batch_size: usize, drop_last: bool) -> Result<Self, DatasetError> {
        if batch_size == 0 {
            return Err(DatasetError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { batch_size, drop_last })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Lazily batch the sampler's sequence. The final, shorter window is
    /// emitted unless `drop_last` was set.
    pub fn plan<S: Sampler>(&self, sampler: S) -> BatchIter<S> {
        BatchIter {
            sampler,
            batch_size: self.batch_size,
            drop_last: self.drop_last,
            next_seq: 0,
            done: false,
        }
    }
}

/// Iterator adapter produced by [`BatchPlanner::plan`].
#[derive(Debug)]
pub struct BatchIter<S: Sampler> {
    sampler: S,
    batch_size: usize,
    drop_last: bool,
    next_seq: u64,
    done: bool,
}

impl<S: Sampler> Iterator for BatchIter<S> {
    type Item = IndexBatch;

    fn next(&mut self) -> Option<IndexBatch> {
        if self.done {
            return None;
        }
        let mut indices = Vec::with_capacity(self.batch_size);
        while indices.len() < self.batch_size {
            match self.sampler.next_index() {
                Some(i) => indices.push(i),
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if indices.is_empty() || (indices.len() < self.batch_size && self.drop_last) {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        Some(IndexBatch { seq, indices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::sampler::SequentialSampler;

    #[test]
    fn short_final_batch_is_kept() {
        let planner = BatchPlanner::new(4, false).unwrap();
        let sizes: Vec<usize> = planner
            .plan(SequentialSampler::new(10))
            .map(|b| b.indices.len())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn short_final_batch_is_dropped() {
        let planner = BatchPlanner::new(4, true).unwrap();
        let sizes: Vec<usize> = planner
            .plan(SequentialSampler::new(10))
            .map(|b| b.indices.len())
            .collect();
        assert_eq!(sizes, vec![4, 4]);
    }

    #[test]
    fn sequence_numbers_increase_from_zero() {
        let planner = BatchPlanner::new(3, false).unwrap();
        let seqs: Vec<u64> = planner.plan(SequentialSampler::new(10)).map(|b| b.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn indices_are_windowed_in_order() {
        let planner = BatchPlanner::new(4, false).unwrap();
        let batches: Vec<IndexBatch> = planner.plan(SequentialSampler::new(6)).collect();
        assert_eq!(batches[0].indices, vec![0, 1, 2, 3]);
        assert_eq!(batches[1].indices, vec![4, 5]);
    }

    #[test]
    fn zero_batch_size_is_a_config_error() {
        assert!(matches!(
            BatchPlanner::new(0, false),
            Err(DatasetError::Config(_))
        ));
    }

    #[test]
    fn empty_sequence_yields_no_batches() {
        let planner = BatchPlanner::new(4, false).unwrap();
        assert_eq!(planner.plan(SequentialSampler::new(0)).count(), 0);
    }
}
