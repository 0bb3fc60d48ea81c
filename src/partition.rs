// src/partition.rs
//
// Deterministic dataset partitioning: one seeded pseudo-random mask over the
// manifest decides which rows land on the training side, the complement is
// the test side, and an optional fixed-size validation slice is carved from
// the front of the compacted training subset.
//
//! Identical `(table, fraction, seed)` inputs always produce identical
//! subsets, which is what makes a training run reproducible across hosts.
//! The carve for validation is a contiguous range split of the compacted
//! kept rows, so it is disjoint from the remaining training rows by
//! construction.

use log::info;
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use thiserror::Error;

use crate::manifest::LabelTable;

#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("held-out fraction must lie in (0, 1), got {0}")]
    HeldOutFraction(f64),

    #[error("validation size {requested} exceeds kept subset size {available}")]
    ValidationTooLarge { requested: usize, available: usize },
}

/// Named, disjoint row-index subsets of one manifest.
///
/// Indices refer to rows of the table the planner was run against.
/// `train` and `validation` together are exactly the rows the mask kept;
/// `test` is the complement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// Compacted per-subset manifests ready to be written back out.
#[derive(Debug, Clone)]
pub struct SubsetTables {
    pub train: LabelTable,
    pub validation: Option<LabelTable>,
    pub test: LabelTable,
}

/// Splits a [`LabelTable`] into train/validation/test index sets from a
/// fixed seed.
#[derive(Debug, Clone)]
pub struct PartitionPlanner {
    held_out_fraction: f64,
    seed: u64,
    validation_size: usize,
}

impl PartitionPlanner {
    /// Create a planner keeping roughly `held_out_fraction` of rows on the
    /// training side. Fails if the fraction is not strictly inside `(0, 1)`.
    pub fn new(held_out_fraction: f64, seed: u64) -> Result<Self, PartitionError> {
        if !(held_out_fraction > 0.0 && held_out_fraction < 1.0) {
            return Err(PartitionError::HeldOutFraction(held_out_fraction));
        }
        Ok(Self {
            held_out_fraction,
            seed,
            validation_size: 0,
        })
    }

    /// Carve a fixed-size validation slice from the front of the kept subset.
    pub fn with_validation_size(mut self, rows: usize) -> Self {
        self.validation_size = rows;
        self
    }

    /// Compute the subset index sets for `table`.
    pub fn split(&self, table: &LabelTable) -> Result<PartitionSpec, PartitionError> {
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);

        let mut kept = Vec::new();
        let mut test = Vec::new();
        for row in 0..table.len() {
            if uniform_f64(&mut rng) < self.held_out_fraction {
                kept.push(row);
            } else {
                test.push(row);
            }
        }

        if self.validation_size > kept.len() {
            return Err(PartitionError::ValidationTooLarge {
                requested: self.validation_size,
                available: kept.len(),
            });
        }

        // The validation slice is the first `validation_size` rows of the
        // kept subset in compacted order. That keeps it disjoint from the
        // remaining training rows, at the cost of being correlated with the
        // source table's row order.
        let train = kept.split_off(self.validation_size);
        let validation = kept;

        if !validation.is_empty() {
            info!(
                "validation carve: first {} of {} kept rows",
                validation.len(),
                validation.len() + train.len()
            );
        }
        info!(
            "partitioned {} rows: train={} validation={} test={} (fraction={}, seed={})",
            table.len(),
            train.len(),
            validation.len(),
            test.len(),
            self.held_out_fraction,
            self.seed
        );

        Ok(PartitionSpec { train, validation, test })
    }

    /// Compute the split and materialize compacted per-subset tables.
    pub fn split_tables(&self, table: &LabelTable) -> Result<SubsetTables, PartitionError> {
        let spec = self.split(table)?;
        let validation = if spec.validation.is_empty() {
            None
        } else {
            Some(table.select(&spec.validation))
        };
        Ok(SubsetTables {
            train: table.select(&spec.train),
            validation,
            test: table.select(&spec.test),
        })
    }
}

/// Uniform draw in `[0, 1)` from the top 53 bits of one `u64`.
fn uniform_f64(rng: &mut ChaCha20Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
