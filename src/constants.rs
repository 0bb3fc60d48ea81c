// src/constants.rs
//
// Centralized constants for fsdlio to avoid hardcoded values throughout the codebase

use once_cell::sync::Lazy;

/// Default number of samples per batch
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Default number of in-flight batches buffered ahead of the consumer
pub const DEFAULT_PREFETCH_DEPTH: usize = 4;

/// Default fraction of rows kept on the training side of a split
pub const DEFAULT_HELD_OUT_FRACTION: f64 = 0.8;

/// Field delimiter used by manifest files
pub const MANIFEST_DELIMITER: char = '\t';

/// Column name every manifest must carry for the item path
pub const MANIFEST_PATH_COLUMN: &str = "path";

/// Worker count used by `LoaderOptions::num_workers_auto` and the CLI default.
/// Resolved once per process from the visible CPU count.
pub static AUTO_WORKER_COUNT: Lazy<usize> = Lazy::new(num_cpus::get);
