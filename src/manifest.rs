// src/manifest.rs
//
// Label manifests: the flat table that maps a row index to a relative item
// path plus one or more integer label columns.
//
//! A `LabelTable` is the immutable input every other component consumes.
//! It is persisted as tab-separated text with a header line so subset
//! tables written by the partitioner can be re-read across runs:
//!
//! ```text
//! path<TAB>age<TAB>gender
//! imgs/018_0_a.jpg<TAB>0<TAB>0
//! imgs/020_1_b.jpg<TAB>2<TAB>1
//! ```
//!
//! Row indices are dense (`0..len`), labels are zero-based integers.
//! Building the table from directory-name conventions is a one-shot job
//! that happens upstream; this module only loads, validates, selects and
//! writes the finished table.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::constants::{MANIFEST_DELIMITER, MANIFEST_PATH_COLUMN};

/// Errors raised while reading, validating or writing a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("manifest line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("manifest is missing required column '{0}'")]
    MissingColumn(String),

    #[error("manifest line {line}: expected {expected} label fields, got {got}")]
    ColumnArity { line: usize, expected: usize, got: usize },

    #[error("manifest line {line}: negative label {value} (labels are zero-based)")]
    NegativeLabel { line: usize, value: i64 },
}

/// One manifest row: a relative item path plus its label values,
/// parallel to [`LabelTable::label_columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
    pub path: String,
    pub labels: Vec<i64>,
}

/// Immutable, dense-indexed table of labeled items.
#[derive(Debug, Clone)]
pub struct LabelTable {
    label_columns: Vec<String>,
    records: Vec<LabelRecord>,
}

impl LabelTable {
    /// Build a table from parts, validating the row invariants.
    pub fn new(
        label_columns: Vec<String>,
        records: Vec<LabelRecord>,
    ) -> Result<Self, ManifestError> {
        for (row, rec) in records.iter().enumerate() {
            if rec.labels.len() != label_columns.len() {
                return Err(ManifestError::ColumnArity {
                    line: row + 2, // 1-based, past the header
                    expected: label_columns.len(),
                    got: rec.labels.len(),
                });
            }
            if let Some(&bad) = rec.labels.iter().find(|&&v| v < 0) {
                return Err(ManifestError::NegativeLabel { line: row + 2, value: bad });
            }
        }
        Ok(Self { label_columns, records })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Label column names, in manifest order.
    pub fn label_columns(&self) -> &[String] {
        &self.label_columns
    }

    /// Row by index.
    pub fn record(&self, index: usize) -> Option<&LabelRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[LabelRecord] {
        &self.records
    }

    /// Resolve a label column name to its position.
    pub fn label_column(&self, name: &str) -> Option<usize> {
        self.label_columns.iter().position(|c| c == name)
    }

    /// Number of classes in a label column (`max + 1`); 0 for an empty table.
    pub fn num_classes(&self, column: usize) -> i64 {
        self.records
            .iter()
            .filter_map(|r| r.labels.get(column))
            .copied()
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
    }

    /// Materialize a compacted subset table: row `i` of the result is
    /// `indices[i]` of `self`. Indices outside the table are skipped.
    pub fn select(&self, indices: &[usize]) -> LabelTable {
        let records = indices
            .iter()
            .filter_map(|&i| self.records.get(i).cloned())
            .collect();
        LabelTable {
            label_columns: self.label_columns.clone(),
            records,
        }
    }

    /// Read a tab-separated manifest with a `path<TAB>label...` header.
    pub fn read_tsv<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_reader(file)?;
        debug!(
            "loaded manifest {} ({} rows, label columns: {:?})",
            path.as_ref().display(),
            table.len(),
            table.label_columns()
        );
        Ok(table)
    }

    /// Parse a manifest from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ManifestError> {
        let mut lines = BufReader::new(reader).lines();

        let header = match lines.next() {
            Some(h) => h?,
            None => {
                return Err(ManifestError::MissingColumn(MANIFEST_PATH_COLUMN.to_string()));
            }
        };
        let mut fields = header.split(MANIFEST_DELIMITER);
        match fields.next() {
            Some(first) if first == MANIFEST_PATH_COLUMN => {}
            _ => return Err(ManifestError::MissingColumn(MANIFEST_PATH_COLUMN.to_string())),
        }
        let label_columns: Vec<String> = fields.map(|s| s.to_string()).collect();
        if label_columns.is_empty() {
            return Err(ManifestError::MissingColumn("<label>".to_string()));
        }

        let mut records = Vec::new();
        for (lineno, line) in lines.enumerate() {
            let line = line?;
            let lineno = lineno + 2; // header was line 1
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(MANIFEST_DELIMITER);
            let path = fields
                .next()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ManifestError::Parse {
                    line: lineno,
                    msg: "empty path field".to_string(),
                })?
                .to_string();
            let labels = fields
                .map(|f| {
                    f.parse::<i64>().map_err(|e| ManifestError::Parse {
                        line: lineno,
                        msg: format!("bad label '{}': {}", f, e),
                    })
                })
                .collect::<Result<Vec<i64>, _>>()?;
            if labels.len() != label_columns.len() {
                return Err(ManifestError::ColumnArity {
                    line: lineno,
                    expected: label_columns.len(),
                    got: labels.len(),
                });
            }
            if let Some(&bad) = labels.iter().find(|&&v| v < 0) {
                return Err(ManifestError::NegativeLabel { line: lineno, value: bad });
            }
            records.push(LabelRecord { path, labels });
        }

        Ok(Self { label_columns, records })
    }

    /// Write the table back out in the same tab-separated format.
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<(), ManifestError> {
        let file = File::create(path.as_ref())?;
        self.to_writer(BufWriter::new(file))?;
        debug!("wrote manifest {} ({} rows)", path.as_ref().display(), self.len());
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), ManifestError> {
        write!(writer, "{}", MANIFEST_PATH_COLUMN)?;
        for col in &self.label_columns {
            write!(writer, "{}{}", MANIFEST_DELIMITER, col)?;
        }
        writeln!(writer)?;
        for rec in &self.records {
            write!(writer, "{}", rec.path)?;
            for label in &rec.labels {
                write!(writer, "{}{}", MANIFEST_DELIMITER, label)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}
