//! Vector indexes: the N×D embedding matrix, its metadata records, and the
//! object-storage layout they are persisted in.
//!
//! Each named index is two objects:
//! - `{name}/vectors.bin`: the matrix blob (see [`format`])
//! - `{name}/metadata.jsonl`: one JSON record per row, in row order

pub mod format;
pub mod metadata;
pub mod store;

pub use metadata::{IndexRecord, RecordId};
pub use store::VectorStore;

use crate::error::{Result, RetrievalError};

/// Dense row-major matrix of f32 embeddings
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatrix {
    dims: usize,
    data: Vec<f32>,
}

impl VectorMatrix {
    /// Matrix with no rows
    pub fn empty(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    /// Build from a flat buffer; a trailing partial row is dropped
    pub(crate) fn from_flat(dims: usize, mut data: Vec<f32>) -> Self {
        if dims == 0 {
            data.clear();
        } else {
            data.truncate(data.len() - data.len() % dims);
        }
        Self { dims, data }
    }

    /// Build from individual rows, rejecting ragged input
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dims = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dims);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dims {
                return Err(RetrievalError::invalid_input(format!(
                    "row {} has {} dimensions, expected {}",
                    i,
                    row.len(),
                    dims
                )));
            }
            data.extend(row);
        }

        Ok(Self { dims, data })
    }

    /// Number of rows (N)
    pub fn rows(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    /// Row width (D)
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a row by index
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dims)?;
        self.data.get(start..start + self.dims)
    }

    /// Iterate rows in order
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on zero, and a zero-width matrix has no rows anyway
        self.data.chunks_exact(self.dims.max(1))
    }

    /// Raw row-major buffer
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
