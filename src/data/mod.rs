//! Dataset containers for tokenized text and multi-hot labels.
//!
//! Matrices are stored flat in row-major order with explicit dimensions,
//! matching the layout the autograd ops expect. Batches are plain slices
//! into the backing storage; iteration is strictly serial and unshuffled.

mod loader;

pub use loader::{load_categories, load_dataset, load_embeddings, validate_tokens};

use std::ops::Range;

/// Padded token-id sequences, one row per example. Id 0 is padding.
#[derive(Debug, Clone)]
pub struct TokenMatrix {
    rows: usize,
    seq_len: usize,
    tokens: Vec<u32>,
}

impl TokenMatrix {
    pub fn new(rows: usize, seq_len: usize, tokens: Vec<u32>) -> Self {
        assert_eq!(tokens.len(), rows * seq_len, "token matrix size mismatch");
        Self {
            rows,
            seq_len,
            tokens,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Flat slice covering the given row range.
    pub fn batch(&self, range: Range<usize>) -> &[u32] {
        &self.tokens[range.start * self.seq_len..range.end * self.seq_len]
    }

    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }
}

/// Multi-hot label rows aligned with a [`TokenMatrix`].
#[derive(Debug, Clone)]
pub struct LabelMatrix {
    rows: usize,
    n_classes: usize,
    values: Vec<f32>,
}

impl LabelMatrix {
    pub fn new(rows: usize, n_classes: usize, values: Vec<f32>) -> Self {
        assert_eq!(values.len(), rows * n_classes, "label matrix size mismatch");
        Self {
            rows,
            n_classes,
            values,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn batch(&self, range: Range<usize>) -> &[f32] {
        &self.values[range.start * self.n_classes..range.end * self.n_classes]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Class indices set in one row, in column order.
    pub fn row_labels(&self, row: usize) -> Vec<usize> {
        let start = row * self.n_classes;
        self.values[start..start + self.n_classes]
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0.5)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Train/validation/test splits. Test labels are optional; without them the
/// prediction summary skips ranking metrics.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x_train: TokenMatrix,
    pub y_train: LabelMatrix,
    pub x_val: TokenMatrix,
    pub y_val: LabelMatrix,
    pub x_test: TokenMatrix,
    pub y_test: Option<LabelMatrix>,
}

impl Dataset {
    pub fn n_classes(&self) -> usize {
        self.y_train.n_classes()
    }
}

/// Serial fixed-size row ranges; the final range may be short.
pub fn batch_ranges(total: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    assert!(batch_size > 0, "batch size must be positive");
    (0..total)
        .step_by(batch_size)
        .map(move |start| start..(start + batch_size).min(total))
}
