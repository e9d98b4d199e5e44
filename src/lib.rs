//! # Etiquetar: hierarchical multi-label text classification
//!
//! Etiquetar trains one CNN classifier per node of a hierarchical label
//! tree and predicts held-out examples with it. Each run fits a model
//! over frozen word embeddings, keeps the epoch with the best validation
//! loss, then reloads those weights and writes probability and label
//! CSVs for the test split.
//!
//! ## Architecture
//!
//! - **autograd**: Tape-based automatic differentiation over flat tensors
//! - **optim**: Optimizers (Adam, SGD) and gradient clipping
//! - **model**: The two classifier architectures (cnn, xml-cnn)
//! - **data**: Token/label matrices and the safetensors loaders
//! - **train**: Trainer, loss, callbacks, validation evaluator
//! - **eval**: Test-phase inference, CSV writers, ranking metrics
//! - **io**: Weight snapshots on disk
//! - **config**: Declarative YAML/JSON run configuration and CLI
//! - **pipeline**: The end-to-end train and predict operations

pub mod autograd;
pub mod config;
pub mod data;
pub mod eval;
pub mod io;
pub mod model;
pub mod optim;
pub mod pipeline;
pub mod progress;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use autograd::Tensor;
pub use error::{Error, Result};
