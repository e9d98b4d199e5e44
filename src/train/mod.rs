//! High-level training loop
//!
//! This module provides a complete training framework with:
//! - Sigmoid cross-entropy loss for multi-hot targets
//! - Trainer abstraction over serial unshuffled batches
//! - Per-epoch validation and best-snapshot persistence
//! - Metrics tracking
//! - Callbacks (early stopping, console/file reports, progress bar)
//!
//! # Example
//!
//! ```no_run
//! use etiquetar::data::{LabelMatrix, TokenMatrix};
//! use etiquetar::model::{build_model, ModelParams};
//! use etiquetar::optim::Adam;
//! use etiquetar::train::{BceWithLogits, EarlyStopping, TrainConfig, Trainer};
//! use ndarray::Array2;
//!
//! let params = ModelParams {
//!     out_channels: 4,
//!     hidden_units: 8,
//!     n_classes: 3,
//!     batch_size: 2,
//!     filter_widths: vec![2, 3],
//!     pool_chunks: 1,
//!     embeddings: Array2::zeros((10, 5)),
//! };
//! let model = build_model("cnn", &params, 42);
//!
//! let mut trainer = Trainer::new(
//!     model,
//!     Box::new(Adam::default_params(0.001)),
//!     Box::new(BceWithLogits),
//!     TrainConfig::new(10, 2),
//! );
//! trainer.add_callback(EarlyStopping::new(3, 0.0));
//!
//! let x = TokenMatrix::new(4, 6, vec![0; 24]);
//! let y = LabelMatrix::new(4, 3, vec![0.0; 12]);
//! let result = trainer.train(&x, &y, None).unwrap();
//! println!("final loss {:.4}", result.final_loss);
//! ```

pub mod callback;
mod config;
mod evaluator;
mod loss;
mod trainer;

pub use callback::{
    BatchProgress, CallbackAction, CallbackContext, CallbackManager, ConsoleReport, EarlyStopping,
    EpochRecord, LogReport, TrainerCallback,
};
pub use config::{MetricsTracker, TrainConfig};
pub use evaluator::Evaluator;
pub use loss::{BceWithLogits, LossFn};
pub use trainer::{TrainResult, Trainer};

pub(crate) use loss::stable_sigmoid;
