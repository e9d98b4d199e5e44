//! Declarative run configuration
//!
//! A run is described by a YAML (or JSON) file naming the node, the input
//! files, and the hyperparameters; the CLI applies overrides on top.
//!
//! # Example
//!
//! ```yaml
//! node: science
//! mode: fine-tune
//! parent_node: root
//!
//! data:
//!   dataset: data/dataset.safetensors
//!   embeddings: data/embeddings.safetensors
//!   categories: data/categories.json
//!
//! model:
//!   architecture: xml-cnn
//!
//! optimizer:
//!   name: adam
//!   lr: 0.001
//!
//! training:
//!   epochs: 30
//!   batch_size: 64
//! ```

mod builder;
mod cli;
mod schema;
mod validate;

pub use builder::{build_optimizer, load_config};
pub use cli::{
    apply_overrides, apply_predict_overrides, parse_args, Cli, Command, InfoArgs, OutputFormat,
    PredictArgs, TrainArgs, ValidateArgs,
};
pub use schema::{DataConfig, ModelConfig, OptimSpec, PipelineSpec, TrainingParams};
pub use validate::{validate_config, ValidationError};
