//! YAML/JSON schema for a per-node training run

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete specification of one node's training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Name of the label-tree node this run trains
    pub node: String,

    /// Initialization mode: "scratch" | "fine-tune"
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Parent node whose weights seed a fine-tune run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node: Option<String>,

    /// Input file locations
    pub data: DataConfig,

    /// Network architecture and sizes
    #[serde(default)]
    pub model: ModelConfig,

    /// Optimizer configuration
    #[serde(default)]
    pub optimizer: OptimSpec,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainingParams,
}

/// Input file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Safetensors file with x_train/y_train, x_val/y_val, x_test
    /// (and optionally y_test) splits
    pub dataset: PathBuf,

    /// Safetensors file holding the "embeddings" lookup table
    pub embeddings: PathBuf,

    /// JSON array of category names, one per label column
    pub categories: PathBuf,
}

/// Network architecture and sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Architecture selector: "cnn" | "xml-cnn"
    #[serde(default = "default_architecture")]
    pub architecture: String,

    /// Convolution channels per filter width
    #[serde(default = "default_out_channels")]
    pub out_channels: usize,

    /// Width of the dense hidden layer
    #[serde(default = "default_hidden_units")]
    pub hidden_units: usize,

    /// Convolution filter widths (tokens per window)
    #[serde(default = "default_filter_widths")]
    pub filter_widths: Vec<usize>,

    /// Chunks for dynamic max pooling (xml-cnn only)
    #[serde(default = "default_pool_chunks")]
    pub pool_chunks: usize,

    /// Seed for weight initialization
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            architecture: default_architecture(),
            out_channels: default_out_channels(),
            hidden_units: default_hidden_units(),
            filter_widths: default_filter_widths(),
            pool_chunks: default_pool_chunks(),
            seed: default_seed(),
        }
    }
}

/// Optimizer specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimSpec {
    /// Optimizer name: "adam" | "sgd"
    #[serde(default = "default_optimizer")]
    pub name: String,

    /// Learning rate
    #[serde(default = "default_lr")]
    pub lr: f32,

    /// Optimizer-specific parameters (beta1, beta2, momentum, etc.)
    #[serde(flatten)]
    pub params: HashMap<String, serde_json::Value>,
}

impl Default for OptimSpec {
    fn default() -> Self {
        Self {
            name: default_optimizer(),
            lr: default_lr(),
            params: HashMap::new(),
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Maximum number of epochs
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Batch size for training, validation, and the test phase
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Non-improving epochs tolerated before stopping early
    #[serde(default = "default_patience")]
    pub patience: usize,

    /// Minimum validation-loss drop that counts as improvement
    #[serde(default)]
    pub min_delta: f32,

    /// Gradient clipping threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grad_clip: Option<f32>,

    /// Render per-epoch progress bars
    #[serde(default = "default_true")]
    pub progress: bool,

    /// Output directory for snapshots, logs, and predictions
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            patience: default_patience(),
            min_delta: 0.0,
            grad_clip: None,
            progress: default_true(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_mode() -> String {
    "scratch".to_string()
}

fn default_architecture() -> String {
    "cnn".to_string()
}

fn default_out_channels() -> usize {
    128
}

fn default_hidden_units() -> usize {
    512
}

fn default_filter_widths() -> Vec<usize> {
    vec![2, 4, 8]
}

fn default_pool_chunks() -> usize {
    2
}

fn default_seed() -> u64 {
    0
}

fn default_optimizer() -> String {
    "adam".to_string()
}

fn default_lr() -> f32 {
    0.001
}

fn default_epochs() -> usize {
    10
}

fn default_batch_size() -> usize {
    32
}

fn default_patience() -> usize {
    3
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./out")
}
