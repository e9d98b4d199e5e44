//! Training configuration and metrics

use std::path::PathBuf;

/// Training configuration
#[derive(Clone, Debug)]
pub struct TrainConfig {
    /// Maximum number of epochs
    pub max_epochs: usize,

    /// Rows per training batch
    pub batch_size: usize,

    /// Maximum gradient norm for clipping (None = no clipping)
    pub max_grad_norm: Option<f32>,

    /// Where to write the best-validation-loss snapshot (None = keep in memory only)
    pub snapshot_path: Option<PathBuf>,

    /// Name recorded in the snapshot header
    pub snapshot_name: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_epochs: 10,
            batch_size: 32,
            max_grad_norm: None,
            snapshot_path: None,
            snapshot_name: "model".to_string(),
        }
    }
}

impl TrainConfig {
    /// Create a new training configuration
    pub fn new(max_epochs: usize, batch_size: usize) -> Self {
        Self {
            max_epochs,
            batch_size,
            ..Self::default()
        }
    }

    /// Set gradient clipping norm
    pub fn with_grad_clip(mut self, max_norm: f32) -> Self {
        self.max_grad_norm = Some(max_norm);
        self
    }

    /// Save the best snapshot to `path` under the given name
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        self.snapshot_path = Some(path.into());
        self.snapshot_name = name.into();
        self
    }
}

/// Tracks training metrics across epochs
#[derive(Clone, Debug)]
pub struct MetricsTracker {
    /// Training loss history (one per epoch)
    pub losses: Vec<f32>,

    /// Validation loss history (one per epoch)
    pub val_losses: Vec<f32>,

    /// Learning rates (one per epoch)
    pub learning_rates: Vec<f32>,

    /// Training step count
    pub steps: usize,

    /// Current epoch
    pub epoch: usize,
}

impl MetricsTracker {
    /// Create a new metrics tracker
    pub fn new() -> Self {
        Self {
            losses: Vec::new(),
            val_losses: Vec::new(),
            learning_rates: Vec::new(),
            steps: 0,
            epoch: 0,
        }
    }

    /// Record an epoch's training metrics
    pub fn record_epoch(&mut self, loss: f32, lr: f32) {
        self.losses.push(loss);
        self.learning_rates.push(lr);
        self.epoch += 1;
    }

    /// Record validation loss for the current epoch
    pub fn record_val_loss(&mut self, val_loss: f32) {
        self.val_losses.push(val_loss);
    }

    /// Get best (minimum) validation loss
    pub fn best_val_loss(&self) -> Option<f32> {
        self.val_losses
            .iter()
            .copied()
            .min_by(|a, b| a.partial_cmp(b).unwrap())
    }

    /// Get best (minimum) training loss
    pub fn best_loss(&self) -> Option<f32> {
        self.losses
            .iter()
            .copied()
            .min_by(|a, b| a.partial_cmp(b).unwrap())
    }

    /// Increment step counter
    pub fn increment_step(&mut self) {
        self.steps += 1;
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}
