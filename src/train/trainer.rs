//! Trainer abstraction for training loops

use super::callback::{CallbackAction, CallbackContext, CallbackManager, TrainerCallback};
use super::{Evaluator, LossFn, MetricsTracker, TrainConfig};
use crate::data::{batch_ranges, LabelMatrix, TokenMatrix};
use crate::error::Result;
use crate::io::{save_snapshot, SnapshotMetadata};
use crate::model::TextClassifier;
use crate::optim::{clip_grad_norm, Optimizer};
use crate::Tensor;
use std::time::Instant;

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainResult {
    /// Final epoch reached
    pub final_epoch: usize,
    /// Final training loss
    pub final_loss: f32,
    /// Best validation loss achieved (training loss when no validation ran)
    pub best_loss: f32,
    /// Whether training was stopped early
    pub stopped_early: bool,
    /// Total training time in seconds
    pub elapsed_secs: f64,
}

/// High-level trainer that orchestrates the training loop
///
/// Owns the model and steps it over serial unshuffled batches. After every
/// epoch the validation split is scored; when the validation loss reaches a
/// new minimum and a snapshot path is configured, the parameters go to disk
/// right away, so the file always holds the best epoch seen so far.
pub struct Trainer {
    /// Model under training
    model: Box<dyn TextClassifier>,

    /// Optimizer
    optimizer: Box<dyn Optimizer>,

    /// Loss function
    loss_fn: Box<dyn LossFn>,

    /// Training configuration
    config: TrainConfig,

    /// Metrics tracker
    pub metrics: MetricsTracker,

    /// Callback manager
    callbacks: CallbackManager,

    /// Best monitored loss achieved during training
    best_loss: Option<f32>,

    /// Training start time
    start_time: Option<Instant>,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(
        model: Box<dyn TextClassifier>,
        optimizer: Box<dyn Optimizer>,
        loss_fn: Box<dyn LossFn>,
        config: TrainConfig,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            config,
            metrics: MetricsTracker::new(),
            callbacks: CallbackManager::new(),
            best_loss: None,
            start_time: None,
        }
    }

    /// Add a callback to the trainer
    pub fn add_callback<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    /// Get current learning rate
    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }

    /// Set learning rate
    pub fn set_lr(&mut self, lr: f32) {
        self.optimizer.set_lr(lr);
    }

    /// Borrow the model under training
    pub fn model(&self) -> &dyn TextClassifier {
        self.model.as_ref()
    }

    /// Take the model out of the trainer
    pub fn into_model(self) -> Box<dyn TextClassifier> {
        self.model
    }

    /// Get reference to callback manager
    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    /// Build callback context from current state
    fn build_context(
        &self,
        epoch: usize,
        step: usize,
        steps_per_epoch: usize,
        loss: f32,
        val_loss: Option<f32>,
    ) -> CallbackContext {
        CallbackContext {
            epoch,
            max_epochs: self.config.max_epochs,
            step,
            steps_per_epoch,
            global_step: self.metrics.steps,
            loss,
            lr: self.lr(),
            best_loss: self.best_loss,
            val_loss,
            elapsed_secs: self
                .start_time
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0),
        }
    }

    /// Perform a single training step over one batch
    ///
    /// Returns the scalar loss for the batch.
    pub fn train_step(&mut self, tokens: &[u32], targets: &[f32], rows: usize) -> f32 {
        {
            let mut named = self.model.named_parameters();
            let mut params: Vec<&mut Tensor> = named.iter_mut().map(|(_, t)| &mut **t).collect();
            self.optimizer.zero_grad(&mut params);
        }

        let logits = self.model.forward(tokens, rows);
        let target_tensor = Tensor::from_vec(targets.to_vec(), false);
        let loss = self.loss_fn.forward(&logits, &target_tensor);
        let loss_val = loss.data()[0];

        if let Some(backward_op) = loss.backward_op() {
            backward_op.backward();
        }

        {
            let mut named = self.model.named_parameters();
            let mut params: Vec<&mut Tensor> = named.iter_mut().map(|(_, t)| &mut **t).collect();
            if let Some(max_norm) = self.config.max_grad_norm {
                clip_grad_norm(&mut params, max_norm);
            }
            self.optimizer.step(&mut params);
        }

        self.metrics.increment_step();

        loss_val
    }

    /// Write the current parameters to the configured snapshot path
    fn save_best_snapshot(&mut self) -> Result<()> {
        let Some(path) = self.config.snapshot_path.clone() else {
            return Ok(());
        };
        let metadata =
            SnapshotMetadata::new(&self.config.snapshot_name, self.model.architecture());
        let named = self.model.named_parameters();
        let views: Vec<(&str, &Tensor)> =
            named.iter().map(|(n, t)| (n.as_str(), &**t)).collect();
        save_snapshot(path, &metadata, &views)
    }

    /// Train for up to `config.max_epochs` epochs with full callback support
    ///
    /// Returns the final metrics. The snapshot on disk, if configured,
    /// belongs to the epoch with the lowest validation loss.
    pub fn train(
        &mut self,
        x: &TokenMatrix,
        y: &LabelMatrix,
        evaluator: Option<&Evaluator<'_>>,
    ) -> Result<TrainResult> {
        self.start_time = Some(Instant::now());
        self.best_loss = None;
        let mut stopped_early = false;
        let mut final_loss = 0.0;
        let steps_per_epoch = batch_ranges(x.rows(), self.config.batch_size).count();

        let ctx = self.build_context(0, 0, steps_per_epoch, 0.0, None);
        if self.callbacks.on_train_begin(&ctx) == CallbackAction::Stop {
            return Ok(TrainResult {
                final_epoch: 0,
                final_loss: 0.0,
                best_loss: 0.0,
                stopped_early: true,
                elapsed_secs: self.elapsed(),
            });
        }

        for epoch in 0..self.config.max_epochs {
            let ctx = self.build_context(epoch, 0, steps_per_epoch, final_loss, None);
            if self.callbacks.on_epoch_begin(&ctx) == CallbackAction::Stop {
                stopped_early = true;
                break;
            }

            let mut total_loss = 0.0;
            let mut num_batches = 0;

            for (step, range) in batch_ranges(x.rows(), self.config.batch_size).enumerate() {
                let rows = range.end - range.start;
                let loss = self.train_step(x.batch(range.clone()), y.batch(range), rows);
                total_loss += loss;
                num_batches += 1;

                let ctx = self.build_context(epoch, step, steps_per_epoch, loss, None);
                if self.callbacks.on_step_end(&ctx) == CallbackAction::Stop {
                    stopped_early = true;
                    break;
                }
            }

            if stopped_early {
                break;
            }

            let avg_loss = if num_batches > 0 {
                total_loss / num_batches as f32
            } else {
                0.0
            };
            final_loss = avg_loss;

            let val_loss = evaluator.map(|e| e.run(self.model.as_ref(), self.loss_fn.as_ref()));

            self.metrics.record_epoch(avg_loss, self.lr());
            if let Some(v) = val_loss {
                self.metrics.record_val_loss(v);
            }

            // Snapshot whenever the monitored loss reaches a new minimum
            let monitored = val_loss.unwrap_or(avg_loss);
            if self.best_loss.map_or(true, |best| monitored < best) {
                self.best_loss = Some(monitored);
                self.save_best_snapshot()?;
            }

            let ctx = self.build_context(epoch, steps_per_epoch, steps_per_epoch, avg_loss, val_loss);
            if self.callbacks.on_epoch_end(&ctx) == CallbackAction::Stop {
                stopped_early = true;
                break;
            }
        }

        let ctx = self.build_context(self.metrics.epoch, 0, steps_per_epoch, final_loss, None);
        self.callbacks.on_train_end(&ctx);

        Ok(TrainResult {
            final_epoch: self.metrics.epoch,
            final_loss,
            best_loss: self.best_loss.unwrap_or(final_loss),
            stopped_early,
            elapsed_secs: self.elapsed(),
        })
    }

    fn elapsed(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelParams, TextCnn};
    use crate::optim::Adam;
    use crate::train::{BceWithLogits, EarlyStopping};
    use ndarray::arr2;

    fn tiny_model(seed: u64) -> Box<dyn TextClassifier> {
        let params = ModelParams {
            out_channels: 2,
            hidden_units: 3,
            n_classes: 2,
            batch_size: 2,
            filter_widths: vec![2],
            pool_chunks: 1,
            embeddings: arr2(&[
                [0.0, 0.0],
                [0.9, -0.3],
                [-0.5, 0.7],
                [0.2, 0.4],
            ]),
        };
        Box::new(TextCnn::new(&params, seed))
    }

    fn tiny_data() -> (TokenMatrix, LabelMatrix) {
        let x = TokenMatrix::new(4, 3, vec![1, 1, 2, 2, 3, 1, 1, 2, 3, 3, 3, 0]);
        let y = LabelMatrix::new(4, 2, vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        (x, y)
    }

    fn tiny_trainer(config: TrainConfig) -> Trainer {
        Trainer::new(
            tiny_model(7),
            Box::new(Adam::default_params(0.05)),
            Box::new(BceWithLogits),
            config,
        )
    }

    #[test]
    fn test_trainer_creation() {
        let trainer = tiny_trainer(TrainConfig::default());
        assert!((trainer.lr() - 0.05).abs() < 1e-7);
        assert!(trainer.callbacks().is_empty());
    }

    #[test]
    fn test_train_step_updates_metrics() {
        let mut trainer = tiny_trainer(TrainConfig::new(1, 2));
        let (x, y) = tiny_data();

        let loss = trainer.train_step(x.batch(0..2), y.batch(0..2), 2);

        assert!(loss > 0.0);
        assert!(loss.is_finite());
        assert_eq!(trainer.metrics.steps, 1);
    }

    #[test]
    fn test_train_runs_all_epochs() {
        let mut trainer = tiny_trainer(TrainConfig::new(3, 2));
        let (x, y) = tiny_data();

        let result = trainer.train(&x, &y, None).unwrap();

        assert!(!result.stopped_early);
        assert_eq!(result.final_epoch, 3);
        assert_eq!(trainer.metrics.losses.len(), 3);
        assert_eq!(trainer.metrics.steps, 6);
    }

    #[test]
    fn test_loss_decreases_on_tiny_dataset() {
        let mut trainer = tiny_trainer(TrainConfig::new(10, 2));
        let (x, y) = tiny_data();

        let result = trainer.train(&x, &y, None).unwrap();

        let first = trainer.metrics.losses[0];
        let last = *trainer.metrics.losses.last().unwrap();
        assert!(last < first, "loss did not decrease: {first} -> {last}");
        assert!(result.best_loss <= first);
    }

    #[test]
    fn test_early_stopping_halts_training() {
        let mut trainer = tiny_trainer(TrainConfig::new(50, 2));
        // Impossible improvement threshold forces a stop after patience epochs
        trainer.add_callback(EarlyStopping::new(2, 1000.0));
        let (x, y) = tiny_data();

        let result = trainer.train(&x, &y, None).unwrap();

        assert!(result.stopped_early);
        assert!(result.final_epoch < 50);
    }

    #[test]
    fn test_validation_loss_recorded() {
        let mut trainer = tiny_trainer(TrainConfig::new(2, 2));
        let (x, y) = tiny_data();
        let evaluator = Evaluator::new(&x, &y, 2);

        trainer.train(&x, &y, Some(&evaluator)).unwrap();

        assert_eq!(trainer.metrics.val_losses.len(), 2);
        assert!(trainer.metrics.best_val_loss().is_some());
    }

    #[test]
    fn test_best_snapshot_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_3.safetensors");
        let config = TrainConfig::new(3, 2).with_snapshot(&path, "3");
        let mut trainer = tiny_trainer(config);
        let (x, y) = tiny_data();
        let evaluator = Evaluator::new(&x, &y, 2);

        trainer.train(&x, &y, Some(&evaluator)).unwrap();

        let snapshot = crate::io::load_snapshot(&path).unwrap();
        assert_eq!(snapshot.metadata.name, "3");
        assert_eq!(snapshot.metadata.architecture, "cnn");
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_gradient_clipping_keeps_training_stable() {
        let config = TrainConfig::new(3, 2).with_grad_clip(1.0);
        let mut trainer = tiny_trainer(config);
        let (x, y) = tiny_data();

        let result = trainer.train(&x, &y, None).unwrap();

        assert!(result.final_loss.is_finite());
        assert_eq!(result.final_epoch, 3);
    }
}
