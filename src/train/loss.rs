//! Loss functions for training

use crate::Tensor;
use ndarray::Array1;

/// Trait for loss functions
pub trait LossFn {
    /// Compute loss given predictions and targets
    ///
    /// Returns a scalar loss value and sets up gradients for backpropagation
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Numerically stable sigmoid.
pub(crate) fn stable_sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Sigmoid cross-entropy over independent binary targets
///
/// L = mean(max(x, 0) - x*t + ln(1 + e^(-|x|)))
///
/// The log1p form never exponentiates a positive argument, so extreme
/// logits stay finite. Targets are multi-hot; every element is its own
/// binary problem and the loss is the mean over all of them.
///
/// # Example
///
/// ```
/// use etiquetar::train::{BceWithLogits, LossFn};
/// use etiquetar::Tensor;
///
/// let loss_fn = BceWithLogits;
/// let logits = Tensor::from_vec(vec![2.0, -1.0], true);
/// let targets = Tensor::from_vec(vec![1.0, 0.0], false);
///
/// let loss = loss_fn.forward(&logits, &targets);
/// assert!(loss.data()[0] > 0.0);
/// ```
pub struct BceWithLogits;

impl LossFn for BceWithLogits {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );

        let n = predictions.len() as f32;
        let total: f32 = predictions
            .data()
            .iter()
            .zip(targets.data().iter())
            .map(|(&x, &t)| x.max(0.0) - x * t + (-x.abs()).exp().ln_1p())
            .sum();

        let mut loss = Tensor::from_vec(vec![total / n], true);

        // d(L)/d(x) = (sigmoid(x) - t) / n
        let grad: Array1<f32> = predictions
            .data()
            .iter()
            .zip(targets.data().iter())
            .map(|(&x, &t)| (stable_sigmoid(x) - t) / n)
            .collect();

        use crate::autograd::BackwardOp;
        use std::rc::Rc;

        struct BceBackward {
            predictions: Tensor,
            grad: Array1<f32>,
        }

        impl BackwardOp for BceBackward {
            fn backward(&self) {
                self.predictions.accumulate_grad(self.grad.clone());
                if let Some(op) = self.predictions.backward_op() {
                    op.backward();
                }
            }
        }

        if predictions.requires_grad() {
            loss.set_backward_op(Rc::new(BceBackward {
                predictions: predictions.clone(),
                grad,
            }));
        }

        loss
    }

    fn name(&self) -> &str {
        "BCEWithLogits"
    }
}
