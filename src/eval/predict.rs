//! Batched inference over the test split.

use crate::data::{batch_ranges, TokenMatrix};
use crate::model::TextClassifier;
use crate::progress::ProgressBar;
use crate::train::stable_sigmoid;

/// Sigmoid scores and thresholded labels for every test row.
#[derive(Debug, Clone)]
pub struct Prediction {
    n_classes: usize,
    probabilities: Vec<f32>,
    labels: Vec<u8>,
}

impl Prediction {
    /// Threshold for turning a score into a positive label.
    pub const LABEL_THRESHOLD: f32 = 0.5;

    /// Build from flat row-major sigmoid scores, deriving the 0/1 labels.
    pub fn from_probabilities(n_classes: usize, probabilities: Vec<f32>) -> Self {
        assert!(n_classes > 0, "prediction needs at least one class");
        assert_eq!(
            probabilities.len() % n_classes,
            0,
            "probability matrix size mismatch"
        );
        let labels = probabilities
            .iter()
            .map(|&p| u8::from(p >= Self::LABEL_THRESHOLD))
            .collect();
        Self {
            n_classes,
            probabilities,
            labels,
        }
    }

    pub fn rows(&self) -> usize {
        self.probabilities.len() / self.n_classes
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn probability_row(&self, row: usize) -> &[f32] {
        let start = row * self.n_classes;
        &self.probabilities[start..start + self.n_classes]
    }

    pub fn label_row(&self, row: usize) -> &[u8] {
        let start = row * self.n_classes;
        &self.labels[start..start + self.n_classes]
    }
}

/// Run the model over the test split in serial batches.
///
/// Logits go through the sigmoid; scores at or above
/// [`Prediction::LABEL_THRESHOLD`] become positive labels.
pub fn run_test_phase(
    model: &dyn TextClassifier,
    x: &TokenMatrix,
    batch_size: usize,
    show_progress: bool,
) -> Prediction {
    let n_classes = model.n_classes();
    let num_batches = batch_ranges(x.rows(), batch_size).count();
    let mut bar = ProgressBar::new(num_batches as u64).with_enabled(show_progress);
    bar.set_message("predict test loop");

    let mut probabilities = Vec::with_capacity(x.rows() * n_classes);
    for range in batch_ranges(x.rows(), batch_size) {
        let rows = range.end - range.start;
        let logits = model.forward(x.batch(range), rows);
        probabilities.extend(logits.data().iter().map(|&v| stable_sigmoid(v)));
        bar.inc(1);
    }
    if show_progress {
        bar.finish();
    }

    Prediction::from_probabilities(n_classes, probabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tensor;

    struct FixedLogits {
        n: usize,
        value: f32,
    }

    impl TextClassifier for FixedLogits {
        fn architecture(&self) -> &'static str {
            "fixed"
        }

        fn n_classes(&self) -> usize {
            self.n
        }

        fn forward(&self, _tokens: &[u32], rows: usize) -> Tensor {
            Tensor::from_vec(vec![self.value; rows * self.n], false)
        }

        fn named_parameters(&mut self) -> Vec<(String, &mut Tensor)> {
            Vec::new()
        }
    }

    #[test]
    fn labels_follow_threshold() {
        let p = Prediction::from_probabilities(3, vec![0.9, 0.5, 0.49, 0.1, 0.51, 0.0]);
        assert_eq!(p.labels(), &[1, 1, 0, 0, 1, 0]);
        assert_eq!(p.rows(), 2);
        assert_eq!(p.label_row(1), &[0, 1, 0]);
    }

    #[test]
    fn scores_pass_through_sigmoid() {
        let model = FixedLogits { n: 2, value: 0.0 };
        let x = TokenMatrix::new(3, 4, vec![0; 12]);

        let prediction = run_test_phase(&model, &x, 2, false);

        assert_eq!(prediction.rows(), 3);
        assert!(prediction.probabilities().iter().all(|&p| (p - 0.5).abs() < 1e-6));
        // 0.5 sits exactly on the threshold
        assert!(prediction.labels().iter().all(|&l| l == 1));
    }

    #[test]
    fn short_tail_batch_is_covered() {
        let model = FixedLogits { n: 2, value: 3.0 };
        let x = TokenMatrix::new(5, 3, vec![0; 15]);

        let prediction = run_test_phase(&model, &x, 2, false);
        assert_eq!(prediction.rows(), 5);
        assert_eq!(prediction.probabilities().len(), 10);
    }

    #[test]
    fn empty_test_set_yields_no_rows() {
        let model = FixedLogits { n: 4, value: 1.0 };
        let x = TokenMatrix::new(0, 3, vec![]);

        let prediction = run_test_phase(&model, &x, 8, false);
        assert_eq!(prediction.rows(), 0);
        assert!(prediction.probabilities().is_empty());
        assert!(prediction.labels().is_empty());
    }

    #[test]
    #[should_panic(expected = "size mismatch")]
    fn ragged_probability_matrix_panics() {
        Prediction::from_probabilities(3, vec![0.1, 0.2]);
    }
}
