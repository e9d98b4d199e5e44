//! Validation-set evaluation between epochs.

use super::LossFn;
use crate::data::{batch_ranges, LabelMatrix, TokenMatrix};
use crate::model::TextClassifier;
use crate::Tensor;

/// Runs the model over a held-out split and reports the mean loss.
///
/// Batches follow the same serial order as training; per-batch losses are
/// weighted by row count so a short final batch does not skew the mean.
pub struct Evaluator<'a> {
    x: &'a TokenMatrix,
    y: &'a LabelMatrix,
    batch_size: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(x: &'a TokenMatrix, y: &'a LabelMatrix, batch_size: usize) -> Self {
        Self { x, y, batch_size }
    }

    pub fn run(&self, model: &dyn TextClassifier, loss_fn: &dyn LossFn) -> f32 {
        let mut total = 0.0;
        let mut rows_seen = 0usize;

        for range in batch_ranges(self.x.rows(), self.batch_size) {
            let rows = range.end - range.start;
            let logits = model.forward(self.x.batch(range.clone()), rows);
            let targets = Tensor::from_vec(self.y.batch(range).to_vec(), false);
            let loss = loss_fn.forward(&logits, &targets);
            total += loss.data()[0] * rows as f32;
            rows_seen += rows;
        }

        if rows_seen > 0 {
            total / rows_seen as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::BceWithLogits;

    struct Zeros {
        n: usize,
    }

    impl TextClassifier for Zeros {
        fn architecture(&self) -> &'static str {
            "zeros"
        }

        fn n_classes(&self) -> usize {
            self.n
        }

        fn forward(&self, tokens: &[u32], rows: usize) -> Tensor {
            assert_eq!(tokens.len() % rows, 0);
            Tensor::from_vec(vec![0.0; rows * self.n], false)
        }

        fn named_parameters(&mut self) -> Vec<(String, &mut Tensor)> {
            Vec::new()
        }
    }

    #[test]
    fn zero_logits_score_ln_two() {
        let x = TokenMatrix::new(5, 2, vec![1; 10]);
        let y = LabelMatrix::new(5, 2, vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
        let evaluator = Evaluator::new(&x, &y, 2);

        let loss = evaluator.run(&Zeros { n: 2 }, &BceWithLogits);
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let x = TokenMatrix::new(3, 2, vec![0, 1, 2, 0, 1, 2]);
        let y = LabelMatrix::new(3, 2, vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
        let evaluator = Evaluator::new(&x, &y, 2);

        let model = Zeros { n: 2 };
        let first = evaluator.run(&model, &BceWithLogits);
        let second = evaluator.run(&model, &BceWithLogits);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_split_scores_zero() {
        let x = TokenMatrix::new(0, 2, vec![]);
        let y = LabelMatrix::new(0, 2, vec![]);
        let evaluator = Evaluator::new(&x, &y, 4);

        assert_eq!(evaluator.run(&Zeros { n: 2 }, &BceWithLogits), 0.0);
    }
}
