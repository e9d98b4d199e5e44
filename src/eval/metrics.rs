//! Ranking metrics over prediction scores.

use super::Prediction;
use crate::data::LabelMatrix;
use std::cmp::Ordering;

/// Precision at k: the share of true labels among each row's k
/// highest-scored categories, averaged over all rows.
///
/// When a row has fewer categories than `k`, the cutoff shrinks to the
/// category count. Rows without any true label contribute zero.
pub fn precision_at_k(prediction: &Prediction, truth: &LabelMatrix, k: usize) -> f32 {
    assert_eq!(
        prediction.n_classes(),
        truth.n_classes(),
        "prediction and truth class counts differ"
    );
    assert_eq!(
        prediction.rows(),
        truth.rows(),
        "prediction and truth row counts differ"
    );
    if prediction.rows() == 0 || k == 0 {
        return 0.0;
    }

    let cutoff = k.min(prediction.n_classes());
    let mut total = 0.0;
    for row in 0..prediction.rows() {
        let scores = prediction.probability_row(row);
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
        });

        let truth_row = truth.batch(row..row + 1);
        let hits = order[..cutoff]
            .iter()
            .filter(|&&class| truth_row[class] > 0.5)
            .count();
        total += hits as f32 / cutoff as f32;
    }

    total / prediction.rows() as f32
}
