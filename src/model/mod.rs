//! CNN text classifiers.
//!
//! Both architectures share the same front end: frozen word embeddings
//! feed narrow convolutions over the token sequence. They differ in how
//! convolution outputs are pooled before the dense layers.

mod cnn;
mod init;
mod xml_cnn;

pub use cnn::TextCnn;
pub use xml_cnn::XmlCnn;

use crate::autograd::Tensor;
use crate::io::Snapshot;
use crate::{Error, Result};
use ndarray::Array2;

/// Construction parameters shared by both architectures.
///
/// The embedding matrix is the lookup table itself; row 0 is the padding
/// row and rows are indexed by token id.
pub struct ModelParams {
    pub out_channels: usize,
    pub hidden_units: usize,
    pub n_classes: usize,
    pub batch_size: usize,
    pub filter_widths: Vec<usize>,
    pub pool_chunks: usize,
    pub embeddings: Array2<f32>,
}

impl ModelParams {
    pub fn embed_dim(&self) -> usize {
        self.embeddings.ncols()
    }

    pub fn vocab_size(&self) -> usize {
        self.embeddings.nrows()
    }
}

/// A trainable classifier over token sequences.
pub trait TextClassifier {
    /// Architecture selector this model answers to.
    fn architecture(&self) -> &'static str;

    /// Number of output categories.
    fn n_classes(&self) -> usize;

    /// Compute logits for a batch.
    ///
    /// `tokens` holds `rows` sequences of equal length back to back; the
    /// result is a `rows x n_classes` matrix of unnormalized scores.
    fn forward(&self, tokens: &[u32], rows: usize) -> Tensor;

    /// All trainable parameters with stable names, in a stable order.
    fn named_parameters(&mut self) -> Vec<(String, &mut Tensor)>;
}

/// Build the architecture selected by name.
///
/// `"xml-cnn"` (any case) selects [`XmlCnn`]; everything else falls back
/// to the plain [`TextCnn`].
pub fn build_model(architecture: &str, params: &ModelParams, seed: u64) -> Box<dyn TextClassifier> {
    if architecture.eq_ignore_ascii_case(XmlCnn::NAME) {
        Box::new(XmlCnn::new(params, seed))
    } else {
        Box::new(TextCnn::new(params, seed))
    }
}

/// Copy snapshot tensors into matching parameters.
///
/// A parameter is restored when the snapshot has a tensor with the same
/// name and length; everything else keeps its fresh initialization. This
/// is how a child node starts from its parent's weights even though the
/// output layer widths differ.
///
/// Returns the number of parameters restored.
pub fn transfer_parameters(model: &mut dyn TextClassifier, snapshot: &Snapshot) -> usize {
    let mut transferred = 0;
    for (name, param) in model.named_parameters() {
        if let Some(saved) = snapshot.tensor(&name) {
            if saved.len() == param.len() {
                param.data_mut().assign(saved.data());
                transferred += 1;
            }
        }
    }
    transferred
}

/// Restore every parameter from a snapshot of the same model.
///
/// Unlike [`transfer_parameters`] this fails if the architectures differ,
/// a parameter is missing, or a shape does not line up.
pub fn restore_parameters(model: &mut dyn TextClassifier, snapshot: &Snapshot) -> Result<()> {
    let architecture = model.architecture();
    if snapshot.metadata.architecture != "unknown"
        && snapshot.metadata.architecture != architecture
    {
        return Err(Error::Config(format!(
            "snapshot was trained with '{}' but the model is '{architecture}'",
            snapshot.metadata.architecture
        )));
    }

    for (name, param) in model.named_parameters() {
        let saved = snapshot
            .tensor(&name)
            .ok_or_else(|| Error::Config(format!("snapshot is missing parameter '{name}'")))?;
        if saved.len() != param.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![param.len()],
                got: vec![saved.len()],
            });
        }
        param.data_mut().assign(saved.data());
    }
    Ok(())
}

/// Gather embedded convolution windows for a whole batch.
///
/// For filter width `w` each sequence contributes `seq_len - w + 1`
/// window rows of `w * dim` values, stacked batch-major. The result is
/// plain data; embeddings are frozen and take no gradient.
pub(crate) fn embed_windows(
    embeddings: &Array2<f32>,
    tokens: &[u32],
    rows: usize,
    seq_len: usize,
    width: usize,
) -> Tensor {
    let dim = embeddings.ncols();
    let positions = seq_len - width + 1;
    let mut out = vec![0.0f32; rows * positions * width * dim];
    let mut cursor = 0;
    for r in 0..rows {
        let sequence = &tokens[r * seq_len..(r + 1) * seq_len];
        for start in 0..positions {
            for &token in &sequence[start..start + width] {
                for &value in embeddings.row(token as usize) {
                    out[cursor] = value;
                    cursor += 1;
                }
            }
        }
    }
    Tensor::from_vec(out, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn tiny_params() -> ModelParams {
        ModelParams {
            out_channels: 3,
            hidden_units: 5,
            n_classes: 2,
            batch_size: 2,
            filter_widths: vec![2],
            pool_chunks: 2,
            embeddings: arr2(&[
                [0.0, 0.0],
                [1.0, 0.5],
                [-0.5, 1.0],
                [0.25, -0.25],
            ]),
        }
    }

    #[test]
    fn selector_is_case_insensitive() {
        let params = tiny_params();
        assert_eq!(build_model("XML-CNN", &params, 1).architecture(), "xml-cnn");
        assert_eq!(build_model("xml-cnn", &params, 1).architecture(), "xml-cnn");
        assert_eq!(build_model("cnn", &params, 1).architecture(), "cnn");
        // anything unrecognized falls back to the plain CNN
        assert_eq!(build_model("mystery", &params, 1).architecture(), "cnn");
    }

    #[test]
    fn embed_windows_stacks_window_rows() {
        let params = tiny_params();
        // one row: tokens [1, 2, 3], width 2 -> windows [1,2] and [2,3]
        let out = embed_windows(&params.embeddings, &[1, 2, 3], 1, 3, 2);
        assert_eq!(out.len(), 2 * 2 * 2);
        assert_eq!(
            out.data().to_vec(),
            vec![1.0, 0.5, -0.5, 1.0, -0.5, 1.0, 0.25, -0.25]
        );
        assert!(!out.requires_grad());
    }

    #[test]
    fn transfer_skips_mismatched_shapes() {
        let params = tiny_params();
        let mut source = TextCnn::new(&params, 7);
        let wider = ModelParams {
            n_classes: 4,
            ..tiny_params()
        };

        let named = source.named_parameters();
        let view: Vec<(&str, &Tensor)> =
            named.iter().map(|(n, t)| (n.as_str(), &**t)).collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parent.safetensors");
        crate::io::save_snapshot(
            &path,
            &crate::io::SnapshotMetadata::new("0", "cnn"),
            &view,
        )
        .unwrap();
        let snapshot = crate::io::load_snapshot(&path).unwrap();

        let mut child = TextCnn::new(&wider, 8);
        let moved = transfer_parameters(&mut child, &snapshot);

        // conv and hidden layers transfer, output layer widths differ
        let total = child.named_parameters().len();
        assert_eq!(total, 6);
        assert_eq!(moved, 4);
    }

    #[test]
    fn restore_rejects_wrong_architecture() {
        let params = tiny_params();
        let mut source = XmlCnn::new(&params, 3);
        let named = source.named_parameters();
        let view: Vec<(&str, &Tensor)> =
            named.iter().map(|(n, t)| (n.as_str(), &**t)).collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xml.safetensors");
        crate::io::save_snapshot(
            &path,
            &crate::io::SnapshotMetadata::new("0", "xml-cnn"),
            &view,
        )
        .unwrap();
        let snapshot = crate::io::load_snapshot(&path).unwrap();

        let mut plain = TextCnn::new(&params, 3);
        assert!(restore_parameters(&mut plain, &snapshot).is_err());
    }

    #[test]
    fn restore_round_trips_exactly() {
        let params = tiny_params();
        let mut source = TextCnn::new(&params, 11);
        let logits_before = source.forward(&[1, 2, 3, 3, 2, 1], 2);

        let named = source.named_parameters();
        let view: Vec<(&str, &Tensor)> =
            named.iter().map(|(n, t)| (n.as_str(), &**t)).collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        crate::io::save_snapshot(
            &path,
            &crate::io::SnapshotMetadata::new("0", "cnn"),
            &view,
        )
        .unwrap();
        let snapshot = crate::io::load_snapshot(&path).unwrap();

        // different seed, then restore: forward must match the source
        let mut restored = TextCnn::new(&params, 99);
        restore_parameters(&mut restored, &snapshot).unwrap();
        let logits_after = restored.forward(&[1, 2, 3, 3, 2, 1], 2);

        for (a, b) in logits_before
            .data()
            .iter()
            .zip(logits_after.data().iter())
        {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
