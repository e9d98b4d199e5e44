//! XML-CNN classifier for large label sets.
//!
//! Compared to [`super::TextCnn`] the convolution outputs are pooled in
//! several chunks along the sequence, keeping coarse positional
//! information, and the wider pooled features pass through a bottleneck
//! layer before the output projection.

use super::init::xavier;
use super::{embed_windows, ModelParams, TextClassifier};
use crate::autograd::{bias_add, chunk_max_pool, concat_features, matmul, relu, Tensor};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct XmlCnn {
    embeddings: Array2<f32>,
    filter_widths: Vec<usize>,
    out_channels: usize,
    embed_dim: usize,
    pool_chunks: usize,
    hidden_units: usize,
    n_classes: usize,
    conv_weights: Vec<Tensor>,
    conv_biases: Vec<Tensor>,
    bottleneck_weight: Tensor,
    bottleneck_bias: Tensor,
    output_weight: Tensor,
    output_bias: Tensor,
}

impl XmlCnn {
    pub const NAME: &'static str = "xml-cnn";

    pub fn new(params: &ModelParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let embed_dim = params.embed_dim();
        let pool_chunks = params.pool_chunks.max(1);

        let mut conv_weights = Vec::with_capacity(params.filter_widths.len());
        let mut conv_biases = Vec::with_capacity(params.filter_widths.len());
        for &width in &params.filter_widths {
            conv_weights.push(xavier(&mut rng, width * embed_dim, params.out_channels));
            conv_biases.push(Tensor::zeros(params.out_channels, true));
        }

        let feature_dim = params.filter_widths.len() * pool_chunks * params.out_channels;
        let bottleneck_weight = xavier(&mut rng, feature_dim, params.hidden_units);
        let bottleneck_bias = Tensor::zeros(params.hidden_units, true);
        let output_weight = xavier(&mut rng, params.hidden_units, params.n_classes);
        let output_bias = Tensor::zeros(params.n_classes, true);

        Self {
            embeddings: params.embeddings.clone(),
            filter_widths: params.filter_widths.clone(),
            out_channels: params.out_channels,
            embed_dim,
            pool_chunks,
            hidden_units: params.hidden_units,
            n_classes: params.n_classes,
            conv_weights,
            conv_biases,
            bottleneck_weight,
            bottleneck_bias,
            output_weight,
            output_bias,
        }
    }
}

impl TextClassifier for XmlCnn {
    fn architecture(&self) -> &'static str {
        Self::NAME
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn forward(&self, tokens: &[u32], rows: usize) -> Tensor {
        assert!(rows > 0, "forward: empty batch");
        assert_eq!(tokens.len() % rows, 0, "forward: ragged batch");
        let seq_len = tokens.len() / rows;

        let mut parts = Vec::with_capacity(self.filter_widths.len());
        let mut part_widths = Vec::with_capacity(self.filter_widths.len());
        for (i, &width) in self.filter_widths.iter().enumerate() {
            assert!(
                seq_len >= width,
                "forward: sequence length {seq_len} shorter than filter width {width}"
            );
            let positions = seq_len - width + 1;
            assert!(
                positions >= self.pool_chunks,
                "forward: {positions} positions cannot fill {} pooling chunks",
                self.pool_chunks
            );

            let windows = embed_windows(&self.embeddings, tokens, rows, seq_len, width);
            let conv = matmul(
                &windows,
                &self.conv_weights[i],
                rows * positions,
                width * self.embed_dim,
                self.out_channels,
            );
            let conv = bias_add(&conv, &self.conv_biases[i], rows * positions, self.out_channels);
            let activated = relu(&conv);
            parts.push(chunk_max_pool(
                &activated,
                rows,
                positions,
                self.out_channels,
                self.pool_chunks,
            ));
            part_widths.push(self.pool_chunks * self.out_channels);
        }

        let features = concat_features(&parts, rows, &part_widths);
        let feature_dim = self.filter_widths.len() * self.pool_chunks * self.out_channels;

        let hidden = matmul(
            &features,
            &self.bottleneck_weight,
            rows,
            feature_dim,
            self.hidden_units,
        );
        let hidden = relu(&bias_add(&hidden, &self.bottleneck_bias, rows, self.hidden_units));

        let logits = matmul(&hidden, &self.output_weight, rows, self.hidden_units, self.n_classes);
        bias_add(&logits, &self.output_bias, rows, self.n_classes)
    }

    fn named_parameters(&mut self) -> Vec<(String, &mut Tensor)> {
        let mut params: Vec<(String, &mut Tensor)> = Vec::new();
        for ((width, weight), bias) in self
            .filter_widths
            .iter()
            .zip(&mut self.conv_weights)
            .zip(&mut self.conv_biases)
        {
            params.push((format!("conv{width}.weight"), weight));
            params.push((format!("conv{width}.bias"), bias));
        }
        params.push(("bottleneck.weight".to_string(), &mut self.bottleneck_weight));
        params.push(("bottleneck.bias".to_string(), &mut self.bottleneck_bias));
        params.push(("output.weight".to_string(), &mut self.output_weight));
        params.push(("output.bias".to_string(), &mut self.output_bias));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd;
    use ndarray::arr2;

    fn params() -> ModelParams {
        ModelParams {
            out_channels: 3,
            hidden_units: 4,
            n_classes: 5,
            batch_size: 2,
            filter_widths: vec![2],
            pool_chunks: 2,
            embeddings: arr2(&[
                [0.0, 0.0],
                [0.8, -0.2],
                [-0.4, 0.6],
                [0.3, 0.3],
            ]),
        }
    }

    #[test]
    fn forward_shape_is_rows_by_classes() {
        let model = XmlCnn::new(&params(), 42);
        let tokens = vec![1, 2, 3, 1, 2, 0, 3, 3, 2, 1, 0, 0];
        let logits = model.forward(&tokens, 2);
        assert_eq!(logits.len(), 2 * 5);
    }

    #[test]
    fn bottleneck_sees_chunked_features() {
        // widths=1 entry, chunks=2, channels=3 -> 6 pooled features
        let mut model = XmlCnn::new(&params(), 0);
        let named = model.named_parameters();
        let bottleneck = named
            .iter()
            .find(|(n, _)| n == "bottleneck.weight")
            .map(|(_, t)| t.len())
            .unwrap();
        assert_eq!(bottleneck, 6 * 4);
    }

    #[test]
    fn gradients_reach_every_parameter() {
        let mut model = XmlCnn::new(&params(), 3);
        let tokens = vec![1, 2, 3, 1, 2, 3];
        let mut logits = model.forward(&tokens, 1);
        autograd::backward(&mut logits, None);

        for (name, param) in model.named_parameters() {
            assert!(param.grad().is_some(), "no gradient for {name}");
        }
    }

    #[test]
    fn seeded_construction_is_deterministic() {
        let a = XmlCnn::new(&params(), 21);
        let b = XmlCnn::new(&params(), 21);
        let tokens = vec![3, 2, 1, 0, 1, 2];
        assert_eq!(a.forward(&tokens, 1).data(), b.forward(&tokens, 1).data());
    }
}
