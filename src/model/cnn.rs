//! Plain convolutional text classifier.

use super::init::xavier;
use super::{embed_windows, ModelParams, TextClassifier};
use crate::autograd::{bias_add, concat_features, matmul, max_over_time, relu, Tensor};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Kim-style CNN: one convolution per filter width, max-over-time
/// pooling, then a ReLU hidden layer feeding the per-category logits.
pub struct TextCnn {
    embeddings: Array2<f32>,
    filter_widths: Vec<usize>,
    out_channels: usize,
    embed_dim: usize,
    hidden_units: usize,
    n_classes: usize,
    conv_weights: Vec<Tensor>,
    conv_biases: Vec<Tensor>,
    hidden_weight: Tensor,
    hidden_bias: Tensor,
    output_weight: Tensor,
    output_bias: Tensor,
}

impl TextCnn {
    pub const NAME: &'static str = "cnn";

    pub fn new(params: &ModelParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let embed_dim = params.embed_dim();

        let mut conv_weights = Vec::with_capacity(params.filter_widths.len());
        let mut conv_biases = Vec::with_capacity(params.filter_widths.len());
        for &width in &params.filter_widths {
            conv_weights.push(xavier(&mut rng, width * embed_dim, params.out_channels));
            conv_biases.push(Tensor::zeros(params.out_channels, true));
        }

        let feature_dim = params.filter_widths.len() * params.out_channels;
        let hidden_weight = xavier(&mut rng, feature_dim, params.hidden_units);
        let hidden_bias = Tensor::zeros(params.hidden_units, true);
        let output_weight = xavier(&mut rng, params.hidden_units, params.n_classes);
        let output_bias = Tensor::zeros(params.n_classes, true);

        Self {
            embeddings: params.embeddings.clone(),
            filter_widths: params.filter_widths.clone(),
            out_channels: params.out_channels,
            embed_dim,
            hidden_units: params.hidden_units,
            n_classes: params.n_classes,
            conv_weights,
            conv_biases,
            hidden_weight,
            hidden_bias,
            output_weight,
            output_bias,
        }
    }
}

impl TextClassifier for TextCnn {
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
            parts.push(max_over_time(&activated, rows, positions, self.out_channels));
            part_widths.push(self.out_channels);
        }

        let features = concat_features(&parts, rows, &part_widths);
        let feature_dim = self.filter_widths.len() * self.out_channels;

        let hidden = matmul(&features, &self.hidden_weight, rows, feature_dim, self.hidden_units);
        let hidden = relu(&bias_add(&hidden, &self.hidden_bias, rows, self.hidden_units));

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
        params.push(("hidden.weight".to_string(), &mut self.hidden_weight));
        params.push(("hidden.bias".to_string(), &mut self.hidden_bias));
        params.push(("output.weight".to_string(), &mut self.output_weight));
        params.push(("output.bias".to_string(), &mut self.output_bias));
        params
    }
}
