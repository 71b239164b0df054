//! Linear Layer
//!
//! The affine projection `y = x @ W + b` underlying every other layer:
//! QKV projections, feed-forward stages, and the output head are all
//! instances of this.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::tensor::Tensor;

/// Standard deviation for weight initialization, following GPT-2.
pub const INIT_STD: f32 = 0.02;

/// Fully connected layer.
///
/// - `weight`: `[in_features, out_features]`
/// - `bias`: `[out_features]`, initialized to zero
pub struct Linear {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl Linear {
    /// Create a linear layer with weights drawn from `N(0, 0.02)`.
    ///
    /// The RNG is threaded in from the model constructor so that a seeded
    /// model is reproducible parameter-for-parameter.
    pub fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        let normal = Normal::new(0.0, INIT_STD).unwrap();
        let weight_data: Vec<f32> = (0..in_features * out_features)
            .map(|_| normal.sample(rng))
            .collect();

        Self {
            weight: Tensor::new(weight_data, vec![in_features, out_features]),
            bias: Tensor::zeros(vec![out_features]),
        }
    }

    /// Forward pass: `y = x @ W + b`.
    ///
    /// Accepts `[rows, in_features]` or `[batch, seq, in_features]`; a 3D
    /// input is flattened to 2D for the product and restored afterwards.
    pub fn forward(&self, x: &Tensor) -> Tensor {
        let out_features = self.weight.shape[1];

        if x.shape.len() == 3 {
            let (batch, seq, in_features) = (x.shape[0], x.shape[1], x.shape[2]);
            let y = x
                .reshape(&[batch * seq, in_features])
                .matmul(&self.weight)
                .reshape(&[batch, seq, out_features]);
            return y.add(&self.bias);
        }

        x.matmul(&self.weight).add(&self.bias)
    }
}
