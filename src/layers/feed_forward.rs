//! Position-Wise Feed-Forward Network
//!
//! The second sublayer of every decoder block: expand each position
//! independently to `expansion * d_model`, apply GELU, project back. The
//! widened hidden stage is where most of a block's capacity lives; the
//! residual stream stays at `d_model` for efficiency.

use rand::rngs::StdRng;

use super::activation::gelu;
use super::dropout::Dropout;
use super::linear::Linear;
use super::Mode;
use crate::tensor::Tensor;

/// Two-stage expansion MLP applied independently at every position.
pub struct FeedForward {
    /// `[d_model, expansion * d_model]`
    pub expand: Linear,
    /// `[expansion * d_model, d_model]`
    pub contract: Linear,
    pub dropout: Dropout,
}

impl FeedForward {
    pub fn new(d_model: usize, expansion: usize, dropout_rate: f32, rng: &mut StdRng) -> Self {
        let hidden = expansion * d_model;
        Self {
            expand: Linear::new(d_model, hidden, rng),
            contract: Linear::new(hidden, d_model, rng),
            dropout: Dropout::new(dropout_rate),
        }
    }

    /// `x -> dropout(contract(gelu(expand(x))))`, shape-preserving.
    pub fn forward(&self, x: &Tensor, mode: Mode) -> Tensor {
        let h = gelu(&self.expand.forward(x));
        self.dropout.forward(&self.contract.forward(&h), mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_forward_preserves_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let ffn = FeedForward::new(6, 4, 0.0, &mut rng);
        let y = ffn.forward(&Tensor::zeros(vec![1, 5, 6]), Mode::Inference);
        assert_eq!(y.shape, vec![1, 5, 6]);
    }

    #[test]
    fn test_hidden_stage_is_expanded() {
        let mut rng = StdRng::seed_from_u64(3);
        let ffn = FeedForward::new(6, 4, 0.0, &mut rng);
        assert_eq!(ffn.expand.weight.shape, vec![6, 24]);
        assert_eq!(ffn.contract.weight.shape, vec![24, 6]);
    }
}
