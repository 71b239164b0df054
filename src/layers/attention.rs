//! Multi-Head Self-Attention
//!
//! The contextualization mechanism of the decoder. Hidden states are
//! projected into `num_heads` independent (query, key, value) subspaces of
//! width `d_model / num_heads`; each head attends over the sequence on its
//! own slice, and the heads are concatenated and re-projected.
//!
//! ## Scaled dot-product attention
//!
//! ```text
//! Q, K, V = split(x @ W_qkv)
//! scores  = (Q @ K^T) / sqrt(head_dim)
//! weights = softmax(mask(scores))      // blocked pairs -> probability 0
//! output  = concat_heads(weights @ V) @ W_proj
//! ```
//!
//! Scaling by `1/sqrt(head_dim)` keeps dot products from growing with head
//! width, which would push softmax into near-one-hot saturation.
//!
//! ## Masking
//!
//! The layer does not decide visibility itself: the decoder stack builds one
//! combined causal+padding [`AttentionMask`] per forward pass and every
//! block applies it to its scores before softmax. A mask that cannot
//! broadcast against the score shape is a fatal integration error surfaced
//! as [`ModelError::MaskShapeMismatch`].

use rand::rngs::StdRng;

use super::dropout::Dropout;
use super::linear::Linear;
use super::Mode;
use crate::error::ModelError;
use crate::mask::AttentionMask;
use crate::tensor::Tensor;

/// Multi-head self-attention with a fused QKV projection.
pub struct MultiHeadAttention {
    /// Combined Q, K, V projection: `[d_model, 3 * d_model]`.
    pub qkv: Linear,
    /// Output projection after head concatenation: `[d_model, d_model]`.
    pub proj: Linear,
    /// Dropout on the projected output, training mode only.
    pub dropout: Dropout,
    pub num_heads: usize,
    pub head_dim: usize,
}

impl MultiHeadAttention {
    /// # Arguments
    ///
    /// * `d_model` - Width of the residual stream; must be divisible by
    ///   `num_heads` (validated by the config before construction)
    /// * `num_heads` - Number of parallel attention subspaces
    pub fn new(d_model: usize, num_heads: usize, dropout_rate: f32, rng: &mut StdRng) -> Self {
        assert_eq!(
            d_model % num_heads,
            0,
            "d_model ({d_model}) must be divisible by num_heads ({num_heads})"
        );

        Self {
            qkv: Linear::new(d_model, 3 * d_model, rng),
            proj: Linear::new(d_model, d_model, rng),
            dropout: Dropout::new(dropout_rate),
            num_heads,
            head_dim: d_model / num_heads,
        }
    }

    /// Attend over the sequence under the given visibility mask.
    ///
    /// Input and output are both `[batch, seq, d_model]`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MaskShapeMismatch`] if the mask does not
    /// broadcast against the score shape `[batch, heads, seq, seq]`.
    pub fn forward(
        &self,
        x: &Tensor,
        mask: &AttentionMask,
        mode: Mode,
    ) -> Result<Tensor, ModelError> {
        let (batch, seq_len, d_model) = (x.shape[0], x.shape[1], x.shape[2]);

        // Fused projection, then slice out Q, K, V per position.
        let qkv = self.qkv.forward(x);
        let mut q_data = Vec::with_capacity(batch * seq_len * d_model);
        let mut k_data = Vec::with_capacity(batch * seq_len * d_model);
        let mut v_data = Vec::with_capacity(batch * seq_len * d_model);
        for pos in 0..batch * seq_len {
            let start = pos * 3 * d_model;
            q_data.extend_from_slice(&qkv.data[start..start + d_model]);
            k_data.extend_from_slice(&qkv.data[start + d_model..start + 2 * d_model]);
            v_data.extend_from_slice(&qkv.data[start + 2 * d_model..start + 3 * d_model]);
        }

        let q = self.split_heads(&Tensor::new(q_data, vec![batch, seq_len, d_model]));
        let k = self.split_heads(&Tensor::new(k_data, vec![batch, seq_len, d_model]));
        let v = self.split_heads(&Tensor::new(v_data, vec![batch, seq_len, d_model]));

        // scores[b,h,i,j] = <q_i, k_j> / sqrt(head_dim)
        let scale = 1.0 / (self.head_dim as f32).sqrt();
        let scores = q.matmul(&k.transpose_last2()).mul_scalar(scale);

        // Blocked pairs get probability zero; softmax normalizes over keys.
        let weights = mask.apply(&scores)?.softmax_last();

        let context = self.merge_heads(&weights.matmul(&v));
        let out = self.proj.forward(&context);
        Ok(self.dropout.forward(&out, mode))
    }

    /// `[batch, seq, d_model] -> [batch, heads, seq, head_dim]`
    fn split_heads(&self, x: &Tensor) -> Tensor {
        let (batch, seq_len) = (x.shape[0], x.shape[1]);
        let (heads, dim) = (self.num_heads, self.head_dim);

        let mut out = vec![0.0; x.data.len()];
        for b in 0..batch {
            for s in 0..seq_len {
                for h in 0..heads {
                    let src = (b * seq_len + s) * heads * dim + h * dim;
                    let dst = ((b * heads + h) * seq_len + s) * dim;
                    out[dst..dst + dim].copy_from_slice(&x.data[src..src + dim]);
                }
            }
        }

        Tensor::new(out, vec![batch, heads, seq_len, dim])
    }

    /// `[batch, heads, seq, head_dim] -> [batch, seq, d_model]`
    fn merge_heads(&self, x: &Tensor) -> Tensor {
        let (batch, seq_len) = (x.shape[0], x.shape[2]);
        let (heads, dim) = (self.num_heads, self.head_dim);

        let mut out = vec![0.0; x.data.len()];
        for b in 0..batch {
            for s in 0..seq_len {
                for h in 0..heads {
                    let src = ((b * heads + h) * seq_len + s) * dim;
                    let dst = (b * seq_len + s) * heads * dim + h * dim;
                    out[dst..dst + dim].copy_from_slice(&x.data[src..src + dim]);
                }
            }
        }

        Tensor::new(out, vec![batch, seq_len, heads * dim])
    }
}
