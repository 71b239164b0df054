//! Decoder Block
//!
//! One layer of contextualization: mask-constrained multi-head attention
//! followed by a position-wise feed-forward network, each wrapped in the
//! pre-norm residual pattern `x + sublayer(norm(x))`.
//!
//! ```text
//! x ──→ LayerNorm ──→ Attention ──→(+)──→ LayerNorm ──→ FeedForward ──→(+)──→
//! │                                 ↑ │                                  ↑
//! └─────────────────────────────────┘ └──────────────────────────────────┘
//! ```
//!
//! ## Variants
//!
//! The block comes in two capacities, chosen once at model construction from
//! `Config::rich` and encoded as a tagged union rather than a per-call
//! branch:
//!
//! - [`StandardBlock`]: the two sublayers above.
//! - [`RichBlock`]: adds a third normalized residual sublayer, a GELU-gated
//!   `d_model -> d_model` projection, for extra per-position capacity at the
//!   same residual width.

use rand::rngs::StdRng;

use super::activation::gelu;
use super::attention::MultiHeadAttention;
use super::dropout::Dropout;
use super::feed_forward::FeedForward;
use super::layer_norm::LayerNorm;
use super::linear::Linear;
use super::Mode;
use crate::config::Config;
use crate::error::ModelError;
use crate::mask::AttentionMask;
use crate::tensor::Tensor;

const LN_EPS: f32 = 1e-5;

/// A decoder layer in one of its two capacity variants.
pub enum DecoderBlock {
    Standard(StandardBlock),
    Rich(RichBlock),
}

impl DecoderBlock {
    /// Build the variant selected by `config.rich`.
    pub fn new(config: &Config, rng: &mut StdRng) -> Self {
        if config.rich {
            DecoderBlock::Rich(RichBlock::new(config, rng))
        } else {
            DecoderBlock::Standard(StandardBlock::new(config, rng))
        }
    }

    /// One contextualization step; shape-preserving over
    /// `[batch, seq, d_model]`.
    pub fn forward(
        &self,
        x: &Tensor,
        mask: &AttentionMask,
        mode: Mode,
    ) -> Result<Tensor, ModelError> {
        match self {
            DecoderBlock::Standard(block) => block.forward(x, mask, mode),
            DecoderBlock::Rich(block) => block.forward(x, mask, mode),
        }
    }

    /// Total learnable parameters in this block.
    pub fn num_parameters(&self) -> usize {
        match self {
            DecoderBlock::Standard(block) => block.num_parameters(),
            DecoderBlock::Rich(block) => {
                block.base.num_parameters()
                    + block.ln_gate.gamma.data.len()
                    + block.ln_gate.beta.data.len()
                    + block.gate.weight.data.len()
                    + block.gate.bias.data.len()
            }
        }
    }
}

/// The default two-sublayer decoder block.
pub struct StandardBlock {
    pub ln_attn: LayerNorm,
    pub attn: MultiHeadAttention,
    pub ln_ffn: LayerNorm,
    pub ffn: FeedForward,
}

impl StandardBlock {
    pub fn new(config: &Config, rng: &mut StdRng) -> Self {
        Self {
            ln_attn: LayerNorm::new(config.d_model, LN_EPS),
            attn: MultiHeadAttention::new(
                config.d_model,
                config.num_heads,
                config.dropout_rate,
                rng,
            ),
            ln_ffn: LayerNorm::new(config.d_model, LN_EPS),
            ffn: FeedForward::new(config.d_model, config.expansion, config.dropout_rate, rng),
        }
    }

    pub fn forward(
        &self,
        x: &Tensor,
        mask: &AttentionMask,
        mode: Mode,
    ) -> Result<Tensor, ModelError> {
        let x = x.add(&self.attn.forward(&self.ln_attn.forward(x), mask, mode)?);
        Ok(x.add(&self.ffn.forward(&self.ln_ffn.forward(&x), mode)))
    }

    fn num_parameters(&self) -> usize {
        let attn = self.attn.qkv.weight.data.len()
            + self.attn.qkv.bias.data.len()
            + self.attn.proj.weight.data.len()
            + self.attn.proj.bias.data.len();
        let ffn = self.ffn.expand.weight.data.len()
            + self.ffn.expand.bias.data.len()
            + self.ffn.contract.weight.data.len()
            + self.ffn.contract.bias.data.len();
        let norms = 2 * (self.ln_attn.gamma.data.len() + self.ln_attn.beta.data.len());
        attn + ffn + norms
    }
}

/// Higher-capacity variant: the standard block plus a third residual
/// sublayer, `x + dropout(gate(gelu-activated, normalized x))`.
pub struct RichBlock {
    pub base: StandardBlock,
    pub ln_gate: LayerNorm,
    pub gate: Linear,
    pub gate_dropout: Dropout,
}

impl RichBlock {
    pub fn new(config: &Config, rng: &mut StdRng) -> Self {
        Self {
            base: StandardBlock::new(config, rng),
            ln_gate: LayerNorm::new(config.d_model, LN_EPS),
            gate: Linear::new(config.d_model, config.d_model, rng),
            gate_dropout: Dropout::new(config.dropout_rate),
        }
    }

    pub fn forward(
        &self,
        x: &Tensor,
        mask: &AttentionMask,
        mode: Mode,
    ) -> Result<Tensor, ModelError> {
        let x = self.base.forward(x, mask, mode)?;
        let extra = self.gate.forward(&gelu(&self.ln_gate.forward(&x)));
        Ok(x.add(&self.gate_dropout.forward(&extra, mode)))
    }
}
