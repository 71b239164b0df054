//! Decoder Stack
//!
//! Composes the full sequence-to-logits function:
//!
//! ```text
//! Input ids [batch, seq]
//!     ↓
//! Input embedding (token + position)        [batch, seq, d_model]
//!     ↓
//! Decoder block 1 ... N  (shared mask)      [batch, seq, d_model]
//!     ↓
//! Final layer norm                          [batch, seq, d_model]
//!     ↓
//! Output head (linear, no activation)       [batch, seq, vocab_size]
//! ```
//!
//! The combined causal+padding mask is built **once** per forward pass from
//! the raw input ids and reused by every block. The stack is a pure function
//! of `(ids, mode)` and its parameters: no state is retained between calls,
//! so one instance serves any number of concurrent readers.
//!
//! ## Inference only
//!
//! Parameters are owned by the stack and read-only from its perspective; how
//! they are learned is a separate concern and not part of this crate.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::Config;
use crate::embedding::InputEmbedding;
use crate::error::ModelError;
use crate::layers::{DecoderBlock, LayerNorm, Linear, Mode};
use crate::mask::AttentionMask;
use crate::tensor::Tensor;

/// Seed used by [`DecoderStack::new`]. Any fixed value works; exposing
/// [`DecoderStack::with_seed`] keeps experiments reproducible.
const DEFAULT_SEED: u64 = 0x5EED;

/// Projects final hidden states to unnormalized vocabulary logits.
///
/// Deliberately activation-free: softmax is the caller's job, so that a
/// training loss can consume raw logits and the generation loop can apply
/// its own numerically stable softmax.
pub struct OutputHead {
    pub proj: Linear,
}

impl OutputHead {
    pub fn new(d_model: usize, vocab_size: usize, rng: &mut StdRng) -> Self {
        Self {
            proj: Linear::new(d_model, vocab_size, rng),
        }
    }

    /// `[batch, seq, d_model] -> [batch, seq, vocab_size]`
    pub fn forward(&self, x: &Tensor) -> Tensor {
        self.proj.forward(x)
    }
}

/// A complete decoder-only language model.
///
/// Constructed once from a validated [`Config`] and reused across any number
/// of forward and generation calls.
///
/// # Example
///
/// ```rust
/// use puck::{Config, DecoderStack, Mode};
///
/// let model = DecoderStack::new(&Config::tiny(64)).unwrap();
/// let logits = model.forward(&[vec![1, 2, 3]], Mode::Inference).unwrap();
/// assert_eq!(logits.shape, vec![1, 3, 64]);
/// ```
pub struct DecoderStack {
    pub config: Config,
    pub embedding: InputEmbedding,
    pub blocks: Vec<DecoderBlock>,
    pub ln_final: LayerNorm,
    pub head: OutputHead,
}

impl DecoderStack {
    /// Build a model with freshly initialized parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if any architectural invariant fails;
    /// validation is never deferred past construction.
    pub fn new(config: &Config) -> Result<Self, ModelError> {
        Self::with_seed(config, DEFAULT_SEED)
    }

    /// Build a model whose random initialization is fully determined by
    /// `seed`. Two models built from the same config and seed are identical
    /// parameter-for-parameter.
    pub fn with_seed(config: &Config, seed: u64) -> Result<Self, ModelError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let embedding = InputEmbedding::new(config, &mut rng);
        let blocks = (0..config.num_layers)
            .map(|_| DecoderBlock::new(config, &mut rng))
            .collect();
        let ln_final = LayerNorm::new(config.d_model, 1e-5);
        let head = OutputHead::new(config.d_model, config.vocab_size, &mut rng);

        let model = Self {
            config: config.clone(),
            embedding,
            blocks,
            ln_final,
            head,
        };

        info!(
            vocab_size = config.vocab_size,
            d_model = config.d_model,
            num_layers = config.num_layers,
            num_heads = config.num_heads,
            rich = config.rich,
            parameters = model.num_parameters(),
            "decoder stack initialized"
        );

        Ok(model)
    }

    /// Full forward pass: ids to logits `[batch, seq, vocab_size]`.
    ///
    /// Builds the visibility mask from the raw ids, embeds, threads the
    /// hidden state through every block in order with that same mask, and
    /// projects through the output head.
    ///
    /// # Errors
    ///
    /// Propagates the embedding preconditions (sequence length, token
    /// range) and any mask/score broadcast failure. No partial output is
    /// returned on error.
    pub fn forward(&self, ids: &[Vec<usize>], mode: Mode) -> Result<Tensor, ModelError> {
        let mask = AttentionMask::build(ids);

        let mut x = self.embedding.forward(ids, mode)?;
        for block in &self.blocks {
            x = block.forward(&x, &mask, mode)?;
        }

        Ok(self.head.forward(&self.ln_final.forward(&x)))
    }

    /// Total learnable parameters across the stack.
    pub fn num_parameters(&self) -> usize {
        let embedding = self.embedding.token.data.len() + self.embedding.position.data.len();
        let blocks: usize = self.blocks.iter().map(|b| b.num_parameters()).sum();
        let ln_final = self.ln_final.gamma.data.len() + self.ln_final.beta.data.len();
        let head = self.head.proj.weight.data.len() + self.head.proj.bias.data.len();
        embedding + blocks + ln_final + head
    }
}
