//! Decoder Layers
//!
//! Building blocks of the decoder stack. Each layer is an immutable bundle of
//! parameter tensors with a pure `forward` method; there is no hidden
//! framework state. Layers that behave differently during training (dropout)
//! take an explicit [`Mode`] argument instead of consulting an ambient flag.
//!
//! ## Layers
//!
//! - **linear**: Affine projection `y = x @ W + b`
//! - **layer_norm**: Per-position normalization over the feature axis
//! - **activation**: GELU nonlinearity
//! - **dropout**: Training-only regularization, identity at inference
//! - **attention**: Mask-aware multi-head self-attention
//! - **feed_forward**: Position-wise expansion MLP
//! - **block**: One decoder layer; `Standard` or `Rich` variant

pub mod activation;
pub mod attention;
pub mod block;
pub mod dropout;
pub mod feed_forward;
pub mod layer_norm;
pub mod linear;

pub use activation::gelu;
pub use attention::MultiHeadAttention;
pub use block::DecoderBlock;
pub use dropout::Dropout;
pub use feed_forward::FeedForward;
pub use layer_norm::LayerNorm;
pub use linear::Linear;

/// Whether a forward pass runs with training-time behavior.
///
/// Threaded explicitly through every call so the same layer objects serve
/// both uses: `Training` enables dropout, `Inference` makes the whole stack
/// deterministic. Generation always runs in `Inference` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Training,
    Inference,
}
